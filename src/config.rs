use chrono::NaiveTime;
use config::{File, FileFormat};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const EXCHANGE_RATE_API_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const BUYEE_BASE_URL: &str = "https://buyee.jp";
pub const TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone)]
pub struct Config {
    /// Search keyword -> label shown in Telegram, in file order.
    pub keywords: IndexMap<String, String>,
    pub max_seen_items: usize,
    pub seen_file: PathBuf,
    pub daily_summary_time: NaiveTime,
    pub keyword_batch_delay: Duration,
    pub full_cycle_delay: Duration,
    pub telegram: TelegramCredentials,
    pub telegram_api_url: String,
    pub exchange_rate_api_url: String,
    pub buyee_base_url: String,
    pub translate_api_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = non_empty_env("BOT_TOKEN")?;
        let chat_id = non_empty_env("CHAT_ID")?;
        Ok(Self { bot_token, chat_id })
    }
}

fn non_empty_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

// Section and key names are matched both as written in config.ini and
// lowercased, since the `config` crate may normalise key case.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "BOT_SETTINGS")]
    bot_settings: BotSettings,
    #[serde(alias = "SCHEDULE")]
    schedule: ScheduleSettings,
    #[serde(alias = "DELAYS")]
    delays: DelaySettings,
    #[serde(alias = "KEYWORDS")]
    keywords: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BotSettings {
    #[serde(alias = "MAX_SEEN_ITEMS", default = "default_max_seen_items")]
    max_seen_items: usize,
    #[serde(alias = "SEEN_FILE", default = "default_seen_file")]
    seen_file: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleSettings {
    #[serde(alias = "DAILY_SUMMARY_TIME", default = "default_summary_time")]
    daily_summary_time: String,
}

#[derive(Debug, Deserialize)]
struct DelaySettings {
    #[serde(alias = "KEYWORD_BATCH_DELAY", default = "default_keyword_delay")]
    keyword_batch_delay: u64,
    #[serde(alias = "FULL_CYCLE_DELAY", default = "default_cycle_delay")]
    full_cycle_delay: u64,
}

fn default_max_seen_items() -> usize {
    6000
}

fn default_seen_file() -> String {
    "seen_items.json".to_string()
}

fn default_summary_time() -> String {
    "12:30".to_string()
}

fn default_keyword_delay() -> u64 {
    10
}

fn default_cycle_delay() -> u64 {
    60
}

impl Config {
    /// Load `config.ini` plus the Telegram credentials from the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let telegram = TelegramCredentials::from_env()?;
        Self::from_file(path, telegram)
    }

    pub fn from_file(path: &Path, telegram: TelegramCredentials) -> Result<Self, ConfigError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini).required(true))
            .build()?
            .try_deserialize()?;

        if raw.bot_settings.max_seen_items == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let summary = raw.schedule.daily_summary_time.trim();
        let daily_summary_time = NaiveTime::parse_from_str(summary, "%H:%M")
            .map_err(|_| ConfigError::InvalidSummaryTime(summary.to_string()))?;

        let keywords: IndexMap<String, String> = raw
            .keywords
            .into_iter()
            .map(|(keyword, label)| (keyword.trim().to_string(), label.trim().to_string()))
            .filter(|(keyword, _)| !keyword.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ConfigError::NoKeywords);
        }

        // Relative seen-file paths live next to config.ini
        let seen_file = PathBuf::from(&raw.bot_settings.seen_file);
        let seen_file = if seen_file.is_absolute() {
            seen_file
        } else {
            path.parent().unwrap_or_else(|| Path::new("")).join(seen_file)
        };

        info!("Loaded {} keywords from {}", keywords.len(), path.display());

        Ok(Config {
            keywords,
            max_seen_items: raw.bot_settings.max_seen_items,
            seen_file,
            daily_summary_time,
            keyword_batch_delay: Duration::from_secs(raw.delays.keyword_batch_delay),
            full_cycle_delay: Duration::from_secs(raw.delays.full_cycle_delay),
            telegram,
            telegram_api_url: TELEGRAM_API_URL.to_string(),
            exchange_rate_api_url: EXCHANGE_RATE_API_URL.to_string(),
            buyee_base_url: BUYEE_BASE_URL.to_string(),
            translate_api_url: TRANSLATE_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Display label for a keyword, falling back to the keyword itself.
    pub fn label_for<'a>(&'a self, keyword: &'a str) -> &'a str {
        match self.keywords.get(keyword) {
            Some(label) if !label.is_empty() => label,
            _ => keyword,
        }
    }
}
