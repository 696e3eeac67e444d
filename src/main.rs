use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod models;
mod monitor;
mod parsers;
mod scrapers;
mod storage;
mod telegram;
mod utils;

use crate::config::Config;
use crate::monitor::Monitor;
use crate::scrapers::BuyeeScraper;
use crate::storage::JsonFileStorage;
use crate::telegram::TelegramNotifier;
use crate::utils::exchange_rate::ExchangeRateClient;
use crate::utils::translate::GoogleTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive("mercari_monitor=info".parse()?);
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Mercari monitor");

    // BOT_TOKEN and CHAT_ID may come from key.env
    dotenv::from_filename("key.env").ok();

    let config_path = std::env::var("MONITOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.ini"));
    let config = match Config::load(&config_path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    info!("Configuration validation passed");

    let client = utils::http::create_client(&config.user_agent)?;

    let notifier = TelegramNotifier::new(
        client.clone(),
        config.telegram_api_url.as_str(),
        config.telegram.clone(),
    );
    notifier
        .check_connection()
        .await
        .context("Cannot connect to Telegram API, check BOT_TOKEN")?;
    info!("Telegram connection verified");

    let storage = JsonFileStorage::new(config.seen_file.clone());
    info!("Seen items file: {}", storage.path().display());

    let mut monitor = Monitor::new(
        config.clone(),
        client,
        Box::new(BuyeeScraper::new(config.buyee_base_url.as_str())),
        Box::new(notifier),
        Box::new(storage),
        ExchangeRateClient::new(config.exchange_rate_api_url.as_str()),
        Box::new(GoogleTranslator::new(config.translate_api_url.as_str())),
    )
    .await;

    let seen = monitor.seen();
    if seen.is_empty() {
        info!("No seen items yet, every current listing will be notified");
    } else {
        info!("Tracking {} of up to {} seen items", seen.len(), seen.capacity());
    }

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Mercari monitor is shutting down");
    Ok(())
}
