use thiserror::Error;

/// Problems with `config.ini` or the credentials. Only raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("no keywords configured in [KEYWORDS]")]
    NoKeywords,

    #[error("MAX_SEEN_ITEMS must be greater than zero")]
    ZeroCapacity,

    #[error("invalid DAILY_SUMMARY_TIME '{0}', expected HH:MM")]
    InvalidSummaryTime(String),
}

/// A failed search for one keyword. The cycle moves on to the next keyword.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("unexpected page structure: {0}")]
    Parse(String),
}
