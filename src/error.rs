use thiserror::Error;

/// Errors surfaced by the trading core and its collaborators
#[derive(Debug, Error)]
pub enum BotError {
    /// Price series shorter than the indicator lookback
    #[error("insufficient data: have {have} prices, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("indicator period must be greater than zero")]
    InvalidPeriod,

    /// Network or HTTP failure talking to the exchange
    #[error("transport error: {0}")]
    Transport(String),

    /// The exchange answered but refused the order
    #[error("order rejected by exchange ({status}): {detail}")]
    Execution { status: u16, detail: String },

    #[error("malformed candle: {0}")]
    MalformedCandle(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// True for failures of the durable store
    pub fn is_persistence(&self) -> bool {
        matches!(self, BotError::Persistence(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Transport(err.to_string())
    }
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        BotError::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for BotError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        BotError::Persistence(format!("migration failed: {}", err))
    }
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}
