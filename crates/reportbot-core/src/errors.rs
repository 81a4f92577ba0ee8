use std::time::Duration;

/// Core error type for the report bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can turn any failure into the right user-facing reply (rate limit vs generic).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
