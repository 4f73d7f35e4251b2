//! Error types for the yotei ecosystem.

use thiserror::Error;

/// Errors that can occur in yotei operations.
#[derive(Error, Debug)]
pub enum YoteiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Calendar service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Calendar not found: {0}")]
    InvalidCalendar(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for yotei operations.
pub type YoteiResult<T> = Result<T, YoteiError>;

impl From<std::io::Error> for YoteiError {
    fn from(err: std::io::Error) -> Self {
        YoteiError::StoreUnavailable(err.to_string())
    }
}
