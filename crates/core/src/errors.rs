//! Core error types for the market analyzer.

use market_analyzer_market_data::{MarketDataError, Rejection};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for overview orchestration and analytics.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// The provider answered, but with a rejection instead of data.
    #[error("Upstream rejected the request: {0}")]
    Upstream(Rejection),

    #[error("Failed to persist market overview: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::Upstream(rejection)
    }
}
