//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all upstream operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to the upstream provider.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the backoff loop repeats the call.
///
/// Upstream rejections (throttle notes, informational notices, invalid-call
/// messages) are *not* errors; they come back as
/// [`Upstream::Rejected`](crate::models::Upstream::Rejected).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// No API key is configured, so no call can be made.
    /// This is a configuration error and is never retried.
    #[error("No Alpha Vantage API keys configured")]
    NoCredentials,

    /// The request could not be built or its parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with HTTP 429.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The connection failed or the body could not be read.
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider being called
        provider: String,
        /// The underlying transport message
        message: String,
    },

    /// The body was not the JSON or CSV document we expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use market_analyzer_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::NoCredentials;
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::NoCredentials | Self::InvalidRequest(_) => RetryClass::Never,

            Self::HttpStatus { status, .. } if *status < 500 => RetryClass::Never,

            Self::Timeout { .. }
            | Self::RateLimited { .. }
            | Self::HttpStatus { .. }
            | Self::Transport { .. }
            | Self::Decode(_) => RetryClass::WithBackoff,
        }
    }
}
