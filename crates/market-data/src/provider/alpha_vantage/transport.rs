use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::errors::MarketDataError;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub(crate) const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Sends one query to the upstream and returns the raw body.
///
/// Implementations map transport problems onto [`MarketDataError`]; they do
/// not interpret the body.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn get(
        &self,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<String, MarketDataError>;
}

/// reqwest-backed transport against the Alpha Vantage query URL.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MarketDataError::Transport {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn get(
        &self,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<String, MarketDataError> {
        let url = reqwest::Url::parse_with_params(&self.base_url, query).map_err(|e| {
            MarketDataError::InvalidRequest(format!("Failed to build URL: {}", e))
        })?;

        if log::log_enabled!(log::Level::Debug) {
            let mut masked = url.as_str().to_string();
            for (name, value) in query {
                if *name == "apikey" && !value.is_empty() {
                    masked = masked.replace(value.as_str(), "***");
                }
            }
            debug!("Alpha Vantage request: {}", masked);
        }

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::Transport {
                        provider: PROVIDER_ID.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::HttpStatus {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Transport {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}
