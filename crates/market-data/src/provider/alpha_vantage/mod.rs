//! Alpha Vantage client.
//!
//! Every public operation follows the same path: cache lookup, admission
//! through the shared rate limiter, then up to one attempt per API key.
//! A throttled answer moves on to the next key. When every key was
//! throttled, one last request is made and its answer returned as-is.
//! Transport failures are absorbed by the backoff policy around the whole
//! sequence.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute.

mod transport;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

pub use transport::{HttpTransport, UpstreamTransport, DEFAULT_BASE_URL};

use crate::cache::{CacheConfig, EndpointCaches, TtlCache};
use crate::errors::MarketDataError;
use crate::models::{
    Endpoint, ListingRow, ListingState, NewsQuery, RequestParams, Upstream, UpstreamPayload,
};
use crate::throttle::{BackoffPolicy, KeyPool, MinuteRateLimiter};

const JSON_TIMEOUT: Duration = Duration::from_secs(30);
const CSV_TIMEOUT: Duration = Duration::from_secs(60);

type Decoder<T> = fn(&str) -> Result<Upstream<T>, MarketDataError>;
type RotationCheck<T> = fn(&Upstream<T>) -> bool;

/// Rate-limited, key-rotating, caching Alpha Vantage client.
pub struct AlphaVantageClient {
    transport: Arc<dyn UpstreamTransport>,
    keys: Arc<KeyPool>,
    rate_limiter: Option<Arc<MinuteRateLimiter>>,
    caches: EndpointCaches,
    backoff: BackoffPolicy,
}

impl AlphaVantageClient {
    /// Create a client. Pass `None` as the rate limiter to disable admission
    /// control entirely.
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        keys: Arc<KeyPool>,
        rate_limiter: Option<Arc<MinuteRateLimiter>>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            transport,
            keys,
            rate_limiter,
            caches: EndpointCaches::new(cache_config),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn global_quote(&self, symbol: &str) -> Result<UpstreamPayload, MarketDataError> {
        let params =
            RequestParams::new(Endpoint::Quote).with("symbol", normalize_symbol(symbol)?);
        self.fetch_json(params, &self.caches.quote).await
    }

    pub async fn time_series_daily(
        &self,
        symbol: &str,
        outputsize: Option<&str>,
    ) -> Result<UpstreamPayload, MarketDataError> {
        let params = RequestParams::new(Endpoint::DailySeries)
            .with("symbol", normalize_symbol(symbol)?)
            .with("outputsize", or_default(outputsize, "compact"));
        self.fetch_json(params, &self.caches.daily).await
    }

    pub async fn time_series_intraday(
        &self,
        symbol: &str,
        interval: Option<&str>,
        outputsize: Option<&str>,
    ) -> Result<UpstreamPayload, MarketDataError> {
        let params = RequestParams::new(Endpoint::IntradaySeries)
            .with("symbol", normalize_symbol(symbol)?)
            .with("interval", or_default(interval, "5min"))
            .with("outputsize", or_default(outputsize, "compact"));
        self.fetch_json(params, &self.caches.intraday).await
    }

    pub async fn fx_daily(
        &self,
        from_symbol: &str,
        to_symbol: &str,
        outputsize: Option<&str>,
    ) -> Result<UpstreamPayload, MarketDataError> {
        let params = RequestParams::new(Endpoint::FxSeries)
            .with("from_symbol", normalize_symbol(from_symbol)?)
            .with("to_symbol", normalize_symbol(to_symbol)?)
            .with("outputsize", or_default(outputsize, "compact"));
        self.fetch_json(params, &self.caches.fx).await
    }

    pub async fn crypto_daily(
        &self,
        symbol: &str,
        market: Option<&str>,
    ) -> Result<UpstreamPayload, MarketDataError> {
        let market = normalize_symbol(&or_default(market, "USD"))?;
        let params = RequestParams::new(Endpoint::CryptoSeries)
            .with("symbol", normalize_symbol(symbol)?)
            .with("market", market);
        self.fetch_json(params, &self.caches.crypto).await
    }

    pub async fn news_sentiment(
        &self,
        query: &NewsQuery,
    ) -> Result<UpstreamPayload, MarketDataError> {
        self.fetch_json(query.to_params(), &self.caches.news).await
    }

    /// Listed (or delisted) symbols as CSV rows.
    pub async fn listing_status(
        &self,
        state: ListingState,
    ) -> Result<Upstream<Vec<ListingRow>>, MarketDataError> {
        let params = RequestParams::new(Endpoint::Listing).with("state", state.as_str());
        if let Some(rows) = self.caches.universe.get(&params) {
            return Ok(Upstream::Data(rows));
        }

        let result = self
            .request_with_rotation(
                &params,
                CSV_TIMEOUT,
                Upstream::<Vec<ListingRow>>::decode_table,
                |answer| match answer {
                    Upstream::Data(rows) => rows.is_empty(),
                    Upstream::Rejected(_) => true,
                },
            )
            .await?;

        if let Upstream::Data(rows) = &result {
            if !rows.is_empty() {
                self.caches.universe.insert(params, rows.clone());
            }
        }
        Ok(result)
    }

    async fn fetch_json(
        &self,
        params: RequestParams,
        cache: &TtlCache<RequestParams, Value>,
    ) -> Result<UpstreamPayload, MarketDataError> {
        if let Some(payload) = cache.get(&params) {
            return Ok(Upstream::Data(payload));
        }

        let result = self
            .request_with_rotation(
                &params,
                JSON_TIMEOUT,
                Upstream::<Value>::decode,
                |answer| answer.is_throttled(),
            )
            .await?;

        if let Upstream::Data(payload) = &result {
            cache.insert(params, payload.clone());
        }
        Ok(result)
    }

    async fn request_with_rotation<T>(
        &self,
        params: &RequestParams,
        timeout: Duration,
        decode: Decoder<T>,
        should_rotate: RotationCheck<T>,
    ) -> Result<Upstream<T>, MarketDataError> {
        if self.keys.is_empty() {
            return Err(MarketDataError::NoCredentials);
        }

        let label = params.endpoint().function();
        self.backoff
            .retry(label, move || {
                self.rotate_keys(params, timeout, decode, should_rotate)
            })
            .await
    }

    async fn rotate_keys<T>(
        &self,
        params: &RequestParams,
        timeout: Duration,
        decode: Decoder<T>,
        should_rotate: RotationCheck<T>,
    ) -> Result<Upstream<T>, MarketDataError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let attempts = self.keys.len().max(1);
        for attempt in 1..=attempts {
            let key = self.keys.next()?;
            let body = self.transport.get(&params.to_query(&key), timeout).await?;
            let answer = decode(&body)?;
            if !should_rotate(&answer) {
                return Ok(answer);
            }
            debug!(
                "{}: key {}/{} throttled, rotating",
                params.endpoint(),
                attempt,
                attempts
            );
        }

        warn!(
            "{}: all {} keys throttled, returning final answer",
            params.endpoint(),
            attempts
        );
        let key = self.keys.next()?;
        let body = self.transport.get(&params.to_query(&key), timeout).await?;
        decode(&body)
    }
}

fn normalize_symbol(symbol: &str) -> Result<String, MarketDataError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(MarketDataError::InvalidRequest(
            "symbol must not be empty".to_string(),
        ));
    }
    Ok(symbol.to_uppercase())
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
