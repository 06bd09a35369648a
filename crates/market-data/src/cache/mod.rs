//! In-memory TTL caches, one per upstream endpoint.

mod ttl_cache;

use std::time::Duration;

use serde_json::Value;

pub use ttl_cache::TtlCache;

use crate::models::{ListingRow, RequestParams};

/// Freshness windows for each cache store.
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    pub quote_ttl: Duration,
    pub daily_ttl: Duration,
    pub intraday_ttl: Duration,
    pub news_ttl: Duration,
    pub universe_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::from_secs(60),
            daily_ttl: Duration::from_secs(300),
            intraday_ttl: Duration::from_secs(60),
            news_ttl: Duration::from_secs(300),
            universe_ttl: Duration::from_secs(1800),
        }
    }
}

/// Separate stores per endpoint so one noisy endpoint cannot evict another.
///
/// FX and crypto series share the daily freshness window.
pub struct EndpointCaches {
    pub quote: TtlCache<RequestParams, Value>,
    pub daily: TtlCache<RequestParams, Value>,
    pub intraday: TtlCache<RequestParams, Value>,
    pub fx: TtlCache<RequestParams, Value>,
    pub crypto: TtlCache<RequestParams, Value>,
    pub news: TtlCache<RequestParams, Value>,
    pub universe: TtlCache<RequestParams, Vec<ListingRow>>,
}

impl EndpointCaches {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            quote: TtlCache::new("quote", config.quote_ttl, 512),
            daily: TtlCache::new("daily", config.daily_ttl, 256),
            intraday: TtlCache::new("intraday", config.intraday_ttl, 128),
            fx: TtlCache::new("fx", config.daily_ttl, 256),
            crypto: TtlCache::new("crypto", config.daily_ttl, 256),
            news: TtlCache::new("news", config.news_ttl, 256),
            universe: TtlCache::new("universe", config.universe_ttl, 8),
        }
    }
}

impl Default for EndpointCaches {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
