//! Environment-driven settings for the upstream client and the overview
//! orchestrator.
//!
//! All values come from process environment variables (a `.env` file is
//! loaded into the environment by the server before this runs).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use log::warn;
use market_analyzer_market_data::{CacheConfig, KeyPool, DEFAULT_BASE_URL, NUMBERED_KEY_PREFIX};

pub const DEFAULT_STOCKS: &str = "AAPL,MSFT,GOOGL,AMZN,NVDA,META,TSLA,JPM,UNH,XOM";
pub const DEFAULT_CRYPTOS: &str = "BTC,ETH,SOL,BNB,XRP,ADA,DOGE,AVAX";
pub const DEFAULT_FX_PAIRS: &str = "EUR/USD,GBP/USD,USD/JPY,USD/CHF,AUD/USD,USD/CAD";
pub const DEFAULT_DATA_FILE: &str = "data/market_overview.json";

/// Shortest pause between two sequential upstream calls.
const MIN_CALL_INTERVAL: Duration = Duration::from_millis(50);

/// A currency pair from the FX watchlist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FxPair {
    pub from: String,
    pub to: String,
}

impl FxPair {
    pub fn label(&self) -> String {
        format!("{}/{}", self.from, self.to)
    }
}

/// Configured watchlists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Watchlist {
    pub stocks: Vec<String>,
    pub fx_pairs: Vec<FxPair>,
    pub cryptos: Vec<String>,
}

impl Watchlist {
    pub fn parse(stocks: &str, fx_pairs: &str, cryptos: &str) -> Self {
        Self {
            stocks: parse_symbols(stocks),
            fx_pairs: parse_fx_pairs(fx_pairs),
            cryptos: parse_symbols(cryptos),
        }
    }

    /// One step per symbol plus the news fetch.
    pub fn total_steps(&self) -> usize {
        self.stocks.len() + self.fx_pairs.len() + self.cryptos.len() + 1
    }
}

impl Default for Watchlist {
    fn default() -> Self {
        Self::parse(DEFAULT_STOCKS, DEFAULT_FX_PAIRS, DEFAULT_CRYPTOS)
    }
}

/// Settings shared by the upstream client and the overview service.
#[derive(Clone)]
pub struct Settings {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub cache: CacheConfig,
    pub rate_limit_enabled: bool,
    pub max_calls_per_minute: u32,
    pub scheduler_enabled: bool,
    pub timezone: Tz,
    pub watchlist: Watchlist,
    pub data_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: CacheConfig::default(),
            rate_limit_enabled: true,
            max_calls_per_minute: 5,
            scheduler_enabled: true,
            timezone: Tz::UTC,
            watchlist: Watchlist::default(),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Read settings from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |name: &str| vars.get(name).map(String::as_str);
        let defaults = Self::default();
        let cache_defaults = defaults.cache;

        let numbered: Vec<(String, String)> = vars
            .iter()
            .filter(|(name, _)| name.starts_with(NUMBERED_KEY_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let api_keys = KeyPool::from_sources(
            get("ALPHAVANTAGE_API_KEYS"),
            get("ALPHAVANTAGE_API_KEY"),
            numbered,
        )
        .into_keys();

        let timezone = match get("MARKET_SCHEDULE_TIMEZONE").map(str::trim) {
            Some(name) if !name.is_empty() => name.parse::<Tz>().unwrap_or_else(|_| {
                warn!("Unknown MARKET_SCHEDULE_TIMEZONE '{}', using UTC", name);
                Tz::UTC
            }),
            _ => Tz::UTC,
        };

        Self {
            api_keys,
            base_url: get("ALPHAVANTAGE_BASE_URL")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_BASE_URL)
                .to_string(),
            cache: CacheConfig {
                quote_ttl: seconds(get("CACHE_TTL_QUOTE"), cache_defaults.quote_ttl),
                daily_ttl: seconds(get("CACHE_TTL_DAILY"), cache_defaults.daily_ttl),
                intraday_ttl: seconds(get("CACHE_TTL_INTRADAY"), cache_defaults.intraday_ttl),
                news_ttl: seconds(get("CACHE_TTL_NEWS"), cache_defaults.news_ttl),
                universe_ttl: seconds(get("CACHE_TTL_UNIVERSE"), cache_defaults.universe_ttl),
            },
            rate_limit_enabled: flag(get("ENABLE_SERVER_RATE_LIMIT"), defaults.rate_limit_enabled),
            max_calls_per_minute: get("MAX_CALLS_PER_MINUTE")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(defaults.max_calls_per_minute),
            scheduler_enabled: flag(get("MARKET_SCHEDULER_ENABLED"), defaults.scheduler_enabled),
            timezone,
            watchlist: Watchlist::parse(
                get("MARKET_OVERVIEW_STOCKS").unwrap_or(DEFAULT_STOCKS),
                get("MARKET_OVERVIEW_FX_PAIRS").unwrap_or(DEFAULT_FX_PAIRS),
                get("MARKET_OVERVIEW_CRYPTOS").unwrap_or(DEFAULT_CRYPTOS),
            ),
            data_file: get("MARKET_OVERVIEW_DATA_FILE")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
        }
    }

    /// Pause between sequential upstream calls: one minute spread over the
    /// per-minute budget, never below 50 ms.
    pub fn call_interval(&self) -> Duration {
        let per_call = Duration::from_secs(60) / self.max_calls_per_minute.max(1);
        per_call.max(MIN_CALL_INTERVAL)
    }

    pub fn key_pool(&self) -> KeyPool {
        KeyPool::new(&self.api_keys)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_keys", &format_args!("[{} masked]", self.api_keys.len()))
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("max_calls_per_minute", &self.max_calls_per_minute)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("timezone", &self.timezone)
            .field("watchlist", &self.watchlist)
            .field("data_file", &self.data_file)
            .finish()
    }
}

fn parse_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

fn parse_fx_pairs(value: &str) -> Vec<FxPair> {
    value
        .split(',')
        .map(str::trim)
        .filter_map(|pair| {
            let (from, to) = pair.split_once('/')?;
            Some(FxPair {
                from: from.trim().to_uppercase(),
                to: to.trim().to_uppercase(),
            })
        })
        .collect()
}

fn seconds(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
