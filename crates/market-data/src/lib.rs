//! Market Analyzer Market Data Crate
//!
//! This crate wraps the Alpha Vantage query API behind a client that keeps
//! working on a free-tier key budget.
//!
//! # Overview
//!
//! - Minute-windowed admission shared by every upstream call
//! - Round-robin rotation across several API keys when one is throttled
//! - Bounded exponential backoff for transport failures
//! - Per-endpoint TTL caches so repeated lookups never touch the network
//!
//! # Architecture
//!
//! ```text
//! caller ──> AlphaVantageClient ──> EndpointCaches (hit? return)
//!                    │
//!                    v
//!            BackoffPolicy::retry
//!                    │
//!                    v
//!          MinuteRateLimiter::acquire
//!                    │
//!                    v
//!     KeyPool::next ──> UpstreamTransport::get ──> Upstream::decode
//!                    ^                                   │
//!                    └──────── throttled: next key ──────┘
//! ```
//!
//! Upstream answers are decoded exactly once into [`Upstream`]: either
//! `Data` or `Rejected` (throttling, informational notices, invalid calls).
//! A rejection is a value, not an error; callers decide how to surface it.

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod throttle;

pub use cache::{CacheConfig, EndpointCaches, TtlCache};
pub use errors::{MarketDataError, RetryClass};
pub use models::{
    Endpoint, ListingRow, ListingState, NewsQuery, Rejection, RejectionKind, RequestParams,
    Upstream, UpstreamPayload,
};
pub use provider::alpha_vantage::{
    AlphaVantageClient, HttpTransport, UpstreamTransport, DEFAULT_BASE_URL,
};
pub use throttle::{BackoffPolicy, KeyPool, MinuteRateLimiter, NUMBERED_KEY_PREFIX};
