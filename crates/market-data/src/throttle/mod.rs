//! Call admission, credential rotation and retry backoff.
//!
//! - [`MinuteRateLimiter`]: sliding 60 second window shared by every call
//! - [`KeyPool`]: round-robin API key rotation
//! - [`BackoffPolicy`]: bounded exponential backoff for transport failures

mod backoff;
mod key_pool;
mod rate_limiter;

pub use backoff::BackoffPolicy;
pub use key_pool::{KeyPool, NUMBERED_KEY_PREFIX};
pub use rate_limiter::MinuteRateLimiter;
