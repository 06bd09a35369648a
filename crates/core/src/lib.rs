//! Market Analyzer Core - overview orchestration, analytics and settings.
//!
//! This crate turns upstream payloads from `market-analyzer-market-data`
//! into watchlist snapshots. It owns the refresh state machine, the
//! snapshot history file and the half-hour scheduler; HTTP lives in the
//! server app.

pub mod analytics;
pub mod errors;
pub mod overview;
pub mod settings;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
