use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{AssetClass, Guidance, NewsSummary, Row};

pub const COVERAGE_NOTE: &str =
    "Coverage is based on configured watchlists and not every global tradable instrument.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshReason {
    Manual,
    Scheduled,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshReason::Manual => f.write_str("manual"),
            RefreshReason::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Process-wide progress record of the most recent refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub reason: Option<RefreshReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub progress_percent: f64,
    pub current_step: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub latest_generated_at: Option<DateTime<Utc>>,
    /// Derived when the status is read; not part of the stored record.
    #[serde(default)]
    pub is_running: bool,
}

impl RefreshStatus {
    pub fn idle(latest_generated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            state: RefreshState::Idle,
            reason: None,
            started_at: None,
            finished_at: None,
            total_steps: 0,
            completed_steps: 0,
            progress_percent: 0.0,
            current_step: None,
            message: None,
            error: None,
            latest_generated_at,
            is_running: false,
        }
    }
}

/// Share of completed steps in percent, rounded to two decimals.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = completed as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub stocks: usize,
    pub fx_pairs: usize,
    pub cryptos: usize,
}

/// A watchlist entry that could not be fetched during a refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolError {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub error: String,
}

/// One completed refresh. Never modified after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub reason: RefreshReason,
    pub timezone: String,
    pub coverage: Coverage,
    pub stocks: Vec<Row>,
    pub fx: Vec<Row>,
    pub crypto: Vec<Row>,
    pub news: NewsSummary,
    pub guidance: Guidance,
    pub errors: Vec<SymbolError>,
    pub notes: Vec<String>,
}

/// Answer to a refresh request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartRefreshOutcome {
    pub accepted: bool,
    pub status: RefreshStatus,
}
