use async_trait::async_trait;

use super::model::{RefreshReason, RefreshStatus, Snapshot, StartRefreshOutcome};
use crate::errors::Result;

/// Market overview orchestration as seen by callers.
#[async_trait]
pub trait MarketOverviewServiceTrait: Send + Sync {
    /// Most recent snapshot, if any refresh ever completed.
    async fn get_latest(&self) -> Option<Snapshot>;

    /// Up to `limit` most recent snapshots, oldest first.
    async fn get_history(&self, limit: usize) -> Vec<Snapshot>;

    /// Queue a background refresh unless one is already running.
    async fn start_refresh(&self, reason: RefreshReason) -> StartRefreshOutcome;

    /// Run one refresh to completion on the calling task.
    async fn refresh_once(&self, reason: RefreshReason, track_progress: bool) -> Result<Snapshot>;

    async fn get_refresh_status(&self) -> RefreshStatus;

    /// Launch the half-hour scheduler.
    async fn start(&self);

    /// Cancel the scheduler and any in-flight refresh, and wait for both.
    async fn stop(&self);
}
