//! Market overview: scheduled and on-demand watchlist refreshes, their
//! progress record, and the persisted snapshot history.

mod model;
mod schedule;
mod service;
mod source;
mod store;
mod traits;

#[cfg(test)]
mod tests;

pub use model::{
    progress_percent, Coverage, RefreshReason, RefreshState, RefreshStatus, Snapshot,
    StartRefreshOutcome, SymbolError, COVERAGE_NOTE,
};
pub use schedule::next_half_hour_boundary;
pub use service::{MarketOverviewService, OverviewConfig};
pub use source::MarketDataSource;
pub use store::{SnapshotFileStore, SnapshotStore, HISTORY_LIMIT};
pub use traits::MarketOverviewServiceTrait;
