//! Market overview service.
//!
//! Owns the refresh state machine (`idle -> running -> completed | failed`),
//! the persisted snapshot store and the half-hour scheduler. At most one
//! refresh body runs at a time; status and history reads never wait for it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use market_analyzer_market_data::NewsQuery;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::model::{
    progress_percent, Coverage, RefreshReason, RefreshState, RefreshStatus, Snapshot,
    StartRefreshOutcome, SymbolError, COVERAGE_NOTE,
};
use super::schedule::next_half_hour_boundary;
use super::source::MarketDataSource;
use super::store::{SnapshotFileStore, SnapshotStore};
use super::traits::MarketOverviewServiceTrait;
use crate::analytics::{
    aggregate_news_sentiment, build_market_guidance, summarize_crypto_daily, summarize_fx_daily,
    summarize_timeseries_daily, AssetClass, Row,
};
use crate::errors::{Error, Result};
use crate::settings::{FxPair, Settings, Watchlist};

const NEWS_TOPICS: &str = "financial_markets";
const NEWS_LIMIT: u32 = 200;
const CRYPTO_MARKET: &str = "USD";
const MIN_SCHEDULER_WAIT: Duration = Duration::from_secs(1);

/// What the service refreshes, and how often it may call upstream.
#[derive(Clone, Debug)]
pub struct OverviewConfig {
    pub watchlist: Watchlist,
    pub timezone: Tz,
    /// Pause after every per-symbol upstream call.
    pub call_interval: Duration,
    pub scheduler_enabled: bool,
    pub data_file: PathBuf,
}

impl From<&Settings> for OverviewConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            watchlist: settings.watchlist.clone(),
            timezone: settings.timezone,
            call_interval: settings.call_interval(),
            scheduler_enabled: settings.scheduler_enabled,
            data_file: settings.data_file.clone(),
        }
    }
}

/// A single watchlist entry to fetch.
enum Target<'a> {
    Stock(&'a str),
    Fx(&'a FxPair),
    Crypto(&'a str),
}

impl Target<'_> {
    fn asset_class(&self) -> AssetClass {
        match self {
            Target::Stock(_) => AssetClass::Stock,
            Target::Fx(_) => AssetClass::Fx,
            Target::Crypto(_) => AssetClass::Crypto,
        }
    }

    fn symbol(&self) -> String {
        match self {
            Target::Stock(symbol) | Target::Crypto(symbol) => symbol.to_string(),
            Target::Fx(pair) => pair.label(),
        }
    }

    fn step_label(&self) -> String {
        match self {
            Target::Stock(symbol) => format!("Fetched stock {}", symbol),
            Target::Fx(pair) => format!("Fetched FX {}", pair.label()),
            Target::Crypto(symbol) => format!("Fetched crypto {}", symbol),
        }
    }
}

struct Progress {
    total: usize,
    completed: usize,
    track: bool,
}

struct Inner {
    source: Arc<dyn MarketDataSource>,
    config: OverviewConfig,
    file_store: SnapshotFileStore,
    store: RwLock<SnapshotStore>,
    status: RwLock<RefreshStatus>,
    start_lock: Mutex<()>,
    refresh_lock: Mutex<()>,
    /// Held while a snapshot is written to disk and swapped into `store`.
    commit_lock: Arc<Mutex<()>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct MarketOverviewService {
    inner: Arc<Inner>,
}

impl MarketOverviewService {
    /// Create the service, loading any previously persisted snapshots.
    pub fn new(source: Arc<dyn MarketDataSource>, config: OverviewConfig) -> Self {
        let file_store = SnapshotFileStore::new(config.data_file.clone());
        let store = file_store.load();
        let latest_generated_at = store.latest.as_ref().map(|s| s.generated_at);
        info!(
            "Market overview: {} snapshots loaded from {}",
            store.history.len(),
            file_store.path().display()
        );

        Self {
            inner: Arc::new(Inner {
                source,
                config,
                file_store,
                store: RwLock::new(store),
                status: RwLock::new(RefreshStatus::idle(latest_generated_at)),
                start_lock: Mutex::new(()),
                refresh_lock: Mutex::new(()),
                commit_lock: Arc::new(Mutex::new(())),
                refresh_task: Mutex::new(None),
                scheduler_task: Mutex::new(None),
            }),
        }
    }

    pub async fn scheduler_running(&self) -> bool {
        let slot = self.inner.scheduler_task.lock().await;
        is_active(&*slot)
    }

    async fn update_status<F>(&self, update: F) -> RefreshStatus
    where
        F: FnOnce(&mut RefreshStatus),
    {
        let mut status = self.inner.status.write().await;
        update(&mut status);
        status.clone()
    }

    async fn mark_step(&self, progress: &mut Progress, label: String) {
        progress.completed += 1;
        if !progress.track {
            return;
        }
        let (completed, total) = (progress.completed, progress.total);
        self.update_status(|s| {
            s.total_steps = total;
            s.completed_steps = completed;
            s.progress_percent = progress_percent(completed, total);
            s.current_step = Some(label.clone());
            s.message = Some(label);
        })
        .await;
    }

    async fn fetch_row(&self, target: &Target<'_>) -> Result<Row> {
        let source = &self.inner.source;
        let mut row = Row::new(target.asset_class(), target.symbol());
        match target {
            Target::Stock(symbol) => {
                let payload = source.daily_series(symbol).await?.into_result()?;
                let summary = summarize_timeseries_daily(&payload);
                row.price = summary.latest_close();
                row.momentum_1d = summary.momentum_1d;
                row.volatility_proxy = summary.volatility_proxy;
                row.last_refreshed = summary.last_refreshed;
            }
            Target::Fx(pair) => {
                let payload = source.fx_series(&pair.from, &pair.to).await?.into_result()?;
                let summary = summarize_fx_daily(&payload);
                row.price = summary.latest_close();
                row.momentum_1d = summary.momentum_1d;
                row.last_refreshed = summary.last_refreshed;
            }
            Target::Crypto(symbol) => {
                let payload = source
                    .crypto_series(symbol, CRYPTO_MARKET)
                    .await?
                    .into_result()?;
                let summary = summarize_crypto_daily(&payload);
                row.price = summary.latest_close();
                row.momentum_1d = summary.momentum_1d;
                row.last_refreshed = summary.last_refreshed;
            }
        }
        Ok(row)
    }

    /// Fetch targets one by one. A failed symbol becomes an error record and
    /// the loop moves on.
    async fn collect_rows(
        &self,
        targets: Vec<Target<'_>>,
        progress: &mut Progress,
    ) -> (Vec<Row>, Vec<SymbolError>) {
        let mut rows = Vec::with_capacity(targets.len());
        let mut errors = Vec::new();
        for target in targets {
            match self.fetch_row(&target).await {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(
                        "Market overview: {} {} failed: {}",
                        target.asset_class().as_str(),
                        target.symbol(),
                        e
                    );
                    errors.push(SymbolError {
                        asset_class: target.asset_class(),
                        symbol: target.symbol(),
                        error: e.to_string(),
                    });
                }
            }
            self.mark_step(progress, target.step_label()).await;
            tokio::time::sleep(self.inner.config.call_interval).await;
        }
        (rows, errors)
    }

    async fn build_and_publish(
        &self,
        reason: RefreshReason,
        progress: &mut Progress,
    ) -> Result<Snapshot> {
        let watchlist = &self.inner.config.watchlist;

        let stock_targets = watchlist.stocks.iter().map(|s| Target::Stock(s)).collect();
        let (mut stocks, stock_errors) = self.collect_rows(stock_targets, progress).await;

        let fx_targets = watchlist.fx_pairs.iter().map(Target::Fx).collect();
        let (mut fx, fx_errors) = self.collect_rows(fx_targets, progress).await;

        let crypto_targets = watchlist.cryptos.iter().map(|s| Target::Crypto(s)).collect();
        let (mut crypto, crypto_errors) = self.collect_rows(crypto_targets, progress).await;

        let news_payload = self
            .inner
            .source
            .news(&NewsQuery::topics(NEWS_TOPICS, NEWS_LIMIT))
            .await?
            .into_result()?;
        let news = aggregate_news_sentiment(&news_payload);
        self.mark_step(progress, "Fetched market news sentiment".to_string())
            .await;

        for row in stocks.iter_mut().chain(fx.iter_mut()).chain(crypto.iter_mut()) {
            row.sentiment = news.ticker_average_sentiment.get(&row.symbol).copied();
        }
        let guidance = build_market_guidance(&mut stocks, &mut fx, &mut crypto, &news);

        let notes = vec![COVERAGE_NOTE.to_string(), guidance.disclaimer.clone()];
        let snapshot = Snapshot {
            generated_at: Utc::now(),
            reason,
            timezone: self.inner.config.timezone.name().to_string(),
            coverage: Coverage {
                stocks: stocks.len(),
                fx_pairs: fx.len(),
                cryptos: crypto.len(),
            },
            stocks,
            fx,
            crypto,
            news,
            guidance,
            errors: [stock_errors, fx_errors, crypto_errors].concat(),
            notes,
        };

        self.commit(snapshot.clone()).await?;
        Ok(snapshot)
    }

    /// Persist `snapshot`, then publish it in memory.
    ///
    /// Runs on its own task so that aborting the refresh cannot separate the
    /// file from the in-memory store; `stop` waits on `commit_lock` for it.
    async fn commit(&self, snapshot: Snapshot) -> Result<()> {
        let guard = self.inner.commit_lock.clone().lock_owned().await;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let mut next = inner.store.read().await.clone();
            next.push(snapshot);
            inner.file_store.save(&next).await?;
            *inner.store.write().await = next;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Persistence(format!("snapshot commit did not finish: {}", e)))?
    }

    async fn run_scheduler(&self) {
        let tz = self.inner.config.timezone;
        loop {
            let now = Utc::now();
            let next = next_half_hour_boundary(now, tz);
            let wait = (next - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(MIN_SCHEDULER_WAIT);
            debug!("Next scheduled market overview refresh at {} ({:?})", next, wait);
            tokio::time::sleep(wait).await;

            let outcome = self.start_refresh(RefreshReason::Scheduled).await;
            if !outcome.accepted {
                info!("Scheduled refresh skipped: a refresh is already running");
            }
        }
    }
}

fn is_active(slot: &Option<JoinHandle<()>>) -> bool {
    slot.as_ref().is_some_and(|handle| !handle.is_finished())
}

#[async_trait]
impl MarketOverviewServiceTrait for MarketOverviewService {
    async fn get_latest(&self) -> Option<Snapshot> {
        self.inner.store.read().await.latest.clone()
    }

    async fn get_history(&self, limit: usize) -> Vec<Snapshot> {
        self.inner.store.read().await.recent(limit)
    }

    async fn start_refresh(&self, reason: RefreshReason) -> StartRefreshOutcome {
        let _start = self.inner.start_lock.lock().await;
        let mut slot = self.inner.refresh_task.lock().await;
        if is_active(&*slot) {
            drop(slot);
            debug!("Refresh requested ({}) while one is running", reason);
            return StartRefreshOutcome {
                accepted: false,
                status: self.get_refresh_status().await,
            };
        }

        let total = self.inner.config.watchlist.total_steps();
        let mut status = self
            .update_status(|s| {
                s.state = RefreshState::Running;
                s.reason = Some(reason);
                s.started_at = Some(Utc::now());
                s.finished_at = None;
                s.total_steps = total;
                s.completed_steps = 0;
                s.progress_percent = 0.0;
                s.current_step = Some("Queued".to_string());
                s.message = Some("Refresh queued.".to_string());
                s.error = None;
            })
            .await;

        let service = self.clone();
        *slot = Some(tokio::spawn(async move {
            // Failures are logged and recorded in the status.
            let _ = service.refresh_once(reason, true).await;
        }));

        status.is_running = true;
        StartRefreshOutcome {
            accepted: true,
            status,
        }
    }

    async fn refresh_once(&self, reason: RefreshReason, track_progress: bool) -> Result<Snapshot> {
        let _serialized = self.inner.refresh_lock.lock().await;

        let total = self.inner.config.watchlist.total_steps();
        let mut progress = Progress {
            total,
            completed: 0,
            track: track_progress,
        };

        if track_progress {
            self.update_status(|s| {
                s.state = RefreshState::Running;
                s.reason = Some(reason);
                s.started_at = Some(Utc::now());
                s.finished_at = None;
                s.total_steps = total;
                s.completed_steps = 0;
                s.progress_percent = 0.0;
                s.current_step = Some("Starting refresh".to_string());
                s.message = Some("Starting refresh".to_string());
                s.error = None;
            })
            .await;
        }
        info!("Market overview refresh started ({}, {} steps)", reason, total);

        match self.build_and_publish(reason, &mut progress).await {
            Ok(snapshot) => {
                info!(
                    "Market overview refresh completed: {} stocks, {} fx, {} crypto, {} errors",
                    snapshot.coverage.stocks,
                    snapshot.coverage.fx_pairs,
                    snapshot.coverage.cryptos,
                    snapshot.errors.len()
                );
                if track_progress {
                    let generated_at = snapshot.generated_at;
                    self.update_status(|s| {
                        s.state = RefreshState::Completed;
                        s.finished_at = Some(Utc::now());
                        s.total_steps = total;
                        s.completed_steps = total;
                        s.progress_percent = 100.0;
                        s.current_step = Some("Completed".to_string());
                        s.message = Some("Refresh completed successfully.".to_string());
                        s.error = None;
                        s.latest_generated_at = Some(generated_at);
                    })
                    .await;
                }
                Ok(snapshot)
            }
            Err(e) => {
                error!("Market overview refresh failed: {}", e);
                if track_progress {
                    let message = e.to_string();
                    self.update_status(|s| {
                        s.state = RefreshState::Failed;
                        s.finished_at = Some(Utc::now());
                        s.current_step = Some("Failed".to_string());
                        s.message = Some("Refresh failed.".to_string());
                        s.error = Some(message);
                    })
                    .await;
                }
                Err(e)
            }
        }
    }

    async fn get_refresh_status(&self) -> RefreshStatus {
        let mut status = self.inner.status.read().await.clone();
        let slot = self.inner.refresh_task.lock().await;
        status.is_running = is_active(&*slot);
        status
    }

    async fn start(&self) {
        if !self.inner.config.scheduler_enabled {
            info!("Market overview scheduler disabled");
            return;
        }
        let mut slot = self.inner.scheduler_task.lock().await;
        if is_active(&*slot) {
            return;
        }
        let service = self.clone();
        *slot = Some(tokio::spawn(async move { service.run_scheduler().await }));
        info!(
            "Market overview scheduler started (every :00 and :30, {})",
            self.inner.config.timezone.name()
        );
    }

    async fn stop(&self) {
        let scheduler = self.inner.scheduler_task.lock().await.take();
        if let Some(handle) = scheduler {
            handle.abort();
            let _ = handle.await;
            info!("Market overview scheduler stopped");
        }

        let refresh = self.inner.refresh_task.lock().await.take();
        if let Some(handle) = refresh {
            if !handle.is_finished() {
                handle.abort();
                let _ = handle.await;
                warn!("In-flight market overview refresh cancelled");
                let _commit = self.inner.commit_lock.lock().await;
                let latest_generated_at = self
                    .inner
                    .store
                    .read()
                    .await
                    .latest
                    .as_ref()
                    .map(|snapshot| snapshot.generated_at);
                self.update_status(|s| {
                    s.latest_generated_at = latest_generated_at;
                    if s.state == RefreshState::Running {
                        s.state = RefreshState::Failed;
                        s.finished_at = Some(Utc::now());
                        s.current_step = Some("Cancelled".to_string());
                        s.message = Some("Refresh cancelled.".to_string());
                        s.error = Some("Refresh was cancelled before it completed.".to_string());
                    }
                })
                .await;
            }
        }
    }
}
