use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use market_analyzer_market_data::{
    MarketDataError, NewsQuery, Rejection, RejectionKind, Upstream, UpstreamPayload,
};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::Semaphore;

use super::*;
use crate::errors::Error;
use crate::settings::{FxPair, Watchlist};

#[derive(Default)]
struct FakeSource {
    failing: HashSet<String>,
    rejected: HashSet<String>,
    reject_news: bool,
    gate: Option<Arc<Semaphore>>,
    series_calls: AtomicUsize,
    news_calls: AtomicUsize,
}

impl FakeSource {
    fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn rejecting(mut self, symbol: &str) -> Self {
        self.rejected.insert(symbol.to_string());
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn answer(&self, symbol: &str, payload: Value) -> Result<UpstreamPayload, MarketDataError> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| MarketDataError::Transport {
                provider: "FAKE".to_string(),
                message: e.to_string(),
            })?;
        }
        if self.failing.contains(symbol) {
            return Err(MarketDataError::Timeout {
                provider: "FAKE".to_string(),
            });
        }
        if self.rejected.contains(symbol) {
            return Ok(Upstream::Rejected(rejection("Invalid API call.")));
        }
        Ok(Upstream::Data(payload))
    }
}

fn rejection(message: &str) -> Rejection {
    Rejection {
        kind: RejectionKind::Error,
        message: message.to_string(),
        raw: json!({ "Error Message": message }),
    }
}

fn daily_payload(symbol: &str) -> Value {
    json!({
        "Meta Data": { "2. Symbol": symbol, "3. Last Refreshed": "2024-05-02" },
        "Time Series (Daily)": {
            "2024-05-02": { "4. close": "110.0" },
            "2024-05-01": { "4. close": "100.0" },
            "2024-04-30": { "4. close": "104.0" }
        }
    })
}

fn fx_payload(from: &str, to: &str) -> Value {
    json!({
        "Meta Data": { "2. From Symbol": from, "3. To Symbol": to, "5. Last Refreshed": "2024-05-02" },
        "Time Series FX (Daily)": {
            "2024-05-02": { "4. close": "1.0800" },
            "2024-05-01": { "4. close": "1.0800" }
        }
    })
}

fn crypto_payload(symbol: &str) -> Value {
    json!({
        "Meta Data": { "2. Digital Currency Code": symbol, "3. Market Code": "USD" },
        "Time Series (Digital Currency Daily)": {
            "2024-05-02": { "4. close": "60000" },
            "2024-05-01": { "4. close": "62000" }
        }
    })
}

fn news_payload() -> Value {
    json!({
        "feed": [{
            "title": "Chips rally",
            "overall_sentiment_score": 0.3,
            "ticker_sentiment": [{ "ticker": "AAPL", "ticker_sentiment_score": "0.5" }]
        }]
    })
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn daily_series(&self, symbol: &str) -> Result<UpstreamPayload, MarketDataError> {
        self.answer(symbol, daily_payload(symbol)).await
    }

    async fn fx_series(
        &self,
        from_symbol: &str,
        to_symbol: &str,
    ) -> Result<UpstreamPayload, MarketDataError> {
        let label = format!("{}/{}", from_symbol, to_symbol);
        self.answer(&label, fx_payload(from_symbol, to_symbol)).await
    }

    async fn crypto_series(
        &self,
        symbol: &str,
        _market: &str,
    ) -> Result<UpstreamPayload, MarketDataError> {
        self.answer(symbol, crypto_payload(symbol)).await
    }

    async fn news(&self, query: &NewsQuery) -> Result<UpstreamPayload, MarketDataError> {
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(query.topics.as_deref(), Some("financial_markets"));
        if self.reject_news {
            return Ok(Upstream::Rejected(rejection("news unavailable")));
        }
        Ok(Upstream::Data(news_payload()))
    }
}

fn config(data_file: &Path, stocks: &[&str]) -> OverviewConfig {
    OverviewConfig {
        watchlist: Watchlist {
            stocks: stocks.iter().map(|s| s.to_string()).collect(),
            fx_pairs: Vec::new(),
            cryptos: Vec::new(),
        },
        timezone: Tz::UTC,
        call_interval: Duration::ZERO,
        scheduler_enabled: false,
        data_file: data_file.to_path_buf(),
    }
}

async fn wait_until_idle(service: &MarketOverviewService) -> RefreshStatus {
    for _ in 0..500 {
        let status = service.get_refresh_status().await;
        if !status.is_running {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("refresh did not finish");
}

#[tokio::test]
async fn test_partial_failure_is_recorded_and_refresh_completes() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::default().failing("BAD"));
    let service = MarketOverviewService::new(
        source.clone(),
        config(&dir.path().join("overview.json"), &["AAPL", "MSFT", "BAD"]),
    );

    let snapshot = service
        .refresh_once(RefreshReason::Manual, true)
        .await
        .unwrap();

    assert_eq!(snapshot.stocks.len(), 2);
    assert_eq!(snapshot.coverage.stocks, 2);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].symbol, "BAD");
    assert_eq!(snapshot.timezone, "UTC");
    assert_eq!(
        snapshot.notes,
        vec![
            COVERAGE_NOTE.to_string(),
            crate::analytics::DISCLAIMER.to_string()
        ]
    );

    let aapl = &snapshot.stocks[0];
    assert_eq!(aapl.symbol, "AAPL");
    assert_eq!(aapl.price, Some(110.0));
    assert_eq!(aapl.sentiment, Some(0.5));
    assert!(aapl.signal.is_some());

    let status = service.get_refresh_status().await;
    assert_eq!(status.state, RefreshState::Completed);
    assert_eq!(status.total_steps, 4);
    assert_eq!(status.completed_steps, 4);
    assert_eq!(status.progress_percent, 100.0);
    assert_eq!(status.latest_generated_at, Some(snapshot.generated_at));
    assert!(!status.is_running);

    assert_eq!(service.get_latest().await, Some(snapshot));
    assert_eq!(source.series_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rejected_symbol_becomes_error_record() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir.path().join("overview.json"), &["AAPL"]);
    config.watchlist.fx_pairs = vec![FxPair {
        from: "EUR".to_string(),
        to: "USD".to_string(),
    }];
    config.watchlist.cryptos = vec!["BTC".to_string()];
    let service = MarketOverviewService::new(
        Arc::new(FakeSource::default().rejecting("BTC")),
        config,
    );

    let snapshot = service
        .refresh_once(RefreshReason::Manual, false)
        .await
        .unwrap();

    assert_eq!(snapshot.fx.len(), 1);
    assert_eq!(snapshot.fx[0].symbol, "EUR/USD");
    assert_eq!(snapshot.fx[0].volatility_proxy, None);
    assert!(snapshot.crypto.is_empty());
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].symbol, "BTC");
    assert!(snapshot.errors[0].error.contains("Invalid API call."));

    // Untracked refreshes leave the status record alone.
    let status = service.get_refresh_status().await;
    assert_eq!(status.state, RefreshState::Idle);
}

#[tokio::test]
async fn test_news_rejection_fails_refresh() {
    let dir = tempdir().unwrap();
    let source = FakeSource {
        reject_news: true,
        ..FakeSource::default()
    };
    let service = MarketOverviewService::new(
        Arc::new(source),
        config(&dir.path().join("overview.json"), &["AAPL"]),
    );

    let result = service.refresh_once(RefreshReason::Manual, true).await;
    assert!(matches!(result, Err(Error::Upstream(_))));

    let status = service.get_refresh_status().await;
    assert_eq!(status.state, RefreshState::Failed);
    assert_eq!(status.message.as_deref(), Some("Refresh failed."));
    assert!(status.error.is_some());
    assert!(service.get_latest().await.is_none());
}

#[tokio::test]
async fn test_start_refresh_is_single_flight() {
    let dir = tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(FakeSource::default().gated(gate.clone()));
    let service = MarketOverviewService::new(
        source.clone(),
        config(&dir.path().join("overview.json"), &["AAPL", "MSFT"]),
    );

    let first = service.start_refresh(RefreshReason::Manual).await;
    assert!(first.accepted);
    assert!(first.status.is_running);
    assert_eq!(first.status.state, RefreshState::Running);
    assert_eq!(first.status.total_steps, 3);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = service.start_refresh(RefreshReason::Manual).await;
    assert!(!second.accepted);
    assert!(second.status.is_running);

    gate.add_permits(10);
    let status = wait_until_idle(&service).await;

    assert_eq!(status.state, RefreshState::Completed);
    assert_eq!(source.news_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.get_history(48).await.len(), 1);
}

#[tokio::test]
async fn test_history_is_bounded_by_limit_and_reads_are_stable() {
    let dir = tempdir().unwrap();
    let service = MarketOverviewService::new(
        Arc::new(FakeSource::default()),
        config(&dir.path().join("overview.json"), &["AAPL"]),
    );

    for _ in 0..3 {
        service
            .refresh_once(RefreshReason::Manual, true)
            .await
            .unwrap();
    }

    let history = service.get_history(2).await;
    assert_eq!(history.len(), 2);
    assert!(history[0].generated_at <= history[1].generated_at);
    assert_eq!(service.get_history(48).await.len(), 3);
    assert!(service.get_history(0).await.is_empty());

    let latest = service.get_latest().await;
    assert_eq!(latest, service.get_latest().await);
    assert_eq!(latest.as_ref(), history.last());
}

#[tokio::test]
async fn test_persistence_failure_keeps_prior_state() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let service = MarketOverviewService::new(
        Arc::new(FakeSource::default()),
        config(&blocker.join("overview.json"), &["AAPL"]),
    );

    let result = service.refresh_once(RefreshReason::Manual, true).await;
    assert!(matches!(result, Err(Error::Persistence(_))));

    let status = service.get_refresh_status().await;
    assert_eq!(status.state, RefreshState::Failed);
    assert_eq!(status.latest_generated_at, None);
    assert!(service.get_latest().await.is_none());
    assert!(service.get_history(48).await.is_empty());
}

#[tokio::test]
async fn test_restart_loads_persisted_snapshots() {
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("nested").join("overview.json");

    let first = MarketOverviewService::new(
        Arc::new(FakeSource::default()),
        config(&data_file, &["AAPL"]),
    );
    let snapshot = first
        .refresh_once(RefreshReason::Manual, true)
        .await
        .unwrap();

    let second = MarketOverviewService::new(
        Arc::new(FakeSource::default()),
        config(&data_file, &["AAPL"]),
    );
    assert_eq!(second.get_latest().await, Some(snapshot.clone()));

    let status = second.get_refresh_status().await;
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.latest_generated_at, Some(snapshot.generated_at));
}

#[tokio::test]
async fn test_stop_cancels_inflight_refresh() {
    let dir = tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let service = MarketOverviewService::new(
        Arc::new(FakeSource::default().gated(gate)),
        config(&dir.path().join("overview.json"), &["AAPL"]),
    );

    assert!(service.start_refresh(RefreshReason::Manual).await.accepted);
    tokio::time::sleep(Duration::from_millis(20)).await;
    service.stop().await;

    let status = service.get_refresh_status().await;
    assert!(!status.is_running);
    assert_eq!(status.state, RefreshState::Failed);
    assert_eq!(status.message.as_deref(), Some("Refresh cancelled."));
    assert!(service.get_latest().await.is_none());
}

#[tokio::test]
async fn test_disabled_scheduler_does_not_start() {
    let dir = tempdir().unwrap();
    let service = MarketOverviewService::new(
        Arc::new(FakeSource::default()),
        config(&dir.path().join("overview.json"), &["AAPL"]),
    );

    service.start().await;
    assert!(!service.scheduler_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_scheduled_refresh_at_boundary() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir.path().join("overview.json"), &["AAPL"]);
    config.scheduler_enabled = true;
    let service = MarketOverviewService::new(Arc::new(FakeSource::default()), config);

    service.start().await;
    service.start().await;
    assert!(service.scheduler_running().await);

    let mut scheduled = None;
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let status = service.get_refresh_status().await;
        if status.state == RefreshState::Completed {
            scheduled = status.reason;
            break;
        }
    }
    assert_eq!(scheduled, Some(RefreshReason::Scheduled));
    assert_eq!(
        service.get_latest().await.map(|s| s.reason),
        Some(RefreshReason::Scheduled)
    );

    service.stop().await;
    assert!(!service.scheduler_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_pauses_between_symbol_calls() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir.path().join("overview.json"), &["AAPL", "MSFT", "NVDA"]);
    config.call_interval = Duration::from_secs(12);
    let service = MarketOverviewService::new(Arc::new(FakeSource::default()), config);

    let started = tokio::time::Instant::now();
    let snapshot = service
        .refresh_once(RefreshReason::Manual, false)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(snapshot.coverage.stocks, 3);
    assert!(elapsed >= Duration::from_secs(36), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(37), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_stop_leaves_memory_and_file_in_step() {
    for yields in 0..16 {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overview.json");
        let gate = Arc::new(Semaphore::new(0));
        let service = MarketOverviewService::new(
            Arc::new(FakeSource::default().gated(gate.clone())),
            config(&path, &["AAPL"]),
        );

        assert!(service.start_refresh(RefreshReason::Manual).await.accepted);
        gate.add_permits(1);
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        service.stop().await;

        let on_disk = SnapshotFileStore::new(&path).load();
        let generated = |history: &[Snapshot]| {
            history.iter().map(|s| s.generated_at).collect::<Vec<_>>()
        };
        assert_eq!(
            generated(&service.get_history(HISTORY_LIMIT).await),
            generated(&on_disk.history),
            "after {} yields",
            yields
        );
        let status = service.get_refresh_status().await;
        assert!(!status.is_running);
        assert_eq!(
            status.latest_generated_at,
            on_disk.latest.map(|s| s.generated_at)
        );
    }
}
