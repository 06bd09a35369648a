//! Snapshot analytics.
//!
//! Pure functions that turn raw upstream payloads into summary rows,
//! aggregate news sentiment, and rank rows into heuristic trading signals.
//! Nothing here performs IO.

pub mod guidance;
pub mod model;
pub mod news;
pub mod report;
pub mod summaries;

pub use guidance::{build_market_guidance, DISCLAIMER};
pub use model::{
    AssetClass, Guidance, MarketDirection, NewsItem, NewsSummary, PublicMood, Row, Signal,
    TickerSentiment,
};
pub use news::aggregate_news_sentiment;
pub use report::{build_report, AssetReport, ReportMood};
pub use summaries::{
    summarize_crypto_daily, summarize_fx_daily, summarize_quote, summarize_timeseries_daily,
    CryptoSummary, DailySummary, FxSummary, PricePoint, QuoteSummary,
};
