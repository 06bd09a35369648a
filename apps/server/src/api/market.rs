use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use market_analyzer_core::analytics::{
    summarize_crypto_daily, summarize_fx_daily, summarize_quote, summarize_timeseries_daily,
    CryptoSummary, DailySummary, FxSummary, QuoteSummary,
};
use market_analyzer_market_data::{ListingRow, ListingState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Deserialize)]
struct SymbolQuery {
    symbol: String,
}

#[derive(Deserialize)]
struct DailyQuery {
    symbol: String,
    outputsize: Option<String>,
}

#[derive(Deserialize)]
struct IntradayQuery {
    symbol: String,
    interval: Option<String>,
    outputsize: Option<String>,
}

#[derive(Deserialize)]
struct FxQuery {
    from_symbol: String,
    to_symbol: String,
    outputsize: Option<String>,
}

#[derive(Deserialize)]
struct CryptoQuery {
    symbol: String,
    market: Option<String>,
}

#[derive(Deserialize)]
struct UniverseQuery {
    state: Option<String>,
}

#[derive(Serialize)]
struct UniverseSnapshot {
    state: ListingState,
    count: usize,
    updated_every_minutes: u64,
    tickers: Vec<ListingRow>,
}

async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<QuoteSummary>> {
    let payload = state.client.global_quote(&q.symbol).await?.into_result()?;
    Ok(Json(summarize_quote(&payload)))
}

async fn get_stock_daily(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DailyQuery>,
) -> ApiResult<Json<DailySummary>> {
    let payload = state
        .client
        .time_series_daily(&q.symbol, q.outputsize.as_deref())
        .await?
        .into_result()?;
    Ok(Json(summarize_timeseries_daily(&payload)))
}

/// Intraday bars are passed through unsummarized.
async fn get_stock_intraday(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IntradayQuery>,
) -> ApiResult<Json<Value>> {
    let payload = state
        .client
        .time_series_intraday(&q.symbol, q.interval.as_deref(), q.outputsize.as_deref())
        .await?
        .into_result()?;
    Ok(Json(payload))
}

async fn get_fx_daily(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FxQuery>,
) -> ApiResult<Json<FxSummary>> {
    let payload = state
        .client
        .fx_daily(&q.from_symbol, &q.to_symbol, q.outputsize.as_deref())
        .await?
        .into_result()?;
    Ok(Json(summarize_fx_daily(&payload)))
}

async fn get_crypto_daily(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CryptoQuery>,
) -> ApiResult<Json<CryptoSummary>> {
    let payload = state
        .client
        .crypto_daily(&q.symbol, q.market.as_deref())
        .await?
        .into_result()?;
    Ok(Json(summarize_crypto_daily(&payload)))
}

async fn get_universe_snapshot(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UniverseQuery>,
) -> ApiResult<Json<UniverseSnapshot>> {
    let listing_state: ListingState = q.state.as_deref().unwrap_or_default().parse()?;
    let tickers = state
        .client
        .listing_status(listing_state)
        .await?
        .into_result()?;
    if tickers.is_empty() {
        return Err(ApiError::BadGateway(
            "Empty universe snapshot response from Alpha Vantage.".to_string(),
        ));
    }
    Ok(Json(UniverseSnapshot {
        state: listing_state,
        count: tickers.len(),
        updated_every_minutes: state.settings.cache.universe_ttl.as_secs() / 60,
        tickers,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/market/quote", get(get_quote))
        .route("/market/stocks/daily", get(get_stock_daily))
        .route("/market/stocks/intraday", get(get_stock_intraday))
        .route("/market/fx/daily", get(get_fx_daily))
        .route("/market/crypto/daily", get(get_crypto_daily))
        .route("/market/universe-snapshot", get(get_universe_snapshot))
}
