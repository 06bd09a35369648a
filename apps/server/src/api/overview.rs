use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use market_analyzer_core::overview::{
    RefreshReason, RefreshStatus, Snapshot, StartRefreshOutcome,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const DEFAULT_HISTORY_LIMIT: usize = 48;
const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct LatestResponse {
    latest: Option<Snapshot>,
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<Snapshot>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: RefreshStatus,
}

async fn get_market_overview(State(state): State<Arc<AppState>>) -> Json<LatestResponse> {
    Json(LatestResponse {
        latest: state.overview_service.get_latest().await,
    })
}

async fn get_market_overview_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }
    Ok(Json(HistoryResponse {
        history: state.overview_service.get_history(limit).await,
    }))
}

async fn refresh_market_overview(
    State(state): State<Arc<AppState>>,
) -> Json<StartRefreshOutcome> {
    Json(
        state
            .overview_service
            .start_refresh(RefreshReason::Manual)
            .await,
    )
}

async fn get_refresh_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.overview_service.get_refresh_status().await,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/report/market-overview", get(get_market_overview))
        .route(
            "/report/market-overview/history",
            get(get_market_overview_history),
        )
        .route(
            "/report/market-overview/refresh",
            post(refresh_market_overview),
        )
        .route(
            "/report/market-overview/refresh-status",
            get(get_refresh_status),
        )
}
