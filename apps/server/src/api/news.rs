use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use market_analyzer_core::analytics::{aggregate_news_sentiment, NewsSummary};
use market_analyzer_market_data::NewsQuery;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

pub(crate) const MAX_NEWS_LIMIT: u32 = 1000;

pub(crate) fn validate_news_limit(limit: u32) -> ApiResult<u32> {
    if (1..=MAX_NEWS_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_NEWS_LIMIT
        )))
    }
}

async fn get_news_sentiment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> ApiResult<Json<NewsSummary>> {
    validate_news_limit(query.limit)?;
    let payload = state.client.news_sentiment(&query).await?.into_result()?;
    Ok(Json(aggregate_news_sentiment(&payload)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/news/sentiment", get(get_news_sentiment))
}
