use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use market_analyzer_core::analytics::{
    aggregate_news_sentiment, build_report, summarize_crypto_daily, summarize_fx_daily,
    summarize_quote, summarize_timeseries_daily, AssetReport, NewsSummary,
};
use market_analyzer_market_data::NewsQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::news::validate_news_limit;
use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

fn default_include_news() -> bool {
    true
}

fn default_news_limit() -> u32 {
    50
}

#[derive(Deserialize)]
struct AssetReportQuery {
    kind: String,
    symbol: Option<String>,
    from_symbol: Option<String>,
    to_symbol: Option<String>,
    market: Option<String>,
    tickers_for_news: Option<String>,
    topics: Option<String>,
    #[serde(default = "default_include_news")]
    include_news: bool,
    #[serde(default = "default_news_limit")]
    news_limit: u32,
}

#[derive(Serialize)]
struct AssetReportResponse {
    report: AssetReport,
    news: NewsSummary,
}

fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// Market summary plus optional news sentiment for one asset.
///
/// Sequential upstream calls are spaced by the configured call interval.
async fn get_asset_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AssetReportQuery>,
) -> ApiResult<Json<AssetReportResponse>> {
    let news_limit = validate_news_limit(q.news_limit)?;
    let pause = state.settings.call_interval();
    let client = &state.client;

    let (market, default_news_tickers) = match q.kind.trim().to_lowercase().as_str() {
        "stock" => {
            let symbol = required(&q.symbol, "symbol required")?;
            let quote = client.global_quote(symbol).await?.into_result()?;
            tokio::time::sleep(pause).await;
            let daily = client
                .time_series_daily(symbol, Some("compact"))
                .await?
                .into_result()?;

            let mut market = serde_json::to_value(summarize_quote(&quote))?;
            if let Value::Object(fields) = &mut market {
                fields.insert(
                    "daily".to_string(),
                    serde_json::to_value(summarize_timeseries_daily(&daily))?,
                );
            }
            (market, symbol.to_uppercase())
        }
        "fx" => {
            let message = "from_symbol and to_symbol required";
            let from_symbol = required(&q.from_symbol, message)?;
            let to_symbol = required(&q.to_symbol, message)?;
            let daily = client
                .fx_daily(from_symbol, to_symbol, Some("compact"))
                .await?
                .into_result()?;
            (
                serde_json::to_value(summarize_fx_daily(&daily))?,
                format!("FOREX:{}", to_symbol.to_uppercase()),
            )
        }
        "crypto" => {
            let symbol = required(&q.symbol, "symbol required")?;
            let daily = client
                .crypto_daily(symbol, q.market.as_deref())
                .await?
                .into_result()?;
            (
                serde_json::to_value(summarize_crypto_daily(&daily))?,
                format!("CRYPTO:{}", symbol.to_uppercase()),
            )
        }
        _ => {
            return Err(ApiError::BadRequest(
                "kind must be stock|fx|crypto".to_string(),
            ))
        }
    };

    let news_tickers = q
        .tickers_for_news
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(default_news_tickers);

    let news = if q.include_news {
        tokio::time::sleep(pause).await;
        let query = NewsQuery {
            topics: q.topics,
            ..NewsQuery::tickers(news_tickers, news_limit)
        };
        let payload = client.news_sentiment(&query).await?.into_result()?;
        aggregate_news_sentiment(&payload)
    } else {
        NewsSummary::default()
    };

    let report = build_report(
        json!({ "market": market, "news": news }),
        &news,
        Utc::now(),
    );
    Ok(Json(AssetReportResponse { report, news }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/report/asset", get(get_asset_report))
}
