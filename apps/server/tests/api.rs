use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::Query,
    http::{Method, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use market_analyzer_core::settings::Settings;
use market_analyzer_server::{api::app_router, build_state, config::Config};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

/// Minimal stand-in for the Alpha Vantage query endpoint.
async fn fake_alpha_vantage(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    let function = params.get("function").map(String::as_str).unwrap_or_default();
    let symbol = params.get("symbol").map(String::as_str).unwrap_or_default();

    match function {
        "GLOBAL_QUOTE" if symbol == "LIMIT" => Json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        }))
        .into_response(),
        "GLOBAL_QUOTE" => Json(json!({
            "Global Quote": {
                "01. symbol": symbol,
                "05. price": "187.5000",
                "06. volume": "1000",
                "07. latest trading day": "2024-05-02",
                "09. change": "1.5000",
                "10. change percent": "0.8065%"
            }
        }))
        .into_response(),
        "TIME_SERIES_DAILY" => Json(json!({
            "Meta Data": { "2. Symbol": symbol, "3. Last Refreshed": "2024-05-02" },
            "Time Series (Daily)": {
                "2024-05-02": { "4. close": "187.50" },
                "2024-05-01": { "4. close": "186.00" },
                "2024-04-30": { "4. close": "188.00" }
            }
        }))
        .into_response(),
        "FX_DAILY" => Json(json!({
            "Meta Data": { "2. From Symbol": "EUR", "3. To Symbol": "USD", "5. Last Refreshed": "2024-05-02" },
            "Time Series FX (Daily)": {
                "2024-05-02": { "4. close": "1.0700" },
                "2024-05-01": { "4. close": "1.0650" }
            }
        }))
        .into_response(),
        "DIGITAL_CURRENCY_DAILY" => Json(json!({
            "Meta Data": { "2. Digital Currency Code": symbol, "3. Market Code": "USD" },
            "Time Series (Digital Currency Daily)": {
                "2024-05-02": { "4. close": "59000" },
                "2024-05-01": { "4. close": "58000" }
            }
        }))
        .into_response(),
        "NEWS_SENTIMENT" => Json(json!({
            "feed": [{
                "title": "Markets steady",
                "overall_sentiment_score": 0.2,
                "ticker_sentiment": [{ "ticker": "IBM", "ticker_sentiment_score": "0.3" }]
            }]
        }))
        .into_response(),
        "LISTING_STATUS" => {
            "symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
             IBM,International Business Machines Corp,NYSE,Stock,1962-01-02,null,Active\n"
                .into_response()
        }
        _ => Json(json!({ "Error Message": "Invalid API call." })).into_response(),
    }
}

async fn spawn_fake_upstream() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/query", get(fake_alpha_vantage));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn build_test_router(api_key: Option<&str>) -> (Router, TempDir) {
    let upstream = spawn_fake_upstream().await;
    let tmp = tempdir().unwrap();

    let mut vars = vec![
        ("ALPHAVANTAGE_BASE_URL".to_string(), format!("http://{}/query", upstream)),
        ("ENABLE_SERVER_RATE_LIMIT".to_string(), "false".to_string()),
        ("MAX_CALLS_PER_MINUTE".to_string(), "1200".to_string()),
        ("MARKET_SCHEDULER_ENABLED".to_string(), "false".to_string()),
        ("MARKET_OVERVIEW_STOCKS".to_string(), "IBM".to_string()),
        ("MARKET_OVERVIEW_FX_PAIRS".to_string(), "EUR/USD".to_string()),
        ("MARKET_OVERVIEW_CRYPTOS".to_string(), "BTC".to_string()),
        (
            "MARKET_OVERVIEW_DATA_FILE".to_string(),
            tmp.path().join("overview.json").display().to_string(),
        ),
    ];
    if let Some(key) = api_key {
        vars.push(("ALPHAVANTAGE_API_KEY".to_string(), key.to_string()));
    }

    let config = Config::with_settings(Settings::from_vars(vars));
    let state = build_state(&config).await.unwrap();
    (app_router(state, &config), tmp)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn quote_is_summarized() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/market/quote?symbol=ibm").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "IBM");
    assert_eq!(body["price"], 187.5);
    assert_eq!(body["change_percent"], "0.8065%");
}

#[tokio::test]
async fn throttled_quote_is_bad_gateway_with_detail() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/market/quote?symbol=LIMIT").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_REJECTED");
    assert!(body["detail"]["Note"].is_string());
}

#[tokio::test]
async fn missing_keys_is_service_unavailable() {
    let (app, _tmp) = build_test_router(None).await;
    let (status, body) = send(&app, Method::GET, "/market/quote?symbol=IBM").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn universe_snapshot_lists_csv_rows() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/market/universe-snapshot").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "active");
    assert_eq!(body["count"], 1);
    assert_eq!(body["updated_every_minutes"], 30);
    assert_eq!(body["tickers"][0]["symbol"], "IBM");

    let (status, _) = send(&app, Method::GET, "/market/universe-snapshot?state=pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn news_limit_is_validated() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/news/sentiment?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(&app, Method::GET, "/news/sentiment?tickers=IBM&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker_average_sentiment"]["IBM"], 0.3);
}

#[tokio::test]
async fn asset_report_combines_market_and_news() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;
    let (status, body) = send(&app, Method::GET, "/report/asset?kind=stock&symbol=IBM").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["sentiment_mood"], "positive");
    assert_eq!(body["report"]["market_snapshot"]["market"]["symbol"], "IBM");
    assert!(body["report"]["market_snapshot"]["market"]["daily"]["points"].is_array());
    assert_eq!(body["news"]["overall_average_sentiment"], 0.2);

    let (status, _) = send(&app, Method::GET, "/report/asset?kind=bond&symbol=IBM").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/report/asset?kind=fx&from_symbol=EUR").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn market_overview_refresh_round_trip() {
    let (app, _tmp) = build_test_router(Some("test-key")).await;

    let (status, body) = send(&app, Method::GET, "/report/market-overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "latest": null }));

    let (status, body) = send(&app, Method::POST, "/report/market-overview/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["status"]["state"], "running");

    let mut finished = Value::Null;
    for _ in 0..200 {
        let (_, body) = send(&app, Method::GET, "/report/market-overview/refresh-status").await;
        if body["status"]["is_running"] == false {
            finished = body["status"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(finished["state"], "completed");
    assert_eq!(finished["progress_percent"], 100.0);

    let (_, body) = send(&app, Method::GET, "/report/market-overview").await;
    let latest = &body["latest"];
    assert_eq!(latest["reason"], "manual");
    assert_eq!(latest["coverage"]["stocks"], 1);
    assert_eq!(latest["coverage"]["fx_pairs"], 1);
    assert_eq!(latest["coverage"]["cryptos"], 1);
    assert_eq!(latest["stocks"][0]["sentiment"], 0.3);

    let (status, body) = send(&app, Method::GET, "/report/market-overview/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"].as_array().map(Vec::len), Some(1));

    for bad in ["0", "501"] {
        let uri = format!("/report/market-overview/history?limit={}", bad);
        let (status, _) = send(&app, Method::GET, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
