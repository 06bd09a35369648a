//! Summaries of single-asset upstream payloads.
//!
//! Alpha Vantage encodes numbers as strings (`"05. price": "180.5200"`);
//! anything that does not parse to a finite number is treated as missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Points kept in a summary, newest first.
const MAX_POINTS: usize = 120;

/// Closes considered for momentum and volatility.
const LOOKBACK_CLOSES: usize = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub close: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<String>,
    pub volume: Option<f64>,
    pub latest_trading_day: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub symbol: Option<String>,
    pub last_refreshed: Option<String>,
    pub points: Vec<PricePoint>,
    pub momentum_1d: Option<f64>,
    pub volatility_proxy: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxSummary {
    pub pair: String,
    pub last_refreshed: Option<String>,
    pub points: Vec<PricePoint>,
    pub momentum_1d: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoSummary {
    pub asset: Option<String>,
    pub market: Option<String>,
    pub last_refreshed: Option<String>,
    pub points: Vec<PricePoint>,
    pub momentum_1d: Option<f64>,
}

/// Most recent close of a newest-first point list.
pub fn latest_close(points: &[PricePoint]) -> Option<f64> {
    points.first().and_then(|p| p.close)
}

impl DailySummary {
    pub fn latest_close(&self) -> Option<f64> {
        latest_close(&self.points)
    }
}

impl FxSummary {
    pub fn latest_close(&self) -> Option<f64> {
        latest_close(&self.points)
    }
}

impl CryptoSummary {
    pub fn latest_close(&self) -> Option<f64> {
        latest_close(&self.points)
    }
}

pub fn summarize_quote(payload: &Value) -> QuoteSummary {
    let Some(quote) = payload.get("Global Quote").and_then(Value::as_object) else {
        return QuoteSummary::default();
    };
    QuoteSummary {
        symbol: text(quote, "01. symbol"),
        price: number(quote.get("05. price")),
        change: number(quote.get("09. change")),
        change_percent: text(quote, "10. change percent"),
        volume: number(quote.get("06. volume")),
        latest_trading_day: text(quote, "07. latest trading day"),
    }
}

pub fn summarize_timeseries_daily(payload: &Value) -> DailySummary {
    let meta = meta_data(payload);
    let points = collect_points(payload.get("Time Series (Daily)"), |row| {
        number(row.get("4. close"))
    });
    let closes = lookback_closes(&points);

    DailySummary {
        symbol: meta.and_then(|m| text(m, "2. Symbol")),
        last_refreshed: meta.and_then(|m| text(m, "3. Last Refreshed")),
        momentum_1d: momentum(&closes),
        volatility_proxy: volatility(&closes),
        points: truncate_points(points),
    }
}

pub fn summarize_fx_daily(payload: &Value) -> FxSummary {
    let meta = meta_data(payload);
    let points = collect_points(payload.get("Time Series FX (Daily)"), |row| {
        number(row.get("4. close"))
    });
    let closes = lookback_closes(&points);

    let side = |key: &str| {
        meta.and_then(|m| text(m, key))
            .unwrap_or_else(|| "None".to_string())
    };
    FxSummary {
        pair: format!("{}/{}", side("2. From Symbol"), side("3. To Symbol")),
        last_refreshed: meta.and_then(|m| text(m, "5. Last Refreshed")),
        momentum_1d: momentum(&closes),
        points: truncate_points(points),
    }
}

pub fn summarize_crypto_daily(payload: &Value) -> CryptoSummary {
    let meta = meta_data(payload);
    let series = payload.as_object().and_then(|obj| {
        obj.iter()
            .find(|(key, _)| key.starts_with("Time Series"))
            .map(|(_, value)| value)
    });
    let points = collect_points(series, |row| {
        ["4a. close (USD)", "4b. close (USD)", "4. close"]
            .iter()
            .filter_map(|key| row.get(*key))
            .find(|value| truthy(value))
            .and_then(|value| number(Some(value)))
    });
    let closes = lookback_closes(&points);

    CryptoSummary {
        asset: meta.and_then(|m| text(m, "2. Digital Currency Code")),
        market: meta.and_then(|m| text(m, "3. Market Code")),
        last_refreshed: meta.and_then(|m| {
            text(m, "6. Last Refreshed").or_else(|| text(m, "5. Last Refreshed"))
        }),
        momentum_1d: momentum(&closes),
        points: truncate_points(points),
    }
}

/// Lenient numeric read of a JSON value.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn meta_data(payload: &Value) -> Option<&Map<String, Value>> {
    payload.get("Meta Data").and_then(Value::as_object)
}

fn collect_points<F>(series: Option<&Value>, close: F) -> Vec<PricePoint>
where
    F: Fn(&Map<String, Value>) -> Option<f64>,
{
    let Some(series) = series.and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut points: Vec<PricePoint> = series
        .iter()
        .map(|(date, row)| PricePoint {
            date: date.clone(),
            close: row.as_object().and_then(&close),
        })
        .collect();
    // ISO dates sort lexicographically.
    points.sort_by(|a, b| b.date.cmp(&a.date));
    points
}

fn truncate_points(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.truncate(MAX_POINTS);
    points
}

fn lookback_closes(points: &[PricePoint]) -> Vec<f64> {
    points
        .iter()
        .filter_map(|p| p.close)
        .take(LOOKBACK_CLOSES)
        .collect()
}

/// Return of the latest close over the one before it.
fn momentum(closes: &[f64]) -> Option<f64> {
    match closes {
        [latest, previous, ..] if *previous != 0.0 => Some((latest - previous) / previous),
        _ => None,
    }
}

/// Sample standard deviation of day-over-day returns, when more than two
/// returns are available.
fn volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0 && w[1] != 0.0)
        .map(|w| (w[0] - w[1]) / w[1])
        .collect();
    if returns.len() <= 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(variance.sqrt())
}
