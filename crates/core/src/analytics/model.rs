use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Fx,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Fx => "fx",
            AssetClass::Crypto => "crypto",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// One watchlist entry in a snapshot.
///
/// The signal fields are empty until guidance has been built over the row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub price: Option<f64>,
    pub momentum_1d: Option<f64>,
    pub volatility_proxy: Option<f64>,
    pub last_refreshed: Option<String>,
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub signal_score: Option<f64>,
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub risk_score: Option<f64>,
}

impl Row {
    pub fn new(asset_class: AssetClass, symbol: impl Into<String>) -> Self {
        Self {
            asset_class,
            symbol: symbol.into(),
            price: None,
            momentum_1d: None,
            volatility_proxy: None,
            last_refreshed: None,
            sentiment: None,
            signal_score: None,
            signal: None,
            risk_score: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub time_published: Option<String>,
    pub source: Option<String>,
    pub overall_sentiment_score: Option<f64>,
    pub overall_sentiment_label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickerSentiment {
    pub ticker: String,
    pub avg_sentiment: f64,
}

/// Aggregated view over a news & sentiment feed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsSummary {
    pub overall_average_sentiment: Option<f64>,
    pub ticker_average_sentiment: BTreeMap<String, f64>,
    pub top_positive: Vec<TickerSentiment>,
    pub top_negative: Vec<TickerSentiment>,
    pub items: Vec<NewsItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicMood {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketDirection {
    #[serde(rename = "upside bias")]
    UpsideBias,
    #[serde(rename = "downside bias")]
    DownsideBias,
    #[serde(rename = "range-bound")]
    RangeBound,
}

/// Ranked signals over every row of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub public_mood: PublicMood,
    pub expected_market_direction: MarketDirection,
    pub signals: Vec<Row>,
    pub safest_bets: Vec<Row>,
    pub riskiest_bets: Vec<Row>,
    pub buy_candidates: Vec<Row>,
    pub sell_candidates: Vec<Row>,
    pub hold_candidates: Vec<Row>,
    pub disclaimer: String,
}
