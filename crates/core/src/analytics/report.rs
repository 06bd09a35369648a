use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::NewsSummary;

const MOOD_THRESHOLD: f64 = 0.15;

pub const REPORT_NOTES: [&str; 2] = [
    "This report summarizes publicly available data and sentiment. It is not investment advice.",
    "Consider validating signals with fundamentals, risk limits, and multiple data sources.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMood {
    Positive,
    Negative,
    Neutral,
    /// No sentiment score was available.
    Mixed,
}

/// Combined market and sentiment report for a single asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    pub generated_at: DateTime<Utc>,
    pub sentiment_mood: ReportMood,
    pub sentiment_score: Option<f64>,
    pub market_snapshot: Value,
    pub notes: Vec<String>,
}

pub fn build_report(market_snapshot: Value, news: &NewsSummary, now: DateTime<Utc>) -> AssetReport {
    let score = news.overall_average_sentiment;
    let sentiment_mood = match score {
        Some(s) if s > MOOD_THRESHOLD => ReportMood::Positive,
        Some(s) if s < -MOOD_THRESHOLD => ReportMood::Negative,
        Some(_) => ReportMood::Neutral,
        None => ReportMood::Mixed,
    };

    AssetReport {
        generated_at: now,
        sentiment_mood,
        sentiment_score: score,
        market_snapshot,
        notes: REPORT_NOTES.iter().map(|n| n.to_string()).collect(),
    }
}
