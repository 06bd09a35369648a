use std::collections::BTreeMap;

use serde_json::Value;

use super::model::{NewsItem, NewsSummary, TickerSentiment};
use super::summaries::number;

const TOP_TICKERS: usize = 10;
const MAX_ITEMS: usize = 100;

/// Averages overall and per-ticker sentiment across a news feed.
pub fn aggregate_news_sentiment(payload: &Value) -> NewsSummary {
    let feed = payload
        .get("feed")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut overall_scores = Vec::new();
    let mut by_ticker: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut items = Vec::with_capacity(feed.len().min(MAX_ITEMS));

    for entry in feed {
        let overall = number(entry.get("overall_sentiment_score"));
        if let Some(score) = overall {
            overall_scores.push(score);
        }

        let ticker_scores = entry
            .get("ticker_sentiment")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for ticker_score in ticker_scores {
            let ticker = ticker_score
                .get("ticker")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty());
            let score = number(ticker_score.get("ticker_sentiment_score"));
            if let (Some(ticker), Some(score)) = (ticker, score) {
                by_ticker.entry(ticker.to_string()).or_default().push(score);
            }
        }

        if items.len() < MAX_ITEMS {
            items.push(NewsItem {
                title: string_field(entry, "title"),
                url: string_field(entry, "url"),
                time_published: string_field(entry, "time_published"),
                source: string_field(entry, "source"),
                overall_sentiment_score: overall,
                overall_sentiment_label: string_field(entry, "overall_sentiment_label"),
            });
        }
    }

    let ticker_average_sentiment: BTreeMap<String, f64> = by_ticker
        .into_iter()
        .filter_map(|(ticker, scores)| mean(&scores).map(|avg| (ticker, avg)))
        .collect();

    let mut ranked: Vec<TickerSentiment> = ticker_average_sentiment
        .iter()
        .map(|(ticker, avg)| TickerSentiment {
            ticker: ticker.clone(),
            avg_sentiment: *avg,
        })
        .collect();

    ranked.sort_by(|a, b| b.avg_sentiment.total_cmp(&a.avg_sentiment));
    let top_positive = ranked.iter().take(TOP_TICKERS).cloned().collect();
    ranked.sort_by(|a, b| a.avg_sentiment.total_cmp(&b.avg_sentiment));
    let top_negative = ranked.into_iter().take(TOP_TICKERS).collect();

    NewsSummary {
        overall_average_sentiment: mean(&overall_scores),
        ticker_average_sentiment,
        top_positive,
        top_negative,
        items,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn string_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}
