use std::cmp::Ordering;

use super::model::{Guidance, MarketDirection, NewsSummary, PublicMood, Row, Signal};

pub const DISCLAIMER: &str = "Signal rankings are heuristic and educational, not financial advice.";

const MOMENTUM_WEIGHT: f64 = 0.5;
const SENTIMENT_WEIGHT: f64 = 0.35;
const VOLATILITY_WEIGHT: f64 = 0.25;
const SIGNAL_THRESHOLD: f64 = 0.22;
const MOOD_THRESHOLD: f64 = 0.15;
const DIRECTION_THRESHOLD: f64 = 0.2;
const RANKED_LIMIT: usize = 10;

/// Scores every row in place and ranks them into candidate lists.
///
/// Rows keep their order (stocks, then FX, then crypto) in `signals`.
pub fn build_market_guidance(
    stocks: &mut [Row],
    fx: &mut [Row],
    crypto: &mut [Row],
    news: &NewsSummary,
) -> Guidance {
    for row in stocks.iter_mut().chain(fx.iter_mut()).chain(crypto.iter_mut()) {
        score_row(row);
    }
    let signals: Vec<Row> = stocks
        .iter()
        .chain(fx.iter())
        .chain(crypto.iter())
        .cloned()
        .collect();

    let news_avg = news.overall_average_sentiment;
    let public_mood = match news_avg {
        Some(avg) if avg > MOOD_THRESHOLD => PublicMood::Bullish,
        Some(avg) if avg < -MOOD_THRESHOLD => PublicMood::Bearish,
        _ => PublicMood::Neutral,
    };
    let expected_market_direction = match news_avg {
        Some(avg) if avg > DIRECTION_THRESHOLD => MarketDirection::UpsideBias,
        Some(avg) if avg < -DIRECTION_THRESHOLD => MarketDirection::DownsideBias,
        _ => MarketDirection::RangeBound,
    };

    let safest_bets = ranked(&signals, |a, b| {
        risk(a)
            .total_cmp(&risk(b))
            .then_with(|| score(b).total_cmp(&score(a)))
    });
    let riskiest_bets = ranked(&signals, |a, b| {
        risk(b)
            .total_cmp(&risk(a))
            .then_with(|| abs_momentum(b).total_cmp(&abs_momentum(a)))
    });

    let buy_candidates = ranked_with_signal(&signals, Signal::Buy, |a, b| {
        score(b).total_cmp(&score(a))
    });
    let sell_candidates = ranked_with_signal(&signals, Signal::Sell, |a, b| {
        score(a).total_cmp(&score(b))
    });
    let hold_candidates = ranked_with_signal(&signals, Signal::Hold, |a, b| {
        score(a).abs().total_cmp(&score(b).abs())
    });

    Guidance {
        public_mood,
        expected_market_direction,
        signals,
        safest_bets,
        riskiest_bets,
        buy_candidates,
        sell_candidates,
        hold_candidates,
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// Composite score from momentum, sentiment and volatility, each clamped
/// to its domain (missing inputs count as zero).
pub fn signal_score(momentum: Option<f64>, sentiment: Option<f64>, volatility: Option<f64>) -> f64 {
    MOMENTUM_WEIGHT * bounded(momentum, -1.0, 1.0) + SENTIMENT_WEIGHT * bounded(sentiment, -1.0, 1.0)
        - VOLATILITY_WEIGHT * bounded(volatility, 0.0, 1.0)
}

pub fn signal_from_score(score: f64) -> Signal {
    if score >= SIGNAL_THRESHOLD {
        Signal::Buy
    } else if score <= -SIGNAL_THRESHOLD {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn score_row(row: &mut Row) {
    let score = signal_score(row.momentum_1d, row.sentiment, row.volatility_proxy);
    row.signal_score = Some(round4(score));
    row.signal = Some(signal_from_score(score));
    row.risk_score = Some(round4(bounded(row.volatility_proxy, 0.0, 1.0)));
}

fn bounded(value: Option<f64>, lo: f64, hi: f64) -> f64 {
    value.map(|v| v.clamp(lo, hi)).unwrap_or(0.0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn score(row: &Row) -> f64 {
    row.signal_score.unwrap_or(0.0)
}

fn risk(row: &Row) -> f64 {
    row.risk_score.unwrap_or(0.0)
}

fn abs_momentum(row: &Row) -> f64 {
    row.momentum_1d.unwrap_or(0.0).abs()
}

fn ranked<F>(rows: &[Row], compare: F) -> Vec<Row>
where
    F: Fn(&Row, &Row) -> Ordering,
{
    let mut sorted = rows.to_vec();
    sorted.sort_by(compare);
    sorted.truncate(RANKED_LIMIT);
    sorted
}

fn ranked_with_signal<F>(rows: &[Row], signal: Signal, compare: F) -> Vec<Row>
where
    F: Fn(&Row, &Row) -> Ordering,
{
    let mut sorted: Vec<Row> = rows
        .iter()
        .filter(|row| row.signal == Some(signal))
        .cloned()
        .collect();
    sorted.sort_by(compare);
    sorted.truncate(RANKED_LIMIT);
    sorted
}
