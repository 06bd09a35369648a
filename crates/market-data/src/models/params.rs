use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Endpoint;
use crate::errors::MarketDataError;

/// Normalized query parameters for one upstream call, without the API key.
///
/// The same value doubles as the cache key, so two calls that normalize to
/// the same parameters share a cache entry.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RequestParams {
    endpoint: Endpoint,
    pairs: Vec<(&'static str, String)>,
}

impl RequestParams {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            pairs: vec![("function", endpoint.function().to_string())],
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.pairs.push((name, value.into()));
        self
    }

    /// Adds the parameter only when a non-blank value is given.
    pub fn with_opt(self, name: &'static str, value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Full query for the wire, including the API key and the CSV flag
    /// for tabular endpoints.
    pub fn to_query(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut query = self.pairs.clone();
        if self.endpoint.is_tabular() {
            query.push(("datatype", "csv".to_string()));
        }
        query.push(("apikey", api_key.to_string()));
        query
    }
}

/// Filters for the news & sentiment endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsQuery {
    pub tickers: Option<String>,
    pub topics: Option<String>,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub sort: String,
    pub limit: u32,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            tickers: None,
            topics: None,
            time_from: None,
            time_to: None,
            sort: "LATEST".to_string(),
            limit: 50,
        }
    }
}

impl NewsQuery {
    pub fn topics(topics: impl Into<String>, limit: u32) -> Self {
        Self {
            topics: Some(topics.into()),
            limit,
            ..Self::default()
        }
    }

    pub fn tickers(tickers: impl Into<String>, limit: u32) -> Self {
        Self {
            tickers: Some(tickers.into()),
            limit,
            ..Self::default()
        }
    }

    pub(crate) fn to_params(&self) -> RequestParams {
        let sort = if self.sort.trim().is_empty() {
            "LATEST".to_string()
        } else {
            self.sort.trim().to_uppercase()
        };
        RequestParams::new(Endpoint::News)
            .with("sort", sort)
            .with("limit", self.limit.to_string())
            .with_opt("tickers", self.tickers.as_deref())
            .with_opt("topics", self.topics.as_deref())
            .with_opt("time_from", self.time_from.as_deref())
            .with_opt("time_to", self.time_to.as_deref())
    }
}

/// Listing state for the universe endpoint.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    #[default]
    Active,
    Delisted,
}

impl ListingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingState::Active => "active",
            ListingState::Delisted => "delisted",
        }
    }
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingState {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "active" => Ok(ListingState::Active),
            "delisted" => Ok(ListingState::Delisted),
            other => Err(MarketDataError::InvalidRequest(format!(
                "listing state must be active or delisted, got '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabular_query_carries_csv_flag_and_key() {
        let params = RequestParams::new(Endpoint::Listing).with("state", "active");
        let query = params.to_query("KEY");

        assert_eq!(query[0], ("function", "LISTING_STATUS".to_string()));
        assert!(query.contains(&("datatype", "csv".to_string())));
        assert_eq!(query.last(), Some(&("apikey", "KEY".to_string())));
    }

    #[test]
    fn test_news_query_skips_blank_filters() {
        let query = NewsQuery {
            tickers: Some("  ".to_string()),
            topics: Some("financial_markets".to_string()),
            sort: "latest".to_string(),
            ..NewsQuery::default()
        };
        let params = query.to_params();

        assert_eq!(params.get("tickers"), None);
        assert_eq!(params.get("topics"), Some("financial_markets"));
        assert_eq!(params.get("sort"), Some("LATEST"));
        assert_eq!(params.get("limit"), Some("50"));
    }

    #[test]
    fn test_listing_state_parsing() {
        assert_eq!("".parse::<ListingState>().unwrap(), ListingState::Active);
        assert_eq!(
            " Delisted ".parse::<ListingState>().unwrap(),
            ListingState::Delisted
        );
        assert!("pending".parse::<ListingState>().is_err());
    }
}
