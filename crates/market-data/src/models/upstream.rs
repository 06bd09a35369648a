use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::errors::MarketDataError;

/// One row of a tabular (CSV) answer, keyed by column header.
pub type ListingRow = BTreeMap<String, String>;

/// Decoded JSON answer.
pub type UpstreamPayload = Upstream<Value>;

/// Why the provider refused to hand out data.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Usage allowance exceeded for the key that made the call.
    Throttled,
    /// An informational notice in place of data (premium endpoint, demo key, ...).
    Information,
    /// The call itself was invalid (unknown symbol, bad parameters).
    Error,
}

/// An upstream answer that carries a rejection marker instead of data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
    /// The body exactly as the provider sent it.
    pub raw: Value,
}

impl Rejection {
    /// Inspects a JSON document for the `Note` / `Information` /
    /// `Error Message` markers.
    pub fn from_payload(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| object.get(key).map(marker_text);

        let (kind, message) = if let Some(note) = text("Note") {
            (RejectionKind::Throttled, note)
        } else if let Some(info) = text("Information") {
            let kind = if mentions_rate_limit(&info) {
                RejectionKind::Throttled
            } else {
                RejectionKind::Information
            };
            (kind, info)
        } else if let Some(error) = text("Error Message") {
            (RejectionKind::Error, error)
        } else {
            return None;
        };

        Some(Self {
            kind,
            message,
            raw: value.clone(),
        })
    }

    pub fn is_throttled(&self) -> bool {
        self.kind == RejectionKind::Throttled
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upstream {:?}: {}", self.kind, self.message)
    }
}

fn marker_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("call frequency") || lower.contains("requests per")
}

/// Result of one upstream call, decided once at the decode boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum Upstream<T> {
    Data(T),
    Rejected(Rejection),
}

impl<T> Upstream<T> {
    pub fn is_data(&self) -> bool {
        matches!(self, Upstream::Data(_))
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Upstream::Rejected(r) if r.is_throttled())
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Upstream::Data(data) => Some(data),
            Upstream::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, Rejection> {
        match self {
            Upstream::Data(data) => Ok(data),
            Upstream::Rejected(rejection) => Err(rejection),
        }
    }
}

impl Upstream<Value> {
    /// Decodes a JSON body.
    pub fn decode(body: &str) -> Result<Self, MarketDataError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| MarketDataError::Decode(format!("invalid JSON body: {}", e)))?;
        Ok(match Rejection::from_payload(&value) {
            Some(rejection) => Upstream::Rejected(rejection),
            None => Upstream::Data(value),
        })
    }
}

impl Upstream<Vec<ListingRow>> {
    /// Decodes a CSV body. A JSON object in place of the table is a
    /// rejection, whatever marker it carries.
    pub fn decode_table(body: &str) -> Result<Self, MarketDataError> {
        if body.trim_start().starts_with('{') {
            let value: Value = serde_json::from_str(body)
                .map_err(|e| MarketDataError::Decode(format!("invalid JSON body: {}", e)))?;
            let rejection = Rejection::from_payload(&value).unwrap_or_else(|| Rejection {
                kind: RejectionKind::Error,
                message: "expected CSV, received a JSON document".to_string(),
                raw: value,
            });
            return Ok(Upstream::Rejected(rejection));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| MarketDataError::Decode(format!("invalid CSV header: {}", e)))?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| MarketDataError::Decode(format!("invalid CSV row: {}", e)))?;
            let row: ListingRow = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            rows.push(row);
        }
        Ok(Upstream::Data(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_is_throttle() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        let decoded = Upstream::decode(body).unwrap();
        assert!(decoded.is_throttled());
    }

    #[test]
    fn test_information_about_rate_limit_is_throttle() {
        let body = r#"{"Information": "Our standard API rate limit is 25 requests per day."}"#;
        assert!(Upstream::decode(body).unwrap().is_throttled());
    }

    #[test]
    fn test_other_information_is_not_throttle() {
        let body = r#"{"Information": "This is a premium endpoint."}"#;
        match Upstream::decode(body).unwrap() {
            Upstream::Rejected(r) => assert_eq!(r.kind, RejectionKind::Information),
            Upstream::Data(_) => panic!("expected a rejection"),
        }
    }

    #[test]
    fn test_error_message_is_error_rejection() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        match Upstream::decode(body).unwrap() {
            Upstream::Rejected(r) => {
                assert_eq!(r.kind, RejectionKind::Error);
                assert_eq!(r.raw, json!({"Error Message": "Invalid API call."}));
            }
            Upstream::Data(_) => panic!("expected a rejection"),
        }
    }

    #[test]
    fn test_data_payload_passes_through() {
        let body = r#"{"Global Quote": {"01. symbol": "IBM"}}"#;
        let decoded = Upstream::decode(body).unwrap();
        assert_eq!(
            decoded.data(),
            Some(&json!({"Global Quote": {"01. symbol": "IBM"}}))
        );
    }

    #[test]
    fn test_garbage_body_is_decode_error() {
        assert!(matches!(
            Upstream::decode("<html>bad gateway</html>"),
            Err(MarketDataError::Decode(_))
        ));
    }

    #[test]
    fn test_csv_rows_are_keyed_by_header() {
        let body = "symbol,name,exchange\nAAPL,Apple Inc,NASDAQ\nIBM,International Business Machines,NYSE\n";
        let rows = Upstream::decode_table(body).unwrap().into_result().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "AAPL");
        assert_eq!(rows[1]["exchange"], "NYSE");
    }

    #[test]
    fn test_json_instead_of_csv_is_rejection() {
        let decoded = Upstream::decode_table(r#"{"Note": "slow down"}"#).unwrap();
        assert!(decoded.is_throttled());

        let decoded = Upstream::decode_table(r#"{"unexpected": true}"#).unwrap();
        assert!(matches!(
            decoded,
            Upstream::Rejected(Rejection {
                kind: RejectionKind::Error,
                ..
            })
        ));
    }
}
