use std::fmt;

use serde::Serialize;

/// Logical upstream endpoints. Each one owns a separate cache store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Quote,
    DailySeries,
    IntradaySeries,
    FxSeries,
    CryptoSeries,
    News,
    Listing,
}

impl Endpoint {
    /// Value of the `function` query parameter.
    pub fn function(&self) -> &'static str {
        match self {
            Endpoint::Quote => "GLOBAL_QUOTE",
            Endpoint::DailySeries => "TIME_SERIES_DAILY",
            Endpoint::IntradaySeries => "TIME_SERIES_INTRADAY",
            Endpoint::FxSeries => "FX_DAILY",
            Endpoint::CryptoSeries => "DIGITAL_CURRENCY_DAILY",
            Endpoint::News => "NEWS_SENTIMENT",
            Endpoint::Listing => "LISTING_STATUS",
        }
    }

    /// The listing endpoint answers in CSV; everything else is JSON.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Endpoint::Listing)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function())
    }
}
