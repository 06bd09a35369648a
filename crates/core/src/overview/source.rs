use async_trait::async_trait;
use market_analyzer_market_data::{
    AlphaVantageClient, MarketDataError, NewsQuery, UpstreamPayload,
};

/// Upstream calls the overview refresh depends on.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn daily_series(&self, symbol: &str) -> Result<UpstreamPayload, MarketDataError>;

    async fn fx_series(
        &self,
        from_symbol: &str,
        to_symbol: &str,
    ) -> Result<UpstreamPayload, MarketDataError>;

    async fn crypto_series(
        &self,
        symbol: &str,
        market: &str,
    ) -> Result<UpstreamPayload, MarketDataError>;

    async fn news(&self, query: &NewsQuery) -> Result<UpstreamPayload, MarketDataError>;
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    async fn daily_series(&self, symbol: &str) -> Result<UpstreamPayload, MarketDataError> {
        self.time_series_daily(symbol, Some("compact")).await
    }

    async fn fx_series(
        &self,
        from_symbol: &str,
        to_symbol: &str,
    ) -> Result<UpstreamPayload, MarketDataError> {
        self.fx_daily(from_symbol, to_symbol, Some("compact")).await
    }

    async fn crypto_series(
        &self,
        symbol: &str,
        market: &str,
    ) -> Result<UpstreamPayload, MarketDataError> {
        self.crypto_daily(symbol, Some(market)).await
    }

    async fn news(&self, query: &NewsQuery) -> Result<UpstreamPayload, MarketDataError> {
        self.news_sentiment(query).await
    }
}
