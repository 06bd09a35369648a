use std::sync::Arc;

use crate::config::Config;
use market_analyzer_core::{
    overview::{MarketOverviewService, MarketOverviewServiceTrait, OverviewConfig},
    settings::Settings,
};
use market_analyzer_market_data::{AlphaVantageClient, HttpTransport, MinuteRateLimiter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub settings: Settings,
    pub client: Arc<AlphaVantageClient>,
    pub overview_service: Arc<dyn MarketOverviewServiceTrait>,
}

pub fn init_tracing() {
    let log_format = std::env::var("MA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let settings = config.settings.clone();
    tracing::info!("Market schedule timezone: {}", settings.timezone.name());

    let keys = Arc::new(settings.key_pool());
    if keys.is_empty() {
        tracing::warn!("No Alpha Vantage API keys configured; upstream calls will fail");
    } else {
        tracing::info!("Alpha Vantage key pool ready ({} keys)", keys.len());
    }

    let transport = Arc::new(HttpTransport::new(settings.base_url.clone())?);
    let rate_limiter = if settings.rate_limit_enabled {
        tracing::info!(
            "Upstream rate limit: {} calls per minute",
            settings.max_calls_per_minute
        );
        Some(Arc::new(MinuteRateLimiter::new(settings.max_calls_per_minute)))
    } else {
        None
    };
    let client = Arc::new(AlphaVantageClient::new(
        transport,
        keys,
        rate_limiter,
        settings.cache,
    ));

    let overview_service: Arc<dyn MarketOverviewServiceTrait> = Arc::new(
        MarketOverviewService::new(client.clone(), OverviewConfig::from(&settings)),
    );

    Ok(Arc::new(AppState {
        settings,
        client,
        overview_service,
    }))
}
