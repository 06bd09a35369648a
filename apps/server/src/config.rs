use std::net::SocketAddr;
use std::time::Duration;

use market_analyzer_core::settings::Settings;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Server configuration. Upstream and overview settings live in
/// [`Settings`]; this adds what only the HTTP layer needs.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,
    pub request_timeout: Duration,
    pub settings: Settings,
}

impl Config {
    /// Load `.env` (if any) into the process environment, then read it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let listen_addr = std::env::var("MA_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid MA_LISTEN_ADDR '{}', falling back to {}",
                listen_addr, DEFAULT_LISTEN_ADDR
            );
            SocketAddr::from(([0, 0, 0, 0], 8080))
        });

        let cors_allow_origins = parse_origins(
            &std::env::var("MA_CORS_ALLOW_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        );

        let request_timeout_ms = std::env::var("MA_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        Self {
            listen_addr,
            cors_allow_origins,
            request_timeout: Duration::from_millis(request_timeout_ms),
            settings: Settings::from_env(),
        }
    }

    /// Defaults for everything except the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            settings,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
