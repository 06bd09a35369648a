use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use market_analyzer_core::Error as CoreError;
use market_analyzer_market_data::{MarketDataError, Rejection};
use serde::Serialize;
use serde_json::Value;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Alpha Vantage answered with a throttle, information or error notice.
    #[error("{0}")]
    Upstream(Rejection),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), code, self);
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), code, self);
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
            detail: match self {
                ApiError::Upstream(rejection) => Some(rejection.raw),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<MarketDataError> for ApiError {
    fn from(e: MarketDataError) -> Self {
        match e {
            MarketDataError::NoCredentials => ApiError::Unavailable(e.to_string()),
            MarketDataError::InvalidRequest(message) => ApiError::BadRequest(message),
            MarketDataError::Timeout { .. }
            | MarketDataError::RateLimited { .. }
            | MarketDataError::HttpStatus { .. }
            | MarketDataError::Transport { .. }
            | MarketDataError::Decode(_) => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::Upstream(rejection)
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MarketData(inner) => inner.into(),
            CoreError::Upstream(rejection) => ApiError::Upstream(rejection),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}
