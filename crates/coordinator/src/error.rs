//! The one place `model::ErrorKind` becomes an HTTP response (§6, §7). No
//! other module constructs the `{status, message, code, timestamp}`
//! envelope directly.

use {
    axum::{http::StatusCode, response::IntoResponse, Json},
    model::ErrorKind,
    serde::Serialize,
};

#[derive(Serialize)]
struct ErrorEnvelope {
    status: &'static str,
    message: String,
    code: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Wraps `ErrorKind` so it can be returned directly from an axum handler.
pub struct ApiError(pub ErrorKind);

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self(kind)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self.0 {
            // Internal invariant violations never leak their cause to callers.
            ErrorKind::Internal(_) => "internal error".to_owned(),
            other => other.to_string(),
        };
        if matches!(self.0, ErrorKind::Internal(_)) {
            tracing::error!(error = %self.0, "internal error surfaced to caller");
        }
        let body = ErrorEnvelope {
            status: "error",
            message,
            code: self.0.code(),
            timestamp: chrono::Utc::now(),
        };
        (status_code, Json(body)).into_response()
    }
}
