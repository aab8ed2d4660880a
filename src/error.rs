use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

/// Every denial the gate can hand back to a caller. None of these are retried
/// internally; each one reaches the caller with its specific reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("invalid access code")]
    InvalidCredential,

    #[error("access code has been disabled")]
    Disabled,

    #[error("quota exhausted")]
    QuotaExhausted,

    #[error("not found")]
    NotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential store unavailable")]
    StoreUnavailable,

    #[error("admin access is not configured")]
    ConfigurationError,
}

impl AccessError {
    /// Log a store failure and collapse it into a denial. Store errors never
    /// fall through to an allow.
    pub fn store(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "credential store failure");
        AccessError::StoreUnavailable
    }

    pub fn code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "unauthenticated",
            AccessError::InvalidCredential => "invalid_credential",
            AccessError::Disabled => "disabled",
            AccessError::QuotaExhausted => "quota_exhausted",
            AccessError::NotFound => "not_found",
            AccessError::InvalidRequest(_) => "invalid_request",
            AccessError::StoreUnavailable => "store_unavailable",
            AccessError::ConfigurationError => "configuration_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::Unauthenticated | AccessError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AccessError::Disabled => StatusCode::FORBIDDEN,
            AccessError::QuotaExhausted => StatusCode::TOO_MANY_REQUESTS,
            AccessError::NotFound => StatusCode::NOT_FOUND,
            AccessError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AccessError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AccessError::ConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        json!({ "error": self.code(), "message": self.to_string() })
    }
}

// Malformed or mistyped request bodies are caller input errors, not 422s.
impl From<JsonRejection> for AccessError {
    fn from(rejection: JsonRejection) -> Self {
        AccessError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
