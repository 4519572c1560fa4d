//! Structured API error responses with error codes
//!
//! Every failure is returned as `{success: false, error, message, details?}`
//! where `error` is a stable machine-readable code.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::KycError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body is not valid JSON or lacks a field
    InvalidRequestBody,
    /// A required input is blank or out of bounds
    ValidationError,
    /// The audit store could not be written or read
    PersistenceFailure,
    /// The ledger failed verification and refuses appends
    LedgerIntegrityViolation,
    /// Dependency not ready
    ServiceUnavailable,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::PersistenceFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::LedgerIntegrityViolation | ErrorCode::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorCode::LedgerIntegrityViolation => "LEDGER_INTEGRITY_VIOLATION",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.as_str();
        let mut response = (status, Json(self)).into_response();

        response.headers_mut().insert(
            HeaderName::from_static("x-error-code"),
            HeaderValue::from_static(code),
        );

        response
    }
}

impl From<KycError> for ApiError {
    fn from(err: KycError) -> Self {
        if !err.is_client_error() {
            tracing::error!(error = %err, "request failed");
        }
        match err {
            KycError::Validation { field, message } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{field} {message}"),
            )
            .with_details(serde_json::json!({ "field": field })),
            KycError::LedgerIntegrity { index, reason } => ApiError::new(
                ErrorCode::LedgerIntegrityViolation,
                "Ledger failed integrity verification; verifications are suspended",
            )
            .with_details(serde_json::json!({
                "index": index,
                "reason": reason,
            })),
            KycError::Database(e) => ApiError::new(
                ErrorCode::PersistenceFailure,
                format!("Verification could not be recorded: {e}"),
            ),
            KycError::Migration(e) => ApiError::new(
                ErrorCode::PersistenceFailure,
                format!("Verification could not be recorded: {e}"),
            ),
            KycError::Persistence(msg) => ApiError::new(
                ErrorCode::PersistenceFailure,
                format!("Verification could not be recorded: {msg}"),
            ),
            KycError::Serialization(e) => ApiError::new(ErrorCode::InternalError, e.to_string()),
            KycError::Configuration(msg) => ApiError::new(
                ErrorCode::InternalError,
                format!("Configuration error: {msg}"),
            ),
            KycError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}
