// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse};
use serde_json::{json, Value};

use crate::api::relationships::RelationError;
use crate::api::response::JsonApi;
use crate::callback::CallbackError;
use crate::database::StoreError;
use crate::filter::FilterError;
use crate::model::AccessError;

const INTERNAL_DETAIL: &str = "An error occurred while processing your request";

/// HTTP API error with appropriate status codes and client-friendly messages,
/// rendered as a JSON:API error document.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad Request",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Conflict(_) => "Conflict",
            ApiError::InternalServerError(_) => "Internal Server Error",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "errors": [{
                "status": self.status_code().to_string(),
                "title": self.title(),
                "detail": self.message(),
            }]
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    /// Log the real cause and hand the client a generic message.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        ApiError::InternalServerError(INTERNAL_DETAIL.to_string())
    }

    /// Classify a hook failure. Anything an authorizer rejects becomes 401.
    pub fn from_callback(err: CallbackError, authorizing: bool) -> Self {
        match err {
            CallbackError::Denied(msg) => {
                tracing::warn!("Access denied: {}", msg);
                ApiError::unauthorized("Access denied")
            }
            CallbackError::User(msg) if authorizing => {
                tracing::warn!("Authorization failed: {}", msg);
                ApiError::unauthorized("Access denied")
            }
            CallbackError::User(msg) => ApiError::bad_request(msg),
            CallbackError::System(msg) => ApiError::internal(msg),
        }
    }
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { id, .. } => ApiError::conflict(format!("Resource with id {} already exists", id)),
            // Don't expose store internals to clients
            other => ApiError::internal(other),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::internal(err)
    }
}

impl From<RelationError> for ApiError {
    fn from(err: RelationError) -> Self {
        match err {
            RelationError::Access(e) => ApiError::internal(e),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<CallbackError> for ApiError {
    fn from(err: CallbackError) -> Self {
        ApiError::from_callback(err, false)
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        JsonApi::with_status(self.to_json(), status).into_response()
    }
}
