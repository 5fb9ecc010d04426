use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// A JSON:API document with its status code.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApi {
    pub body: Value,
    pub status_code: StatusCode,
}

impl JsonApi {
    /// Create a document response with default 200 status
    pub fn ok(body: Value) -> Self {
        Self::with_status(body, StatusCode::OK)
    }

    pub fn with_status(body: Value, status_code: StatusCode) -> Self {
        Self { body, status_code }
    }

    /// `{"data": ...}` with 200
    pub fn data(data: Value) -> Self {
        Self::ok(json!({ "data": data }))
    }

    /// Create a 201 Created response
    pub fn created(data: Value) -> Self {
        Self::with_status(json!({ "data": data }), StatusCode::CREATED)
    }

    /// Create a 204 No Content response
    pub fn no_content() -> Self {
        Self::with_status(Value::Null, StatusCode::NO_CONTENT)
    }
}

impl IntoResponse for JsonApi {
    fn into_response(self) -> Response {
        // For 204 No Content, return empty response
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }

        match serde_json::to_string(&self.body) {
            Ok(body) => (self.status_code, [(header::CONTENT_TYPE, JSONAPI_MEDIA_TYPE)], body).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response document: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub type ApiResult = Result<JsonApi, crate::error::ApiError>;
