//! Response envelope shared by every route.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::StorefrontError;

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    status: u16,
    code: &'static str,
    message: String,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

/// Successful outcome with a typed payload.
#[derive(Debug)]
pub struct ApiSuccess<T> {
    status: StatusCode,
    message: &'static str,
    data: T,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self { status: StatusCode::OK, message, data }
    }

    pub fn created(message: &'static str, data: T) -> Self {
        Self { status: StatusCode::CREATED, message, data }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            status: self.status.as_u16(),
            code: "SUCCESS",
            message: self.message.to_string(),
            data: self.data,
            error: None,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Duplicate(_) | Self::CycleDetected(_) | Self::DepthExceeded(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, error) = match &self {
            Self::Storage(detail) => {
                tracing::error!(error = %detail, "request failed");
                ("Internal server error".to_string(), Some(detail.clone()))
            }
            Self::CycleDetected(_) | Self::DepthExceeded(_) | Self::Conflict(_) => {
                tracing::warn!(error = %self, "request rejected");
                (self.to_string(), None)
            }
            other => (other.to_string(), None),
        };
        let body = Envelope {
            success: false,
            status: status.as_u16(),
            code: self.code(),
            message,
            data: serde_json::json!({}),
            error,
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// `Json` whose rejections come back in the envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(StorefrontError))]
pub struct ApiJson<T>(pub T);
