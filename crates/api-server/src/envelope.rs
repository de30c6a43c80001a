//! The `{ok, data, error}` response envelope and error → status mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use wreckshop_journey::JourneyError;

/// Body returned for unknown journey ids.
pub const NOT_FOUND: &str = "not found";

/// Every response body: `ok` plus either `data` or `error`.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiEnvelope<()> {
    /// `{ok: true}` with no payload.
    pub fn ok() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }
}

/// Documented shape of failed responses. `error` is a string, or a
/// `{formErrors, fieldErrors}` object for validation failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub error: Value,
}

pub type ApiResult<T> = Result<Json<ApiEnvelope<T>>, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Journey(#[from] JourneyError),

    /// The body was not JSON at all. Wrongly typed fields are validation errors.
    #[error("{0}")]
    MalformedBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Journey(JourneyError::Validation(_))
            | ApiError::Journey(JourneyError::Precondition(_))
            | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Journey(JourneyError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Journey(JourneyError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Journey(JourneyError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Journey(JourneyError::Validation(errors)) => serde_json::to_value(errors)
                .unwrap_or_else(|_| Value::String(errors.to_string())),
            ApiError::Journey(JourneyError::NotFound(_)) => Value::String(NOT_FOUND.to_string()),
            ApiError::Journey(JourneyError::Store(err)) => Value::String(err.to_string()),
            ApiError::Journey(JourneyError::Precondition(message))
            | ApiError::Journey(JourneyError::Conflict(message))
            | ApiError::MalformedBody(message) => Value::String(message.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::BAD_REQUEST => {
                warn!(error = %self, "Rejected journey request");
                metrics::counter!("api.validation_errors").increment(1);
            }
            StatusCode::CONFLICT => {
                warn!(error = %self, "Journey request conflicts with current status");
                metrics::counter!("api.conflicts").increment(1);
            }
            StatusCode::NOT_FOUND => debug!(error = %self, "Journey not found"),
            _ => {
                error!(error = %self, "Journey request failed");
                metrics::counter!("api.errors").increment(1);
            }
        }

        let body: ApiEnvelope<()> = ApiEnvelope {
            ok: false,
            data: None,
            error: Some(self.body()),
        };
        (status, Json(body)).into_response()
    }
}
