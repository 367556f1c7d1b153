//! Mapping of harness errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use fault_harness::HarnessError;
use modbus_frame::FrameError;

/// Error payload: `{ "error": <code>, "message": ..., "field": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    field: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
            field: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<HarnessError> for ApiError {
    fn from(err: HarnessError) -> Self {
        let status = match &err {
            HarnessError::InvalidParameter { .. } | HarnessError::Frame(_) => {
                StatusCode::BAD_REQUEST
            }
            HarnessError::Dispatch(_) => StatusCode::BAD_GATEWAY,
        };
        let field = match &err {
            HarnessError::InvalidParameter { field, .. } => Some(*field),
            _ => None,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
            field,
        }
    }
}

impl From<FrameError> for ApiError {
    fn from(err: FrameError) -> Self {
        HarnessError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "malformed_body",
            message: rejection.body_text(),
            field: None,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "malformed_query",
            message: rejection.body_text(),
            field: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: self.code,
            message: &self.message,
            field: self.field,
        };
        (self.status, Json(body)).into_response()
    }
}
