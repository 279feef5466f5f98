//! Maps [`OrderError`] onto HTTP responses.
//!
//! | Kind                     | Status |
//! |--------------------------|--------|
//! | `ValidationError`        | 400    |
//! | `NotFoundError`          | 404    |
//! | `ConflictError`          | 409    |
//! | `IllegalTransitionError` | 422    |
//! | `UnavailableError`       | 503    |

use crate::order_actor::OrderError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

pub fn status_for(error: &OrderError) -> StatusCode {
    match error {
        OrderError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::Conflict { .. } => StatusCode::CONFLICT,
        OrderError::IllegalTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OrderError::Framework(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Order actor unavailable");
        }
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed request bodies become validation errors with the usual error body.
pub fn bad_body(rejection: JsonRejection) -> OrderError {
    OrderError::validation(rejection.body_text())
}
