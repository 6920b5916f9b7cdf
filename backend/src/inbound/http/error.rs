//! Maps domain errors onto HTTP responses.
//!
//! The response envelope carries the stable error code, the trace id of the
//! failing request, and a `Retry-After` header when an account lock sets a
//! retry horizon. Internal errors are logged in full and redacted on the
//! wire.

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{Error, ErrorCode};
use crate::middleware::TraceId;

/// Wire shape of every error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[schema(example = "invalid_request")]
    pub code: ErrorCode,
    #[schema(example = "violation must not be empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AccountLocked => StatusCode::LOCKED,
        ErrorCode::InvalidTransition | ErrorCode::AlreadyPaid | ErrorCode::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let trace_id = TraceId::current().map(|id| id.to_string());
        let message = if self.code() == ErrorCode::InternalError {
            tracing::error!(
                error = %self.message(),
                trace_id = trace_id.as_deref().unwrap_or("-"),
                "internal error"
            );
            "internal error".to_owned()
        } else {
            self.message().to_owned()
        };

        let body = ErrorBody {
            code: self.code(),
            message,
            details: self.details().cloned(),
            retry_after_secs: self.retry_after_secs(),
            trace_id,
        };
        let mut response = HttpResponse::build(self.status_code());
        if let Some(retry_after) = self.retry_after_secs() {
            response.insert_header((header::RETRY_AFTER, retry_after.to_string()));
        }
        response.json(body)
    }
}
