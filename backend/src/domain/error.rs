//! Domain-level error type shared by every service.
//!
//! The type is transport agnostic: inbound adapters map it onto HTTP status
//! codes and response envelopes, while services construct it from port-level
//! failures without knowing who is listening.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The account is temporarily locked after repeated login failures.
    AccountLocked,
    /// The citation state machine forbids the requested transition.
    InvalidTransition,
    /// The citation is already settled.
    AlreadyPaid,
    /// A uniqueness constraint could not be satisfied.
    Conflict,
    /// A backing store or transport is unavailable; safe to retry.
    ServiceUnavailable,
    /// An unexpected error occurred inside the service.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
/// - `retry_after_secs` is only present for [`ErrorCode::AccountLocked`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    #[schema(example = "invalid_request")]
    code: ErrorCode,
    #[schema(example = "Something went wrong")]
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl Error {
    /// Create a new error, panicking if the message is blank.
    ///
    /// All call sites pass literal or formatted non-empty messages; the panic
    /// guards against programming mistakes, not runtime input.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        assert!(
            !message.trim().is_empty(),
            "domain error messages must not be blank"
        );
        Self {
            code,
            message,
            details: None,
            retry_after_secs: None,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary structured details for adapters.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Seconds until a locked account accepts login attempts again.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after_secs
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Constructor for [`ErrorCode::AccountLocked`] carrying the retry hint.
    #[must_use]
    pub fn account_locked(retry_after_secs: u64) -> Self {
        let minutes = retry_after_secs.div_ceil(60);
        let mut error = Self::new(
            ErrorCode::AccountLocked,
            format!("account temporarily locked; try again in about {minutes} minute(s)"),
        );
        error.retry_after_secs = Some(retry_after_secs);
        error
    }

    /// Convenience constructor for [`ErrorCode::InvalidTransition`].
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransition, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyPaid`].
    pub fn already_paid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyPaid, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// Convenient result alias for domain operations.
pub type DomainResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::InvalidRequest, "invalid_request")]
    #[case(ErrorCode::AccountLocked, "account_locked")]
    #[case(ErrorCode::AlreadyPaid, "already_paid")]
    #[case(ErrorCode::ServiceUnavailable, "service_unavailable")]
    fn error_codes_serialise_as_snake_case(#[case] code: ErrorCode, #[case] expected: &str) {
        let value = serde_json::to_value(code).expect("serialise code");
        assert_eq!(value, serde_json::json!(expected));
    }

    #[test]
    fn account_locked_carries_retry_hint() {
        let error = Error::account_locked(90);
        assert_eq!(error.code(), ErrorCode::AccountLocked);
        assert_eq!(error.retry_after_secs(), Some(90));
        assert!(error.message().contains("2 minute"));
    }

    #[test]
    fn details_round_trip() {
        let error = Error::invalid_request("bad field")
            .with_details(serde_json::json!({ "field": "email" }));
        let json = serde_json::to_value(&error).expect("serialise error");
        assert_eq!(json["code"], "invalid_request");
        assert_eq!(json["details"]["field"], "email");
        assert!(json.get("retryAfterSecs").is_none());
    }
}
