//! Application error taxonomy.
//!
//! [`AppError`] is the closed set of failures a handler may surface on
//! purpose. Each variant fixes its own HTTP status code and status label, so
//! the error boundary can match on the variant rather than on type identity.
//! The payload types are transport agnostic; the HTTP adapter in
//! `inbound::http::error` turns them into responses.

use serde::{Deserialize, Serialize};

/// Recognised application errors.
///
/// # Examples
/// ```
/// use todo_backend::domain::AppError;
///
/// let err = AppError::bad_request("Invalid input");
/// assert_eq!(err.status_code(), 400);
/// assert_eq!(err.status(), "Bad Request");
/// assert_eq!(err.message(), "Invalid input");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// The request is malformed or fails validation.
    #[error("{0}")]
    BadRequest(String),
    /// Authentication failed or is missing.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not permitted.
    #[error("{0}")]
    Forbidden(String),
    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request conflicts with the current resource state.
    #[error("{0}")]
    Conflict(String),
    /// The request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// A dependency the request needs is not available.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Unexpected failure; the message is never sent to clients.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for [`AppError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Convenience constructor for [`AppError::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Convenience constructor for [`AppError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Convenience constructor for [`AppError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Convenience constructor for [`AppError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Convenience constructor for [`AppError::PayloadTooLarge`].
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Convenience constructor for [`AppError::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Convenience constructor for [`AppError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Numeric HTTP status code carried by the variant.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::PayloadTooLarge(_) => 413,
            Self::ServiceUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Status label carried by the variant.
    pub const fn status(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad Request",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "Not Found",
            Self::Conflict(_) => "Conflict",
            Self::PayloadTooLarge(_) => "Payload Too Large",
            Self::ServiceUnavailable(_) => "Service Unavailable",
            Self::Internal(_) => "Internal Server Error",
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::PayloadTooLarge(message)
            | Self::ServiceUnavailable(message)
            | Self::Internal(message) => message,
        }
    }

    /// Whether the message must be hidden from clients.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Serialise the error into its client-facing payload.
    ///
    /// Internal errors are redacted to a generic message.
    pub fn serialize_error(&self) -> ErrorResponse {
        let message = if self.is_internal() {
            ErrorResponse::INTERNAL_MESSAGE.to_owned()
        } else {
            self.message().to_owned()
        };
        ErrorResponse {
            message,
            status_code: self.status_code(),
            status: self.status().to_owned(),
        }
    }
}

/// Error body returned to clients: `{ message, statusCode, status }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable message.
    pub message: String,
    /// Numeric HTTP status code.
    pub status_code: u16,
    /// Status label, e.g. `Bad Request`.
    pub status: String,
}

impl ErrorResponse {
    /// Message used whenever an internal failure reaches a client.
    pub const INTERNAL_MESSAGE: &'static str = "Internal server error";

    /// Generic body for failures outside the taxonomy.
    pub fn internal() -> Self {
        AppError::internal(Self::INTERNAL_MESSAGE).serialize_error()
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(value: &AppError) -> Self {
        value.serialize_error()
    }
}

/// Body returned by the catch-all handler for unmatched routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundResponse {
    /// `<original-url> not found`.
    pub message: String,
}

impl NotFoundResponse {
    /// Build the body for the given original request URL.
    ///
    /// # Examples
    /// ```
    /// use todo_backend::domain::NotFoundResponse;
    ///
    /// let body = NotFoundResponse::for_url("/unknown-path");
    /// assert_eq!(body.message, "/unknown-path not found");
    /// ```
    pub fn for_url(original_url: &str) -> Self {
        Self {
            message: format!("{original_url} not found"),
        }
    }
}
