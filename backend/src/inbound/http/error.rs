//! HTTP adapter mapping for [`AppError`].
//!
//! Purpose: keep the domain taxonomy HTTP-agnostic while letting Actix
//! handlers return it directly. Every variant becomes a JSON body of the
//! form `{message, statusCode, status}` with the variant's own status.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use crate::domain::{AppError, ErrorResponse};

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(self.serialize_error())
    }
}

/// JSON body for a status produced outside the taxonomy.
///
/// Client errors keep their status and use the canonical reason as both
/// message and label. Anything else collapses to the generic 500 body.
pub fn framework_error_body(status: StatusCode) -> ErrorResponse {
    if !status.is_client_error() {
        return ErrorResponse::internal();
    }
    let reason = status.canonical_reason().unwrap_or("Client Error");
    ErrorResponse {
        message: reason.to_owned(),
        status_code: status.as_u16(),
        status: reason.to_owned(),
    }
}
