//! Request body limits for JSON, URL-encoded and raw payloads.
//!
//! All three extractors share one 50 MB ceiling. Overflow maps to
//! [`AppError::PayloadTooLarge`]; malformed bodies map to
//! [`AppError::BadRequest`]. Other extractor failures pass through with
//! their framework status.

use actix_web::error::{JsonPayloadError, UrlencodedError};
use actix_web::{HttpRequest, web};
use tracing::debug;

use crate::domain::AppError;

/// Maximum accepted request body size in bytes.
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

const TOO_LARGE: &str = "request entity too large";

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejecting JSON body");
    match err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            AppError::payload_too_large(TOO_LARGE).into()
        }
        JsonPayloadError::Deserialize(inner) => AppError::bad_request(inner.to_string()).into(),
        other => other.into(),
    }
}

fn form_error(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejecting URL-encoded body");
    match err {
        UrlencodedError::Overflow { .. } => AppError::payload_too_large(TOO_LARGE).into(),
        UrlencodedError::Parse(_) => AppError::bad_request("malformed form body").into(),
        other => other.into(),
    }
}

/// JSON extractor configuration with the shared limit.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(BODY_LIMIT_BYTES)
        .error_handler(json_error)
}

/// URL-encoded form extractor configuration with the shared limit.
pub fn form_config() -> web::FormConfig {
    web::FormConfig::default()
        .limit(BODY_LIMIT_BYTES)
        .error_handler(form_error)
}

/// Raw payload (`Bytes`/`String`) extractor configuration.
pub fn payload_config() -> web::PayloadConfig {
    web::PayloadConfig::new(BODY_LIMIT_BYTES)
}
