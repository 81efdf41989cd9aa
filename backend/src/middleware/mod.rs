//! Request middleware.
//!
//! Purpose: cross-cutting request concerns layered around every route:
//! tracing, query normalisation, header hardening and the terminal error
//! handler.

pub mod error_boundary;
pub mod parameter_pollution;
pub mod security_headers;
pub mod trace;

pub use error_boundary::ErrorBoundary;
pub use parameter_pollution::{
    CollapsedQuery, OriginalUri, PollutedQuery, collapse_query, parameter_pollution,
};
pub use security_headers::{SECURITY_HEADERS, security_headers};
pub use trace::{TRACE_ID_HEADER, Trace, TraceId};
