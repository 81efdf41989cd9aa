//! Backend scaffold for the task-management application.
//!
//! The crate wires together the process bootstrap: configuration, the
//! supervised database connection, the HTTP middleware stack with its error
//! boundary, and the Redis-backed real-time channel.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use middleware::Trace;
