//! HTTP inbound adapter: error mapping, health probes, body limits and the
//! catch-all handler for unmatched routes.

pub mod body_limits;
pub mod error;
pub mod fallback;
pub mod health;
