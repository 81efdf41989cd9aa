//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL connection supervision and the Diesel user
//!   repository
//! - **pubsub**: Redis publish/subscribe fan-out for the real-time channel
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod persistence;
pub mod pubsub;
