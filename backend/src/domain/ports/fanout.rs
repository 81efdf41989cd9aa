//! Port for cross-process fan-out of real-time envelopes.
//!
//! The publishing half is a trait; the subscribing half is a plain stream of
//! envelopes handed to the channel when the adapter is installed. Adapters
//! keep the two on separate connections because a subscribed connection
//! cannot issue other commands.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::Envelope;

use super::define_port_error;

define_port_error! {
    /// Errors raised by fan-out adapters.
    pub enum FanoutError {
        /// Connecting to the broker failed.
        Connection => "fan-out connection failed",
        /// Publishing an envelope failed.
        Publish => "fan-out publish failed",
        /// The envelope could not be encoded.
        Encode => "fan-out encode failed",
    }
}

/// Publishing half of a fan-out adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FanoutPublisher: Send + Sync {
    /// Publish an envelope to every process in the group.
    async fn publish(&self, envelope: &Envelope) -> Result<(), FanoutError>;
}

/// Subscribing half of a fan-out adapter: every envelope published by any
/// process, including this one.
pub type FanoutInbound = BoxStream<'static, Envelope>;
