//! Port for pushing notification events to connected clients.

use async_trait::async_trait;

use crate::domain::RealtimeEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised while delivering a notification.
    pub enum NotificationPublisherError {
        /// The event could not be handed to the delivery channel.
        Delivery => "notification delivery failed",
    }
}

/// Delivers domain events to clients over whatever push channel is attached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: RealtimeEvent) -> Result<(), NotificationPublisherError>;
}

/// Publisher that drops every event. Used where no push channel exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationPublisher;

#[async_trait]
impl NotificationPublisher for NoOpNotificationPublisher {
    async fn publish(&self, _event: RealtimeEvent) -> Result<(), NotificationPublisherError> {
        Ok(())
    }
}
