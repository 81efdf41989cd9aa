//! [`NotificationPublisher`] backed by the real-time channel.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::RealtimeEvent;
use crate::domain::ports::{NotificationPublisher, NotificationPublisherError};

use super::state::RealtimeSlot;

/// Pushes domain notifications through whichever channel is attached.
///
/// Until the slot is filled every event is dropped, matching
/// [`crate::domain::ports::NoOpNotificationPublisher`].
#[derive(Clone)]
pub struct RealtimeNotifier {
    slot: RealtimeSlot,
}

impl RealtimeNotifier {
    /// Publish through the channel `slot` holds, once one is attached.
    pub fn new(slot: RealtimeSlot) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl NotificationPublisher for RealtimeNotifier {
    async fn publish(&self, event: RealtimeEvent) -> Result<(), NotificationPublisherError> {
        let Some(channel) = self.slot.get() else {
            debug!(event = %event.event, "real-time channel not attached; dropping event");
            return Ok(());
        };
        channel
            .emit_event(event)
            .await
            .map_err(|err| NotificationPublisherError::delivery(err.to_string()))
    }
}
