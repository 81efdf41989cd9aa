//! Process-wide real-time channel.
//!
//! Events emitted here reach this process's WebSocket sessions directly and
//! every other process through the fan-out adapter. Each envelope carries the
//! emitting [`NodeId`]; the relay task drops envelopes from its own node so
//! local subscribers see every event exactly once.
//!
//! If the inbound stream ends the relay stops for good; [`RealtimeChannel::relay_stopped`]
//! lets the owner react, since events from other processes no longer arrive.

use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, trace};

use crate::domain::ports::{FanoutError, FanoutInbound, FanoutPublisher};
use crate::domain::{Envelope, NodeId, RealtimeEvent};

const LOCAL_BUFFER: usize = 256;

/// Errors raised by the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    /// The fan-out adapter could not be connected.
    #[error("real-time channel unavailable: {0}")]
    Connect(#[source] FanoutError),
    /// The envelope was delivered locally but not published.
    #[error("real-time publish failed: {0}")]
    Publish(#[source] FanoutError),
}

/// Shared real-time channel bound to one fan-out adapter.
///
/// Dropping the channel stops relaying inbound envelopes.
pub struct RealtimeChannel {
    node: NodeId,
    local: broadcast::Sender<RealtimeEvent>,
    publisher: Arc<dyn FanoutPublisher>,
    relay: JoinHandle<()>,
    relaying: watch::Receiver<bool>,
}

impl RealtimeChannel {
    /// Install `publisher` and `inbound` as this channel's fan-out adapter.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(publisher: Arc<dyn FanoutPublisher>, inbound: FanoutInbound) -> Self {
        Self::with_node(NodeId::random(), publisher, inbound)
    }

    /// As [`Self::new`], with an explicit node identity.
    pub fn with_node(
        node: NodeId,
        publisher: Arc<dyn FanoutPublisher>,
        inbound: FanoutInbound,
    ) -> Self {
        let (local, _) = broadcast::channel(LOCAL_BUFFER);
        let (status, relaying) = watch::channel(true);
        let relay = tokio::spawn(relay(node, inbound, local.clone(), status));
        info!(%node, "real-time channel created");
        Self {
            node,
            local,
            publisher,
            relay,
            relaying,
        }
    }

    /// Identity stamped on envelopes emitted here.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Whether envelopes from other processes are still being relayed.
    pub fn is_relaying(&self) -> bool {
        *self.relaying.borrow()
    }

    /// Resolves once the inbound relay has stopped, whether its stream
    /// ended or the channel was dropped.
    pub fn relay_stopped(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut relaying = self.relaying.clone();
        async move {
            // An error means the relay task is gone, which is also a stop.
            relaying.wait_for(|running| !*running).await.ok();
        }
    }

    /// Receive every event delivered to this process.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.local.subscribe()
    }

    /// Emit `event` with `payload` to all connected clients.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Publish`] if the fan-out publish fails. Local
    /// sessions have already received the event by then.
    pub async fn emit(&self, event: impl Into<String>, payload: Value) -> Result<(), RealtimeError> {
        self.emit_event(RealtimeEvent::new(event, payload)).await
    }

    /// Emit an already built event. See [`Self::emit`].
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Publish`] if the fan-out publish fails.
    pub async fn emit_event(&self, event: RealtimeEvent) -> Result<(), RealtimeError> {
        let envelope = Envelope::new(self.node, event);
        deliver(&self.local, envelope.event.clone());
        self.publisher
            .publish(&envelope)
            .await
            .map_err(RealtimeError::Publish)
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

async fn relay(
    node: NodeId,
    mut inbound: FanoutInbound,
    local: broadcast::Sender<RealtimeEvent>,
    status: watch::Sender<bool>,
) {
    while let Some(envelope) = inbound.next().await {
        if envelope.is_from(node) {
            continue;
        }
        deliver(&local, envelope.event);
    }
    error!(%node, "fan-out subscription ended; events from other processes are no longer relayed");
    status.send_replace(false);
}

fn deliver(local: &broadcast::Sender<RealtimeEvent>, event: RealtimeEvent) {
    // Sending fails only when no session is connected.
    if local.send(event).is_err() {
        trace!("no local subscribers for real-time event");
    }
}
