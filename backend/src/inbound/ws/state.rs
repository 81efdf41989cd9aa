//! Shared WebSocket adapter state.
//!
//! The real-time channel is created after the listener is bound, so handlers
//! see it through a [`RealtimeSlot`] that starts empty and is filled at most
//! once.

use std::sync::{Arc, OnceLock};

use url::Url;

use super::channel::RealtimeChannel;

/// Write-once holder for the process's [`RealtimeChannel`].
#[derive(Clone, Default)]
pub struct RealtimeSlot {
    inner: Arc<OnceLock<RealtimeChannel>>,
}

impl RealtimeSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `channel`. Returns it back if a channel is already attached.
    ///
    /// # Errors
    ///
    /// Returns the rejected channel when the slot is already filled.
    pub fn attach(&self, channel: RealtimeChannel) -> Result<(), RealtimeChannel> {
        self.inner.set(channel)
    }

    /// The attached channel, if any.
    pub fn get(&self) -> Option<&RealtimeChannel> {
        self.inner.get()
    }

    /// Whether a channel is attached.
    pub fn is_attached(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// Dependency bundle for the `/ws` handler.
#[derive(Clone)]
pub struct WsState {
    /// Channel events are forwarded from.
    pub realtime: RealtimeSlot,
    /// The single origin allowed to open a socket.
    pub allowed_origin: Url,
}

impl WsState {
    /// Construct state from the shared slot and the configured client URL.
    pub fn new(realtime: RealtimeSlot, allowed_origin: Url) -> Self {
        Self {
            realtime,
            allowed_origin,
        }
    }
}
