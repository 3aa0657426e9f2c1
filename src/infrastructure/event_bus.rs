//! In-process broadcast sink backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use crate::application::EventSink;
use crate::domain::{BroadcastEvent, Result};

/// Broadcast bus delivering events to every live subscriber.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct BroadcastEventBus {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl BroadcastEventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventBus {
    fn publish(&self, event: BroadcastEvent) -> impl Future<Output = Result<()>> + Send {
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::trace!(receivers, "Broadcast event published");
        async { Ok(()) }
    }
}
