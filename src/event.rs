//! Session events emitted by the authenticated client.
//!
//! The client never navigates or renders anything itself; it broadcasts
//! these events and the embedding UI decides what to do (redirect to a
//! login surface, show a toast, and so on).

use tokio::sync::broadcast;

/// Capacity of the session event channel. Events are small and
/// subscribers are expected to drain them promptly; a lagging receiver
/// loses the oldest events, never the newest.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session ended: explicit logout, a hard auth failure, or a
    /// failed credential renewal. Subscribers own any navigation.
    Terminated,

    /// A user-visible failure notice carrying the server-provided
    /// message, or the transport error text when no response arrived.
    Notice { message: String },
}

/// Fan-out handle for [`SessionEvent`]s, owned by the client.
#[derive(Debug, Clone)]
pub(crate) struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // Err just means nobody is subscribed, which is fine for a
        // headless caller.
        let _ = self.tx.send(event);
    }
}
