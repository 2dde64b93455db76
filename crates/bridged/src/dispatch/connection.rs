//! Weak handles to client connections.

use std::fmt;
use std::sync::{Arc, Weak};

use super::response::ResponseEnvelope;

/// Identifier assigned to each accepted connection.
pub type ConnectionId = u64;

/// Delivery side of a client connection.
pub trait ResponseChannel: Send + Sync {
    /// Sends one envelope. Returns whether the write was accepted.
    fn deliver(&self, envelope: &ResponseEnvelope) -> bool;
}

/// Non-owning reference to the connection that submitted a request.
///
/// Holding a handle never keeps a connection alive. Once the connection
/// manager drops the channel, [`ConnectionHandle::send`] returns `false`.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    channel: Weak<dyn ResponseChannel>,
}

impl ConnectionHandle {
    /// Creates a handle that observes `channel` without owning it.
    #[must_use]
    pub fn new(id: ConnectionId, channel: &Arc<dyn ResponseChannel>) -> Self {
        Self {
            id,
            channel: Arc::downgrade(channel),
        }
    }

    /// Identifier of the underlying connection.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns true while the connection is still registered.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.channel.strong_count() > 0
    }

    /// Sends `envelope` if the connection is still open.
    pub fn send(&self, envelope: &ResponseEnvelope) -> bool {
        self.channel
            .upgrade()
            .is_some_and(|channel| channel.deliver(envelope))
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl ResponseChannel for Collect {
        fn deliver(&self, envelope: &ResponseEnvelope) -> bool {
            self.0
                .lock()
                .expect("collect lock")
                .push(envelope.request_id().to_owned());
            true
        }
    }

    #[test]
    fn send_fails_once_the_channel_is_dropped() {
        let channel: Arc<dyn ResponseChannel> = Arc::new(Collect::default());
        let handle = ConnectionHandle::new(3, &channel);
        assert!(handle.send(&ResponseEnvelope::success("r1", "ok", None)));
        drop(channel);
        assert!(!handle.is_open());
        assert!(!handle.send(&ResponseEnvelope::success("r2", "ok", None)));
    }
}
