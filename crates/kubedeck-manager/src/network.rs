//! Host network transition signals.
//!
//! The embedding application owns the OS-level detection and calls the
//! notifier; the manager subscribes and reacts. Delivery is broadcast so
//! unrelated observers can listen too.

use std::fmt;

use tokio::sync::broadcast;

/// A host-wide network transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The host lost network connectivity.
    Offline,
    /// The host regained network connectivity.
    Online,
}

impl fmt::Display for NetworkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkEvent::Offline => write!(f, "offline"),
            NetworkEvent::Online => write!(f, "online"),
        }
    }
}

/// Broadcast fan-out for network transitions.
pub struct NetworkNotifier {
    sender: broadcast::Sender<NetworkEvent>,
}

impl NetworkNotifier {
    /// Creates a notifier whose subscribers can lag by at most `capacity`
    /// undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Announces that the host went offline. Returns the number of
    /// subscribers the event reached.
    pub fn notify_offline(&self) -> usize {
        self.notify(NetworkEvent::Offline)
    }

    /// Announces that the host came back online. Returns the number of
    /// subscribers the event reached.
    pub fn notify_online(&self) -> usize {
        self.notify(NetworkEvent::Online)
    }

    /// Opens a subscription to future transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn notify(&self, event: NetworkEvent) -> usize {
        if self.sender.receiver_count() == 0 {
            return 0;
        }
        let _ = self.sender.send(event);
        self.sender.receiver_count()
    }
}
