//! NotificationBus: fan-out of neighbor events to the routing layer.
//!
//! Backed by a `tokio::sync::broadcast` channel: every subscriber sees
//! every event in publication order. A subscriber that falls more than
//! `capacity` events behind loses the oldest ones and is told so with a
//! warning; publication never blocks the discovery loop.

use tokio::sync::broadcast;

use crate::neighbor::{EventKind, NeighborEvent};

pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Publisher side of the neighbor event stream.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<NeighborEvent>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns how many subscribers it reached; zero is not an error.
    pub fn publish(&self, event: NeighborEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to one kind of event.
    pub fn subscribe(&self, kind: EventKind) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            kind: Some(kind),
        }
    }

    /// Subscribe to every event.
    pub fn subscribe_all(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            kind: None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

/// Receiving side of a subscription, optionally filtered to one kind.
#[derive(Debug)]
pub struct EventSubscription {
    rx: broadcast::Receiver<NeighborEvent>,
    kind: Option<EventKind>,
}

impl EventSubscription {
    /// Kind this subscription is filtered to, `None` for all.
    pub fn kind(&self) -> Option<EventKind> {
        self.kind
    }

    /// Wait for the next matching event.
    ///
    /// Returns `None` once the bus and every publisher are gone.
    pub async fn recv(&mut self) -> Option<NeighborEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, kind = ?self.kind, "radar: subscriber lagged, events lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<NeighborEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, kind = ?self.kind, "radar: subscriber lagged, events lost");
                }
                Err(_) => return None,
            }
        }
    }

    fn matches(&self, event: &NeighborEvent) -> bool {
        self.kind.is_none() || self.kind == Some(event.kind())
    }
}
