//! # Event bus for broadcasting graph events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every node
//! (sources, aggregators, the top aggregator) and the orchestrator hold a clone
//! and publish lifecycle events without blocking.
//!
//! ```text
//! Publishers (many):                  Consumer (one per orchestrator):
//!   Source 1     ──┐
//!   Aggregator 1 ──┼──────► Bus ─────► subscriber listener ────► SubscriberSet
//!   TopAggregator──┤  (broadcast chan)
//!   Orchestrator ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - One shared ring buffer; lagging receivers observe `RecvError::Lagged(n)`.
//! - Events published while nobody subscribes are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Default ring buffer size used by [`Bus::default`].
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel for graph events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
