//! # Graph lifecycle events.
//!
//! The [`EventKind`] enum classifies what happened in the graph:
//! - **Source events**: a production loop started, stopped or failed
//! - **Aggregation events**: termination, released upstreams, emitted decisions
//! - **Shutdown events**: orchestrator shutdown progress
//! - **Subscriber events**: overflow/panic inside the fan-out workers
//!
//! [`Event`] carries the optional metadata (node id, value, remaining count,
//! reason) that each kind sets.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use it to restore order when events arrive interleaved.
//!
//! ## Example
//! ```rust
//! use tradevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DecisionEmitted)
//!     .with_node("top-4")
//!     .with_value(35.0);
//!
//! assert_eq!(ev.kind, EventKind::DecisionEmitted);
//! assert_eq!(ev.node.as_deref(), Some("top-4"));
//! assert_eq!(ev.value, Some(35.0));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of graph events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Source events ===
    /// A source spawned its production loop.
    ///
    /// Sets: `node`
    SourceStarted,

    /// A source was stopped (explicitly or by its last referrer releasing it).
    ///
    /// Sets: `node`
    SourceStopped,

    /// A source loop ended because a listener failed fatally or panicked.
    ///
    /// Sets: `node`, `reason`
    SourceFailed,

    /// A listener failed one round; the source keeps producing.
    ///
    /// Sets: `node`, `reason`
    DeliveryFailed,

    // === Aggregation events ===
    /// An aggregator completed its termination protocol.
    ///
    /// Sets: `node`, `remaining` (listeners detached)
    AggregatorTerminated,

    /// A terminating aggregator released one of its upstreams.
    ///
    /// Sets: `node` (the upstream), `remaining` (referrers left)
    UpstreamReleased,

    /// The top aggregator dropped an upstream's contribution.
    ///
    /// Sets: `node` (the upstream), `remaining` (decisions left)
    UpstreamRemoved,

    /// The top aggregator produced a new median decision.
    ///
    /// Sets: `node`, `value`
    DecisionEmitted,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ///
    /// Sets: `reason` (signal name)
    ShutdownRequested,

    /// Every source loop finished within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some source loops did not finish in time.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `node` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `node` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Graph event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Display form of the node the event is about.
    pub node: Option<Arc<str>>,
    /// Numeric payload (decisions).
    pub value: Option<f64>,
    /// Remaining count (referrers, decisions, listeners), depending on kind.
    pub remaining: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node: None,
            value: None,
            remaining: None,
            reason: None,
        }
    }

    /// Attaches a node name.
    #[inline]
    pub fn with_node(mut self, node: impl Into<Arc<str>>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Attaches a numeric value.
    #[inline]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attaches a remaining count (saturated to `u32`).
    #[inline]
    pub fn with_remaining(mut self, n: usize) -> Self {
        self.remaining = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_node(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_node(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::SourceStarted);
        let b = Event::new(EventKind::SourceStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_fill_fields() {
        let ev = Event::new(EventKind::UpstreamReleased)
            .with_node("source-1")
            .with_remaining(2);
        assert_eq!(ev.node.as_deref(), Some("source-1"));
        assert_eq!(ev.remaining, Some(2));
        assert!(ev.value.is_none());

        let ov = Event::subscriber_overflow("log", "full");
        assert_eq!(ov.kind, EventKind::SubscriberOverflow);
        assert_eq!(ov.reason.as_deref(), Some("full"));
    }
}
