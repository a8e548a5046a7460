//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing graph lifecycle events
//! (source start/stop, terminations, decisions). Each subscriber is driven by a
//! dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block sources, aggregators or
//!   other subscribers.
//! - Each subscriber declares its queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow the event is dropped for that
//!   subscriber and `SubscriberOverflow` is published.
//!
//! Subscribers are observability only. Values flowing through the graph are
//! delivered by [`Notifier`](crate::Notifier) to [`Listen`](crate::Listen)ers.

use crate::events::Event;
use async_trait::async_trait;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
