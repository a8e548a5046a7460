//! # Event subscribers for graph observability.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] (feature `logging`).
//!
//! ```text
//! Source/Aggregator/Top ── publish(Event) ──► Bus ──► orchestrator listener
//!                                                          │
//!                                                   SubscriberSet::emit
//!                                                ┌─────────┼─────────┐
//!                                                ▼         ▼         ▼
//!                                            LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use tradevisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct StopCounter;
//!
//! #[async_trait]
//! impl Subscribe for StopCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::SourceStopped {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
