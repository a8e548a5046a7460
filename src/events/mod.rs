//! Graph events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by sources, aggregators, the
//! top aggregator, the orchestrator and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Source` (start/stop/failure), `Aggregator` (termination,
//!   releases), `TopAggregator` (decisions, removals), `Orchestrator`
//!   (shutdown), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's listener, which fans out to a
//!   `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
