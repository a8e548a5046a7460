//! # tradevisor
//!
//! **Tradevisor** is a small publish/subscribe hierarchy for Rust: periodic
//! sources feed summing aggregators, whose outputs are reduced to a median
//! decision by a top aggregator. Aggregators can be torn down at any time
//! without leaving dangling subscriptions or orphaned producers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Source 1   │   │   Source 2   │   │   Source 3   │
//!     │ (periodic)   │   │ (periodic)   │   │ (periodic)   │
//!     └──────┬───────┘   └──┬────────┬──┘   └──────┬───────┘
//!            │  Signal      │        │  Signal     │
//!            ▼              ▼        ▼             ▼
//!     ┌──────────────────────────┐  ┌──────────────────────────┐
//!     │ Aggregator A             │  │ Aggregator B             │
//!     │ sum, change-suppressed   │  │ sum, change-suppressed   │
//!     └────────────┬─────────────┘  └─────────────┬────────────┘
//!                  │ Signal (on change)           │
//!                  ▼                              ▼
//!     ┌─────────────────────────────────────────────────────────┐
//!     │ TopAggregator: median over aggregators ─► DecisionSink  │
//!     └─────────────────────────────────────────────────────────┘
//!
//!  Every node publishes lifecycle events:
//!     Source / Aggregator / TopAggregator / Orchestrator
//!                          │
//!                          ▼
//!     ┌─────────────────────────────────────────────────────────┐
//!     │               Bus (broadcast channel)                   │
//!     │             (capacity: Config::bus_capacity)            │
//!     └────────────────────────────┬────────────────────────────┘
//!                                  ▼
//!                      ┌─────────────────────────┐
//!                      │ SubscriberSet::forward  │
//!                      │    (in Orchestrator)    │
//!                      └────────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Teardown
//! ```text
//! Aggregator::terminate()
//!   ├─► mark Terminated
//!   ├─► detach own listeners (the top aggregator, parent aggregators)
//!   └─► for each upstream:
//!         ├─ detach self
//!         └─ release() ─► referrers == 0 on a Source ─► Source::stop()
//!
//! TopAggregator::remove_upstream(aggregator)
//!   └─► drop its decision, re-emit the median if it changed
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Notification**  | Ordered, idempotent listener sets with awaited delivery.      | [`Notifier`], [`Listen`], [`ListenFn`]      |
//! | **Nodes**         | Periodic sources, summing aggregators, median top aggregator. | [`Source`], [`Aggregator`], [`TopAggregator`] |
//! | **Orchestration** | Build a random graph and kill aggregators on a schedule.      | [`Orchestrator`], [`OrchestratorBuilder`]   |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).        | [`Subscribe`]                               |
//! | **Errors**        | Typed errors for delivery, reduction and shutdown.            | [`ListenError`], [`AggregateError`], [`RuntimeError`] |
//! | **Configuration** | Centralize graph and runtime settings.                        | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tradevisor::{Aggregator, Bus, Source, TopAggregator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Bus::default();
//!     let s1 = Source::new(|| 10_i64, Duration::from_secs(60), bus.clone());
//!     let s2 = Source::new(|| 20_i64, Duration::from_secs(60), bus.clone());
//!
//!     let agg = Aggregator::new(vec![s1.clone(), s2.clone()], bus.clone());
//!     let top = TopAggregator::new(
//!         vec![agg.clone()],
//!         |d: f64| println!("decision: {d}"),
//!         bus.clone(),
//!     );
//!
//!     s1.produce_once().await?;
//!     s2.produce_once().await?;
//!     assert_eq!(agg.combined(), 30);
//!     assert_eq!(top.median()?, 30.0);
//!
//!     // Tear down: both sources lose their only referrer and stop.
//!     let report = agg.terminate().expect("first termination");
//!     assert_eq!(report.stopped.len(), 2);
//!     top.remove_upstream(agg.as_ref());
//!     assert!(top.median().is_err());
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod nodes;
mod notify;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Orchestrator, OrchestratorBuilder};
pub use error::{AggregateError, ListenError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use nodes::{
    median, sum, Aggregator, AggregatorStatus, DecisionSink, Generate, NodeId, NodeKind,
    RandomGenerator, Released, Signal, Source, SourceState, StdoutSink, Termination,
    TopAggregator, Upstream, UpstreamRef,
};
pub use notify::{Listen, ListenFn, ListenerRef, Notifier};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
