//! Runtime core: graph construction and lifecycle.
//!
//! The public API from this module is [`Orchestrator`] and its
//! [`OrchestratorBuilder`], which wire a graph and drive it through its
//! termination schedule and graceful shutdown.
//!
//! Internal modules:
//! - [`builder`]: creates sources, aggregators and the top aggregator;
//! - [`orchestrator`]: runs the kill schedule, forwards events, shuts down;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod orchestrator;
mod shutdown;

pub use builder::OrchestratorBuilder;
pub use orchestrator::Orchestrator;
