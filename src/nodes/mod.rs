//! # Graph nodes.
//!
//! - [`Source`] - periodic producer with a start/stop lifecycle
//! - [`Aggregator`] - change-suppressed sum over sources or other aggregators
//! - [`TopAggregator`] - median over aggregators, reported to a [`DecisionSink`]
//! - [`Upstream`] - seam aggregators attach through (with referrer counting)
//! - [`Signal`], [`NodeId`] - the value flowing through the graph and who produced it
//!
//! ```text
//!   Source ──Signal──► Aggregator ──Signal (on change)──► TopAggregator ──► DecisionSink
//!   Source ──Signal──┘      ▲
//!                           └── (aggregators may also feed aggregators)
//! ```

mod aggregator;
mod generator;
mod id;
mod reduce;
mod signal;
mod source;
mod top;
mod upstream;

pub use aggregator::{Aggregator, AggregatorStatus, Termination};
pub use generator::{Generate, RandomGenerator};
pub use id::{NodeId, NodeKind};
pub use reduce::{median, sum};
pub use signal::Signal;
pub use source::{Source, SourceState};
pub use top::{DecisionSink, StdoutSink, TopAggregator};
pub use upstream::{Released, Upstream, UpstreamRef};
