//! # TopAggregator: median over aggregator outputs.
//!
//! The [`TopAggregator`] listens to a set of aggregators, keeps the latest
//! combined value of each one and reduces them with a median. Whenever the
//! median changes it is handed to a [`DecisionSink`].
//!
//! ```text
//! Aggregator A ─┐
//! Aggregator B ─┼─► update(Signal) ─► decisions[origin] = value
//! Aggregator C ─┘                          │
//!                                   median(decisions)
//!                                          │ (changed?)
//!                                          ▼
//!                              DecisionSink::on_decision(m)
//! ```
//!
//! There is no global instance: build one and pass it around explicitly.
//! When an aggregator terminates, its owner calls
//! [`TopAggregator::remove_upstream`] so the stale value stops counting.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AggregateError, ListenError};
use crate::events::{Bus, Event, EventKind};
use crate::notify::{Listen, ListenerRef};

use super::id::{NodeId, NodeKind};
use super::reduce;
use super::signal::Signal;
use super::upstream::{Upstream, UpstreamRef};

/// External hook receiving every new median decision.
pub trait DecisionSink: Send + Sync + 'static {
    /// Called outside of any lock, once per changed median.
    fn on_decision(&self, decision: f64);
}

impl<F> DecisionSink for F
where
    F: Fn(f64) + Send + Sync + 'static,
{
    fn on_decision(&self, decision: f64) {
        self(decision)
    }
}

/// Prints each decision to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl DecisionSink for StdoutSink {
    fn on_decision(&self, decision: f64) {
        println!("Trader median decision: {decision}");
    }
}

struct TopState {
    decisions: HashMap<NodeId, i64>,
    upstreams: Vec<UpstreamRef>,
    last: Option<f64>,
}

impl TopState {
    /// Recomputes the median and returns it if it differs from the last one.
    fn refresh(&mut self) -> Option<f64> {
        match reduce::median(self.decisions.values().copied()) {
            Ok(m) if self.last != Some(m) => {
                self.last = Some(m);
                Some(m)
            }
            Ok(_) => None,
            Err(AggregateError::Empty) => {
                self.last = None;
                None
            }
        }
    }
}

/// Median reducer over aggregators.
pub struct TopAggregator {
    id: NodeId,
    sink: Arc<dyn DecisionSink>,
    state: Mutex<TopState>,
    bus: Bus,
}

impl TopAggregator {
    /// Creates a top aggregator attached to every aggregator in `upstreams`.
    pub fn new<U, I>(upstreams: I, sink: impl DecisionSink, bus: Bus) -> Arc<Self>
    where
        U: Upstream,
        I: IntoIterator<Item = Arc<U>>,
    {
        let upstreams = upstreams
            .into_iter()
            .map(|u| u as UpstreamRef)
            .collect();
        Self::with_upstreams(upstreams, Arc::new(sink), bus)
    }

    /// Creates a top aggregator from type-erased upstream handles.
    pub fn with_upstreams(
        upstreams: Vec<UpstreamRef>,
        sink: Arc<dyn DecisionSink>,
        bus: Bus,
    ) -> Arc<Self> {
        let me = Arc::new(Self {
            id: NodeId::mint(NodeKind::Top),
            sink,
            state: Mutex::new(TopState {
                decisions: HashMap::new(),
                upstreams: Vec::with_capacity(upstreams.len()),
                last: None,
            }),
            bus,
        });

        let listener: ListenerRef<Signal> = me.clone();
        {
            let mut state = me.state.lock();
            for up in upstreams {
                if state.upstreams.iter().any(|u| u.id() == up.id()) {
                    continue;
                }
                up.retain();
                up.notifier().attach(Arc::clone(&listener));
                state.upstreams.push(up);
            }
        }
        me
    }

    /// Stable identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Median over the current decisions.
    ///
    /// # Errors
    /// [`AggregateError::Empty`] when no attached aggregator has reported.
    pub fn median(&self) -> Result<f64, AggregateError> {
        reduce::median(self.state.lock().decisions.values().copied())
    }

    /// Snapshot of the latest value per reporting aggregator.
    pub fn decisions(&self) -> HashMap<NodeId, i64> {
        self.state.lock().decisions.clone()
    }

    /// Number of aggregators currently attached.
    pub fn upstream_count(&self) -> usize {
        self.state.lock().upstreams.len()
    }

    /// Stores one aggregator's value and emits the median if it changed.
    ///
    /// Values from nodes that are not attached upstreams are ignored.
    pub async fn update(&self, signal: &Signal) -> Result<(), ListenError> {
        let decision = {
            let mut state = self.state.lock();
            if !state.upstreams.iter().any(|u| u.id() == signal.origin) {
                debug!(top = %self.id, origin = %signal.origin, "update from unknown upstream ignored");
                return Ok(());
            }
            state.decisions.insert(signal.origin, signal.value);
            state.refresh()
        };

        if let Some(m) = decision {
            self.emit(m);
        }
        Ok(())
    }

    /// Detaches and releases `upstream` and drops its contribution.
    ///
    /// Returns `false` if it was neither attached nor reporting. If decisions
    /// remain and the median moved, the new median is emitted.
    pub fn remove_upstream(&self, upstream: &dyn Upstream) -> bool {
        let id = upstream.id();
        upstream.notifier().detach(self);

        let (was_attached, known, remaining, decision) = {
            let mut state = self.state.lock();
            let attached = state.upstreams.len();
            state.upstreams.retain(|u| u.id() != id);
            let was_attached = state.upstreams.len() != attached;
            let had_decision = state.decisions.remove(&id).is_some();
            let decision = if had_decision { state.refresh() } else { None };
            (
                was_attached,
                was_attached || had_decision,
                state.decisions.len(),
                decision,
            )
        };

        if was_attached {
            upstream.release();
        }

        if known {
            debug!(top = %self.id, upstream = %id, remaining, "upstream removed");
            self.bus.publish(
                Event::new(EventKind::UpstreamRemoved)
                    .with_node(id.to_string())
                    .with_remaining(remaining),
            );
        }
        if let Some(m) = decision {
            self.emit(m);
        }
        known
    }

    fn emit(&self, decision: f64) {
        self.sink.on_decision(decision);
        self.bus.publish(
            Event::new(EventKind::DecisionEmitted)
                .with_node(self.id.to_string())
                .with_value(decision),
        );
    }
}

#[async_trait]
impl Listen<Signal> for TopAggregator {
    async fn on_value(&self, value: &Signal) -> Result<(), ListenError> {
        self.update(value).await
    }

    fn name(&self) -> &str {
        "top-aggregator"
    }
}
