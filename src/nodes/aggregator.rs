//! # Aggregator: change-suppressed sum over upstreams.
//!
//! An [`Aggregator`] listens to a fixed set of upstreams (sources or other
//! aggregators), keeps the latest value per upstream and republishes the sum to
//! its own listeners, but only when an upstream value actually changed.
//!
//! ## Update rules
//! ```text
//! update(Signal { origin, value })
//!   ├─ terminated?               ─► no-op
//!   ├─ origin not an upstream?   ─► no-op
//!   ├─ value == stored value?    ─► no-op   (seeded with 0, so a first 0 is suppressed)
//!   └─ store, sum all values     ─► notify(Signal { self.id, sum })
//! ```
//!
//! ## Termination
//! ```text
//! terminate()
//!   ├─► mark Terminated (further updates are ignored)
//!   ├─► detach every listener of this aggregator
//!   ├─► for each upstream:
//!   │     ├─ detach self from its notifier
//!   │     └─ release() ─► last referrer of a Source stops it
//!   └─► clear values and upstreams
//! ```
//! Terminating twice is a no-op (returns `None`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::ListenError;
use crate::events::{Bus, Event, EventKind};
use crate::notify::{Listen, ListenerRef, Notifier};

use super::id::{NodeId, NodeKind};
use super::reduce;
use super::signal::Signal;
use super::upstream::{Referrers, Released, Upstream, UpstreamRef};

/// Lifecycle of an [`Aggregator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregatorStatus {
    /// Receiving updates and emitting sums.
    Active,
    /// Inert for good.
    Terminated,
}

/// Report of a completed termination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Termination {
    /// The terminated aggregator.
    pub aggregator: NodeId,
    /// How many of its own listeners were detached.
    pub detached_listeners: usize,
    /// Upstreams released, in attachment order.
    pub released: Vec<NodeId>,
    /// Upstreams that stopped because this was their last referrer.
    pub stopped: Vec<NodeId>,
}

struct AggregatorState {
    status: AggregatorStatus,
    values: HashMap<NodeId, i64>,
    upstreams: Vec<UpstreamRef>,
}

/// Summing aggregator over a fixed upstream set.
pub struct Aggregator {
    id: NodeId,
    notifier: Notifier<Signal>,
    referrers: Referrers,
    state: Mutex<AggregatorState>,
    bus: Bus,
}

impl Aggregator {
    /// Creates an aggregator attached to every upstream in `upstreams`.
    ///
    /// Use [`Aggregator::with_upstreams`] to mix sources and aggregators.
    pub fn new<U, I>(upstreams: I, bus: Bus) -> Arc<Self>
    where
        U: Upstream,
        I: IntoIterator<Item = Arc<U>>,
    {
        let upstreams = upstreams
            .into_iter()
            .map(|u| u as UpstreamRef)
            .collect();
        Self::with_upstreams(upstreams, bus)
    }

    /// Creates an aggregator from type-erased upstream handles.
    ///
    /// Duplicate upstreams (same id) are attached once. Each upstream is
    /// retained and its value seeded with 0.
    pub fn with_upstreams(upstreams: Vec<UpstreamRef>, bus: Bus) -> Arc<Self> {
        let mut seen = HashSet::new();
        let upstreams: Vec<UpstreamRef> = upstreams
            .into_iter()
            .filter(|u| seen.insert(u.id()))
            .collect();
        let values = upstreams.iter().map(|u| (u.id(), 0)).collect();

        let me = Arc::new(Self {
            id: NodeId::mint(NodeKind::Aggregator),
            notifier: Notifier::new(),
            referrers: Referrers::default(),
            state: Mutex::new(AggregatorState {
                status: AggregatorStatus::Active,
                values,
                upstreams: upstreams.clone(),
            }),
            bus,
        });

        let listener: ListenerRef<Signal> = me.clone();
        for up in &upstreams {
            up.retain();
            up.notifier().attach(Arc::clone(&listener));
        }
        debug!(aggregator = %me.id, upstreams = upstreams.len(), "aggregator attached");
        me
    }

    /// Stable identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current lifecycle status.
    pub fn status(&self) -> AggregatorStatus {
        self.state.lock().status
    }

    /// True once [`Aggregator::terminate`] ran.
    pub fn is_terminated(&self) -> bool {
        self.status() == AggregatorStatus::Terminated
    }

    /// Current sum over all upstream values.
    pub fn combined(&self) -> i64 {
        reduce::sum(self.state.lock().values.values().copied())
    }

    /// Latest value stored for `upstream`, if it is one.
    pub fn value_of(&self, upstream: NodeId) -> Option<i64> {
        self.state.lock().values.get(&upstream).copied()
    }

    /// Ids of the upstreams this aggregator holds.
    pub fn upstream_ids(&self) -> Vec<NodeId> {
        self.state.lock().upstreams.iter().map(|u| u.id()).collect()
    }

    /// True if this aggregator holds `upstream`.
    pub fn holds(&self, upstream: NodeId) -> bool {
        self.state
            .lock()
            .upstreams
            .iter()
            .any(|u| u.id() == upstream)
    }

    /// Number of downstream nodes holding this aggregator.
    pub fn referrers(&self) -> usize {
        self.referrers.get()
    }

    /// Registers a downstream listener (see [`Notifier::attach`]).
    pub fn attach(&self, listener: ListenerRef<Signal>) -> bool {
        self.notifier.attach(listener)
    }

    /// Number of downstream listeners.
    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }

    /// Applies one upstream value and republishes the sum if it changed.
    pub async fn update(&self, signal: &Signal) -> Result<(), ListenError> {
        let combined = {
            let mut state = self.state.lock();
            if state.status == AggregatorStatus::Terminated {
                return Ok(());
            }
            let Some(slot) = state.values.get_mut(&signal.origin) else {
                debug!(aggregator = %self.id, origin = %signal.origin, "update from unknown upstream ignored");
                return Ok(());
            };
            if *slot == signal.value {
                return Ok(());
            }
            *slot = signal.value;
            reduce::sum(state.values.values().copied())
        };

        self.notifier.notify(&Signal::new(self.id, combined)).await
    }

    /// Runs the termination protocol once.
    ///
    /// Returns `None` if the aggregator was already terminated.
    pub fn terminate(&self) -> Option<Termination> {
        let upstreams = {
            let mut state = self.state.lock();
            if state.status == AggregatorStatus::Terminated {
                return None;
            }
            state.status = AggregatorStatus::Terminated;
            state.upstreams.clone()
        };

        let detached_listeners = self.notifier.detach_all();

        let mut released = Vec::with_capacity(upstreams.len());
        let mut stopped = Vec::new();
        for up in &upstreams {
            up.notifier().detach(self);
            let Released {
                referrers,
                stopped: did_stop,
            } = up.release();

            released.push(up.id());
            if did_stop {
                stopped.push(up.id());
            }
            self.bus.publish(
                Event::new(EventKind::UpstreamReleased)
                    .with_node(up.id().to_string())
                    .with_remaining(referrers),
            );
        }

        {
            let mut state = self.state.lock();
            state.values.clear();
            state.upstreams.clear();
        }

        debug!(
            aggregator = %self.id,
            detached_listeners,
            released = released.len(),
            stopped = stopped.len(),
            "aggregator terminated"
        );
        self.bus.publish(
            Event::new(EventKind::AggregatorTerminated)
                .with_node(self.id.to_string())
                .with_remaining(detached_listeners),
        );

        Some(Termination {
            aggregator: self.id,
            detached_listeners,
            released,
            stopped,
        })
    }
}

#[async_trait]
impl Listen<Signal> for Aggregator {
    async fn on_value(&self, value: &Signal) -> Result<(), ListenError> {
        self.update(value).await
    }

    fn name(&self) -> &str {
        "aggregator"
    }
}

impl Upstream for Aggregator {
    fn id(&self) -> NodeId {
        self.id
    }

    fn notifier(&self) -> &Notifier<Signal> {
        &self.notifier
    }

    fn retain(&self) -> usize {
        self.referrers.retain()
    }

    /// Aggregators are owned by whoever built them; releasing only counts.
    fn release(&self) -> Released {
        Released {
            referrers: self.referrers.release().unwrap_or(0),
            stopped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::nodes::source::{Source, SourceState};
    use crate::notify::ListenFn;

    fn source() -> Arc<Source> {
        Source::new(|| 1_i64, Duration::from_secs(1), Bus::default())
    }

    fn collector(seen: &Arc<Mutex<Vec<i64>>>) -> ListenerRef<Signal> {
        let seen = Arc::clone(seen);
        ListenFn::arc("collector", move |s: Signal| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(s.value);
                Ok::<_, ListenError>(())
            }
        })
    }

    #[tokio::test]
    async fn repeated_value_notifies_once() {
        let s = source();
        let agg = Aggregator::new(vec![s.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        agg.attach(collector(&seen));

        agg.update(&Signal::new(s.id(), 4)).await.unwrap();
        agg.update(&Signal::new(s.id(), 4)).await.unwrap();
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[tokio::test]
    async fn first_zero_matches_the_seed_and_is_suppressed() {
        let s = source();
        let agg = Aggregator::new(vec![s.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        agg.attach(collector(&seen));

        agg.update(&Signal::new(s.id(), 0)).await.unwrap();
        assert!(seen.lock().is_empty());
        assert_eq!(agg.value_of(s.id()), Some(0));
    }

    #[tokio::test]
    async fn sums_latest_value_per_upstream() {
        let (a, b, c) = (source(), source(), source());
        let agg = Aggregator::new(vec![a.clone(), b.clone(), c.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        agg.attach(collector(&seen));

        for (id, v) in [(a.id(), 3), (b.id(), 4), (a.id(), 10), (c.id(), -2), (b.id(), 1)] {
            agg.update(&Signal::new(id, v)).await.unwrap();
        }
        assert_eq!(agg.combined(), 9);
        assert_eq!(*seen.lock(), vec![3, 7, 14, 12, 9]);
    }

    #[tokio::test]
    async fn unknown_origin_is_ignored() {
        let s = source();
        let agg = Aggregator::new(vec![s.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        agg.attach(collector(&seen));

        let stranger = NodeId::mint(NodeKind::Source);
        agg.update(&Signal::new(stranger, 50)).await.unwrap();
        assert!(seen.lock().is_empty());
        assert_eq!(agg.value_of(stranger), None);
    }

    #[test]
    fn duplicate_upstreams_attach_once() {
        let s = source();
        let agg = Aggregator::new(vec![s.clone(), s.clone()], Bus::default());
        assert_eq!(agg.upstream_ids(), vec![s.id()]);
        assert!(agg.holds(s.id()));
        assert!(!agg.holds(source().id()));
        assert_eq!(s.referrers(), 1);
        assert_eq!(s.notifier().len(), 1);
    }

    #[test]
    fn shared_source_stops_with_its_last_aggregator() {
        let shared = source();
        let only_a = source();
        let a = Aggregator::new(vec![shared.clone(), only_a.clone()], Bus::default());
        let b = Aggregator::new(vec![shared.clone()], Bus::default());

        let report = a.terminate().expect("first termination");
        assert_eq!(report.released, vec![shared.id(), only_a.id()]);
        assert_eq!(report.stopped, vec![only_a.id()]);
        assert_ne!(shared.state(), SourceState::Stopped);
        assert_eq!(only_a.state(), SourceState::Stopped);

        let report = b.terminate().expect("first termination");
        assert_eq!(report.stopped, vec![shared.id()]);
        assert_eq!(shared.state(), SourceState::Stopped);
        assert_eq!(shared.referrers(), 0);
    }

    #[tokio::test]
    async fn terminate_unwinds_both_directions_and_is_idempotent() {
        let s = source();
        let agg = Aggregator::new(vec![s.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        agg.attach(collector(&seen));
        agg.update(&Signal::new(s.id(), 8)).await.unwrap();

        let report = agg.terminate().expect("terminated");
        assert_eq!(report.detached_listeners, 1);
        assert!(agg.is_terminated());
        assert_eq!(agg.listener_count(), 0);
        assert!(s.notifier().is_empty());
        assert!(agg.upstream_ids().is_empty());
        assert!(!agg.holds(s.id()));
        assert_eq!(agg.combined(), 0);

        agg.update(&Signal::new(s.id(), 9)).await.unwrap();
        assert_eq!(*seen.lock(), vec![8]);
        assert_eq!(agg.terminate(), None);
    }

    #[tokio::test]
    async fn aggregators_compose() {
        let (a, b) = (source(), source());
        let low = Aggregator::new(vec![a.clone(), b.clone()], Bus::default());
        let high = Aggregator::new(vec![low.clone()], Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        high.attach(collector(&seen));
        assert_eq!(low.referrers(), 1);

        low.update(&Signal::new(a.id(), 2)).await.unwrap();
        low.update(&Signal::new(b.id(), 5)).await.unwrap();
        assert_eq!(*seen.lock(), vec![2, 7]);

        let report = high.terminate().expect("terminated");
        assert_eq!(report.released, vec![low.id()]);
        assert!(report.stopped.is_empty());
        assert!(!low.is_terminated());
        assert_eq!(low.listener_count(), 0);
        assert_eq!(low.referrers(), 0);
    }
}
