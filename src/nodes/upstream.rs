//! # Upstream seam and referrer counting.
//!
//! An [`Upstream`] is anything an aggregator can listen to: it exposes a
//! [`Notifier`] of [`Signal`]s and counts how many downstream nodes currently
//! hold it. Attaching an aggregator or the top aggregator `retain`s; the
//! matching termination or removal `release`s. A [`Source`](crate::Source)
//! stops itself when its count drops back to zero; an
//! [`Aggregator`](crate::Aggregator) used as an upstream only counts.
//!
//! ```text
//! Aggregator::new / TopAggregator::new ──► up.retain() ──► referrers += 1
//! Aggregator::terminate                ──► up.release() ─► referrers -= 1
//! TopAggregator::remove_upstream       ──┘                 └─ 0 and Source? ─► Source::stop()
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::notify::Notifier;

use super::id::NodeId;
use super::signal::Signal;

/// Outcome of [`Upstream::release`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Released {
    /// Referrers left after this release.
    pub referrers: usize,
    /// True if this release stopped the upstream.
    pub stopped: bool,
}

/// A node aggregators can attach to.
pub trait Upstream: Send + Sync + 'static {
    /// Stable identifier (key of the aggregator's value map).
    fn id(&self) -> NodeId;

    /// Notifier the aggregator attaches to.
    fn notifier(&self) -> &Notifier<Signal>;

    /// Records one more referrer and returns the new count.
    fn retain(&self) -> usize;

    /// Drops one referrer.
    fn release(&self) -> Released;
}

/// Shared handle to an upstream.
pub type UpstreamRef = Arc<dyn Upstream>;

/// Saturating referrer counter.
#[derive(Debug, Default)]
pub(crate) struct Referrers(AtomicUsize);

impl Referrers {
    pub(crate) fn retain(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the new count, or `None` if it was already zero.
    pub(crate) fn release(&self) -> Option<usize> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }

    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}
