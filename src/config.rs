//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings used by the
//! [`Orchestrator`](crate::Orchestrator) to build and drive a graph.
//!
//! ## Sentinel values
//! - `aggregators = 0` → one less than `sources` (at least one)
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::ops::RangeInclusive;
use std::time::Duration;

/// Configuration for building and driving a graph.
///
/// ## Field semantics
/// - `sources`: number of [`Source`](crate::Source)s to create
/// - `aggregators`: number of [`Aggregator`](crate::Aggregator)s (`0` = `sources - 1`)
/// - `interval`: sleep between two production cycles of a source
/// - `kill_every`: delay between two scheduled aggregator terminations
/// - `value_min` / `value_max`: inclusive range of generated values
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `grace`: how long to wait for source loops to finish on shutdown
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of sources to create.
    pub sources: usize,

    /// Number of aggregators to create.
    ///
    /// - `0` = derived from `sources` (see [`Config::aggregator_count`])
    pub aggregators: usize,

    /// Fixed interval a source sleeps after each notification round.
    pub interval: Duration,

    /// Delay before each scheduled aggregator termination.
    pub kill_every: Duration,

    /// Smallest value a random generator may produce.
    pub value_min: i64,

    /// Largest value a random generator may produce.
    pub value_max: i64,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,

    /// Maximum time to wait for source loops after they were stopped.
    pub grace: Duration,
}

impl Config {
    /// Returns the number of aggregators to build.
    ///
    /// `aggregators = 0` means `sources - 1`, but never less than one.
    #[inline]
    pub fn aggregator_count(&self) -> usize {
        if self.aggregators == 0 {
            self.sources.saturating_sub(1).max(1)
        } else {
            self.aggregators
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the generator range, with swapped bounds put back in order.
    #[inline]
    pub fn value_range(&self) -> RangeInclusive<i64> {
        if self.value_min <= self.value_max {
            self.value_min..=self.value_max
        } else {
            self.value_max..=self.value_min
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `sources = 5`, `aggregators = 0` (→ 4)
    /// - `interval = 60s`, `kill_every = 30s`
    /// - values in `1..=100`
    /// - `bus_capacity = 1024`, `grace = 5s`
    fn default() -> Self {
        Self {
            sources: 5,
            aggregators: 0,
            interval: Duration::from_secs(60),
            kill_every: Duration::from_secs(30),
            value_min: 1,
            value_max: 100,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
