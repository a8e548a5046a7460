use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::{
    config::Config,
    events::Bus,
    nodes::{
        Aggregator, DecisionSink, RandomGenerator, Source, StdoutSink, TopAggregator, UpstreamRef,
    },
    subscribers::{Subscribe, SubscriberSet},
};

use super::orchestrator::Orchestrator;

/// Builder wiring sources, aggregators and the top aggregator into an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    sink: Arc<dyn DecisionSink>,
    layout: Option<Vec<Vec<usize>>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            sink: Arc::new(StdoutSink),
            layout: None,
        }
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the hook receiving median decisions (default: [`StdoutSink`]).
    pub fn with_sink(mut self, sink: impl DecisionSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Fixes which sources each aggregator listens to.
    ///
    /// `layout[i]` lists source indices for aggregator `i`; out-of-range
    /// indices are skipped. Without a layout, `Config::aggregator_count()`
    /// aggregators each pick a random non-empty sample of sources.
    pub fn with_layout(mut self, layout: Vec<Vec<usize>>) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Builds the graph. Sources are created idle; see [`Orchestrator::start`].
    ///
    /// Must be called from within a tokio runtime (subscriber workers are spawned here).
    pub fn build(self) -> Orchestrator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let sources: Vec<Arc<Source>> = (0..self.cfg.sources)
            .map(|_| {
                Source::new(
                    RandomGenerator::new(self.cfg.value_range()),
                    self.cfg.interval,
                    bus.clone(),
                )
            })
            .collect();

        let layout = self
            .layout
            .unwrap_or_else(|| random_layout(sources.len(), self.cfg.aggregator_count()));

        let aggregators: Vec<Arc<Aggregator>> = layout
            .iter()
            .map(|picks| {
                let upstreams = picks.iter().filter_map(|&i| sources.get(i).cloned());
                Aggregator::new(upstreams, bus.clone())
            })
            .collect();

        let top = TopAggregator::with_upstreams(
            aggregators
                .iter()
                .map(|a| Arc::clone(a) as UpstreamRef)
                .collect(),
            self.sink,
            bus.clone(),
        );

        debug!(
            sources = sources.len(),
            aggregators = aggregators.len(),
            "graph built"
        );
        Orchestrator::from_parts(self.cfg, bus, subs, sources, aggregators, top)
    }
}

/// `aggregators` random non-empty samples over `sources` indices.
fn random_layout(sources: usize, aggregators: usize) -> Vec<Vec<usize>> {
    if sources == 0 {
        return Vec::new();
    }
    let mut rng = rand::rng();
    (0..aggregators)
        .map(|_| {
            let amount = rng.random_range(1..=sources);
            let mut picks = rand::seq::index::sample(&mut rng, sources, amount).into_vec();
            picks.sort_unstable();
            picks
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_layout_samples_are_valid() {
        for _ in 0..50 {
            let layout = random_layout(5, 4);
            assert_eq!(layout.len(), 4);
            for picks in layout {
                assert!(!picks.is_empty() && picks.len() <= 5);
                assert!(picks.iter().all(|&i| i < 5));
                assert!(picks.windows(2).all(|w| w[0] < w[1]));
            }
        }
        assert!(random_layout(0, 3).is_empty());
    }
}
