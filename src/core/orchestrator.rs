//! # Orchestrator: drives a graph through its termination schedule.
//!
//! The [`Orchestrator`] owns the sources, the aggregators and the top
//! aggregator built by [`OrchestratorBuilder`](crate::OrchestratorBuilder),
//! plus the event bus and the subscriber fan-out.
//!
//! ## Run
//! ```text
//! run()
//!   ├─► start(): Source::start() for every source
//!   ├─► loop while aggregators remain:
//!   │     ├─ shutdown signal      ─► publish ShutdownRequested, break
//!   │     └─ sleep(kill_every)    ─► kill_aggregator(0)
//!   └─► shutdown():
//!         ├─ kill every remaining aggregator
//!         ├─ stop every source
//!         ├─ wait up to `grace` for source loops
//!         │    ├─ Ok     ─► publish AllStoppedWithin
//!         │    └─ Err    ─► publish GraceExceeded, RuntimeError::GraceExceeded
//!         └─ stop the subscriber fan-out (pending events are still delivered)
//! ```
//!
//! ## Killing an aggregator
//! ```text
//! kill_aggregator(i)
//!   ├─► Aggregator::terminate()          (detach, release sources)
//!   ├─► TopAggregator::remove_upstream() (drop its decision)
//!   └─► forget it
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    nodes::{Aggregator, NodeId, Source, Termination, TopAggregator},
    subscribers::{Subscribe, SubscriberSet},
};

use super::builder::OrchestratorBuilder;
use super::shutdown;

/// Owns a graph and drives its lifecycle.
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    sources: Vec<Arc<Source>>,
    aggregators: Vec<Arc<Aggregator>>,
    top: Arc<TopAggregator>,
    fanout_stop: CancellationToken,
    fanout: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Builds a random graph from `cfg` with the given subscribers and the
    /// default stdout sink.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        OrchestratorBuilder::new(cfg)
            .with_subscribers(subscribers)
            .build()
    }

    /// Returns a builder for the given configuration.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        sources: Vec<Arc<Source>>,
        aggregators: Vec<Arc<Aggregator>>,
        top: Arc<TopAggregator>,
    ) -> Self {
        let fanout_stop = CancellationToken::new();
        let fanout =
            (!subs.is_empty()).then(|| subs.forward(bus.subscribe(), fanout_stop.clone()));
        Self {
            cfg,
            bus,
            sources,
            aggregators,
            top,
            fanout_stop,
            fanout,
        }
    }

    /// Configuration this graph was built from.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared by every node.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// All sources, including stopped ones.
    pub fn sources(&self) -> &[Arc<Source>] {
        &self.sources
    }

    /// Aggregators that have not been killed yet.
    pub fn aggregators(&self) -> &[Arc<Aggregator>] {
        &self.aggregators
    }

    /// The top aggregator.
    pub fn top(&self) -> &Arc<TopAggregator> {
        &self.top
    }

    /// Starts every idle source and returns how many were started.
    pub fn start(&self) -> usize {
        self.sources.iter().filter(|s| s.start()).count()
    }

    /// Terminates the aggregator at `index`, removes its decision from the
    /// top aggregator and forgets it.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn kill_aggregator(&mut self, index: usize) -> Option<Termination> {
        let aggregator = Arc::clone(self.aggregators.get(index)?);

        let report = aggregator.terminate();
        self.top.remove_upstream(aggregator.as_ref());
        self.aggregators.remove(index);

        let remaining = self.aggregators.len();
        info!(aggregator = %aggregator.id(), remaining, "aggregator killed");
        if remaining == 0 {
            info!("no aggregators remain; closing");
        }
        report
    }

    /// Runs the termination schedule until no aggregator remains or a
    /// shutdown signal arrives, then shuts the graph down.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        self.start();

        let signal = shutdown_requested();
        tokio::pin!(signal);

        while !self.aggregators.is_empty() {
            select! {
                name = &mut signal => {
                    info!(signal = name, "shutdown requested");
                    self.bus
                        .publish(Event::new(EventKind::ShutdownRequested).with_reason(name));
                    break;
                }
                _ = time::sleep(self.cfg.kill_every) => {
                    self.kill_aggregator(0);
                }
            }
        }

        self.shutdown().await
    }

    /// Kills every remaining aggregator, stops every source and waits up to
    /// `Config::grace` for their loops to finish.
    ///
    /// Subscribers have handled every event published so far, including the
    /// final `AllStoppedWithin` or `GraceExceeded`, when this returns.
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        let res = self.stop_sources().await;
        self.close_fanout().await;
        res
    }

    async fn close_fanout(&mut self) {
        self.fanout_stop.cancel();
        if let Some(handle) = self.fanout.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "subscriber fan-out ended abnormally");
            }
        }
    }

    async fn stop_sources(&mut self) -> Result<(), RuntimeError> {
        while self.kill_aggregator(0).is_some() {}
        for source in &self.sources {
            source.stop();
        }

        let mut loops: Vec<(NodeId, _)> = self
            .sources
            .iter()
            .filter_map(|s| s.take_loop().map(|h| (s.id(), h)))
            .collect();

        let grace = self.cfg.grace;
        let all = futures::future::join_all(loops.iter_mut().map(|(_, h)| h));
        let outcome = time::timeout(grace, all).await;
        match outcome {
            Ok(results) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                let mut panicked = None;
                for ((id, _), res) in loops.iter().zip(results) {
                    match res {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(source = %id, error = %e, "source loop ended with error");
                        }
                        Err(je) => {
                            warn!(source = %id, error = %je, "source loop panicked");
                            panicked.get_or_insert_with(|| id.to_string());
                        }
                    }
                }
                match panicked {
                    Some(source_id) => Err(RuntimeError::SourcePanicked { source_id }),
                    None => Ok(()),
                }
            }
            Err(_) => {
                let stuck: Vec<String> = loops
                    .iter()
                    .filter(|(_, h)| !h.is_finished())
                    .map(|(id, _)| id.to_string())
                    .collect();
                for (_, h) in &loops {
                    h.abort();
                }
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Name of the OS signal received; never completes if handlers cannot be installed.
async fn shutdown_requested() -> &'static str {
    match shutdown::wait_for_shutdown_signal().await {
        Ok(name) => name,
        Err(e) => {
            warn!(error = %e, "cannot install shutdown signal handlers");
            std::future::pending().await
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.fanout_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::nodes::SourceState;

    fn cfg() -> Config {
        Config {
            sources: 3,
            aggregators: 0,
            interval: Duration::from_secs(60),
            kill_every: Duration::from_secs(30),
            grace: Duration::from_secs(1),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn kill_keeps_shared_sources_running() {
        let mut orch = Orchestrator::builder(cfg())
            .with_sink(|_d: f64| {})
            .with_layout(vec![vec![0, 1], vec![1, 2]])
            .build();
        assert_eq!(orch.start(), 3);

        let first = orch.aggregators()[0].id();
        let report = orch.kill_aggregator(0).expect("killed");
        assert_eq!(report.aggregator, first);
        assert_eq!(report.stopped, vec![orch.sources()[0].id()]);

        assert_eq!(orch.sources()[0].state(), SourceState::Stopped);
        assert!(orch.sources()[1].is_running());
        assert!(orch.sources()[2].is_running());
        assert_eq!(orch.top().upstream_count(), 1);
        assert!(orch.kill_aggregator(5).is_none());

        orch.shutdown().await.unwrap();
        assert!(orch
            .sources()
            .iter()
            .all(|s| s.state() == SourceState::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn run_kills_every_aggregator_then_stops() {
        let decisions = Arc::new(Mutex::new(Vec::new()));
        let sink_decisions = Arc::clone(&decisions);
        let orch = Orchestrator::builder(cfg())
            .with_sink(move |d: f64| sink_decisions.lock().push(d))
            .build();

        let top = Arc::clone(orch.top());
        let sources: Vec<_> = orch.sources().to_vec();
        assert_eq!(orch.aggregators().len(), 2);

        orch.run().await.unwrap();

        assert!(!decisions.lock().is_empty());
        assert_eq!(top.upstream_count(), 0);
        assert!(top.decisions().is_empty());
        assert!(sources.iter().all(|s| s.state() == SourceState::Stopped));
    }
}
