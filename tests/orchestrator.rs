//! Orchestrator runs on a paused clock: the whole termination schedule
//! completes instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tradevisor::{Config, Event, EventKind, Orchestrator, SourceState, Subscribe};

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn cfg() -> Config {
    Config {
        sources: 4,
        interval: Duration::from_secs(10),
        kill_every: Duration::from_secs(30),
        grace: Duration::from_secs(5),
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn fixed_layout_is_torn_down_in_order() {
    let rec = Arc::new(Recorder::default());
    let decisions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&decisions);

    let orch = Orchestrator::builder(cfg())
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .with_sink(move |d: f64| sink.lock().push(d))
        .with_layout(vec![vec![0, 1], vec![1, 2], vec![2, 3]])
        .build();
    assert_eq!(orch.aggregators().len(), 3);
    assert_eq!(orch.top().upstream_count(), 3);

    let sources = orch.sources().to_vec();
    let top = Arc::clone(orch.top());
    orch.run().await.unwrap();

    assert!(sources.iter().all(|s| s.state() == SourceState::Stopped));
    assert!(sources.iter().all(|s| s.referrers() == 0));
    assert_eq!(top.upstream_count(), 0);
    assert!(!decisions.lock().is_empty());

    // `run` returns only after the subscriber has handled every event and its
    // worker has exited.
    assert_eq!(Arc::strong_count(&rec), 1);
    let kinds = rec.kinds.lock().clone();
    let count = |k: EventKind| kinds.iter().filter(|x| **x == k).count();
    assert_eq!(count(EventKind::SourceStarted), 4);
    assert_eq!(count(EventKind::SourceStopped), 4);
    assert_eq!(count(EventKind::AggregatorTerminated), 3);
    assert_eq!(count(EventKind::UpstreamRemoved), 3);
    assert_eq!(count(EventKind::AllStoppedWithin), 1);
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}

#[tokio::test(start_paused = true)]
async fn default_layout_uses_one_aggregator_less_than_sources() {
    let orch = Orchestrator::builder(cfg()).with_sink(|_d: f64| {}).build();
    assert_eq!(orch.sources().len(), 4);
    assert_eq!(orch.aggregators().len(), 3);
    for agg in orch.aggregators() {
        let held = agg.upstream_ids();
        assert!(!held.is_empty() && held.len() <= 4);
    }
    orch.run().await.unwrap();
}
