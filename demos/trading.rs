//! # Example: trading
//!
//! Builds a random graph of sources and aggregators, prints every median
//! decision and kills one aggregator at a time until none remain.
//!
//! ## Flow
//! ```text
//! Orchestrator::run()
//!     ├─► Source::start() for every source
//!     │     └─► publish(SourceStarted)
//!     ├─► every kill_every:
//!     │     ├─► Aggregator::terminate()
//!     │     │     ├─► publish(UpstreamReleased) per upstream
//!     │     │     ├─► publish(SourceStopped) for sources nobody holds
//!     │     │     └─► publish(AggregatorTerminated)
//!     │     └─► TopAggregator::remove_upstream()
//!     │           ├─► publish(UpstreamRemoved)
//!     │           └─► publish(DecisionEmitted) if the median moved
//!     └─► shutdown()
//!          ├─► publish(AllStoppedWithin)
//!          └─► exit
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=tradevisor=debug cargo run --example trading --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use tradevisor::{Config, LogWriter, Orchestrator, Subscribe};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Short intervals so the whole run fits in a few seconds.
    let cfg = Config {
        sources: 5,
        interval: Duration::from_millis(400),
        kill_every: Duration::from_secs(2),
        grace: Duration::from_secs(1),
        ..Config::default()
    };

    // 2. Print lifecycle events.
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    // 3. Build and drive the graph until every aggregator is gone.
    let orch = Orchestrator::builder(cfg)
        .with_subscribers(subs)
        .with_sink(|d: f64| println!("Trader median decision: {d:.1}"))
        .build();
    println!(
        "[trading] {} sources, {} aggregators",
        orch.sources().len(),
        orch.aggregators().len()
    );

    orch.run().await?;
    println!("[trading] done");
    Ok(())
}
