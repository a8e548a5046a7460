//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for demos.
//!
//! ## Example output
//! ```text
//! [source-started] node="source-1"
//! [decision] node="top-9" value=42.5
//! [aggregator-terminated] node="aggregator-6" listeners=1
//! [upstream-released] node="source-2" referrers=0
//! [source-stopped] node="source-2"
//! [upstream-removed] node="aggregator-6" remaining=3
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let node = e.node.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::SourceStarted => println!("[source-started] node={node:?}"),
            EventKind::SourceStopped => println!("[source-stopped] node={node:?}"),
            EventKind::SourceFailed => {
                println!("[source-failed] node={node:?} err={:?}", e.reason);
            }
            EventKind::DeliveryFailed => {
                println!("[delivery-failed] node={node:?} err={:?}", e.reason);
            }
            EventKind::AggregatorTerminated => {
                println!(
                    "[aggregator-terminated] node={node:?} listeners={:?}",
                    e.remaining
                );
            }
            EventKind::UpstreamReleased => {
                println!("[upstream-released] node={node:?} referrers={:?}", e.remaining);
            }
            EventKind::UpstreamRemoved => {
                println!("[upstream-removed] node={node:?} remaining={:?}", e.remaining);
            }
            EventKind::DecisionEmitted => {
                println!("[decision] node={node:?} value={:?}", e.value);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] signal={:?}", e.reason);
            }
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded]"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={node} reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={node} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
