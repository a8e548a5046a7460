//! # SubscriberSet: per-subscriber queues fed from the graph's event bus.
//!
//! Every node publishes to one [`Bus`]. An [`Orchestrator`](crate::Orchestrator)
//! turns its subscribers into a [`SubscriberSet`] and hands it to
//! [`SubscriberSet::forward`], which pumps bus events into the subscriber
//! queues until the orchestrator shuts down.
//!
//! ```text
//!   Bus ──recv──► forward task ──emit──┬─► [queue S1] ─► worker S1 ─► on_event()
//!                      ▲               └─► [queue SN] ─► worker SN ─► on_event()
//!                      │
//!           stop token (shutdown) ─► drain pending events, close queues,
//!                                    wait for the workers
//! ```
//!
//! - `emit` never waits on a subscriber. A full or closed queue drops the
//!   event for that subscriber only and publishes `SubscriberOverflow`,
//!   except for overflow events themselves.
//! - Each subscriber sees events in publication order.
//! - A panicking subscriber is reported as `SubscriberPanicked` and keeps
//!   receiving later events.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::{select, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out over a fixed group of subscribers.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Failure events (overflow, panic) are published on `bus`.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (queues, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let queue = Queue {
                    name: sub.name(),
                    tx,
                };
                (queue, spawn_worker(sub, rx, bus.clone()))
            })
            .unzip();

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Queues one event for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let is_overflow = event.kind == EventKind::SubscriberOverflow;

        let ev = Arc::new(event.clone());
        for queue in &self.queues {
            let reason = match queue.tx.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            warn!(subscriber = queue.name, reason, "dropped event");
            if !is_overflow {
                self.bus
                    .publish(Event::subscriber_overflow(queue.name, reason));
            }
        }
    }

    /// Spawns the task that forwards `rx` into this set.
    ///
    /// Once `stop` fires, events already on the bus are still delivered,
    /// then the queues close and the task waits for every worker.
    pub fn forward(
        self,
        mut rx: broadcast::Receiver<Event>,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                select! {
                    biased;
                    _ = stop.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => self.emit(&ev),
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber fan-out lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            loop {
                match rx.try_recv() {
                    Ok(ev) => self.emit(&ev),
                    Err(TryRecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber fan-out lagged");
                    }
                    Err(_) => break,
                }
            }
            debug!(subscribers = self.len(), "subscriber fan-out stopping");
            self.shutdown().await;
        })
    }

    /// Closes every queue and waits until the workers processed what was queued.
    pub async fn shutdown(self) {
        drop(self.queues);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let handled = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()))
                .catch_unwind()
                .await;
            if let Err(payload) = handled {
                let info = panic_message(payload.as_ref());
                warn!(subscriber = sub.name(), panic = %info, "subscriber panicked");
                bus.publish(Event::subscriber_panicked(sub.name(), info));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn fans_out_in_order_and_isolates_panics() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone(), Arc::new(Panicker)];
        let set = SubscriberSet::new(subs, bus);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::SourceStarted));
        set.emit(&Event::new(EventKind::SourceStopped));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock(),
            vec![EventKind::SourceStarted, EventKind::SourceStopped]
        );

        let panicked = rx.recv().await.unwrap();
        assert_eq!(panicked.kind, EventKind::SubscriberPanicked);
        assert_eq!(panicked.node.as_deref(), Some("panicker"));
        assert_eq!(panicked.reason.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn stopped_forwarder_delivers_pending_events_then_exits() {
        let bus = Bus::default();
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus.clone());

        let stop = CancellationToken::new();
        let handle = set.forward(bus.subscribe(), stop.clone());

        bus.publish(Event::new(EventKind::SourceStarted));
        bus.publish(Event::new(EventKind::DecisionEmitted));
        bus.publish(Event::new(EventKind::AllStoppedWithin));
        stop.cancel();
        handle.await.unwrap();

        assert_eq!(
            *rec.seen.lock(),
            vec![
                EventKind::SourceStarted,
                EventKind::DecisionEmitted,
                EventKind::AllStoppedWithin
            ]
        );
        // The worker is gone and no longer holds the subscriber.
        assert_eq!(Arc::strong_count(&rec), 1);
    }
}
