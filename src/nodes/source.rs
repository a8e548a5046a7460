//! # Source: autonomous periodic producer.
//!
//! A [`Source`] owns a production loop that, while running, generates one value,
//! notifies its listeners with `Signal { origin: self.id, value }` and sleeps
//! for a fixed interval.
//!
//! ## Lifecycle
//! ```text
//!   Idle ──start()──► Running ──stop()──► Stopped
//!     │                                      ▲
//!     └────────────────stop()────────────────┘
//! ```
//! - `start` while `Running` or `Stopped` is a no-op: a source is single-use.
//! - `stop` while `Stopped` is a no-op.
//! - `stop` does not wait for an in-flight delivery; it only guarantees that no
//!   new production cycle begins.
//!
//! ## Production loop
//! ```text
//! loop {
//!   ├─► cancelled? ─► exit Ok
//!   ├─► value = generator.next_value()
//!   ├─► notifier.notify(Signal { id, value }).await
//!   │     ├─ Err(Fail)  ─► publish DeliveryFailed, keep going
//!   │     └─ Err(Fatal) ─► exit Err
//!   └─► sleep(interval)  (cancellable)
//! }
//! ```
//! A fatal listener error or a listener panic ends the loop: the source moves
//! to `Stopped` and publishes `SourceFailed`, and [`Source::join`] returns the
//! failure. Other sources are unaffected.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{panic_message, ListenError};
use crate::events::{Bus, Event, EventKind};
use crate::notify::{ListenerRef, Notifier};

use super::generator::Generate;
use super::id::{NodeId, NodeKind};
use super::signal::Signal;
use super::upstream::{Referrers, Released, Upstream};

pub(crate) type LoopHandle = JoinHandle<Result<(), ListenError>>;

/// Observable lifecycle state of a [`Source`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceState {
    /// Created, never started.
    Idle,
    /// Production loop active.
    Running,
    /// Stopped for good.
    Stopped,
}

enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        join: Option<LoopHandle>,
    },
    Stopped {
        join: Option<LoopHandle>,
    },
}

/// Periodic producer shared by any number of aggregators.
pub struct Source {
    id: NodeId,
    interval: Duration,
    generator: Box<dyn Generate>,
    notifier: Notifier<Signal>,
    referrers: Referrers,
    lifecycle: Mutex<Lifecycle>,
    bus: Bus,
}

impl Source {
    /// Creates an idle source.
    pub fn new(generator: impl Generate, interval: Duration, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::mint(NodeKind::Source),
            interval,
            generator: Box::new(generator),
            notifier: Notifier::new(),
            referrers: Referrers::default(),
            lifecycle: Mutex::new(Lifecycle::Idle),
            bus,
        })
    }

    /// Stable identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Sleep between two production cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SourceState {
        match &*self.lifecycle.lock() {
            Lifecycle::Idle => SourceState::Idle,
            Lifecycle::Running { .. } => SourceState::Running,
            Lifecycle::Stopped { .. } => SourceState::Stopped,
        }
    }

    /// True while the production loop is active.
    pub fn is_running(&self) -> bool {
        self.state() == SourceState::Running
    }

    /// Number of aggregators currently holding this source.
    pub fn referrers(&self) -> usize {
        self.referrers.get()
    }

    /// Registers a listener (see [`Notifier::attach`]).
    pub fn attach(&self, listener: ListenerRef<Signal>) -> bool {
        self.notifier.attach(listener)
    }

    /// Spawns the production loop.
    ///
    /// Returns `false` (no-op) unless the source was `Idle`.
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return false;
            }

            let cancel = CancellationToken::new();
            let me = Arc::clone(self);
            let token = cancel.clone();
            let join = tokio::spawn(async move {
                match AssertUnwindSafe(me.produce(&token)).catch_unwind().await {
                    Ok(res) => {
                        if let Err(e) = &res {
                            me.fail(e.as_message());
                        }
                        res
                    }
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        me.fail(format!("listener panicked: {reason}"));
                        std::panic::resume_unwind(payload)
                    }
                }
            });

            *lifecycle = Lifecycle::Running {
                cancel,
                join: Some(join),
            };
        }

        debug!(source = %self.id, interval = ?self.interval, "source started");
        self.bus
            .publish(Event::new(EventKind::SourceStarted).with_node(self.id.to_string()));
        true
    }

    /// Stops the source for good.
    ///
    /// Returns `false` (no-op) if it was already stopped.
    pub fn stop(&self) -> bool {
        let stopped = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped { join: None }) {
                Lifecycle::Idle => true,
                Lifecycle::Running { cancel, join } => {
                    cancel.cancel();
                    *lifecycle = Lifecycle::Stopped { join };
                    true
                }
                stopped @ Lifecycle::Stopped { .. } => {
                    *lifecycle = stopped;
                    false
                }
            }
        };

        if stopped {
            debug!(source = %self.id, "source stopped");
            self.bus
                .publish(Event::new(EventKind::SourceStopped).with_node(self.id.to_string()));
        }
        stopped
    }

    /// Runs one production cycle: generate a value and notify every listener.
    ///
    /// Does nothing once the source is stopped.
    pub async fn produce_once(&self) -> Result<(), ListenError> {
        if self.state() == SourceState::Stopped {
            return Ok(());
        }
        let value = self.generator.next_value();
        self.notifier.notify(&Signal::new(self.id, value)).await
    }

    /// Waits for the production loop to finish and returns its outcome.
    ///
    /// Returns `Ok(())` if the loop was never started or was already joined.
    /// A panicking loop is reported as [`ListenError::Fatal`].
    pub async fn join(&self) -> Result<(), ListenError> {
        let Some(handle) = self.take_loop() else {
            return Ok(());
        };
        match handle.await {
            Ok(res) => res,
            Err(je) => {
                warn!(source = %self.id, error = %je, "production loop panicked");
                Err(ListenError::fatal(format!("production loop of {} panicked", self.id)))
            }
        }
    }

    /// Takes the loop handle out, leaving the lifecycle state untouched.
    pub(crate) fn take_loop(&self) -> Option<LoopHandle> {
        match &mut *self.lifecycle.lock() {
            Lifecycle::Idle => None,
            Lifecycle::Running { join, .. } | Lifecycle::Stopped { join } => join.take(),
        }
    }

    async fn produce(&self, cancel: &CancellationToken) -> Result<(), ListenError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.produce_once().await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(source = %self.id, error = %e, "round lost; producing again next cycle");
                    self.bus.publish(
                        Event::new(EventKind::DeliveryFailed)
                            .with_node(self.id.to_string())
                            .with_reason(e.as_message()),
                    );
                }
            }

            select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = time::sleep(self.interval) => {}
            }
        }
    }
}

impl Source {
    /// Retires the source after its loop ended abnormally.
    fn fail(&self, reason: String) {
        warn!(source = %self.id, %reason, "production loop failed");
        self.bus.publish(
            Event::new(EventKind::SourceFailed)
                .with_node(self.id.to_string())
                .with_reason(reason),
        );
        self.stop();
    }
}

impl Upstream for Source {
    fn id(&self) -> NodeId {
        self.id
    }

    fn notifier(&self) -> &Notifier<Signal> {
        &self.notifier
    }

    fn retain(&self) -> usize {
        self.referrers.retain()
    }

    /// The last release stops the source.
    fn release(&self) -> Released {
        match self.referrers.release() {
            Some(0) => Released {
                referrers: 0,
                stopped: self.stop(),
            },
            Some(n) => Released {
                referrers: n,
                stopped: false,
            },
            None => Released {
                referrers: 0,
                stopped: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::notify::ListenFn;

    fn counting() -> impl Generate {
        let next = AtomicI64::new(1);
        move || next.fetch_add(1, Ordering::Relaxed)
    }

    fn collector(seen: &Arc<Mutex<Vec<Signal>>>) -> ListenerRef<Signal> {
        let seen = Arc::clone(seen);
        ListenFn::arc("collector", move |s: Signal| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(s);
                Ok::<_, ListenError>(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn produces_then_sleeps_until_stopped() {
        let source = Source::new(counting(), Duration::from_secs(60), Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        source.attach(collector(&seen));

        assert!(source.start());
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert!(source.stop());
        source.join().await.unwrap();

        let values: Vec<i64> = seen.lock().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(seen.lock().iter().all(|s| s.origin == source.id()));
        assert_eq!(source.state(), SourceState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let source = Source::new(counting(), Duration::from_secs(10), Bus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        source.attach(collector(&seen));

        assert!(source.start());
        assert!(!source.start());
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert!(source.stop());
        assert!(!source.stop());
        source.join().await.unwrap();

        // One loop only: 0s, 10s, 20s.
        assert_eq!(seen.lock().len(), 3);
        assert!(!source.start());
        assert_eq!(source.state(), SourceState::Stopped);
    }

    #[tokio::test]
    async fn stopping_idle_source_retires_it() {
        let source = Source::new(|| 1_i64, Duration::from_secs(1), Bus::default());
        assert_eq!(source.state(), SourceState::Idle);
        assert!(source.stop());
        assert!(!source.start());
        assert_eq!(source.produce_once().await, Ok(()));
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_listener_error_ends_only_this_loop() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let failing = Source::new(|| 1_i64, Duration::from_secs(1), bus.clone());
        let healthy = Source::new(|| 2_i64, Duration::from_secs(1), bus.clone());

        failing.attach(ListenFn::arc("broken", |_s: Signal| async {
            Err::<(), _>(ListenError::fatal("sink closed"))
        }));
        let seen = Arc::new(Mutex::new(Vec::new()));
        healthy.attach(collector(&seen));

        failing.start();
        healthy.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(failing.join().await, Err(ListenError::fatal("sink closed")));
        assert_eq!(failing.state(), SourceState::Stopped);
        assert!(healthy.is_running());
        assert_eq!(seen.lock().len(), 3);

        assert!(drain(&mut rx).contains(&EventKind::SourceFailed));
        healthy.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_round_is_retried_next_cycle() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let source = Source::new(counting(), Duration::from_secs(1), bus.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        source.attach(ListenFn::arc("flaky", move |s: Signal| {
            let sink = Arc::clone(&sink);
            async move {
                if s.value == 1 {
                    return Err(ListenError::fail("transient"));
                }
                sink.lock().push(s.value);
                Ok(())
            }
        }));

        source.start();
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert!(source.is_running());
        assert!(source.stop());
        source.join().await.unwrap();

        // 0s fails, then 1s..5s are delivered.
        assert_eq!(*seen.lock(), vec![2, 3, 4, 5, 6]);
        let kinds = drain(&mut rx);
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::DeliveryFailed).count(),
            1
        );
        assert!(!kinds.contains(&EventKind::SourceFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_stops_the_source() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let source = Source::new(|| 1_i64, Duration::from_secs(1), bus.clone());
        source.attach(ListenFn::arc("explodes", |_s: Signal| async {
            if true {
                panic!("listener blew up");
            }
            Ok::<_, ListenError>(())
        }));

        source.start();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(source.state(), SourceState::Stopped);
        assert!(!source.is_running());
        assert!(matches!(source.join().await, Err(ListenError::Fatal { .. })));
        let kinds = drain(&mut rx);
        assert_eq!(
            kinds,
            vec![
                EventKind::SourceStarted,
                EventKind::SourceFailed,
                EventKind::SourceStopped
            ]
        );
    }

    #[test]
    fn last_release_stops() {
        let source = Source::new(|| 1_i64, Duration::from_secs(1), Bus::default());
        assert_eq!(source.retain(), 1);
        assert_eq!(source.retain(), 2);
        assert_eq!(
            source.release(),
            Released {
                referrers: 1,
                stopped: false
            }
        );
        assert_ne!(source.state(), SourceState::Stopped);
        assert_eq!(
            source.release(),
            Released {
                referrers: 0,
                stopped: true
            }
        );
        assert_eq!(source.state(), SourceState::Stopped);
    }
}
