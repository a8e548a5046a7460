//! # Notifier: one-to-many awaited delivery.
//!
//! [`Notifier`] is the attach/detach/notify primitive shared by every node of
//! the graph.
//!
//! ## Rules
//! - A listener appears **at most once** (identity = address of the shared value).
//! - `notify` delivers **sequentially, in registration order**, awaiting each
//!   listener before moving on to the next one. The caller is therefore paced
//!   by its slowest listener.
//! - `notify` iterates a **snapshot** taken when it starts: a listener that
//!   detaches itself (or another listener) mid-delivery only affects later
//!   rounds.
//! - The first listener error ends the round and is returned as-is.
//!
//! ```text
//! notify(v) ──► snapshot [L1, L2, L3]
//!                 ├─► L1.on_value(&v).await
//!                 ├─► L2.on_value(&v).await   (L2 detaches L3 here)
//!                 └─► L3.on_value(&v).await   (still called: snapshot)
//! notify(w) ──► snapshot [L1, L2]
//! ```

use parking_lot::RwLock;

use crate::error::ListenError;
use crate::notify::listen::{identity, Listen, ListenerRef};

/// Ordered set of listeners with awaited fan-out.
pub struct Notifier<T> {
    listeners: RwLock<Vec<ListenerRef<T>>>,
}

impl<T> Notifier<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a notifier with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Registers `listener` unless it is already registered.
    ///
    /// Returns `false` when the listener was already present.
    pub fn attach(&self, listener: ListenerRef<T>) -> bool {
        let mut listeners = self.listeners.write();
        let id = identity(listener.as_ref());
        if listeners.iter().any(|l| identity(l.as_ref()) == id) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregisters `listener` if present.
    ///
    /// Returns `false` when the listener was not registered.
    pub fn detach(&self, listener: &dyn Listen<T>) -> bool {
        let id = identity(listener);
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| identity(l.as_ref()) != id);
        listeners.len() != before
    }

    /// Unregisters every listener and returns how many were removed.
    pub fn detach_all(&self) -> usize {
        let mut listeners = self.listeners.write();
        let n = listeners.len();
        listeners.clear();
        n
    }

    /// True if `listener` is currently registered.
    pub fn contains(&self, listener: &dyn Listen<T>) -> bool {
        let id = identity(listener);
        self.listeners
            .read()
            .iter()
            .any(|l| identity(l.as_ref()) == id)
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// True if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Copy of the current listener list, in registration order.
    pub fn snapshot(&self) -> Vec<ListenerRef<T>> {
        self.listeners.read().clone()
    }

    /// Delivers `value` to every listener registered when the call starts.
    ///
    /// With no listeners this returns `Ok(())` immediately.
    pub async fn notify(&self, value: &T) -> Result<(), ListenError> {
        for listener in self.snapshot() {
            if let Err(e) = listener.on_value(value).await {
                tracing::debug!(listener = listener.name(), error = %e, "delivery failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<T> Default for Notifier<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
