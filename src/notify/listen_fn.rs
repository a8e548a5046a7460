//! # Function-backed listener (`ListenFn`)
//!
//! [`ListenFn`] wraps a closure `F: Fn(T) -> Fut`, producing a fresh future per
//! delivered value. The closure receives an owned clone of the value, so the
//! future it returns may outlive the notifier's borrow.
//!
//! ## Example
//! ```rust
//! use tradevisor::{ListenError, ListenFn, ListenerRef, Signal};
//!
//! let l: ListenerRef<Signal> = ListenFn::arc("printer", |s: Signal| async move {
//!     println!("{} -> {}", s.origin, s.value);
//!     Ok::<_, ListenError>(())
//! });
//!
//! assert_eq!(l.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ListenError;
use crate::notify::listen::Listen;

/// Function-backed listener implementation.
#[derive(Debug)]
pub struct ListenFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenFn<F> {
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`ListenFn::arc`] when you immediately need a
    /// [`ListenerRef`](crate::ListenerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<T, F, Fut> Listen<T> for ListenFn<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenError>> + Send + 'static,
{
    async fn on_value(&self, value: &T) -> Result<(), ListenError> {
        (self.f)(value.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
