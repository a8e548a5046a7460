//! # Listener abstraction.
//!
//! [`Listen`] is the single-method capability "receives a value of type `T`".
//! Sources, aggregators and the top aggregator all speak it: a
//! [`Notifier`](crate::Notifier) holds [`ListenerRef`]s and awaits each of them
//! in turn.
//!
//! Listener identity is the address of the shared value behind the handle, so
//! the same `Arc` attached twice is one listener, while two separately
//! allocated listeners are always distinct.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ListenError;

/// # Asynchronous receiver of values.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tradevisor::{Listen, ListenError, Signal};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Listen<Signal> for Printer {
///     async fn on_value(&self, value: &Signal) -> Result<(), ListenError> {
///         println!("{} -> {}", value.origin, value.value);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Listen<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    /// Receives one value.
    ///
    /// Returning an error stops the delivery round in progress and hands the
    /// error to whoever called `notify`.
    async fn on_value(&self, value: &T) -> Result<(), ListenError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a listener.
pub type ListenerRef<T> = Arc<dyn Listen<T>>;

/// Address used as listener identity.
#[inline]
pub(crate) fn identity<T>(listener: &dyn Listen<T>) -> *const ()
where
    T: Send + Sync + 'static,
{
    std::ptr::from_ref(listener).cast::<()>()
}
