//! # Notification primitives.
//!
//! This module provides the one-to-many delivery machinery every node is built on:
//! - [`Listen`] - trait for receiving a value of type `T`
//! - [`ListenFn`] - closure-backed listener
//! - [`ListenerRef`] - shared handle to a listener (`Arc<dyn Listen<T>>`)
//! - [`Notifier`] - attach/detach/notify over an ordered listener set

mod listen;
mod listen_fn;
mod notifier;

pub use listen::{Listen, ListenerRef};
pub use listen_fn::ListenFn;
pub use notifier::Notifier;
