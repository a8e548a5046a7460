//! Error types used by the tradevisor graph and its orchestrator.
//!
//! This module defines three error enums:
//!
//! - [`ListenError`] - failures raised by a listener while a value is delivered.
//! - [`AggregateError`] - failures of a reducer (median over no decisions).
//! - [`RuntimeError`] - failures of the orchestration runtime itself.
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` (human-readable details).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by listeners during delivery.
///
/// A listener error stops the [`Notifier::notify`](crate::Notifier::notify) call
/// that observed it and is returned to whoever drives that call (usually a
/// [`Source`](crate::Source) production loop).
///
/// A Source treats the two kinds differently:
/// - `Fail`: the round is lost, the loop publishes `DeliveryFailed` and
///   produces again after its interval;
/// - `Fatal`: the loop ends, publishes `SourceFailed` and the source stops.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenError {
    /// Delivery failed for this round only.
    #[error("delivery failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable failure; the producing loop ends.
    #[error("fatal delivery error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl ListenError {
    /// Shorthand for [`ListenError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ListenError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`ListenError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        ListenError::Fatal {
            error: error.into(),
        }
    }

    /// True if the producing loop must end.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ListenError::Fatal { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tradevisor::ListenError;
    ///
    /// assert_eq!(ListenError::fail("boom").as_label(), "listen_failed");
    /// assert_eq!(ListenError::fatal("boom").as_label(), "listen_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenError::Fail { .. } => "listen_failed",
            ListenError::Fatal { .. } => "listen_fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ListenError::Fail { error } => format!("error: {error}"),
            ListenError::Fatal { error } => format!("fatal: {error}"),
        }
    }
}

/// # Errors produced by reducers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    /// The reducer was asked for a statistic over zero contributing values.
    #[error("cannot reduce an empty set of decisions")]
    Empty,
}

impl AggregateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AggregateError::Empty => "aggregate_empty",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            AggregateError::Empty => "no upstream decisions to reduce".to_string(),
        }
    }
}

/// # Errors produced by the orchestration runtime.
///
/// These represent failures while driving the graph, such as a production loop
/// that did not wind down within the configured grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Grace period was exceeded; some source loops were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Sources whose loops did not finish in time.
        stuck: Vec<String>,
    },

    /// A source production loop panicked.
    #[error("source {source_id} panicked")]
    SourcePanicked {
        /// Identifier of the panicking source.
        source_id: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tradevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::SourcePanicked { .. } => "runtime_source_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck sources={stuck:?}")
            }
            RuntimeError::SourcePanicked { source_id } => {
                format!("production loop of {source_id} panicked")
            }
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ListenError::fatal("x").as_label(), "listen_fatal");
        assert_eq!(AggregateError::Empty.as_label(), "aggregate_empty");
        let err = RuntimeError::SourcePanicked {
            source_id: "source-1".into(),
        };
        assert_eq!(err.as_label(), "runtime_source_panicked");
        assert_eq!(err.as_message(), "production loop of source-1 panicked");
    }

    #[test]
    fn only_fatal_ends_a_loop() {
        assert!(ListenError::fatal("gone").is_fatal());
        assert!(!ListenError::fail("busy").is_fatal());
    }

    #[test]
    fn panic_payload_text() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }

    #[test]
    fn display_carries_details() {
        assert_eq!(
            ListenError::fail("queue closed").to_string(),
            "delivery failed: queue closed"
        );
        assert_eq!(
            AggregateError::Empty.to_string(),
            "cannot reduce an empty set of decisions"
        );
    }
}
