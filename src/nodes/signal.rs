//! # Signal: the value flowing through the graph.

use super::id::NodeId;

/// A value tagged with the node that produced it.
///
/// Sources emit `(self id, generated value)`; aggregators emit
/// `(self id, combined value)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signal {
    /// Node that produced the value.
    pub origin: NodeId,
    /// Produced value.
    pub value: i64,
}

impl Signal {
    /// Creates a new signal.
    #[inline]
    pub fn new(origin: NodeId, value: i64) -> Self {
        Self { origin, value }
    }
}
