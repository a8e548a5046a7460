//! # Node identifiers.
//!
//! Every source, aggregator and top aggregator gets a [`NodeId`] minted at
//! construction from a process-wide monotonic counter. Aggregators key their
//! per-upstream state by it, so it is stable for the node's whole life and
//! never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global counter shared by all node kinds.
static NODE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Kind of graph node an identifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Periodic producer.
    Source,
    /// Summing aggregator.
    Aggregator,
    /// Median top aggregator.
    Top,
}

impl NodeKind {
    fn as_str(self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Aggregator => "aggregator",
            NodeKind::Top => "top",
        }
    }
}

/// Stable, unique identifier of a graph node.
///
/// Displayed as `<kind>-<seq>`, e.g. `source-3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    kind: NodeKind,
    seq: u64,
}

impl NodeId {
    /// Mints a fresh identifier of the given kind.
    pub fn mint(kind: NodeKind) -> Self {
        Self {
            kind,
            seq: NODE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }

    /// Kind of node this identifier was minted for.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Sequence number, unique across all kinds.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.as_str(), self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_unique_and_ordered() {
        let a = NodeId::mint(NodeKind::Source);
        let b = NodeId::mint(NodeKind::Aggregator);
        assert_ne!(a, b);
        assert!(b.seq() > a.seq());
        assert_eq!(b.kind(), NodeKind::Aggregator);
        assert_eq!(a.to_string(), format!("source-{}", a.seq()));
    }
}
