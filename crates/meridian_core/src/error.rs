//! # Tree Error Types
//!
//! All errors that can be produced by structural tree operations.
//!
//! Every variant here is reported synchronously to the caller that requested
//! the operation, and every rejected mutation leaves the tree unchanged.

use crate::node::ItemId;
use thiserror::Error;

/// Errors produced by structural mutation of the item tree.
///
/// A rejected operation is always a no-op: no partial insert, reorder or
/// reparent is ever observable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// The destination of a reparent lies inside the moved subtree.
    #[error("cycle detected: {node} is an ancestor of the destination")]
    Cycle {
        /// The node whose move was rejected.
        node: ItemId,
    },

    /// A child index was out of range for the parent's child list.
    #[error("invalid index {index} for child list of length {len}")]
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// The length of the child list at the time of the call.
        len: usize,
    },

    /// A reorder permutation referenced the same slot twice or had the
    /// wrong length.
    #[error("invalid permutation: {reason}")]
    InvalidPermutation {
        /// What was wrong with the permutation.
        reason: &'static str,
    },

    /// The referenced node does not exist (never allocated, already swept,
    /// or pending delete).
    #[error("node not found: {0}")]
    NodeNotFound(ItemId),

    /// A theme is already attached to this node. Detach it first.
    #[error("theme already attached to {0}")]
    DuplicateAttach(ItemId),

    /// Detach was requested but nothing is attached.
    #[error("nothing attached to {0}")]
    NotAttached(ItemId),

    /// The root node cannot be removed or reparented.
    #[error("the root node cannot be removed or reparented")]
    RootImmutable,
}

/// Violations of the concurrency protocol.
///
/// These never corrupt the tree: the offending request is dropped and the
/// error is handed back to the requester.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyViolation {
    /// The deferred-mutation queue is full; the request was not enqueued.
    #[error("mutation queue full: capacity {capacity}")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The render loop has shut down and the queue has no consumer.
    #[error("mutation queue disconnected: render loop has shut down")]
    Disconnected,
}

/// Result type for structural tree operations.
pub type TreeResult<T> = Result<T, StructuralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StructuralError::InvalidIndex { index: 9, len: 2 };
        assert_eq!(err.to_string(), "invalid index 9 for child list of length 2");

        let err = ConcurrencyViolation::QueueFull { capacity: 64 };
        assert!(err.to_string().contains("64"));
    }
}
