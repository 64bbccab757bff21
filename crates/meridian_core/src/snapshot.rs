//! Per-frame snapshots of the visible tree topology.
//!
//! Each frame is a pure function of (tree snapshot, previous-frame results).
//! The snapshot is taken in one pass under the mutation lock, so a
//! concurrent structural change is either fully visible to the frame or
//! fully deferred to the next one, never half-visible. After the copy the
//! render thread walks the snapshot without any lock; mutators only ever
//! wait for the copy itself.

use crate::handler::Handler;
use crate::node::{ItemFlags, ItemId, ItemKind, LayoutSpec};
use crate::theme::Theme;
use crate::tree::ItemTree;
use std::collections::HashMap;
use std::sync::Arc;

/// One node of a frame snapshot.
///
/// Children are indices into the snapshot's node vector, so the walk never
/// needs an id lookup.
pub struct SnapshotNode {
    /// Identity of the source node.
    pub id: ItemId,
    /// Kind, copied by value.
    pub kind: ItemKind,
    /// Flags at snapshot time.
    pub flags: ItemFlags,
    /// Layout directives at snapshot time.
    pub layout: LayoutSpec,
    /// Theme reference, shared with the retained node.
    pub theme: Option<Arc<Theme>>,
    /// Handler references in attachment order.
    pub handlers: Vec<Arc<dyn Handler>>,
    /// Child positions within the snapshot, in paint order.
    pub children: Vec<usize>,
}

impl std::fmt::Debug for SnapshotNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// An immutable copy of the visible topology, valid for one frame.
///
/// Hidden and pending-delete subtrees are excluded at capture time, which is
/// what makes `remove` + tick safe: the removed subtree can never be
/// visited, drawn or dispatched to by any later frame.
#[derive(Debug)]
pub struct FrameSnapshot {
    nodes: Vec<SnapshotNode>,
    index: HashMap<ItemId, usize>,
}

impl FrameSnapshot {
    /// Position of the root node in [`nodes`](Self::node).
    pub const ROOT: usize = 0;

    /// Returns the snapshot node at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range; positions only come from
    /// [`SnapshotNode::children`], which are always in range.
    #[must_use]
    pub fn node(&self, position: usize) -> &SnapshotNode {
        &self.nodes[position]
    }

    /// Returns the number of captured nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the snapshot captured nothing (never happens for a
    /// live tree; the root is always captured).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the snapshot position of `id`, if it was captured.
    #[must_use]
    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns true if `id` was captured by this snapshot.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterates captured nodes in depth-first pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotNode> + '_ {
        self.nodes.iter()
    }
}

impl ItemTree {
    /// Captures the visible topology into a [`FrameSnapshot`].
    ///
    /// Must be called with the mutation lock held (see
    /// [`SharedTree`](crate::sync::SharedTree)); the copy is the only part
    /// of the frame that excludes mutators.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        let mut snapshot = FrameSnapshot {
            nodes: Vec::with_capacity(self.len()),
            index: HashMap::with_capacity(self.len()),
        };
        self.capture(self.root(), &mut snapshot);
        snapshot
    }

    /// Appends `id` and its visible descendants; returns the position, or
    /// `None` if the node is hidden or pending delete.
    fn capture(&self, id: ItemId, snapshot: &mut FrameSnapshot) -> Option<usize> {
        let node = self.node(id)?;
        if !node.is_visible() {
            return None;
        }

        let position = snapshot.nodes.len();
        snapshot.nodes.push(SnapshotNode {
            id,
            kind: node.kind().clone(),
            flags: node.flags(),
            layout: *node.layout(),
            theme: node.theme().cloned(),
            handlers: node.handlers().to_vec(),
            children: Vec::with_capacity(node.children().len()),
        });
        snapshot.index.insert(id, position);

        for &child in node.children() {
            if let Some(child_position) = self.capture(child, snapshot) {
                snapshot.nodes[position].children.push(child_position);
            }
        }
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ItemNode, PrimitiveKind};

    #[test]
    fn test_snapshot_captures_child_order() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree.append(root, ItemNode::container()).unwrap();
        let b = tree.append(root, ItemNode::container()).unwrap();
        let c = tree.append(a, ItemNode::container()).unwrap();

        let snapshot = tree.snapshot();
        assert_eq!(snapshot.len(), 4);

        let root_node = snapshot.node(FrameSnapshot::ROOT);
        let first = snapshot.node(root_node.children[0]);
        let second = snapshot.node(root_node.children[1]);
        assert_eq!(first.id, a);
        assert_eq!(second.id, b);
        assert_eq!(snapshot.node(first.children[0]).id, c);
    }

    #[test]
    fn test_snapshot_skips_hidden_subtree() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree.append(root, ItemNode::container()).unwrap();
        let b = tree.append(a, ItemNode::container()).unwrap();
        tree.set_visible(a, false).unwrap();

        let snapshot = tree.snapshot();
        assert!(!snapshot.contains(a));
        assert!(!snapshot.contains(b));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_snapshot_skips_pending_delete() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree.append(root, ItemNode::container()).unwrap();
        tree.remove(a).unwrap();

        // Not swept yet, but already invisible to the frame.
        let snapshot = tree.snapshot();
        assert!(!snapshot.contains(a));
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutation() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree
            .append(
                root,
                ItemNode::new(ItemKind::Primitive(PrimitiveKind::Separator)),
            )
            .unwrap();

        let snapshot = tree.snapshot();
        tree.remove(a).unwrap();
        tree.sweep();

        // The frame's copy still holds the node it captured.
        assert!(snapshot.contains(a));
        assert_eq!(snapshot.len(), 2);
    }
}
