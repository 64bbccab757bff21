//! Thread-safe handle to the item tree.
//!
//! ## Locking discipline
//!
//! One `parking_lot::Mutex` guards the tree. Every critical section is a
//! pointer/list update or the frame-start snapshot copy; nothing ever holds
//! the lock across a backend call, a layout pass or handler dispatch. A
//! mutator therefore waits at most for another mutation in flight or for
//! the snapshot copy, never for a frame.

use crate::error::TreeResult;
use crate::handler::Handler;
use crate::node::{ItemId, ItemNode, Rect};
use crate::snapshot::FrameSnapshot;
use crate::theme::Theme;
use crate::tree::ItemTree;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, thread-safe handle to the shared item tree.
///
/// Application threads clone this freely; the render loop holds one too.
/// All structural operations are atomic relative to each other and to the
/// frame-start snapshot.
#[derive(Clone)]
pub struct SharedTree {
    inner: Arc<Mutex<ItemTree>>,
    root: ItemId,
}

impl SharedTree {
    /// Creates a shared tree holding only the root container.
    #[must_use]
    pub fn new() -> Self {
        let tree = ItemTree::new();
        let root = tree.root();
        Self {
            inner: Arc::new(Mutex::new(tree)),
            root,
        }
    }

    /// Returns the root id. Never changes for the lifetime of the tree.
    #[inline]
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Inserts a node under `parent` at `index`.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::insert`].
    pub fn insert(&self, parent: ItemId, node: ItemNode, index: usize) -> TreeResult<ItemId> {
        self.inner.lock().insert(parent, node, index)
    }

    /// Inserts a node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::append`].
    pub fn append(&self, parent: ItemId, node: ItemNode) -> TreeResult<ItemId> {
        self.inner.lock().append(parent, node)
    }

    /// Detaches `id` and its subtree (mark-and-defer).
    ///
    /// # Errors
    ///
    /// See [`ItemTree::remove`].
    pub fn remove(&self, id: ItemId) -> TreeResult<()> {
        self.inner.lock().remove(id)
    }

    /// Applies a permutation to `parent`'s child list.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::reorder`].
    pub fn reorder(&self, parent: ItemId, order: &[usize]) -> TreeResult<()> {
        self.inner.lock().reorder(parent, order)
    }

    /// Atomically moves `id` under `new_parent`.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::reparent`].
    pub fn reparent(&self, id: ItemId, new_parent: ItemId, index: usize) -> TreeResult<()> {
        self.inner.lock().reparent(id, new_parent, index)
    }

    /// Attaches a theme to a node.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::attach_theme`].
    pub fn attach_theme(&self, id: ItemId, theme: Arc<Theme>) -> TreeResult<()> {
        self.inner.lock().attach_theme(id, theme)
    }

    /// Detaches a node's theme.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::detach_theme`].
    pub fn detach_theme(&self, id: ItemId) -> TreeResult<()> {
        self.inner.lock().detach_theme(id)
    }

    /// Appends a handler to a node.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::attach_handler`].
    pub fn attach_handler(&self, id: ItemId, handler: Arc<dyn Handler>) -> TreeResult<()> {
        self.inner.lock().attach_handler(id, handler)
    }

    /// Removes every handler from a node.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::detach_handlers`].
    pub fn detach_handlers(&self, id: ItemId) -> TreeResult<()> {
        self.inner.lock().detach_handlers(id)
    }

    /// Shows or hides a node.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::set_visible`].
    pub fn set_visible(&self, id: ItemId, visible: bool) -> TreeResult<()> {
        self.inner.lock().set_visible(id, visible)
    }

    /// Enables or disables input delivery for a node.
    ///
    /// # Errors
    ///
    /// See [`ItemTree::set_enabled`].
    pub fn set_enabled(&self, id: ItemId, enabled: bool) -> TreeResult<()> {
        self.inner.lock().set_enabled(id, enabled)
    }

    /// Finds the first node carrying `label`.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<ItemId> {
        self.inner.lock().find_by_label(label)
    }

    /// Returns the rect resolved for `id` by the last completed frame.
    #[must_use]
    pub fn resolved_rect(&self, id: ItemId) -> Option<Rect> {
        self.inner.lock().node(id).map(ItemNode::resolved)
    }

    /// Returns the parent of `id` as currently retained.
    #[must_use]
    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.inner.lock().node(id).and_then(ItemNode::parent)
    }

    /// Captures the frame snapshot. This is the traversal lock: the only
    /// moment the render thread excludes mutators.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        self.inner.lock().snapshot()
    }

    /// Runs `f` with shared access to the tree.
    ///
    /// Keep the closure short; it holds the mutation lock.
    pub fn with<R>(&self, f: impl FnOnce(&ItemTree) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Locks the tree for a compound update (sweep + deferred apply +
    /// publish). Used by the render loop between frames; application code
    /// should prefer the typed operations above.
    #[must_use]
    pub fn lock(&self) -> MutexGuard<'_, ItemTree> {
        self.inner.lock()
    }
}

impl Default for SharedTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_append_from_many_threads() {
        let tree = SharedTree::new();
        let root = tree.root();

        let mut joins = Vec::new();
        for _ in 0..8 {
            let tree = tree.clone();
            joins.push(thread::spawn(move || {
                for _ in 0..100 {
                    tree.append(root, ItemNode::container()).unwrap();
                }
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        tree.with(|t| {
            assert_eq!(t.len(), 801);
            t.validate().unwrap();
        });
    }

    #[test]
    fn test_snapshot_while_mutating() {
        let tree = SharedTree::new();
        let root = tree.root();
        for _ in 0..50 {
            tree.append(root, ItemNode::container()).unwrap();
        }

        let writer = {
            let tree = tree.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let id = tree.append(root, ItemNode::container()).unwrap();
                    tree.remove(id).unwrap();
                }
            })
        };

        // Every snapshot taken while the writer churns must be internally
        // consistent: all child links resolve inside the snapshot.
        for _ in 0..100 {
            let snapshot = tree.snapshot();
            for node in snapshot.iter() {
                for &child in &node.children {
                    assert!(child < snapshot.len());
                }
            }
        }
        writer.join().unwrap();
    }
}
