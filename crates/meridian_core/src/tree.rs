//! The arena-backed item tree and its structural operations.
//!
//! Nodes live in generational slots indexed by [`ItemId`]; the parent link
//! is a non-owning back-reference and children are an owned ordered id list.
//! Cycle checks walk the ancestor chain by index, O(depth).
//!
//! Removal is mark-and-defer: `remove` detaches the subtree and flags it
//! `PENDING_DELETE`; slots are reclaimed by [`ItemTree::sweep`], which the
//! render loop runs between frames. A frame that snapshotted the subtree
//! before the removal keeps its copy; nothing is freed under a live walk.

use crate::error::{StructuralError, TreeResult};
use crate::handler::Handler;
use crate::node::{ItemFlags, ItemId, ItemKind, ItemNode, Rect};
use crate::theme::Theme;
use std::collections::HashMap;
use std::sync::Arc;

/// One arena slot. The generation survives the node so stale ids miss.
#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<ItemNode>,
}

/// The set of all live nodes plus the root.
///
/// All operations validate first and mutate second: a returned error means
/// the tree is exactly as it was before the call.
#[derive(Debug)]
pub struct ItemTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ItemId,
    /// Roots of detached subtrees awaiting the between-frames sweep.
    detached: Vec<ItemId>,
    live: usize,
}

impl ItemTree {
    /// Creates a tree holding only the root container.
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::with_capacity(256),
            free: Vec::new(),
            root: ItemId::new(0, 0),
            detached: Vec::new(),
            live: 0,
        };
        let root = tree.allocate(ItemNode::container().with_label("root"));
        tree.root = root;
        tree
    }

    /// Returns the root id.
    #[inline]
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Returns the number of live nodes, root included, pending deletes
    /// excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    /// Looks up a node. Stale ids and pending-delete nodes return `None`.
    #[must_use]
    pub fn node(&self, id: ItemId) -> Option<&ItemNode> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref().filter(|n| !n.is_pending_delete())
    }

    /// Mutable lookup with the same visibility rules as [`node`](Self::node).
    pub fn node_mut(&mut self, id: ItemId) -> Option<&mut ItemNode> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut().filter(|n| !n.is_pending_delete())
    }

    /// Inserts `node` as a child of `parent` at `index`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the parent is gone, `InvalidIndex` if `index`
    /// exceeds the child list length.
    pub fn insert(&mut self, parent: ItemId, node: ItemNode, index: usize) -> TreeResult<ItemId> {
        let len = self
            .node(parent)
            .ok_or(StructuralError::NodeNotFound(parent))?
            .children
            .len();
        if index > len {
            return Err(StructuralError::InvalidIndex { index, len });
        }

        let id = self.allocate(node);
        // Infallible past this point; both slots were just validated.
        if let Some(n) = self.node_mut(id) {
            n.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.insert(index, id);
        }
        self.mark_dirty_chain(id);
        Ok(id)
    }

    /// Inserts `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`insert`](Self::insert).
    pub fn append(&mut self, parent: ItemId, node: ItemNode) -> TreeResult<ItemId> {
        let len = self
            .node(parent)
            .ok_or(StructuralError::NodeNotFound(parent))?
            .children
            .len();
        self.insert(parent, node, len)
    }

    /// Detaches `id` and its subtree, marking every node pending-delete.
    ///
    /// The slots stay allocated until [`sweep`](Self::sweep) runs, so an
    /// in-flight frame that captured the subtree cannot observe a free.
    ///
    /// # Errors
    ///
    /// `RootImmutable` for the root, `NodeNotFound` otherwise.
    pub fn remove(&mut self, id: ItemId) -> TreeResult<()> {
        if id == self.root {
            return Err(StructuralError::RootImmutable);
        }
        let parent = self
            .node(id)
            .ok_or(StructuralError::NodeNotFound(id))?
            .parent;

        if let Some(parent) = parent {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|&c| c != id);
            }
            self.mark_dirty_chain(parent);
        }
        self.mark_pending_delete(id);
        self.detached.push(id);
        Ok(())
    }

    /// Applies a permutation to `parent`'s child list.
    ///
    /// `order[i]` names the old position of the child that ends up at
    /// position `i`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for a missing parent; `InvalidPermutation` on wrong
    /// length or duplicates; `InvalidIndex` on out-of-range entries.
    pub fn reorder(&mut self, parent: ItemId, order: &[usize]) -> TreeResult<()> {
        let len = self
            .node(parent)
            .ok_or(StructuralError::NodeNotFound(parent))?
            .children
            .len();
        if order.len() != len {
            return Err(StructuralError::InvalidPermutation {
                reason: "length does not match child count",
            });
        }
        let mut seen = vec![false; len];
        for &index in order {
            if index >= len {
                return Err(StructuralError::InvalidIndex { index, len });
            }
            if seen[index] {
                return Err(StructuralError::InvalidPermutation {
                    reason: "duplicate index",
                });
            }
            seen[index] = true;
        }

        if let Some(p) = self.node_mut(parent) {
            let old = p.children.clone();
            for (i, &src) in order.iter().enumerate() {
                p.children[i] = old[src];
            }
        }
        self.mark_dirty_chain(parent);
        Ok(())
    }

    /// Moves `id` under `new_parent` at `index`. Atomic: on any error the
    /// tree is left unchanged.
    ///
    /// # Errors
    ///
    /// `RootImmutable`, `NodeNotFound`, `Cycle` if `new_parent` is `id` or
    /// lies inside the moved subtree, `InvalidIndex` against the child list
    /// as it will be after the detach.
    pub fn reparent(&mut self, id: ItemId, new_parent: ItemId, index: usize) -> TreeResult<()> {
        if id == self.root {
            return Err(StructuralError::RootImmutable);
        }
        let old_parent = self
            .node(id)
            .ok_or(StructuralError::NodeNotFound(id))?
            .parent;
        let new_parent_node = self
            .node(new_parent)
            .ok_or(StructuralError::NodeNotFound(new_parent))?;

        if new_parent == id || self.is_ancestor(id, new_parent) {
            return Err(StructuralError::Cycle { node: id });
        }

        // Index is validated against the list as it will look after the
        // detach, so "move to the end" works within the same parent.
        let mut len = new_parent_node.children.len();
        if old_parent == Some(new_parent) {
            len -= 1;
        }
        if index > len {
            return Err(StructuralError::InvalidIndex { index, len });
        }

        // All checks passed; mutate.
        if let Some(old) = old_parent {
            if let Some(p) = self.node_mut(old) {
                p.children.retain(|&c| c != id);
            }
            self.mark_dirty_chain(old);
        }
        if let Some(p) = self.node_mut(new_parent) {
            p.children.insert(index, id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = Some(new_parent);
        }
        self.mark_dirty_chain(id);
        Ok(())
    }

    /// Attaches a theme to a node.
    ///
    /// # Errors
    ///
    /// `DuplicateAttach` if a theme is already attached; detach first.
    pub fn attach_theme(&mut self, id: ItemId, theme: Arc<Theme>) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        if node.theme.is_some() {
            return Err(StructuralError::DuplicateAttach(id));
        }
        node.theme = Some(theme);
        self.mark_dirty_chain(id);
        Ok(())
    }

    /// Detaches the node's theme. Resolution reverts to the next ancestor
    /// starting the following frame.
    ///
    /// # Errors
    ///
    /// `NotAttached` if no theme is attached.
    pub fn detach_theme(&mut self, id: ItemId) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        if node.theme.take().is_none() {
            return Err(StructuralError::NotAttached(id));
        }
        self.mark_dirty_chain(id);
        Ok(())
    }

    /// Appends a handler to the node's attachment-ordered handler list.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the node is gone.
    pub fn attach_handler(&mut self, id: ItemId, handler: Arc<dyn Handler>) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        node.handlers.push(handler);
        Ok(())
    }

    /// Detaches every handler from the node.
    ///
    /// # Errors
    ///
    /// `NotAttached` if the node had no handlers.
    pub fn detach_handlers(&mut self, id: ItemId) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        if node.handlers.is_empty() {
            return Err(StructuralError::NotAttached(id));
        }
        node.handlers.clear();
        Ok(())
    }

    /// Shows or hides a node. Hidden subtrees keep their slots but are
    /// skipped by snapshot, layout, drawing and dispatch.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the node is gone.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        if visible {
            node.flags.set(ItemFlags::VISIBLE);
        } else {
            node.flags.clear(ItemFlags::VISIBLE);
        }
        self.mark_dirty_chain(id);
        Ok(())
    }

    /// Enables or disables input delivery for a node.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the node is gone.
    pub fn set_enabled(&mut self, id: ItemId, enabled: bool) -> TreeResult<()> {
        let node = self.node_mut(id).ok_or(StructuralError::NodeNotFound(id))?;
        if enabled {
            node.flags.set(ItemFlags::ENABLED);
        } else {
            node.flags.clear(ItemFlags::ENABLED);
        }
        Ok(())
    }

    /// Finds the first node (in depth-first order) carrying `label`.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<ItemId> {
        self.iter_dfs().find(|&id| {
            self.node(id)
                .and_then(ItemNode::label)
                .is_some_and(|l| l == label)
        })
    }

    /// Reclaims the slots of every detached subtree.
    ///
    /// Run by the render loop between frames, after the frame that observed
    /// the pending-delete marks has completed. Returns the number of nodes
    /// freed.
    pub fn sweep(&mut self) -> usize {
        let detached = std::mem::take(&mut self.detached);
        let mut freed = 0;
        for root in detached {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                let slot = &mut self.slots[id.index() as usize];
                if slot.generation != id.generation() {
                    continue;
                }
                if let Some(node) = slot.node.take() {
                    stack.extend(node.children);
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.push(id.index());
                    freed += 1;
                }
            }
        }
        freed
    }

    /// Writes the frame's resolved rects back into the retained nodes and
    /// clears their dirty-layout flags.
    ///
    /// Called by the render loop while publishing a completed frame; an
    /// abandoned frame publishes nothing.
    pub fn publish_layout(&mut self, rects: &HashMap<ItemId, Rect>) {
        for (&id, &rect) in rects {
            if let Some(node) = self.node_mut(id) {
                node.resolved = rect;
                node.flags.clear(ItemFlags::DIRTY_LAYOUT);
            }
        }
    }

    /// Publishes backend interaction state (hover/press flags, widget
    /// values) into the retained nodes after a completed frame.
    pub fn publish_interactions(&mut self, results: &[(ItemId, crate::handler::Interaction)]) {
        for &(id, interaction) in results {
            if let Some(node) = self.node_mut(id) {
                if interaction.hovered {
                    node.flags.set(ItemFlags::HOVERED);
                } else {
                    node.flags.clear(ItemFlags::HOVERED);
                }
                if interaction.pressed {
                    node.flags.set(ItemFlags::PRESSED);
                } else {
                    node.flags.clear(ItemFlags::PRESSED);
                }
                if let (ItemKind::Widget { value }, Some(new)) =
                    (&mut node.kind, interaction.value)
                {
                    *value = new;
                }
            }
        }
    }

    /// Iterates live node ids in depth-first pre-order from the root.
    pub fn iter_dfs(&self) -> impl Iterator<Item = ItemId> + '_ {
        DfsIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Checks every structural invariant; used by the randomized tests.
    ///
    /// Verified: parent/child links are mutually consistent, no duplicate
    /// child entries, no cycles, and every live node is reachable from the
    /// root.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        let mut reachable = 0_usize;
        let mut stack = vec![(self.root, 0_usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > self.slots.len() {
                return Err(format!("cycle suspected at {id}: depth exceeds node count"));
            }
            let Some(node) = self.node(id) else {
                return Err(format!("reachable id {id} does not resolve"));
            };
            reachable += 1;
            let mut seen = Vec::with_capacity(node.children.len());
            for &child in &node.children {
                if seen.contains(&child) {
                    return Err(format!("{id} lists child {child} twice"));
                }
                seen.push(child);
                let Some(child_node) = self.node(child) else {
                    return Err(format!("{id} lists missing child {child}"));
                };
                if child_node.parent != Some(id) {
                    return Err(format!("{child} parent link does not point at {id}"));
                }
                stack.push((child, depth + 1));
            }
        }
        if reachable != self.live {
            return Err(format!(
                "{} live nodes but {reachable} reachable from root",
                self.live
            ));
        }
        Ok(())
    }

    /// Returns true if `ancestor` appears on `id`'s parent chain.
    fn is_ancestor(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut cursor = self.node(id).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).and_then(|n| n.parent);
        }
        false
    }

    /// Marks `id` and its ancestor chain dirty-layout.
    fn mark_dirty_chain(&mut self, id: ItemId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.node_mut(current) else {
                break;
            };
            node.flags.set(ItemFlags::DIRTY_LAYOUT);
            cursor = node.parent;
        }
    }

    /// Flags `id` and its whole subtree pending-delete.
    fn mark_pending_delete(&mut self, id: ItemId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children = match self.node_mut(current) {
                Some(node) => {
                    node.flags.set(ItemFlags::PENDING_DELETE);
                    node.children.clone()
                }
                None => continue,
            };
            stack.extend(children);
            self.live -= 1;
        }
    }

    /// Allocates a slot for `node`, reusing the free list first.
    fn allocate(&mut self, mut node: ItemNode) -> ItemId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let id = ItemId::new(index, slot.generation);
            node.id = id;
            slot.node = Some(node);
            id
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            let id = ItemId::new(index, 0);
            node.id = id;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            id
        }
    }
}

impl Default for ItemTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-first pre-order iterator over live nodes.
struct DfsIter<'a> {
    tree: &'a ItemTree,
    stack: Vec<ItemId>,
}

impl Iterator for DfsIter<'_> {
    type Item = ItemId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            // Push children in reverse so they come out left-to-right.
            for &child in node.children.iter().rev() {
                self.stack.push(child);
            }
            return Some(id);
        }
    }
}
