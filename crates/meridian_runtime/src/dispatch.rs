//! Interaction diffing, handler dispatch, and the deferred mutation queue.
//!
//! The backend reports raw per-node interaction state each frame; the
//! dispatcher diffs consecutive frames of that state into [`UiEvent`]s and
//! delivers them to attached handlers in attachment order. A handler that
//! fails is logged and counted; its siblings and the frame are untouched.
//!
//! Handlers must not mutate the tree synchronously. Structural requests go
//! through [`MutationQueue`] and are applied by the render loop between
//! frames, under the same lock as the sweep.

use crate::layout::SizeMap;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use meridian_core::{
    ConcurrencyViolation, FrameSnapshot, Interaction, ItemFlags, ItemId, ItemKind, ItemNode,
    ItemTree, Theme, TreeResult, UiEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A structural change requested while a frame is in flight.
///
/// Applied between frames in submission order; each request observes the
/// effects of the ones before it, and a rejected request is logged and
/// dropped without touching the rest of the batch.
#[derive(Debug)]
pub enum MutationRequest {
    /// Insert `node` under `parent` at `index`.
    Insert {
        /// Destination parent.
        parent: ItemId,
        /// The node to insert.
        node: ItemNode,
        /// Position in the parent's child list.
        index: usize,
    },
    /// Insert `node` as the last child of `parent`.
    Append {
        /// Destination parent.
        parent: ItemId,
        /// The node to append.
        node: ItemNode,
    },
    /// Detach a node and its subtree.
    Remove(ItemId),
    /// Move a node under a new parent.
    Reparent {
        /// The node to move.
        node: ItemId,
        /// Destination parent.
        new_parent: ItemId,
        /// Position in the destination child list.
        index: usize,
    },
    /// Permute a parent's child list.
    Reorder {
        /// The parent whose children are permuted.
        parent: ItemId,
        /// `order[i]` is the old position of the child ending up at `i`.
        order: Vec<usize>,
    },
    /// Show or hide a node.
    SetVisible {
        /// The node to change.
        node: ItemId,
        /// New visibility.
        visible: bool,
    },
    /// Enable or disable event delivery for a node.
    SetEnabled {
        /// The node to change.
        node: ItemId,
        /// New enabled state.
        enabled: bool,
    },
    /// Attach a theme to a node.
    AttachTheme {
        /// The node to theme.
        node: ItemId,
        /// The theme to attach.
        theme: Arc<Theme>,
    },
    /// Detach a node's theme.
    DetachTheme(ItemId),
}

impl MutationRequest {
    /// Applies this request to the tree. Called by the render loop with the
    /// mutation lock held.
    ///
    /// # Errors
    ///
    /// Propagates the structural error of the underlying operation; the
    /// tree is left unchanged in that case.
    pub fn apply(self, tree: &mut ItemTree) -> TreeResult<()> {
        match self {
            Self::Insert {
                parent,
                node,
                index,
            } => tree.insert(parent, node, index).map(|_| ()),
            Self::Append { parent, node } => tree.append(parent, node).map(|_| ()),
            Self::Remove(node) => tree.remove(node),
            Self::Reparent {
                node,
                new_parent,
                index,
            } => tree.reparent(node, new_parent, index),
            Self::Reorder { parent, order } => tree.reorder(parent, &order),
            Self::SetVisible { node, visible } => tree.set_visible(node, visible),
            Self::SetEnabled { node, enabled } => tree.set_enabled(node, enabled),
            Self::AttachTheme { node, theme } => tree.attach_theme(node, theme),
            Self::DetachTheme(node) => tree.detach_theme(node),
        }
    }
}

/// Bounded, non-blocking submission side of the deferred mutation queue.
///
/// Cloneable; handlers and application threads hold one each. Submission
/// never blocks: a full queue is an error handed back to the caller, not a
/// stall inside a frame.
#[derive(Debug, Clone)]
pub struct MutationQueue {
    sender: Sender<MutationRequest>,
    capacity: usize,
}

impl MutationQueue {
    /// Creates a queue with the given capacity, returning the submission
    /// handle and the receiver the render loop drains between frames.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<MutationRequest>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self { sender, capacity }, receiver)
    }

    /// Enqueues a request for application after the current frame.
    ///
    /// # Errors
    ///
    /// [`ConcurrencyViolation::QueueFull`] if the queue is at capacity,
    /// [`ConcurrencyViolation::Disconnected`] if the render loop has shut
    /// down. The request is dropped in both cases.
    pub fn submit(&self, request: MutationRequest) -> Result<(), ConcurrencyViolation> {
        match self.sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(request)) => {
                warn!(capacity = self.capacity, ?request, "mutation queue full, request dropped");
                Err(ConcurrencyViolation::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => Err(ConcurrencyViolation::Disconnected),
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Summary of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events delivered to at least one handler.
    pub events_fired: usize,
    /// Handler invocations that returned an error.
    pub handler_failures: usize,
}

/// Diffs per-frame interaction state into events and delivers them.
///
/// Holds the previous frame's interaction map; nodes absent from the
/// current snapshot are forgotten, so a removed node can never receive an
/// event from a later frame.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    previous: HashMap<ItemId, Interaction>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no interaction history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs `polled` against the previous frame and fires handlers.
    ///
    /// Events per node fire in a fixed order (hover, click, value, resize);
    /// handlers on one node fire in attachment order. Disabled nodes have
    /// their state tracked but receive no events, so re-enabling does not
    /// replay stale transitions.
    pub fn dispatch(
        &mut self,
        snapshot: &FrameSnapshot,
        polled: &[(ItemId, Interaction)],
        previous_sizes: &SizeMap,
        sizes: &SizeMap,
    ) -> DispatchReport {
        let current: HashMap<ItemId, Interaction> = polled.iter().copied().collect();
        let mut report = DispatchReport::default();
        let mut next = HashMap::with_capacity(snapshot.len());

        for node in snapshot.iter() {
            let before = self.previous.get(&node.id).copied().unwrap_or_default();
            let now = current.get(&node.id).copied().unwrap_or_default();
            next.insert(node.id, now);

            if !node.flags.has(ItemFlags::ENABLED) {
                continue;
            }

            let mut events: Vec<UiEvent> = Vec::new();
            if now.hovered && !before.hovered {
                events.push(UiEvent::HoverEnter);
            }
            if !now.hovered && before.hovered {
                events.push(UiEvent::HoverExit);
            }
            if let Some(button) = now.clicked {
                events.push(UiEvent::Clicked(button));
            }
            if let Some(current_value) = now.value {
                let retained = match node.kind {
                    ItemKind::Widget { value } => Some(value),
                    _ => None,
                };
                let previous_value = before.value.or(retained);
                if let Some(previous_value) = previous_value {
                    if (current_value - previous_value).abs() > f64::EPSILON {
                        events.push(UiEvent::ValueChanged {
                            previous: previous_value,
                            current: current_value,
                        });
                    }
                }
            }
            if let (Some(&old), Some(&new)) =
                (previous_sizes.get(&node.id), sizes.get(&node.id))
            {
                if old != new {
                    events.push(UiEvent::Resized { old, new });
                }
            }

            if node.handlers.is_empty() {
                continue;
            }
            for event in &events {
                report.events_fired += 1;
                for handler in &node.handlers {
                    if let Err(error) = handler.handle(node.id, event) {
                        report.handler_failures += 1;
                        warn!(
                            node = %node.id,
                            handler = handler.name(),
                            %error,
                            "handler failed, continuing with siblings"
                        );
                    }
                }
            }
        }

        self.previous = next;
        report
    }
}
