//! Handler capability: callbacks invoked on node state transitions.
//!
//! Handlers are attached to nodes and invoked by the dispatcher when the
//! per-frame interaction diff detects a qualifying transition. They are
//! reference-shared, independent of node lifetime, and must never mutate the
//! tree synchronously: structural requests go through the deferred mutation
//! queue and apply between frames.

use crate::node::ItemId;
use thiserror::Error;

/// Mouse button identity for click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
}

/// Events derived from frame-to-frame state transitions.
///
/// These are the "API" between the runtime and attached handlers. Each
/// variant fires at most once per node per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The cursor entered the node this frame.
    HoverEnter,
    /// The cursor left the node this frame.
    HoverExit,
    /// The node was clicked this frame.
    Clicked(MouseButton),
    /// The node's retained value changed.
    ValueChanged {
        /// Value as of the previous frame.
        previous: f64,
        /// Value reported this frame.
        current: f64,
    },
    /// The node's resolved size changed between frames.
    Resized {
        /// Size as of the previous frame.
        old: (f32, f32),
        /// Size resolved this frame.
        new: (f32, f32),
    },
}

/// Failure reported by a handler.
///
/// Isolated per handler: one failing handler never affects its siblings or
/// the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler refused or failed to process the event.
    #[error("handler failed: {reason}")]
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// The capability every attached callback implements.
///
/// Stateless with respect to the tree; a handler may hold its own external
/// state (channels, counters) behind its own synchronization.
pub trait Handler: Send + Sync {
    /// Processes one event for one node.
    ///
    /// Errors are caught, logged and reported by the dispatcher; they are
    /// never propagated into the frame.
    fn handle(&self, node: ItemId, event: &UiEvent) -> Result<(), HandlerError>;

    /// Diagnostic name used in failure logs.
    fn name(&self) -> &str {
        "handler"
    }
}

/// Adapter turning a closure into a [`Handler`].
pub struct FnHandler<F> {
    name: &'static str,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(ItemId, &UiEvent) -> Result<(), HandlerError> + Send + Sync,
{
    /// Wraps a closure as a handler.
    #[must_use]
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(ItemId, &UiEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, node: ItemId, event: &UiEvent) -> Result<(), HandlerError> {
        (self.func)(node, event)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Per-node interaction result polled from the backend each frame.
///
/// The dispatcher diffs consecutive frames of these to derive [`UiEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interaction {
    /// The cursor is over the node.
    pub hovered: bool,
    /// A button is held down on the node.
    pub pressed: bool,
    /// The node was clicked this frame.
    pub clicked: Option<MouseButton>,
    /// The widget value reported by the backend, if the node carries one.
    pub value: Option<f64>,
}
