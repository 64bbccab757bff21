//! # MERIDIAN
//!
//! A retained-mode UI item tree replayed through an immediate-mode
//! backend, one full frame per tick.
//!
//! Application threads build and mutate a shared tree of items; the render
//! loop snapshots it each frame, resolves layout and themes, re-submits
//! every visible primitive to the backend, and diffs the polled
//! interaction state into events for attached handlers.
//!
//! ```text
//! ┌──────────────┐   mutate    ┌───────────────┐   snapshot   ┌────────────┐
//! │ app threads  │ ──────────► │  SharedTree   │ ───────────► │  Context   │
//! └──────────────┘             └───────────────┘              │ (per tick) │
//!        ▲                            ▲                       └─────┬──────┘
//!        │        deferred queue      │   commit + publish          │ draw
//!        └────────────────────────────┴───────────────◄─────┐      ▼
//!                                                           │ ┌──────────┐
//!                                        events ◄───────────┴─┤ Backend  │
//!                                                              └──────────┘
//! ```
//!
//! ## Quick start
//!
//! ```
//! use meridian::prelude::*;
//!
//! let tree = SharedTree::new();
//! tree.append(tree.root(), ItemNode::container().with_label("sidebar"))
//!     .unwrap();
//!
//! let mut context = Context::new(tree, HeadlessBackend::new(), RuntimeConfig::default());
//! let report = context.run_once().unwrap();
//! assert_eq!(report.frame, 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub use meridian_core::{
    Alignment, Color, ConcurrencyViolation, Direction, FnHandler, FrameSnapshot, Handler,
    HandlerError, Interaction, ItemFlags, ItemId, ItemKind, ItemNode, ItemTree, LayoutSpec,
    MouseButton, PrimitiveKind, Rect, SharedTree, SizeSpec, SnapshotNode, StructuralError,
    StyleKey, StyleValue, Theme, TreeResult, UiEvent,
};
pub use meridian_runtime::{
    Backend, BackendError, ConfigError, Context, DispatchReport, DrawCall, EventDispatcher,
    FrameError, FramePhases, FrameReport, FrameResult, HeadlessBackend, LayoutEngine,
    LayoutResult, LoopStats, MutationQueue, MutationRequest, ResolvedStyle, RunState,
    RuntimeConfig, SizeMap, StopHandle, ThemeStack,
};

/// The names application code reaches for first.
pub mod prelude {
    pub use meridian_core::{
        Color, FnHandler, Handler, ItemKind, ItemNode, LayoutSpec, PrimitiveKind, Rect,
        SharedTree, SizeSpec, StyleKey, StyleValue, Theme, UiEvent,
    };
    pub use meridian_runtime::{
        Backend, Context, HeadlessBackend, MutationQueue, MutationRequest, RunState,
        RuntimeConfig, StopHandle,
    };
}
