//! # MERIDIAN Core
//!
//! The retained item tree behind the MERIDIAN runtime.
//!
//! Application threads build a persistent tree of items (containers, draw
//! primitives, widgets) and mutate it at any time. Once per frame the render
//! loop takes a consistent snapshot of the tree and replays it into an
//! immediate-mode backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      SharedTree                          │
//! │                                                          │
//! │   App threads ──► mutation lock ──► ItemTree (arena)     │
//! │                                        │                 │
//! │   Render thread ──► snapshot() ──► FrameSnapshot         │
//! │                                        │                 │
//! │                              (walked lock-free)          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership discipline
//!
//! - Nodes live in an arena of generational slots; `ItemId` never dangles.
//! - Children are an owned, ordered id list; the parent link is a non-owning
//!   back-reference.
//! - `remove` marks a subtree pending-delete; slots are reclaimed by the
//!   between-frames sweep, never while a snapshot may still reference them.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod handler;
pub mod node;
pub mod snapshot;
pub mod sync;
pub mod theme;
pub mod tree;

pub use error::{ConcurrencyViolation, StructuralError, TreeResult};
pub use handler::{FnHandler, Handler, HandlerError, Interaction, MouseButton, UiEvent};
pub use node::{Alignment, Direction, ItemFlags, ItemId, ItemKind, ItemNode, LayoutSpec, PrimitiveKind, Rect, SizeSpec};
pub use snapshot::{FrameSnapshot, SnapshotNode};
pub use sync::SharedTree;
pub use theme::{Color, StyleKey, StyleValue, Theme};
pub use tree::ItemTree;
