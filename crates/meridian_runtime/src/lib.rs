//! # MERIDIAN Runtime
//!
//! The frame loop that replays the retained item tree into an
//! immediate-mode backend, once per tick.
//!
//! ## Frame timeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         FRAME TIMELINE                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  1. SNAPSHOT      lock the tree, copy the visible topology      │
//! │  2. LAYOUT        measure (prev-frame sizes), then place        │
//! │  3. TRAVERSE      begin_frame, theme push / draw / recurse /    │
//! │                   theme pop, poll_input, end_frame              │
//! │  4. COMMIT        sweep pending deletes, apply deferred         │
//! │                   mutations, publish rects + interactions       │
//! │  5. DISPATCH      diff interactions, fire handlers in           │
//! │                   attachment order                              │
//! │                                                                 │
//! │  Backend failure anywhere in 3 abandons the frame: nothing is   │
//! │  committed, nothing is dispatched, the next tick retries.       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod layout;
pub mod theme_stack;

pub use backend::{Backend, BackendError, DrawCall, HeadlessBackend};
pub use config::{ConfigError, RuntimeConfig};
pub use context::{
    Context, FrameError, FramePhases, FrameReport, FrameResult, LoopStats, RunState, StopHandle,
};
pub use dispatch::{DispatchReport, EventDispatcher, MutationQueue, MutationRequest};
pub use layout::{LayoutEngine, LayoutResult, SizeMap};
pub use theme_stack::{ResolvedStyle, ThemeStack};
