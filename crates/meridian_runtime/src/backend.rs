//! The immediate-mode backend contract, plus a headless test backend.
//!
//! The backend is a black box with no persistent object model: every frame
//! re-submits all draw calls between `begin_frame` and `end_frame`, and
//! `poll_input` reports interaction results keyed by node identity. Calls
//! are synchronous and frame-scoped, in exactly that order.

use crate::theme_stack::ResolvedStyle;
use meridian_core::{Interaction, ItemId, ItemKind, Rect};
use std::collections::VecDeque;
use thiserror::Error;

/// Failures reported by the backend.
///
/// Any of these abandons the current frame; the loop retries next tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend lost its device/surface and could not start the frame.
    #[error("backend device lost: {0}")]
    DeviceLost(String),
    /// The backend rejected a draw submission.
    #[error("backend rejected draw call: {0}")]
    Draw(String),
    /// The input poll failed.
    #[error("backend input poll failed: {0}")]
    Input(String),
}

/// The contract every immediate-mode backend implements.
///
/// The runtime guarantees the call order `begin_frame`, zero or more
/// `draw_primitive`, `poll_input`, `end_frame`, and never interleaves
/// frames.
pub trait Backend {
    /// Starts a frame.
    ///
    /// # Errors
    ///
    /// Any [`BackendError`] abandons the frame.
    fn begin_frame(&mut self) -> Result<(), BackendError>;

    /// Submits one primitive with its resolved rect and style.
    ///
    /// # Errors
    ///
    /// Any [`BackendError`] abandons the frame.
    fn draw_primitive(
        &mut self,
        id: ItemId,
        kind: &ItemKind,
        rect: Rect,
        style: &ResolvedStyle,
    ) -> Result<(), BackendError>;

    /// Polls interaction results for the frame, keyed by node identity.
    ///
    /// # Errors
    ///
    /// Any [`BackendError`] abandons the frame.
    fn poll_input(&mut self) -> Result<Vec<(ItemId, Interaction)>, BackendError>;

    /// Finishes the frame.
    ///
    /// # Errors
    ///
    /// Any [`BackendError`] abandons the frame.
    fn end_frame(&mut self) -> Result<(), BackendError>;
}

/// One recorded draw submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Frame number the call belongs to (1-based).
    pub frame: u64,
    /// Identity of the submitting node.
    pub id: ItemId,
    /// The submitted kind.
    pub kind: ItemKind,
    /// Resolved rect.
    pub rect: Rect,
    /// Resolved style.
    pub style: ResolvedStyle,
}

/// Recording backend with scripted input, for tests and benches.
///
/// Draw calls are recorded per frame; interaction results are replayed
/// from a script, one batch per frame. Failures can be injected on any of
/// the four contract calls to exercise the abandon path.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    frames_begun: u64,
    frames_completed: u64,
    in_frame: bool,
    calls: Vec<DrawCall>,
    scripted_input: VecDeque<Vec<(ItemId, Interaction)>>,
    fail_begin: bool,
    fail_draw: bool,
    fail_poll: bool,
    fail_end: bool,
}

impl HeadlessBackend {
    /// Creates an idle headless backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one frame's worth of interaction results.
    pub fn script_input(&mut self, results: Vec<(ItemId, Interaction)>) {
        self.scripted_input.push_back(results);
    }

    /// Makes the next `begin_frame` fail once.
    pub fn fail_next_begin(&mut self) {
        self.fail_begin = true;
    }

    /// Makes the next `draw_primitive` fail once.
    pub fn fail_next_draw(&mut self) {
        self.fail_draw = true;
    }

    /// Makes the next `poll_input` fail once.
    pub fn fail_next_poll(&mut self) {
        self.fail_poll = true;
    }

    /// Makes the next `end_frame` fail once.
    pub fn fail_next_end(&mut self) {
        self.fail_end = true;
    }

    /// Returns the number of frames that ran to completion.
    #[must_use]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Returns every recorded draw call.
    #[must_use]
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Returns the draw calls recorded for one frame, in submission order.
    #[must_use]
    pub fn calls_for_frame(&self, frame: u64) -> Vec<&DrawCall> {
        self.calls.iter().filter(|c| c.frame == frame).collect()
    }

    /// Returns true if `id` was drawn in the given frame.
    #[must_use]
    pub fn was_drawn(&self, id: ItemId, frame: u64) -> bool {
        self.calls.iter().any(|c| c.frame == frame && c.id == id)
    }
}

impl Backend for HeadlessBackend {
    fn begin_frame(&mut self) -> Result<(), BackendError> {
        if self.fail_begin {
            self.fail_begin = false;
            return Err(BackendError::DeviceLost("injected".into()));
        }
        self.frames_begun += 1;
        self.in_frame = true;
        Ok(())
    }

    fn draw_primitive(
        &mut self,
        id: ItemId,
        kind: &ItemKind,
        rect: Rect,
        style: &ResolvedStyle,
    ) -> Result<(), BackendError> {
        if self.fail_draw {
            self.fail_draw = false;
            return Err(BackendError::Draw("injected".into()));
        }
        self.calls.push(DrawCall {
            frame: self.frames_begun,
            id,
            kind: kind.clone(),
            rect,
            style: style.clone(),
        });
        Ok(())
    }

    fn poll_input(&mut self) -> Result<Vec<(ItemId, Interaction)>, BackendError> {
        if self.fail_poll {
            self.fail_poll = false;
            return Err(BackendError::Input("injected".into()));
        }
        Ok(self.scripted_input.pop_front().unwrap_or_default())
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        if self.fail_end {
            self.fail_end = false;
            return Err(BackendError::DeviceLost("injected".into()));
        }
        self.in_frame = false;
        self.frames_completed += 1;
        Ok(())
    }
}
