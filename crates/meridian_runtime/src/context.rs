//! The render-loop context and its state machine.
//!
//! One [`Context`] owns the backend and drives one frame per tick:
//! snapshot, layout, traversal, commit, dispatch. The lifecycle is
//! `Uninitialized -> Running -> Stopping -> Stopped`, one way only; a
//! stopped context never runs another frame.
//!
//! A backend failure anywhere in the traversal abandons the frame
//! wholesale: no sweep, no deferred mutations, no published rects, no
//! events. The retained tree still describes the intended state, so the
//! next tick simply retries.

use crate::backend::{Backend, BackendError};
use crate::config::RuntimeConfig;
use crate::dispatch::{EventDispatcher, MutationQueue, MutationRequest};
use crate::layout::{LayoutEngine, SizeMap};
use crate::theme_stack::ThemeStack;
use crossbeam_channel::Receiver;
use meridian_core::{FrameSnapshot, ItemId, Rect, SharedTree};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lifecycle state of the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, no frame has run yet.
    Uninitialized,
    /// Frames are being produced.
    Running,
    /// Stop requested; the loop winds down on its next tick.
    Stopping,
    /// Terminal. No further frames.
    Stopped,
}

/// Errors reported by [`Context::run_once`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The backend failed; the frame was abandoned and nothing published.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The loop is past its running phase.
    #[error("render loop is not running (state: {state:?})")]
    NotRunning {
        /// State observed at the call.
        state: RunState,
    },
}

/// Result type for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Microseconds spent in each phase of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePhases {
    /// Snapshot copy under the mutation lock.
    pub snapshot_us: u64,
    /// Measure + place.
    pub layout_us: u64,
    /// Backend traversal: begin, draws, poll, end.
    pub traverse_us: u64,
    /// Sweep, deferred mutations, publication.
    pub commit_us: u64,
    /// Interaction diffing and handler delivery.
    pub dispatch_us: u64,
}

/// Summary of one completed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, 1-based.
    pub frame: u64,
    /// Nodes submitted to the backend.
    pub nodes_drawn: usize,
    /// Slots freed by the between-frames sweep.
    pub swept: usize,
    /// Deferred mutations applied this frame.
    pub mutations_applied: usize,
    /// Events delivered to handlers.
    pub events_fired: usize,
    /// Handler invocations that failed.
    pub handler_failures: usize,
    /// Per-phase timing breakdown.
    pub phases: FramePhases,
    /// Wall-clock time the frame took.
    pub duration: Duration,
}

/// Aggregate statistics across the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames that ran to completion.
    pub frames: u64,
    /// Frames abandoned on a backend failure.
    pub abandoned: u64,
    /// Completed frames that exceeded the configured budget.
    pub over_budget: u64,
    /// Total time spent inside completed frames.
    pub total_frame_time: Duration,
}

impl LoopStats {
    /// Mean completed-frame duration, zero if no frame completed.
    #[must_use]
    pub fn average_frame_time(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_possible_truncation)]
        let frames = self.frames as u32;
        self.total_frame_time / frames
    }
}

/// Cloneable handle that requests a loop shutdown from any thread.
///
/// Stopping is cooperative: the current frame finishes, the next tick
/// transitions to `Stopping` and then `Stopped`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests shutdown. Idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// The render-loop context: retained tree, backend, and frame state.
pub struct Context<B: Backend> {
    tree: SharedTree,
    backend: B,
    config: RuntimeConfig,
    engine: LayoutEngine,
    dispatcher: EventDispatcher,
    queue: MutationQueue,
    receiver: Receiver<MutationRequest>,
    stop: Arc<AtomicBool>,
    state: RunState,
    frame_count: u64,
    previous_sizes: SizeMap,
    stats: LoopStats,
}

impl<B: Backend> Context<B> {
    /// Creates a context around an existing tree and backend.
    #[must_use]
    pub fn new(tree: SharedTree, backend: B, config: RuntimeConfig) -> Self {
        let engine = LayoutEngine::new(config.viewport_width, config.viewport_height);
        let (queue, receiver) = MutationQueue::bounded(config.mutation_queue_capacity);
        Self {
            tree,
            backend,
            config,
            engine,
            dispatcher: EventDispatcher::new(),
            queue,
            receiver,
            stop: Arc::new(AtomicBool::new(false)),
            state: RunState::Uninitialized,
            frame_count: 0,
            previous_sizes: SizeMap::new(),
            stats: LoopStats::default(),
        }
    }

    /// Returns the shared tree handle.
    #[must_use]
    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    /// Returns the backend, for inspection in tests.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Returns a submission handle for the deferred mutation queue.
    #[must_use]
    pub fn mutation_queue(&self) -> MutationQueue {
        self.queue.clone()
    }

    /// Returns a handle that stops the loop from any thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the accumulated loop statistics.
    #[must_use]
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Runs exactly one frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::Backend`] if the backend failed (the frame was
    /// abandoned, nothing was published); [`FrameError::NotRunning`] once
    /// the loop is past its running phase.
    pub fn run_once(&mut self) -> FrameResult<FrameReport> {
        match self.state {
            RunState::Uninitialized => {
                info!(
                    fps = self.config.target_fps,
                    viewport_width = self.config.viewport_width,
                    viewport_height = self.config.viewport_height,
                    "render loop starting"
                );
                self.state = RunState::Running;
            }
            RunState::Running => {}
            RunState::Stopping => {
                info!(frames = self.frame_count, "render loop stopped");
                self.state = RunState::Stopped;
                return Err(FrameError::NotRunning {
                    state: RunState::Stopped,
                });
            }
            RunState::Stopped => {
                return Err(FrameError::NotRunning {
                    state: RunState::Stopped,
                });
            }
        }

        let started = Instant::now();
        let result = self.frame();
        if self.stop.load(Ordering::Acquire) && self.state == RunState::Running {
            self.state = RunState::Stopping;
        }

        match result {
            Ok(mut report) => {
                report.duration = started.elapsed();
                self.frame_count += 1;
                report.frame = self.frame_count;
                self.stats.frames += 1;
                self.stats.total_frame_time += report.duration;
                if report.duration.as_micros() > u128::from(self.config.frame_budget_us) {
                    self.stats.over_budget += 1;
                    debug!(
                        frame = report.frame,
                        duration_us = report.duration.as_micros() as u64,
                        "frame exceeded budget"
                    );
                }
                Ok(report)
            }
            Err(error) => {
                self.stats.abandoned += 1;
                warn!(%error, "frame abandoned, nothing published");
                Err(FrameError::Backend(error))
            }
        }
    }

    /// Runs frames until stopped, pacing to the configured frame rate.
    ///
    /// # Errors
    ///
    /// [`FrameError::Backend`] with the last failure after
    /// `max_consecutive_failures` abandoned frames in a row. A cooperative
    /// stop returns the accumulated [`LoopStats`] instead.
    pub fn run_forever(&mut self) -> FrameResult<LoopStats> {
        let interval = Duration::from_secs(1) / self.config.target_fps;
        let mut consecutive_failures = 0_u32;

        loop {
            let tick = Instant::now();
            match self.run_once() {
                Ok(_) => consecutive_failures = 0,
                Err(FrameError::NotRunning { .. }) => return Ok(self.stats),
                Err(error) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        warn!(
                            failures = consecutive_failures,
                            "giving up after consecutive backend failures"
                        );
                        return Err(error);
                    }
                }
            }
            let elapsed = tick.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }

    /// One frame body: snapshot, layout, traverse, commit, dispatch.
    fn frame(&mut self) -> Result<FrameReport, BackendError> {
        let mut phases = FramePhases::default();
        let mut mark = Instant::now();

        let snapshot = self.tree.snapshot();
        phases.snapshot_us = elapsed_us(&mut mark);

        let layout = self.engine.resolve(&snapshot, &self.previous_sizes);
        phases.layout_us = elapsed_us(&mut mark);

        self.backend.begin_frame()?;
        let mut theme_stack = ThemeStack::new();
        let nodes_drawn = draw_subtree(
            &mut self.backend,
            &snapshot,
            FrameSnapshot::ROOT,
            &layout.rects,
            &mut theme_stack,
        )?;
        let polled = self.backend.poll_input()?;
        self.backend.end_frame()?;
        phases.traverse_us = elapsed_us(&mut mark);

        // Commit: one lock for sweep, deferred mutations and publication,
        // so application threads observe the post-frame tree atomically.
        let (swept, mutations_applied) = {
            let mut guard = self.tree.lock();
            let swept = guard.sweep();
            let mut applied = 0_usize;
            for request in self.receiver.try_iter() {
                match request.apply(&mut guard) {
                    Ok(()) => applied += 1,
                    Err(error) => {
                        warn!(%error, "deferred mutation rejected");
                    }
                }
            }
            guard.publish_layout(&layout.rects);
            guard.publish_interactions(&polled);
            (swept, applied)
        };
        phases.commit_us = elapsed_us(&mut mark);

        let dispatch = self
            .dispatcher
            .dispatch(&snapshot, &polled, &self.previous_sizes, &layout.sizes);
        self.previous_sizes = layout.sizes;
        phases.dispatch_us = elapsed_us(&mut mark);

        Ok(FrameReport {
            frame: 0, // filled in by run_once
            nodes_drawn,
            swept,
            mutations_applied,
            events_fired: dispatch.events_fired,
            handler_failures: dispatch.handler_failures,
            phases,
            duration: Duration::ZERO, // filled in by run_once
        })
    }
}

/// Microseconds since `mark`, resetting `mark` to now.
fn elapsed_us(mark: &mut Instant) -> u64 {
    let now = Instant::now();
    let elapsed = now.duration_since(*mark);
    *mark = now;
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Draws `position` and its subtree, scoping the node's theme to it.
///
/// Free function rather than a method so the backend and theme stack can
/// be borrowed independently of the context.
fn draw_subtree<B: Backend>(
    backend: &mut B,
    snapshot: &FrameSnapshot,
    position: usize,
    rects: &HashMap<ItemId, Rect>,
    theme_stack: &mut ThemeStack,
) -> Result<usize, BackendError> {
    let node = snapshot.node(position);
    let pushed = match &node.theme {
        Some(theme) if !theme.is_empty() => {
            theme_stack.push(Arc::clone(theme));
            true
        }
        _ => false,
    };

    let result = (|| {
        let Some(&rect) = rects.get(&node.id) else {
            return Ok(0);
        };
        let style = theme_stack.resolved_style();
        backend.draw_primitive(node.id, &node.kind, rect, &style)?;
        let mut drawn = 1;
        for &child in &node.children {
            drawn += draw_subtree(backend, snapshot, child, rects, theme_stack)?;
        }
        Ok(drawn)
    })();

    if pushed {
        theme_stack.pop();
    }
    result
}
