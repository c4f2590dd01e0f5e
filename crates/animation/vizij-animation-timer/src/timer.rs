//! AnimationTimer: converts frame-source elapsed time into normalized progress.
//!
//! Each playback operation starts a session: one subscription with the frame
//! source plus a mode-specific per-frame step. Per frame the step updates the
//! timer state, then the resulting events are dispatched with no interior
//! borrow held, so handlers can call back into the timer (restart from a `stop`
//! handler, stop from a `tick` handler, re-register handlers, and so on).
//! In bounce mode the direction flips after the `bounce` handlers return.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::TimerConfig;
use crate::duration::{parse_duration, DurationInput};
use crate::events::{EventKind, EventRegistry, TimerEvent};
use crate::frame::{FrameCallback, FrameControl, FrameSource, FrameTick, Subscription};
use crate::state::{Direction, TimerMode, TimerStatus};
use crate::Result;

/// Mutable timer state. Never borrowed while user code runs.
#[derive(Debug)]
struct TimerCore {
    duration_ms: f64,
    mode: TimerMode,
    direction: Direction,
    paused: bool,
    /// Last raw (direction-independent) fraction seen by a wrapping mode.
    last_progress: f64,
    /// Bumped at every session start; frames from older sessions are ignored.
    generation: u64,
    session: Option<Subscription>,
}

/// Boundary crossed during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Boundary {
    Loop,
    Bounce,
}

/// What one frame produced, computed under the borrow and dispatched after it.
#[derive(Debug, Clone, Copy)]
struct FrameStep {
    boundary: Option<Boundary>,
    /// Direction-independent fraction of the current cycle.
    raw: f64,
    direction: Direction,
    delta_ms: f64,
    finished: bool,
}

impl FrameStep {
    #[inline]
    fn progress(&self) -> f64 {
        self.direction.apply(self.raw)
    }
}

impl TimerCore {
    /// Play-once step: clamped so the terminal tick is exactly 1 (or 0 reversed).
    fn play_once_step(&self, tick: FrameTick) -> FrameStep {
        let raw = (tick.elapsed_ms / self.duration_ms).min(1.0);
        FrameStep {
            boundary: None,
            raw,
            direction: self.direction,
            delta_ms: tick.delta_ms,
            finished: raw == 1.0,
        }
    }

    /// Loop step: a raw fraction smaller than the previous one means a wrap.
    fn loop_step(&mut self, tick: FrameTick) -> FrameStep {
        let raw = (tick.elapsed_ms / self.duration_ms) % 1.0;
        let wrapped = raw < self.last_progress;
        self.last_progress = raw;
        FrameStep {
            boundary: wrapped.then_some(Boundary::Loop),
            raw,
            direction: self.direction,
            delta_ms: tick.delta_ms,
            finished: false,
        }
    }

    /// Bounce step: like loop. The flip itself happens after `bounce` is
    /// dispatched, see `AnimationTimer::flip_after_bounce`.
    fn bounce_step(&mut self, tick: FrameTick) -> FrameStep {
        let raw = (tick.elapsed_ms / self.duration_ms) % 1.0;
        let wrapped = raw < self.last_progress;
        self.last_progress = raw;
        FrameStep {
            boundary: wrapped.then_some(Boundary::Bounce),
            raw,
            direction: self.direction,
            delta_ms: tick.delta_ms,
            finished: false,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.mode.is_active()
    }
}

struct TimerShared {
    source: Rc<dyn FrameSource>,
    core: RefCell<TimerCore>,
    events: EventRegistry,
}

impl Drop for TimerShared {
    fn drop(&mut self) {
        // Unregister silently; dropping is not a `stop`.
        if let Some(session) = self.core.get_mut().session.take() {
            debug!(subscription = session.id().0, "timer dropped with active session");
            session.stop();
        }
    }
}

/// Frame-driven animation timer.
///
/// Cloning yields another handle to the same timer. Handlers that need to
/// reach their own timer should capture a [`WeakAnimationTimer`] from
/// [`AnimationTimer::downgrade`] so the timer can be dropped.
#[derive(Clone)]
pub struct AnimationTimer {
    shared: Rc<TimerShared>,
}

/// Non-owning handle to an [`AnimationTimer`].
#[derive(Clone)]
pub struct WeakAnimationTimer {
    shared: Weak<TimerShared>,
}

impl WeakAnimationTimer {
    pub fn upgrade(&self) -> Option<AnimationTimer> {
        self.shared.upgrade().map(|shared| AnimationTimer { shared })
    }
}

impl fmt::Debug for WeakAnimationTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakAnimationTimer")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl AnimationTimer {
    /// Create an idle timer with the default configuration (1000 ms).
    pub fn new(source: Rc<dyn FrameSource>) -> Self {
        Self::build(source, 1000.0, &TimerConfig::default())
    }

    /// Create an idle timer from a validated configuration.
    pub fn with_config(source: Rc<dyn FrameSource>, cfg: TimerConfig) -> Result<Self> {
        let duration_ms = cfg.default_duration_ms()?;
        Ok(Self::build(source, duration_ms, &cfg))
    }

    fn build(source: Rc<dyn FrameSource>, duration_ms: f64, cfg: &TimerConfig) -> Self {
        Self {
            shared: Rc::new(TimerShared {
                source,
                core: RefCell::new(TimerCore {
                    duration_ms,
                    mode: TimerMode::Idle,
                    direction: Direction::Forward,
                    paused: false,
                    last_progress: 0.0,
                    generation: 0,
                    session: None,
                }),
                events: EventRegistry::new(cfg.listener_policy),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakAnimationTimer {
        WeakAnimationTimer {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Whether two handles refer to the same timer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    // ----- configuration -----

    /// Set the duration from milliseconds or an expression such as `"2.4s"`.
    ///
    /// A running session picks the new duration up on its next frame. On error
    /// the previous duration is kept.
    pub fn duration(&self, value: impl Into<DurationInput>) -> Result<&Self> {
        let ms = parse_duration(value)?;
        self.shared.core.borrow_mut().duration_ms = ms;
        Ok(self)
    }

    pub fn duration_ms(&self) -> f64 {
        self.shared.core.borrow().duration_ms
    }

    // ----- events -----

    /// Register a handler for `event`. An empty event name is logged and
    /// ignored.
    pub fn on(
        &self,
        event: impl Into<EventKind>,
        handler: impl FnMut(&TimerEvent) + 'static,
    ) -> &Self {
        self.shared.events.on(event, handler);
        self
    }

    /// Register several handlers at once.
    pub fn on_map<K, F, I>(&self, handlers: I) -> &Self
    where
        K: Into<EventKind>,
        F: FnMut(&TimerEvent) + 'static,
        I: IntoIterator<Item = (K, F)>,
    {
        self.shared.events.on_map(handlers);
        self
    }

    /// Remove the handlers for `event`.
    pub fn off(&self, event: impl Into<EventKind>) -> &Self {
        self.shared.events.off(event);
        self
    }

    /// Dispatch `event` to its handlers synchronously. Unregistered names are a no-op.
    pub fn trigger(&self, event: TimerEvent) {
        self.shared.events.trigger(&event);
    }

    // ----- playback -----

    /// Play once forward, ending at 1.
    pub fn play(&self) {
        self.start(TimerMode::PlayOnce, Direction::Forward);
    }

    /// Play once backward, ending at 0.
    pub fn reverse(&self) {
        self.start(TimerMode::PlayOnce, Direction::Backward);
    }

    /// Repeat 0 to 1 every duration until stopped.
    pub fn loop_forward(&self) {
        self.start(TimerMode::Loop, Direction::Forward);
    }

    /// Repeat 1 to 0 every duration until stopped.
    pub fn loop_reverse(&self) {
        self.start(TimerMode::Loop, Direction::Backward);
    }

    /// Alternate forward and backward every duration until stopped.
    pub fn bounce(&self) {
        self.start(TimerMode::Bounce, Direction::Forward);
    }

    /// End the active session and emit `stop`. Does nothing when idle.
    /// A stopped session cannot be resumed.
    pub fn stop(&self) {
        let session = {
            let mut core = self.shared.core.borrow_mut();
            core.mode = TimerMode::Idle;
            core.paused = false;
            core.session.take()
        };
        if let Some(session) = session {
            session.stop();
            debug!(subscription = session.id().0, "timer stopped");
            self.emit(TimerEvent::Stop {
                at: self.shared.source.now(),
            });
        }
    }

    /// Pause the active session. Returns `false` if already paused.
    pub fn pause(&self) -> bool {
        let (changed, session) = {
            let mut core = self.shared.core.borrow_mut();
            let changed = !core.paused;
            core.paused = true;
            (changed, core.session.clone())
        };
        if let (true, Some(session)) = (changed, session) {
            session.pause();
            debug!(subscription = session.id().0, "timer paused");
        }
        changed
    }

    /// Resume a paused session. Returns `false` if it was not paused.
    pub fn resume(&self) -> bool {
        let (changed, session) = {
            let mut core = self.shared.core.borrow_mut();
            let changed = core.paused;
            core.paused = false;
            (changed, core.session.clone())
        };
        if let (true, Some(session)) = (changed, session) {
            session.resume();
            debug!(subscription = session.id().0, "timer resumed");
        }
        changed
    }

    // ----- introspection -----

    pub fn state(&self) -> TimerStatus {
        let core = self.shared.core.borrow();
        TimerStatus {
            mode: core.mode,
            direction: core.direction,
            paused: core.paused,
        }
    }

    #[inline]
    pub fn mode(&self) -> TimerMode {
        self.shared.core.borrow().mode
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.shared.core.borrow().direction
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.shared.core.borrow().mode.is_active()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.core.borrow().paused
    }

    // ----- internals -----

    fn start(&self, mode: TimerMode, direction: Direction) {
        let (generation, previous) = {
            let mut core = self.shared.core.borrow_mut();
            core.last_progress = 0.0;
            core.mode = mode;
            core.direction = direction;
            core.paused = false;
            core.generation = core.generation.wrapping_add(1);
            (core.generation, core.session.take())
        };
        if let Some(previous) = previous {
            debug!(
                subscription = previous.id().0,
                "replacing active session"
            );
            previous.stop();
        }

        let weak = Rc::downgrade(&self.shared);
        let callback: FrameCallback = Box::new(move |tick: FrameTick, control: &mut FrameControl| {
            match weak.upgrade() {
                Some(shared) => AnimationTimer { shared }.on_frame(generation, tick, control),
                None => control.stop(),
            }
        });
        let session = Subscription::start(self.shared.source.clone(), callback);
        debug!(
            subscription = session.id().0,
            mode = mode.name(),
            ?direction,
            "session started"
        );
        self.shared.core.borrow_mut().session = Some(session);
    }

    fn on_frame(&self, generation: u64, tick: FrameTick, control: &mut FrameControl) {
        let mut step = {
            let mut core = self.shared.core.borrow_mut();
            if !core.is_current(generation) {
                control.stop();
                return;
            }
            if core.paused {
                return;
            }
            match core.mode {
                TimerMode::PlayOnce => core.play_once_step(tick),
                TimerMode::Loop => core.loop_step(tick),
                TimerMode::Bounce => core.bounce_step(tick),
                TimerMode::Idle => return,
            }
        };

        if let Some(boundary) = step.boundary {
            let at = self.shared.source.now();
            match boundary {
                Boundary::Loop => self.emit(TimerEvent::Loop { at }),
                Boundary::Bounce => {
                    self.emit(TimerEvent::Bounce { at });
                    step.direction = self.flip_after_bounce(generation, step.direction);
                }
            }
        }

        // Still sent when a boundary handler stopped or restarted the timer;
        // the old subscription is released below.
        self.emit(TimerEvent::Tick {
            progress: step.progress(),
            delta_ms: step.delta_ms,
        });

        if step.finished {
            let finished_here = {
                let mut core = self.shared.core.borrow_mut();
                if core.is_current(generation) {
                    core.mode = TimerMode::Idle;
                    core.paused = false;
                    core.session.take();
                    true
                } else {
                    false
                }
            };
            control.stop();
            if finished_here {
                debug!("session finished");
                self.emit(TimerEvent::Stop {
                    at: self.shared.source.now(),
                });
            }
        } else if !self.shared.core.borrow().is_current(generation) {
            control.stop();
        }
    }

    /// Flip the bounce direction once the `bounce` handlers have run.
    ///
    /// A handler that restarted the timer owns the direction now, so a
    /// superseded session only flips its own copy for the trailing tick.
    fn flip_after_bounce(&self, generation: u64, before: Direction) -> Direction {
        let mut core = self.shared.core.borrow_mut();
        if core.is_current(generation) {
            core.direction = core.direction.flipped();
            core.direction
        } else {
            before.flipped()
        }
    }

    fn emit(&self, event: TimerEvent) {
        self.shared.events.trigger(&event);
    }
}

impl fmt::Debug for AnimationTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.borrow();
        f.debug_struct("AnimationTimer")
            .field("duration_ms", &core.duration_ms)
            .field("mode", &core.mode)
            .field("direction", &core.direction)
            .field("paused", &core.paused)
            .field("session", &core.session)
            .field("events", &self.shared.events)
            .finish()
    }
}
