//! Frame scheduler: a concrete [`FrameSource`] driven by a [`Clock`].
//!
//! The host calls [`FrameScheduler::tick`] once per display refresh (or, in
//! tests, after advancing a [`ManualClock`]). Each tick delivers one frame to
//! every subscription that is registered and unpaused when the tick begins.
//!
//! All interior borrows are released before a callback runs, so callbacks may
//! freely subscribe, stop, pause or resume subscriptions.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{Clock, ManualClock};
use crate::frame::{FrameCallback, FrameControl, FrameSource, FrameTick};
use crate::ids::{IdAllocator, SubscriptionId};

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound for a single frame delta in milliseconds. `None` leaves
    /// deltas uncapped, so a stalled host catches up in one frame.
    #[serde(default)]
    pub max_delta_ms: Option<f64>,
}

impl SchedulerConfig {
    #[inline]
    pub fn with_max_delta_ms(mut self, max_delta_ms: f64) -> Self {
        self.max_delta_ms = Some(max_delta_ms);
        self
    }
}

struct Entry {
    id: SubscriptionId,
    /// Taken out while the callback runs.
    callback: Option<FrameCallback>,
    elapsed_ms: f64,
    paused: bool,
}

struct Registry {
    ids: IdAllocator,
    entries: Vec<Entry>,
    last_tick_ms: f64,
    suspended: bool,
}

impl Registry {
    fn position(&self, id: SubscriptionId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: SubscriptionId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

/// Single-threaded frame loop with per-subscription pause and elapsed time.
pub struct FrameScheduler<C: Clock> {
    clock: C,
    cfg: SchedulerConfig,
    registry: RefCell<Registry>,
}

impl<C: Clock> FrameScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    pub fn with_config(clock: C, cfg: SchedulerConfig) -> Self {
        let start = clock.now_ms();
        Self {
            clock,
            cfg,
            registry: RefCell::new(Registry {
                ids: IdAllocator::new(),
                entries: Vec::new(),
                last_tick_ms: start,
                suspended: false,
            }),
        }
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Number of registered subscriptions, paused ones included.
    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elapsed unpaused time of a subscription, if it is registered.
    pub fn elapsed_ms(&self, id: SubscriptionId) -> Option<f64> {
        let registry = self.registry.borrow();
        registry.position(id).map(|idx| registry.entries[idx].elapsed_ms)
    }

    /// Suspend every subscription. Ticks keep the clock reference current but
    /// deliver nothing and accrue no elapsed time until [`Self::resume_all`].
    pub fn pause_all(&self) {
        self.registry.borrow_mut().suspended = true;
        debug!("frame scheduler suspended");
    }

    pub fn resume_all(&self) {
        self.registry.borrow_mut().suspended = false;
        debug!("frame scheduler resumed");
    }

    pub fn is_suspended(&self) -> bool {
        self.registry.borrow().suspended
    }

    /// Deliver one frame. Returns the number of callbacks invoked.
    pub fn tick(&self) -> usize {
        let now = self.clock.now_ms();
        let (delta_ms, due) = {
            let mut registry = self.registry.borrow_mut();
            let mut delta_ms = (now - registry.last_tick_ms).max(0.0);
            if let Some(cap) = self.cfg.max_delta_ms {
                delta_ms = delta_ms.min(cap.max(0.0));
            }
            registry.last_tick_ms = now;
            if registry.suspended {
                return 0;
            }
            let due: Vec<SubscriptionId> = registry
                .entries
                .iter()
                .filter(|e| !e.paused)
                .map(|e| e.id)
                .collect();
            (delta_ms, due)
        };

        let mut delivered = 0;
        for id in due {
            // Earlier callbacks in this frame may have stopped or paused it.
            let taken = {
                let mut registry = self.registry.borrow_mut();
                match registry.entry_mut(id) {
                    Some(entry) if !entry.paused => entry.callback.take().map(|cb| {
                        entry.elapsed_ms += delta_ms;
                        let tick = FrameTick {
                            elapsed_ms: entry.elapsed_ms,
                            delta_ms,
                        };
                        (cb, tick)
                    }),
                    _ => None,
                }
            };
            let Some((mut callback, tick)) = taken else {
                continue;
            };

            trace!(
                subscription = id.0,
                elapsed_ms = tick.elapsed_ms,
                delta_ms = tick.delta_ms,
                "frame"
            );
            let mut control = FrameControl::new();
            callback(tick, &mut control);
            delivered += 1;

            let released = {
                let mut registry = self.registry.borrow_mut();
                match registry.position(id) {
                    Some(idx) if control.stop_requested() => {
                        registry.entries.remove(idx);
                        debug!(subscription = id.0, "subscription stopped by callback");
                        Some(callback)
                    }
                    Some(idx) => {
                        registry.entries[idx].callback = Some(callback);
                        None
                    }
                    None => Some(callback),
                }
            };
            // Dropping a callback can run arbitrary destructors; keep it outside the borrow.
            drop(released);
        }
        delivered
    }
}

impl FrameScheduler<ManualClock> {
    /// Advance the manual clock by `ms` and deliver one frame.
    pub fn advance(&self, ms: f64) -> usize {
        self.clock.advance(ms);
        self.tick()
    }
}

impl<C: Clock> FrameSource for FrameScheduler<C> {
    fn subscribe(&self, callback: FrameCallback) -> SubscriptionId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.ids.alloc_subscription();
        registry.entries.push(Entry {
            id,
            callback: Some(callback),
            elapsed_ms: 0.0,
            paused: false,
        });
        debug!(subscription = id.0, "subscribed");
        id
    }

    fn stop(&self, id: SubscriptionId) {
        let removed = {
            let mut registry = self.registry.borrow_mut();
            registry
                .position(id)
                .map(|idx| registry.entries.remove(idx))
        };
        if removed.is_some() {
            debug!(subscription = id.0, "unsubscribed");
        }
        drop(removed);
    }

    fn pause(&self, id: SubscriptionId) {
        if let Some(entry) = self.registry.borrow_mut().entry_mut(id) {
            entry.paused = true;
        }
    }

    fn resume(&self, id: SubscriptionId) {
        if let Some(entry) = self.registry.borrow_mut().entry_mut(id) {
            entry.paused = false;
        }
    }

    fn is_active(&self, id: SubscriptionId) -> bool {
        self.registry.borrow().position(id).is_some()
    }

    fn now(&self) -> f64 {
        self.clock.now_ms()
    }
}
