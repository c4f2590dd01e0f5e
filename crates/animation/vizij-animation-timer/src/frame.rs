//! Frame source contract.
//!
//! A frame source owns the per-frame loop. Consumers subscribe a callback and
//! receive one [`FrameTick`] per frame until they stop. Elapsed time is tracked
//! per subscription by the source, which freezes it while the subscription is
//! paused.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ids::SubscriptionId;

/// Timing information delivered to a subscription each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTick {
    /// Milliseconds of unpaused time since the subscription was created.
    pub elapsed_ms: f64,
    /// Milliseconds since the previous frame.
    pub delta_ms: f64,
}

/// Lets a frame callback end its own subscription.
#[derive(Debug, Default)]
pub struct FrameControl {
    stop_requested: bool,
}

impl FrameControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unregister the subscription once the current callback returns.
    #[inline]
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

/// Callback invoked once per frame.
pub type FrameCallback = Box<dyn FnMut(FrameTick, &mut FrameControl)>;

/// Source of per-frame callbacks.
///
/// Implementations must tolerate re-entrant calls: a callback may subscribe,
/// stop, pause or resume any subscription (its own included) while it runs.
pub trait FrameSource {
    /// Register a callback; it receives its first frame on the next tick.
    fn subscribe(&self, callback: FrameCallback) -> SubscriptionId;

    /// Unregister a subscription. Unknown ids are ignored.
    fn stop(&self, id: SubscriptionId);

    /// Suspend frame delivery and elapsed-time accounting for a subscription.
    fn pause(&self, id: SubscriptionId);

    /// Resume a paused subscription; elapsed time continues from where it froze.
    fn resume(&self, id: SubscriptionId);

    /// Whether the subscription is still registered.
    fn is_active(&self, id: SubscriptionId) -> bool;

    /// Source-wide timestamp in milliseconds.
    fn now(&self) -> f64;
}

/// Owned handle to a registered subscription.
///
/// Dropping the handle does not unregister the callback; call
/// [`Subscription::stop`] for that.
#[derive(Clone)]
pub struct Subscription {
    source: Rc<dyn FrameSource>,
    id: SubscriptionId,
}

impl Subscription {
    /// Subscribe `callback` to `source` and wrap the resulting id.
    pub fn start(source: Rc<dyn FrameSource>, callback: FrameCallback) -> Self {
        let id = source.subscribe(callback);
        Self { source, id }
    }

    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn stop(&self) {
        self.source.stop(self.id);
    }

    pub fn pause(&self) {
        self.source.pause(self.id);
    }

    pub fn resume(&self) {
        self.source.resume(self.id);
    }

    pub fn is_active(&self) -> bool {
        self.source.is_active(self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
