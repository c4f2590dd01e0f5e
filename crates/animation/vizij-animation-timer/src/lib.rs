//! Vizij Animation Timer
//!
//! A frame-driven timer that turns elapsed time into normalized progress
//! (`0..=1`) and lifecycle events. The timer does not own a clock: it
//! subscribes to an injected [`FrameSource`], such as [`FrameScheduler`], and
//! does its work inside the frame callbacks that source delivers.
//!
//! ```
//! use std::rc::Rc;
//! use vizij_animation_timer::{AnimationTimer, FrameScheduler, ManualClock};
//!
//! let frames = Rc::new(FrameScheduler::new(ManualClock::new()));
//! let timer = AnimationTimer::new(frames.clone());
//! timer
//!     .duration("200ms")?
//!     .on("tick", |event| println!("progress {:?}", event.progress()))
//!     .on("stop", |_| println!("done"));
//! timer.play();
//!
//! while timer.is_active() {
//!     frames.advance(16.0);
//! }
//! # Ok::<(), vizij_animation_timer::TimerError>(())
//! ```

pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod frame;
pub mod ids;
pub mod scheduler;
pub mod state;
pub mod timer;

// Re-exports for consumers
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ListenerPolicy, TimerConfig};
pub use duration::{parse_duration, DurationInput};
pub use error::TimerError;
pub use events::{EventHandler, EventKind, EventRegistry, TimerEvent};
pub use frame::{FrameCallback, FrameControl, FrameSource, FrameTick, Subscription};
pub use ids::SubscriptionId;
pub use scheduler::{FrameScheduler, SchedulerConfig};
pub use state::{Direction, TimerMode, TimerStatus};
pub use timer::{AnimationTimer, WeakAnimationTimer};

/// Animation timer result type
pub type Result<T> = core::result::Result<T, TimerError>;
