//! Timer events and the named-handler registry.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ListenerPolicy;

/// Names of the events a timer emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EventKind {
    /// Every frame of an active session
    Tick,
    /// Session ended, by reaching the end or by `stop()`
    Stop,
    /// Loop mode wrapped around
    Loop,
    /// Bounce mode changed direction
    Bounce,
    /// User-defined event dispatched through `trigger`
    Custom(String),
}

impl EventKind {
    /// Get the name of this event kind
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Self::Tick => "tick",
            Self::Stop => "stop",
            Self::Loop => "loop",
            Self::Bounce => "bounce",
            Self::Custom(name) => name,
        }
    }

    /// Whether the timer itself emits this event
    #[inline]
    pub fn is_lifecycle_event(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "tick" => Self::Tick,
            "stop" => Self::Stop,
            "loop" => Self::Loop,
            "bounce" => Self::Bounce,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for EventKind {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload passed to event handlers.
///
/// Timestamps (`at`) are frame source time in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Tick { progress: f64, delta_ms: f64 },
    Stop { at: f64 },
    Loop { at: f64 },
    Bounce { at: f64 },
    Custom {
        name: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl TimerEvent {
    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            name: name.into(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Tick { .. } => EventKind::Tick,
            Self::Stop { .. } => EventKind::Stop,
            Self::Loop { .. } => EventKind::Loop,
            Self::Bounce { .. } => EventKind::Bounce,
            Self::Custom { name, .. } => EventKind::from(name.as_str()),
        }
    }

    /// Name the event is dispatched under.
    pub fn name(&self) -> &str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Stop { .. } => "stop",
            Self::Loop { .. } => "loop",
            Self::Bounce { .. } => "bounce",
            Self::Custom { name, .. } => name,
        }
    }

    /// Normalized progress carried by `tick`.
    #[inline]
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Tick { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// Timestamp carried by `stop`, `loop` and `bounce`.
    #[inline]
    pub fn timestamp(&self) -> Option<f64> {
        match self {
            Self::Stop { at } | Self::Loop { at } | Self::Bounce { at } => Some(*at),
            _ => None,
        }
    }
}

/// Boxed event handler.
pub type EventHandler = Box<dyn FnMut(&TimerEvent)>;

type SharedHandler = Rc<RefCell<EventHandler>>;

/// Handlers keyed by event name.
///
/// Dispatch clones the handler list out of the registry before calling, so a
/// handler may register, replace or remove handlers (its own included) while
/// it runs.
pub struct EventRegistry {
    policy: ListenerPolicy,
    handlers: RefCell<HashMap<String, Vec<SharedHandler>>>,
}

impl EventRegistry {
    pub fn new(policy: ListenerPolicy) -> Self {
        Self {
            policy,
            handlers: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn policy(&self) -> ListenerPolicy {
        self.policy
    }

    /// Register a handler. Returns `false` (and logs a warning) when the event
    /// name is empty.
    pub fn on(
        &self,
        event: impl Into<EventKind>,
        handler: impl FnMut(&TimerEvent) + 'static,
    ) -> bool {
        let kind = event.into();
        let name = kind.name().trim();
        if name.is_empty() {
            warn!(
                event = ?kind,
                "not able to bind event handler: event name must not be empty"
            );
            return false;
        }

        let boxed: EventHandler = Box::new(handler);
        let handler: SharedHandler = Rc::new(RefCell::new(boxed));
        let mut handlers = self.handlers.borrow_mut();
        let slot = handlers.entry(name.to_string()).or_default();
        match self.policy {
            ListenerPolicy::Replace => {
                slot.clear();
                slot.push(handler);
            }
            ListenerPolicy::Append => slot.push(handler),
        }
        true
    }

    /// Register several handlers. Returns how many were accepted.
    pub fn on_map<K, F, I>(&self, handlers: I) -> usize
    where
        K: Into<EventKind>,
        F: FnMut(&TimerEvent) + 'static,
        I: IntoIterator<Item = (K, F)>,
    {
        handlers
            .into_iter()
            .map(|(event, handler)| self.on(event, handler))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Remove every handler for `event`. Returns whether any existed.
    pub fn off(&self, event: impl Into<EventKind>) -> bool {
        let kind = event.into();
        self.handlers.borrow_mut().remove(kind.name().trim()).is_some()
    }

    pub fn has_handler(&self, event: impl Into<EventKind>) -> bool {
        let kind = event.into();
        self.handlers
            .borrow()
            .get(kind.name().trim())
            .is_some_and(|list| !list.is_empty())
    }

    /// Number of registered handlers across all events.
    pub fn len(&self) -> usize {
        self.handlers.borrow().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronously invoke the handlers registered for `event.name()`.
    /// Returns the number of handlers invoked; unknown names are a no-op.
    pub fn trigger(&self, event: &TimerEvent) -> usize {
        let listeners: Vec<SharedHandler> = match self.handlers.borrow().get(event.name()) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut invoked = 0;
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut handler) => {
                    (&mut **handler)(event);
                    invoked += 1;
                }
                Err(_) => warn!(
                    event = event.name(),
                    "skipping re-entrant dispatch to a handler that is already running"
                ),
            }
        }
        invoked
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(ListenerPolicy::default())
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        let mut names: Vec<&str> = handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EventRegistry")
            .field("policy", &self.policy)
            .field("events", &names)
            .finish()
    }
}
