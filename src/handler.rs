//! Milestone handlers and the events they receive.

use crate::platform::PlayerId;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// What a handler is called with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneEvent {
    pub player: PlayerId,
    /// Event name, `"<pct>%"`, or `HH:MM:SS`
    pub label: String,
    /// Whole seconds the milestone corresponds to
    pub seconds: u64,
}

/// Identity of a handler: two clones of the same [`Handler`] share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

/// A milestone callback, compared by identity.
///
/// Registering the same `Handler` (or a clone of it) twice for one milestone
/// binds it once. Wrapping the same closure in two `Handler::new` calls
/// produces two distinct handlers.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&MilestoneEvent) + Send + Sync>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MilestoneEvent) + Send + Sync + 'static,
    {
        Handler(Arc::new(f))
    }

    pub fn id(&self) -> HandlerId {
        HandlerId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn call(&self, event: &MilestoneEvent) {
        (self.0)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:#x})", self.id().0)
    }
}
