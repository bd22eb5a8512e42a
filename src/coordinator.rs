//! Reference-counted native listeners shared by every listener instance of a
//! document.
//!
//! However many [`MediaListener`](crate::MediaListener)s are alive, the host
//! holds at most one native listener per [`ListenerKind`]. The first
//! `acquire` installs it, the last `release` removes it.

use crate::platform::MediaHost;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// A class of native signal the listener subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// A media event requested by a handler (`play`, `pause`, `ended`, ...)
    Event(String),
    /// The shared timing signal used by every percentage and seconds milestone
    TimeUpdate,
    /// Source change detection, used to invalidate schedules
    DurationChange,
}

impl ListenerKind {
    /// Native event type this listener is attached for.
    pub fn event_type(&self) -> &str {
        match self {
            ListenerKind::Event(name) => name,
            ListenerKind::TimeUpdate => "timeupdate",
            ListenerKind::DurationChange => "durationchange",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerKind::Event(name) => write!(f, "event:{}", name),
            ListenerKind::TimeUpdate => f.write_str("timing"),
            ListenerKind::DurationChange => f.write_str("source"),
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatchCoordinator {
    counts: HashMap<ListenerKind, usize>,
}

impl DispatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `kind`. Returns `true` if this installed the
    /// native listener.
    pub fn acquire(&mut self, kind: &ListenerKind, host: &dyn MediaHost) -> bool {
        let count = self.counts.entry(kind.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            debug!("installing native listener {}", kind);
            host.add_listener(kind);
            true
        } else {
            false
        }
    }

    /// Drop interest in `kind`. Returns `true` if this removed the native
    /// listener. Releasing a kind nobody holds does nothing.
    pub fn release(&mut self, kind: &ListenerKind, host: &dyn MediaHost) -> bool {
        let Some(count) = self.counts.get_mut(kind) else {
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return false;
        }
        self.counts.remove(kind);
        debug!("removing native listener {}", kind);
        host.remove_listener(kind);
        true
    }

    pub fn count(&self, kind: &ListenerKind) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    pub fn is_installed(&self, kind: &ListenerKind) -> bool {
        self.count(kind) > 0
    }

    /// Installed kinds, sorted.
    pub fn installed(&self) -> Vec<ListenerKind> {
        let mut kinds: Vec<ListenerKind> = self.counts.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
