//! Host boundary: media players, their state, and the native signals they emit.
//!
//! Element lookup, native listener attachment and player state all belong to
//! the embedding environment. The listener only talks to it through
//! [`MediaHost`] and receives signals through [`SignalSink`].

pub mod media;

#[cfg(feature = "html")]
pub mod document;

pub use media::{MediaState, SimulatedPlayer};

#[cfg(feature = "html")]
pub use document::HtmlDocument;

use crate::coordinator::ListenerKind;
use crate::Result;
use serde::Serialize;
use std::fmt;

/// Stable handle for a media element, assigned once by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Snapshot of the attributes the listener reads from a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    /// Playback position in seconds
    pub current_time: f64,
    /// Media duration in seconds; NaN while unknown, infinite for streams
    pub duration: f64,
    /// Whether playback has reached the end
    pub ended: bool,
}

impl PlayerState {
    /// Duration when it is finite and positive.
    pub fn known_duration(&self) -> Option<f64> {
        (self.duration.is_finite() && self.duration > 0.0).then_some(self.duration)
    }
}

/// A native signal raised by a player (`timeupdate`, `play`, `durationchange`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSignal {
    pub player: PlayerId,
    pub event_type: String,
    /// Whether the host raised it (as opposed to script-synthesized)
    pub trusted: bool,
}

impl MediaSignal {
    pub fn new(player: PlayerId, event_type: impl Into<String>) -> Self {
        Self { player, event_type: event_type.into(), trusted: true }
    }

    pub fn untrusted(player: PlayerId, event_type: impl Into<String>) -> Self {
        Self { trusted: false, ..Self::new(player, event_type) }
    }
}

/// The embedding environment as seen by the listener.
///
/// Implementations must not call back into the listener from inside these
/// methods; signals are delivered separately through a [`SignalSink`].
pub trait MediaHost: Send + Sync {
    /// Every media element currently known to the host.
    fn players(&self) -> Vec<PlayerId>;

    /// Whether `player` matches `selector`.
    fn matches(&self, player: PlayerId, selector: &str) -> Result<bool>;

    /// Resolve a selector to the players it matches.
    fn select(&self, selector: &str) -> Result<Vec<PlayerId>> {
        let mut out = Vec::new();
        for player in self.players() {
            if self.matches(player, selector)? {
                out.push(player);
            }
        }
        Ok(out)
    }

    /// Current state of a player, or `None` if the host does not know it.
    fn state(&self, player: PlayerId) -> Option<PlayerState>;

    /// Install the native listener for `kind`.
    fn add_listener(&self, kind: &ListenerKind);

    /// Remove the native listener for `kind`.
    fn remove_listener(&self, kind: &ListenerKind);
}

/// Receiver of native signals.
pub trait SignalSink {
    fn deliver(&self, signal: &MediaSignal);
}
