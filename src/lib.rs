//! Media Milestone Listener
//!
//! Declarative playback milestones for media players: register handlers for
//! media events (`play`, `pause`, `ended`, ...), percentages of the duration,
//! and absolute or recurring second offsets, and have each one reported once
//! per source.
//!
//! # Features
//!
//! - **Shared dispatch**: every listener instance of a document shares one
//!   native listener per signal kind, installed on first use and removed with
//!   the last registration that needs it
//! - **Deferred handlers**: handlers run on a [`Defer`] queue, never inside a
//!   dispatch pass
//! - **HTML host** (`html`, default): a `scraper`-backed document whose
//!   `<audio>`/`<video>` elements are simulated players
//!
//! # Example
//!
//! ```
//! use medialistener::{Handler, HtmlDocument, ListenerConfig, ListenerContext, MediaHost, TaskQueue, TriggerConfig};
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> medialistener::Result<()> {
//! let doc = Arc::new(HtmlDocument::parse("<video></video>")?);
//! let queue = Arc::new(TaskQueue::new());
//! let ctx = ListenerContext::new(doc.clone(), queue.clone(), ListenerConfig::default());
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let handler = Handler::new(move |e| sink.lock().unwrap().push(e.label.clone()));
//!
//! let listener = ctx.listener();
//! let cfg = TriggerConfig::from_json(r#"{"percentages": {"every": [50]}}"#)?;
//! listener.on(None, &cfg, &handler)?;
//!
//! let video = doc.players()[0];
//! doc.load(video, 10.0, ctx.as_ref())?;
//! doc.play(video, ctx.as_ref())?;
//! doc.advance(video, 10.0, ctx.as_ref())?;
//! queue.run_until_idle();
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["50%", "100%"]);
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;

pub mod error;
pub use error::{Error, Result};

pub mod time;
pub use time::translate_seconds;

pub mod percent;
pub use percent::expand_every_percentage;

pub mod trigger;
pub use trigger::{Thresholds, TriggerConfig, Triggers};

pub mod schedule;
pub use schedule::{build_schedule, Milestone, MilestoneKey};

pub mod rearm;
pub use rearm::CatchUpPolicy;

pub mod handler;
pub use handler::{Handler, MilestoneEvent};

pub mod registry;
pub use registry::{ListenerId, MilestoneRegistry, PlayerSchedule};

pub mod coordinator;
pub use coordinator::{DispatchCoordinator, ListenerKind};

pub mod deferred;
pub use deferred::{Defer, TaskQueue, TokioQueue};

pub mod dispatch;

pub mod listener;
pub use listener::{ListenerContext, MediaListener};

// Host boundary (players, native signals) and the bundled HTML host
pub mod platform;
pub use platform::{MediaHost, MediaSignal, PlayerId, PlayerState, SignalSink};

#[cfg(feature = "html")]
pub use platform::HtmlDocument;

/// Behavior shared by every listener instance of a context
///
/// The defaults match what browsers report: the `pause` raised right before
/// `ended` is swallowed, script-synthesized signals are ignored, and recurring
/// seconds catch up every missed interval point.
///
/// # Examples
///
/// ```
/// let cfg: medialistener::ListenerConfig = serde_json::from_str(r#"{"catch_up": "legacy"}"#).unwrap();
/// assert_eq!(cfg.catch_up, medialistener::CatchUpPolicy::Legacy);
/// assert!(cfg.suppress_pause_on_end);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// How recurring seconds milestones count missed interval points
    pub catch_up: CatchUpPolicy,
    /// Whether `pause` is dropped once playback has ended
    pub suppress_pause_on_end: bool,
    /// Whether signals not raised by the host are ignored
    pub require_trusted: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            catch_up: CatchUpPolicy::Interval,
            suppress_pause_on_end: true,
            require_trusted: true,
        }
    }
}

impl ListenerConfig {
    /// Parse a configuration from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.catch_up, CatchUpPolicy::Interval);
        assert!(config.suppress_pause_on_end);
        assert!(config.require_trusted);
    }

    #[test]
    fn test_partial_json_config() {
        let config = ListenerConfig::from_json(r#"{"require_trusted": false}"#).unwrap();
        assert!(!config.require_trusted);
        assert!(config.suppress_pause_on_end);
        assert!(matches!(ListenerConfig::from_json("{"), Err(Error::InvalidConfig(_))));
    }
}
