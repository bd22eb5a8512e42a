//! Trigger configuration: which events, percentages and seconds a handler
//! should be called for.
//!
//! [`TriggerConfig`] is the caller-facing shape (deserializable from the same
//! JSON object the browser listener accepts). [`Triggers`] is its normalized
//! form: percentage repeaters expanded, invalid thresholds dropped and
//! duplicates removed.

use crate::percent::expand_every_percentage;
use crate::Result;
use log::debug;
use serde::Deserialize;

/// A pair of absolute (`each`) and repeating (`every`) thresholds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub each: Vec<f64>,
    pub every: Vec<f64>,
}

impl Thresholds {
    pub fn new(each: &[f64], every: &[f64]) -> Self {
        Self { each: each.to_vec(), every: every.to_vec() }
    }
}

/// Caller-facing trigger configuration.
///
/// Unknown JSON keys are ignored and every field defaults to empty.
/// `events` accepts either a single string or a list of strings.
///
/// ```
/// use medialistener::TriggerConfig;
///
/// let cfg = TriggerConfig::from_json(r#"{"events": "play", "seconds": {"every": [10]}}"#).unwrap();
/// assert_eq!(cfg.events, vec!["play".to_string()]);
/// assert_eq!(cfg.seconds.every, vec![10.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub events: Vec<String>,
    pub percentages: Thresholds,
    pub seconds: Thresholds,
}

impl TriggerConfig {
    /// Parse a configuration from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Configuration that only listens for the given media events.
    pub fn events<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { events: events.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn with_percentages(mut self, each: &[f64], every: &[f64]) -> Self {
        self.percentages = Thresholds::new(each, every);
        self
    }

    pub fn with_seconds(mut self, each: &[f64], every: &[f64]) -> Self {
        self.seconds = Thresholds::new(each, every);
        self
    }

    /// Normalize into the form used for scheduling.
    ///
    /// Percentages outside `(0, 100]` and seconds below one are dropped without
    /// error. Fractional seconds are truncated to whole seconds.
    pub fn normalize(&self) -> Triggers {
        let mut triggers = Triggers::default();

        for event in &self.events {
            let event = event.trim();
            if event.is_empty() {
                continue;
            }
            if !triggers.events.iter().any(|e| e == event) {
                triggers.events.push(event.to_string());
            }
        }

        let expanded = expand_every_percentage(&self.percentages.every);
        for &pct in self.percentages.each.iter().chain(expanded.iter()) {
            if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
                debug!("ignoring percentage threshold {}", pct);
                continue;
            }
            if !triggers.percentages.contains(&pct) {
                triggers.percentages.push(pct);
            }
        }

        push_whole_seconds(&self.seconds.each, &mut triggers.seconds);
        push_whole_seconds(&self.seconds.every, &mut triggers.intervals);

        triggers
    }
}

fn push_whole_seconds(values: &[f64], out: &mut Vec<u64>) {
    for &value in values {
        if !value.is_finite() || value < 1.0 {
            debug!("ignoring seconds threshold {}", value);
            continue;
        }
        let whole = value.floor() as u64;
        if !out.contains(&whole) {
            out.push(whole);
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(event) => vec![event],
        OneOrMany::Many(events) => events,
    })
}

/// Normalized triggers of a single registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triggers {
    /// Media event names, in registration order.
    pub events: Vec<String>,
    /// Absolute percentages in `(0, 100]`: `each` first, then expanded `every`.
    pub percentages: Vec<f64>,
    /// Absolute whole-second offsets.
    pub seconds: Vec<u64>,
    /// Recurring whole-second intervals.
    pub intervals: Vec<u64>,
}

impl Triggers {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.percentages.is_empty()
            && self.seconds.is_empty()
            && self.intervals.is_empty()
    }

    /// Whether any trigger depends on the playback position.
    pub fn is_timed(&self) -> bool {
        !self.percentages.is_empty() || !self.seconds.is_empty() || !self.intervals.is_empty()
    }

    /// Remove every trigger named in `other`. Returns whether anything changed.
    pub fn remove(&mut self, other: &Triggers) -> bool {
        let before = self.len();
        self.events.retain(|e| !other.events.contains(e));
        self.percentages.retain(|p| !other.percentages.contains(p));
        self.seconds.retain(|s| !other.seconds.contains(s));
        self.intervals.retain(|s| !other.intervals.contains(s));
        before != self.len()
    }

    fn len(&self) -> usize {
        self.events.len() + self.percentages.len() + self.seconds.len() + self.intervals.len()
    }
}
