//! Turning normalized triggers into concrete milestones for one player.
//!
//! Percentages are converted to absolute seconds once, using the player's
//! duration at the time the schedule is built. A schedule is only valid for
//! one duration epoch; the listener rebuilds it after `durationchange`.

use crate::time::translate_seconds;
use crate::trigger::Triggers;
use log::debug;

/// Where a milestone lives in a player's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MilestoneKey {
    /// A media event name
    Event(String),
    /// An absolute whole-second offset
    Offset(u64),
}

/// One point at which a handler should be called.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub key: MilestoneKey,
    /// `play`, `25%`, `00:01:30`, ...
    pub label: String,
    /// Set for recurring milestones: seconds between firings
    pub interval: Option<u64>,
}

impl Milestone {
    pub fn event(name: &str) -> Self {
        Milestone { key: MilestoneKey::Event(name.to_string()), label: name.to_string(), interval: None }
    }

    pub fn offset(seconds: u64) -> Self {
        Milestone { key: MilestoneKey::Offset(seconds), label: translate_seconds(seconds), interval: None }
    }

    pub fn recurring(at: u64, interval: u64) -> Self {
        Milestone { interval: Some(interval), ..Self::offset(at) }
    }

    /// Second offset the milestone fires at; `None` for event milestones.
    pub fn fire_at(&self) -> Option<u64> {
        match self.key {
            MilestoneKey::Offset(s) => Some(s),
            MilestoneKey::Event(_) => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.interval.is_some()
    }
}

/// Offset of a percentage of `duration`, truncated to whole seconds.
pub fn percentage_offset(duration: f64, percentage: f64) -> u64 {
    (duration * percentage / 100.0).floor().max(0.0) as u64
}

/// First multiple of `interval` at or after `position`, never zero.
pub fn first_recurrence(interval: u64, position: f64) -> u64 {
    let interval = interval.max(1);
    let n = (position.max(0.0) / interval as f64).ceil().max(1.0) as u64;
    n * interval
}

/// Build the milestones `triggers` imply for a player.
///
/// `duration` is `None` when unknown or infinite, in which case percentage
/// milestones are skipped. `position` places the first recurrence of each
/// interval.
pub fn build_schedule(triggers: &Triggers, duration: Option<f64>, position: f64) -> Vec<Milestone> {
    let mut milestones: Vec<Milestone> = triggers.events.iter().map(|e| Milestone::event(e)).collect();

    match duration {
        Some(duration) => {
            let mut seen: Vec<u64> = Vec::new();
            for &pct in &triggers.percentages {
                let at = percentage_offset(duration, pct);
                // Two percentages landing on the same second fire once; first label wins.
                if at == 0 || seen.contains(&at) {
                    continue;
                }
                seen.push(at);
                milestones.push(Milestone {
                    key: MilestoneKey::Offset(at),
                    label: format!("{}%", pct),
                    interval: None,
                });
            }
        }
        None if !triggers.percentages.is_empty() => {
            debug!("duration unknown, skipping {} percentage milestones", triggers.percentages.len());
        }
        None => {}
    }

    milestones.extend(triggers.seconds.iter().map(|&s| Milestone::offset(s)));
    milestones.extend(
        triggers
            .intervals
            .iter()
            .map(|&step| Milestone::recurring(first_recurrence(step, position), step)),
    );

    milestones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriggerConfig;

    fn labels(ms: &[Milestone]) -> Vec<&str> {
        ms.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn percentages_become_absolute_seconds() {
        let t = TriggerConfig::default().with_percentages(&[10.0, 90.0], &[25.0]).normalize();
        let ms = build_schedule(&t, Some(52.0), 0.0);
        let offsets: Vec<u64> = ms.iter().filter_map(Milestone::fire_at).collect();
        assert_eq!(offsets, vec![5, 46, 13, 26, 39, 52]);
        assert_eq!(labels(&ms), vec!["10%", "90%", "25%", "50%", "75%", "100%"]);
    }

    #[test]
    fn colliding_percentages_keep_first_label() {
        let t = TriggerConfig::default().with_percentages(&[10.0, 12.0, 1.0], &[]).normalize();
        // Of 9s, 10% and 1% truncate to zero.
        let ms = build_schedule(&t, Some(9.0), 0.0);
        assert_eq!(labels(&ms), vec!["12%"]);

        // Of 20s, 10% and 12% both land on second 2.
        let ms = build_schedule(&t, Some(20.0), 0.0);
        assert_eq!(labels(&ms), vec!["10%"]);
    }

    #[test]
    fn unknown_duration_skips_only_percentages() {
        let t = TriggerConfig::events(["play"])
            .with_percentages(&[50.0], &[])
            .with_seconds(&[3.0], &[5.0])
            .normalize();
        let ms = build_schedule(&t, None, 0.0);
        assert_eq!(labels(&ms), vec!["play", "00:00:03", "00:00:05"]);
        assert_eq!(ms[0].fire_at(), None);
        assert!(ms[2].is_recurring());
    }

    #[test]
    fn first_recurrence_follows_position() {
        assert_eq!(first_recurrence(5, 0.0), 5);
        assert_eq!(first_recurrence(5, 5.0), 5);
        assert_eq!(first_recurrence(5, 5.1), 10);
        assert_eq!(first_recurrence(2, 33.0), 34);
    }

    #[test]
    fn recurring_milestone_carries_interval() {
        let m = Milestone::recurring(30, 10);
        assert_eq!(m.key, MilestoneKey::Offset(30));
        assert_eq!(m.label, "00:00:30");
        assert_eq!(m.interval, Some(10));
    }
}
