//! Catch-up arithmetic for recurring seconds milestones.
//!
//! A recurring milestone armed at `s` with interval `step` fires when the
//! timing signal reaches `s`. If updates were sparse (a seek, a throttled
//! tab) the position may already be several intervals past `s`; every missed
//! interval point fires too, and the milestone is re-armed after the last one.

use serde::Deserialize;

/// How missed interval points are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatchUpPolicy {
    /// `missed = floor((current - s) / step)`: every interval point at or
    /// before the current position fires.
    #[default]
    Interval,
    /// Catch up only once more than a full interval was skipped, counting
    /// `missed = floor((current - s) / s)`. Kept for parity with deployments
    /// whose reports were built on that count.
    Legacy,
}

/// Result of firing a recurring milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rearm {
    /// Interval points to fire now, ascending, starting with the armed point
    pub points: Vec<u64>,
    /// Offset the milestone is re-armed at
    pub next: u64,
}

/// Points to fire for a recurring milestone armed at `armed_at`, given the
/// current playback position.
pub fn catch_up(policy: CatchUpPolicy, armed_at: u64, step: u64, current: f64) -> Rearm {
    let step = step.max(1);
    let s = armed_at as f64;

    let missed = match policy {
        CatchUpPolicy::Interval if current > s => ((current - s) / step as f64).floor() as u64,
        CatchUpPolicy::Legacy if current > s + step as f64 && armed_at > 0 => {
            ((current - s) / s).floor() as u64
        }
        _ => 0,
    };

    let points = (0..=missed).map(|i| armed_at + i * step).collect();
    Rearm { points, next: armed_at + (missed + 1) * step }
}
