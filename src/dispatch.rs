//! Dispatch passes: deciding which bound handlers a native signal triggers.
//!
//! Both passes only compute [`Invocation`]s. Running them is deferred by the
//! caller, so a dispatch pass never observes a handler's side effects.

use crate::handler::{Handler, MilestoneEvent};
use crate::platform::{PlayerId, PlayerState};
use crate::rearm::{catch_up, CatchUpPolicy};
use crate::registry::{Binding, PlayerSchedule};
use crate::time::translate_seconds;
use log::trace;
use std::ops::Bound::{Excluded, Included, Unbounded};

/// A handler call decided by a dispatch pass.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub handler: Handler,
    pub event: MilestoneEvent,
}

impl Invocation {
    fn new(handler: &Handler, player: PlayerId, label: String, seconds: u64) -> Self {
        Invocation { handler: handler.clone(), event: MilestoneEvent { player, label, seconds } }
    }

    pub fn run(self) {
        self.handler.call(&self.event)
    }
}

/// Handlers a media event triggers on `player`.
///
/// With `suppress_pause_on_end`, the `pause` browsers raise right before
/// `ended` is swallowed.
pub fn dispatch_event(
    schedule: &PlayerSchedule,
    player: PlayerId,
    event_type: &str,
    state: &PlayerState,
    suppress_pause_on_end: bool,
) -> Vec<Invocation> {
    if suppress_pause_on_end && event_type == "pause" && state.ended {
        trace!("{}: pause at end of playback suppressed", player);
        return Vec::new();
    }

    let seconds = state.current_time.max(0.0).floor() as u64;
    schedule
        .event_bindings(event_type)
        .iter()
        .map(|b| Invocation::new(&b.handler, player, event_type.to_string(), seconds))
        .collect()
}

/// Handlers a timing update triggers on `player`.
///
/// Every offset at or before `ceil(current_time)` is due. A `(handler,
/// offset)` pair fires at most once per schedule; recurring bindings fire
/// their missed points and move to their next offset unless playback ended.
pub fn dispatch_time_update(
    schedule: &mut PlayerSchedule,
    player: PlayerId,
    state: &PlayerState,
    policy: CatchUpPolicy,
) -> Vec<Invocation> {
    let seconds = state.current_time.max(0.0).ceil() as u64;
    let percentage = state.known_duration().map(|d| (seconds as f64 / d * 100.0).ceil());
    trace!("{}: timeupdate at {}s ({:?}%)", player, seconds, percentage);

    let mut out = Vec::new();
    let mut lower = Unbounded;

    // Offsets are visited in ascending order. Re-armed bindings landing at or
    // before `seconds` are picked up later in the same pass.
    while let Some(offset) = schedule.timed.range((lower, Included(seconds))).next().map(|(k, _)| *k) {
        lower = Excluded(offset);
        let Some(bindings) = schedule.timed.remove(&offset) else { continue };

        let mut kept: Vec<Binding> = Vec::with_capacity(bindings.len());
        let mut rearmed: Vec<(u64, Binding)> = Vec::new();

        for mut binding in bindings {
            let Some(step) = binding.interval else {
                if schedule.fired.insert((binding.handler.id(), offset)) {
                    out.push(Invocation::new(&binding.handler, player, binding.label.clone(), offset));
                }
                kept.push(binding);
                continue;
            };

            let rearm = catch_up(policy, offset, step, state.current_time);
            for point in rearm.points {
                if schedule.fired.insert((binding.handler.id(), point)) {
                    out.push(Invocation::new(&binding.handler, player, translate_seconds(point), point));
                }
            }

            if state.ended {
                trace!("{}: playback ended, every {}s not re-armed", player, step);
            } else {
                binding.label = translate_seconds(rearm.next);
                rearmed.push((rearm.next, binding));
            }
        }

        if !kept.is_empty() {
            schedule.timed.insert(offset, kept);
        }
        for (next, binding) in rearmed {
            schedule.timed.entry(next).or_default().push(binding);
        }
    }

    out
}
