//! Listener instances and the per-document context they share.
//!
//! A [`ListenerContext`] owns everything shared across instances of one
//! document: the dispatch coordinator, the milestone registry and the list of
//! subscriptions. [`MediaListener`] is the caller-facing handle exposing
//! `on`, `off` and `destroy`.

use crate::coordinator::{DispatchCoordinator, ListenerKind};
use crate::deferred::Defer;
use crate::dispatch::{dispatch_event, dispatch_time_update};
use crate::handler::Handler;
use crate::platform::{MediaHost, MediaSignal, PlayerId, SignalSink};
use crate::registry::{ListenerId, MilestoneRegistry, PlayerSchedule};
use crate::schedule::build_schedule;
use crate::trigger::{TriggerConfig, Triggers};
use crate::{Error, ListenerConfig, Result};
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Selector used when none is given: every player.
pub const ALL_PLAYERS: &str = "*";

// What one `on` call asked for, kept so schedules can be rebuilt after a
// source change or for players that show up later.
struct Subscription {
    owner: ListenerId,
    selector: String,
    handler: Handler,
    triggers: Triggers,
}

#[derive(Default)]
struct SharedState {
    coordinator: DispatchCoordinator,
    registry: MilestoneRegistry,
    subscriptions: Vec<Subscription>,
    held: HashMap<ListenerId, BTreeSet<ListenerKind>>,
    next_listener: u64,
}

/// State shared by every [`MediaListener`] of one document.
///
/// The context is also the [`SignalSink`] the host delivers native signals to.
pub struct ListenerContext {
    host: Arc<dyn MediaHost>,
    queue: Arc<dyn Defer>,
    config: ListenerConfig,
    state: Mutex<SharedState>,
}

impl ListenerContext {
    pub fn new(host: Arc<dyn MediaHost>, queue: Arc<dyn Defer>, config: ListenerConfig) -> Arc<Self> {
        Arc::new(ListenerContext { host, queue, config, state: Mutex::new(SharedState::default()) })
    }

    /// Create a new listener instance sharing this context.
    pub fn listener(self: &Arc<Self>) -> MediaListener {
        let mut state = self.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        debug!("created {}", id);
        MediaListener { id, ctx: Arc::clone(self), destroyed: AtomicBool::new(false) }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Native listener kinds currently installed on the host.
    pub fn installed_listeners(&self) -> Vec<ListenerKind> {
        self.lock().coordinator.installed()
    }

    /// Handle one native signal. Matched handlers are queued on the deferred
    /// queue, never run inline.
    pub fn dispatch(&self, signal: &MediaSignal) {
        if self.config.require_trusted && !signal.trusted {
            trace!("{}: ignoring untrusted {}", signal.player, signal.event_type);
            return;
        }
        let Some(player_state) = self.host.state(signal.player) else {
            trace!("{}: not known to host, ignoring {}", signal.player, signal.event_type);
            return;
        };

        let invocations = {
            let mut state = self.lock();
            let event_type = signal.event_type.as_str();
            let mut out = Vec::new();

            if event_type == "durationchange" && state.coordinator.is_installed(&ListenerKind::DurationChange) {
                // A new source plays from the start: recurrences count from zero.
                if state.registry.reset(signal.player) {
                    debug!("{}: source changed, schedule discarded", signal.player);
                }
                self.ensure_bound(&mut state, signal.player, 0.0);
            }

            let position = player_state.current_time;
            if event_type == "timeupdate" && state.coordinator.is_installed(&ListenerKind::TimeUpdate) {
                let schedule = self.ensure_bound(&mut state, signal.player, position);
                out.extend(dispatch_time_update(schedule, signal.player, &player_state, self.config.catch_up));
            }

            if state.coordinator.is_installed(&ListenerKind::Event(event_type.to_string())) {
                let schedule = self.ensure_bound(&mut state, signal.player, position);
                out.extend(dispatch_event(
                    schedule,
                    signal.player,
                    event_type,
                    &player_state,
                    self.config.suppress_pause_on_end,
                ));
            }
            out
        };

        if !invocations.is_empty() {
            trace!("{}: deferring {} handler calls", signal.player, invocations.len());
        }
        for invocation in invocations {
            self.queue.defer(Box::new(move || invocation.run()));
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Schedule for `player`, built from every matching subscription if the
    // player has none yet or its duration no longer matches the host.
    // `position` places the first recurrences.
    fn ensure_bound<'a>(&self, state: &'a mut SharedState, player: PlayerId, position: f64) -> &'a mut PlayerSchedule {
        let SharedState { registry, subscriptions, .. } = state;
        let duration = self.host.state(player).and_then(|s| s.known_duration());
        if registry.get(player).is_some_and(|s| s.duration != duration) {
            debug!("{}: duration is now {:?} without a source signal, rebuilding", player, duration);
            registry.reset(player);
        }
        registry.get_or_insert_with(player, || {
            let mut schedule = PlayerSchedule::new(duration);
            for sub in subscriptions.iter() {
                if self.selector_matches(player, &sub.selector) {
                    bind(&mut schedule, &sub.triggers, &sub.handler, sub.owner, position);
                }
            }
            debug!("{}: schedule built (duration {:?})", player, duration);
            schedule
        })
    }

    fn selector_matches(&self, player: PlayerId, selector: &str) -> bool {
        match self.host.matches(player, selector) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("{}: {}", player, e);
                false
            }
        }
    }

    // Bring the native listeners held by `owner` in line with its subscriptions.
    fn sync_listeners(&self, state: &mut SharedState, owner: ListenerId) {
        let mut needed = BTreeSet::new();
        for sub in state.subscriptions.iter().filter(|s| s.owner == owner) {
            needed.insert(ListenerKind::DurationChange);
            if sub.triggers.is_timed() {
                needed.insert(ListenerKind::TimeUpdate);
            }
            needed.extend(sub.triggers.events.iter().cloned().map(ListenerKind::Event));
        }

        let held = state.held.remove(&owner).unwrap_or_default();
        for kind in needed.difference(&held) {
            state.coordinator.acquire(kind, self.host.as_ref());
        }
        for kind in held.difference(&needed) {
            state.coordinator.release(kind, self.host.as_ref());
        }
        if !needed.is_empty() {
            state.held.insert(owner, needed);
        }
    }
}

impl SignalSink for ListenerContext {
    fn deliver(&self, signal: &MediaSignal) {
        self.dispatch(signal)
    }
}

fn bind(schedule: &mut PlayerSchedule, triggers: &Triggers, handler: &Handler, owner: ListenerId, position: f64) {
    for milestone in build_schedule(triggers, schedule.duration, position) {
        schedule.register(&milestone, handler, owner);
    }
}

// A selector naming a container also covers the players inside it.
fn normalize_selector(selector: Option<&str>) -> String {
    match selector.map(str::trim) {
        Some(s) if s.is_empty() => ALL_PLAYERS.to_string(),
        Some(s) if s.ends_with('*') => s.to_string(),
        Some(s) => format!("{0}, {0} *", s),
        None => ALL_PLAYERS.to_string(),
    }
}

/// One tracker: a set of registrations that can be torn down together.
///
/// Dropping a `MediaListener` destroys it.
///
/// ```
/// use medialistener::{Handler, HtmlDocument, ListenerConfig, ListenerContext, MediaHost, TaskQueue, TriggerConfig};
/// use std::sync::Arc;
///
/// # fn main() -> medialistener::Result<()> {
/// let doc = Arc::new(HtmlDocument::parse(r#"<video id="v"></video>"#)?);
/// let queue = Arc::new(TaskQueue::new());
/// let ctx = ListenerContext::new(doc.clone(), queue.clone(), ListenerConfig::default());
///
/// let listener = ctx.listener();
/// let handler = Handler::new(|e| println!("{} at {}s", e.label, e.seconds));
/// listener.on(Some("#v"), &TriggerConfig::events(["play"]), &handler)?;
///
/// let video = doc.players()[0];
/// doc.load(video, 30.0, ctx.as_ref())?;
/// doc.play(video, ctx.as_ref())?;
/// assert_eq!(queue.run_until_idle(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MediaListener {
    id: ListenerId,
    ctx: Arc<ListenerContext>,
    destroyed: AtomicBool,
}

impl MediaListener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Register `handler` for the milestones `config` describes on every
    /// player matching `selector` (all players when `None`).
    ///
    /// Registering the same handler for a milestone it is already bound to
    /// does nothing. Matching no players is not an error: the registration
    /// applies to matching players when they first emit a signal.
    pub fn on(&self, selector: Option<&str>, config: &TriggerConfig, handler: &Handler) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::Destroyed);
        }
        let selector = normalize_selector(selector);
        let triggers = config.normalize();
        if triggers.is_empty() {
            debug!("{}: nothing to register for '{}'", self.id, selector);
            return Ok(());
        }

        let players = self.ctx.host.select(&selector)?;
        if players.is_empty() {
            debug!("{}: no players match '{}' yet", self.id, selector);
        }

        let mut guard = self.ctx.lock();
        let state = &mut *guard;
        let existing = state
            .subscriptions
            .iter_mut()
            .find(|s| s.owner == self.id && s.selector == selector && s.handler == *handler);
        match existing {
            Some(sub) => merge(&mut sub.triggers, &triggers),
            None => state.subscriptions.push(Subscription {
                owner: self.id,
                selector: selector.clone(),
                handler: handler.clone(),
                triggers: triggers.clone(),
            }),
        }

        for player in players {
            // A fresh schedule already includes the subscription recorded above.
            let fresh = state.registry.get(player).is_none();
            let position = self.ctx.host.state(player).map(|s| s.current_time).unwrap_or(0.0);
            let schedule = self.ctx.ensure_bound(state, player, position);
            if !fresh {
                bind(schedule, &triggers, handler, self.id, position);
            }
        }

        self.ctx.sync_listeners(state, self.id);
        debug!("{}: registered {:?} on '{}'", self.id, handler, selector);
        Ok(())
    }

    /// Unregister `handler` from the milestones `config` describes. Bindings
    /// that do not exist are ignored.
    ///
    /// Timed bindings are removed by offset. A percentage of this handler
    /// that lands on the same second as a removed second offset (or the
    /// reverse) is gone for the current source, but the registration keeps
    /// it: it is bound again after the next source change.
    pub fn off(&self, selector: Option<&str>, config: &TriggerConfig, handler: &Handler) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        let selector = normalize_selector(selector);
        let triggers = config.normalize();

        let mut guard = self.ctx.lock();
        let state = &mut *guard;
        for sub in state.subscriptions.iter_mut() {
            if sub.owner == self.id && sub.selector == selector && sub.handler == *handler {
                sub.triggers.remove(&triggers);
            }
        }
        state.subscriptions.retain(|s| !s.triggers.is_empty());

        let SharedState { registry, subscriptions, .. } = &mut *state;
        for (player, schedule) in registry.iter_mut() {
            if !self.ctx.selector_matches(player, &selector) {
                continue;
            }
            for milestone in build_schedule(&triggers, schedule.duration, 0.0) {
                schedule.unregister(&milestone, handler, self.id);
            }
            // Other selectors of this instance may still want some of them.
            let position = self.ctx.host.state(player).map(|s| s.current_time).unwrap_or(0.0);
            for sub in subscriptions.iter() {
                if sub.owner == self.id
                    && sub.handler == *handler
                    && sub.selector != selector
                    && self.ctx.selector_matches(player, &sub.selector)
                {
                    bind(schedule, &sub.triggers, handler, self.id, position);
                }
            }
        }
        registry.drop_empty();

        self.ctx.sync_listeners(state, self.id);
        debug!("{}: unregistered {:?} on '{}'", self.id, handler, selector);
        Ok(())
    }

    /// Remove every registration of this instance and release the native
    /// listeners no other instance needs. Calls already queued still run.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.ctx.lock();
        state.subscriptions.retain(|s| s.owner != self.id);
        state.registry.remove_owner(self.id);
        self.ctx.sync_listeners(&mut state, self.id);
        debug!("destroyed {}", self.id);
    }
}

impl Drop for MediaListener {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn merge(into: &mut Triggers, from: &Triggers) {
    for e in &from.events {
        if !into.events.contains(e) {
            into.events.push(e.clone());
        }
    }
    for p in &from.percentages {
        if !into.percentages.contains(p) {
            into.percentages.push(*p);
        }
    }
    for s in &from.seconds {
        if !into.seconds.contains(s) {
            into.seconds.push(*s);
        }
    }
    for s in &from.intervals {
        if !into.intervals.contains(s) {
            into.intervals.push(*s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_defaults_to_all_players() {
        assert_eq!(normalize_selector(None), "*");
        assert_eq!(normalize_selector(Some("  ")), "*");
        assert_eq!(normalize_selector(Some(" video#main ")), "video#main, video#main *");
        assert_eq!(normalize_selector(Some("#wrap *")), "#wrap *");
    }

    #[test]
    fn merge_appends_missing_triggers() {
        let mut t = TriggerConfig::events(["play"]).normalize();
        merge(&mut t, &TriggerConfig::events(["play", "pause"]).with_seconds(&[5.0], &[]).normalize());
        assert_eq!(t.events, vec!["play", "pause"]);
        assert_eq!(t.seconds, vec![5]);
    }
}
