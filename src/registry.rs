//! Per-player milestone registry.
//!
//! Each player owns a [`PlayerSchedule`]: event bindings keyed by event name,
//! timed bindings keyed by absolute second offset, and the invocation cache
//! recording which `(handler, offset)` pairs already fired this epoch.
//!
//! Bindings are shared by every listener instance of a document. A binding
//! remembers which instances registered it and only disappears once none of
//! them want it any more.

use crate::handler::{Handler, HandlerId};
use crate::platform::PlayerId;
use crate::schedule::{Milestone, MilestoneKey};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Identity of one [`MediaListener`](crate::MediaListener) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A handler bound under one milestone key.
#[derive(Debug, Clone)]
pub struct Binding {
    pub handler: Handler,
    pub label: String,
    /// Recurring interval; the binding moves to a new offset each time it fires
    pub interval: Option<u64>,
    owners: BTreeSet<ListenerId>,
}

impl Binding {
    fn new(milestone: &Milestone, handler: &Handler, owner: ListenerId) -> Self {
        Binding {
            handler: handler.clone(),
            label: milestone.label.clone(),
            interval: milestone.interval,
            owners: BTreeSet::from([owner]),
        }
    }

    pub fn owners(&self) -> impl Iterator<Item = ListenerId> + '_ {
        self.owners.iter().copied()
    }
}

/// Milestones of one player for one duration epoch.
#[derive(Debug, Default)]
pub struct PlayerSchedule {
    /// Duration the percentage offsets were computed from
    pub duration: Option<f64>,
    pub(crate) events: HashMap<String, Vec<Binding>>,
    pub(crate) timed: BTreeMap<u64, Vec<Binding>>,
    pub(crate) fired: HashSet<(HandlerId, u64)>,
}

impl PlayerSchedule {
    pub fn new(duration: Option<f64>) -> Self {
        PlayerSchedule { duration, ..Default::default() }
    }

    /// Bind `handler` to `milestone` on behalf of `owner`.
    ///
    /// Returns `false` when the handler was already bound there; the owner
    /// is still recorded so it must release the binding too.
    pub fn register(&mut self, milestone: &Milestone, handler: &Handler, owner: ListenerId) -> bool {
        if let Some(existing) = self.find_mut(milestone, handler) {
            existing.owners.insert(owner);
            return false;
        }

        let binding = Binding::new(milestone, handler, owner);
        match &milestone.key {
            MilestoneKey::Event(name) => self.events.entry(name.clone()).or_default().push(binding),
            MilestoneKey::Offset(at) => self.timed.entry(*at).or_default().push(binding),
        }
        true
    }

    /// Drop `owner`'s interest in `handler` at `milestone`. Returns `true` if
    /// the binding was removed entirely. Unknown bindings are ignored.
    pub fn unregister(&mut self, milestone: &Milestone, handler: &Handler, owner: ListenerId) -> bool {
        let Some(binding) = self.find_mut(milestone, handler) else {
            return false;
        };
        binding.owners.remove(&owner);
        if !binding.owners.is_empty() {
            return false;
        }
        self.prune();
        true
    }

    /// Drop every binding interest of `owner`.
    pub fn remove_owner(&mut self, owner: ListenerId) {
        for binding in self.bindings_mut() {
            binding.owners.remove(&owner);
        }
        self.prune();
    }

    /// Handlers bound to a media event, in registration order.
    pub fn event_bindings(&self, event_type: &str) -> &[Binding] {
        self.events.get(event_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Timed bindings at an offset, in registration order.
    pub fn bindings_at(&self, offset: u64) -> &[Binding] {
        self.timed.get(&offset).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Offsets that currently hold bindings, ascending.
    pub fn offsets(&self) -> Vec<u64> {
        self.timed.keys().copied().collect()
    }

    pub fn has_fired(&self, handler: &Handler, offset: u64) -> bool {
        self.fired.contains(&(handler.id(), offset))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.timed.is_empty()
    }

    fn find_mut(&mut self, milestone: &Milestone, handler: &Handler) -> Option<&mut Binding> {
        let id = handler.id();
        match (&milestone.key, milestone.interval) {
            (MilestoneKey::Event(name), _) => {
                self.events.get_mut(name)?.iter_mut().find(|b| b.handler.id() == id)
            }
            (MilestoneKey::Offset(at), None) => self
                .timed
                .get_mut(at)?
                .iter_mut()
                .find(|b| b.interval.is_none() && b.handler.id() == id),
            // Recurring bindings move as they fire: match on interval wherever they are.
            (MilestoneKey::Offset(_), Some(step)) => self
                .timed
                .values_mut()
                .flatten()
                .find(|b| b.interval == Some(step) && b.handler.id() == id),
        }
    }

    fn bindings_mut(&mut self) -> impl Iterator<Item = &mut Binding> {
        self.events.values_mut().flatten().chain(self.timed.values_mut().flatten())
    }

    fn prune(&mut self) {
        for list in self.events.values_mut().chain(self.timed.values_mut()) {
            list.retain(|b| !b.owners.is_empty());
        }
        self.events.retain(|_, list| !list.is_empty());
        self.timed.retain(|_, list| !list.is_empty());
    }
}

/// Schedules of every player seen so far.
#[derive(Debug, Default)]
pub struct MilestoneRegistry {
    players: HashMap<PlayerId, PlayerSchedule>,
}

impl MilestoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerSchedule> {
        self.players.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut PlayerSchedule> {
        self.players.get_mut(&player)
    }

    pub fn insert(&mut self, player: PlayerId, schedule: PlayerSchedule) -> &mut PlayerSchedule {
        let slot = self.players.entry(player).or_default();
        *slot = schedule;
        slot
    }

    pub fn get_or_insert_with<F>(&mut self, player: PlayerId, build: F) -> &mut PlayerSchedule
    where
        F: FnOnce() -> PlayerSchedule,
    {
        self.players.entry(player).or_insert_with(build)
    }

    /// Forget a player's schedule and invocation cache (new source loaded).
    pub fn reset(&mut self, player: PlayerId) -> bool {
        self.players.remove(&player).is_some()
    }

    /// Drop every binding interest of `owner`. Players left with no bindings
    /// lose their schedule and invocation cache.
    pub fn remove_owner(&mut self, owner: ListenerId) {
        for schedule in self.players.values_mut() {
            schedule.remove_owner(owner);
        }
        self.drop_empty();
    }

    /// Forget players whose schedule holds no bindings.
    pub fn drop_empty(&mut self) {
        self.players.retain(|_, schedule| !schedule.is_empty());
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut PlayerSchedule)> {
        self.players.iter_mut().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
