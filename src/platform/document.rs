//! HTML-backed media host.
//!
//! `HtmlDocument` parses a page with `scraper`, turns every `<audio>` and
//! `<video>` element into a [`SimulatedPlayer`], and resolves CSS selectors
//! against the parsed markup. Playback is driven explicitly; each transition
//! delivers the native signals a browser would raise to a [`SignalSink`], but
//! only for event types a listener is installed for.

use super::media::{SimulatedPlayer, POSITION_EPSILON, TIMEUPDATE_INTERVAL};
use super::{MediaHost, MediaSignal, PlayerId, PlayerState, SignalSink};
use crate::coordinator::ListenerKind;
use crate::{Error, Result};
use log::{debug, trace};
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

const MEDIA_ELEMENTS: &str = "audio, video";

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct HtmlDocument {
    // `Html` is not `Send`, so the source is kept and re-parsed once per
    // distinct selector. The markup never changes after parsing.
    source: String,
    tick: f64,
    players: Mutex<Vec<SimulatedPlayer>>,
    listeners: Mutex<BTreeSet<ListenerKind>>,
    matched: Mutex<HashMap<String, Vec<PlayerId>>>,
}

impl HtmlDocument {
    /// Parse `html`. Media elements get ids `player#1`, `player#2`, ... in
    /// document order.
    pub fn parse(html: &str) -> Result<Self> {
        let media = parse_selector(MEDIA_ELEMENTS)?;
        let document = Html::parse_document(html);
        let players: Vec<SimulatedPlayer> =
            document.select(&media).map(|el| SimulatedPlayer::new(el.value().name())).collect();
        debug!("parsed document with {} media element(s)", players.len());
        Ok(HtmlDocument {
            source: html.to_string(),
            tick: TIMEUPDATE_INTERVAL,
            players: Mutex::new(players),
            listeners: Mutex::new(BTreeSet::new()),
            matched: Mutex::new(HashMap::new()),
        })
    }

    /// Raise `timeupdate` every `seconds` of playback instead of every
    /// [`TIMEUPDATE_INTERVAL`]. Large values model throttled or sparse updates.
    pub fn with_tick(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.tick = seconds;
        }
        self
    }

    /// Tag name (`audio` or `video`) of a player.
    pub fn tag(&self, id: PlayerId) -> Option<String> {
        let players = lock(&self.players);
        index(id).and_then(|i| players.get(i)).map(|p| p.tag().to_string())
    }

    /// Native listener kinds currently installed, in a stable order.
    pub fn installed_listeners(&self) -> Vec<ListenerKind> {
        lock(&self.listeners).iter().cloned().collect()
    }

    /// Load a new source of `duration` seconds (NaN for unknown).
    pub fn load(&self, id: PlayerId, duration: f64, sink: &dyn SignalSink) -> Result<()> {
        self.transition(id, sink, |p| p.load(duration))
    }

    pub fn play(&self, id: PlayerId, sink: &dyn SignalSink) -> Result<()> {
        self.transition(id, sink, SimulatedPlayer::play)
    }

    pub fn pause(&self, id: PlayerId, sink: &dyn SignalSink) -> Result<()> {
        self.transition(id, sink, SimulatedPlayer::pause)
    }

    pub fn seek(&self, id: PlayerId, seconds: f64, sink: &dyn SignalSink) -> Result<()> {
        self.transition(id, sink, |p| p.seek(seconds))
    }

    /// Play forward by `seconds`, raising a `timeupdate` every tick. Stops
    /// early when playback ends or is paused.
    ///
    /// Tick positions are multiples of the tick from the starting position,
    /// and the last one lands exactly on `start + seconds`.
    pub fn advance(&self, id: PlayerId, seconds: f64, sink: &dyn SignalSink) -> Result<()> {
        let start = self.state(id).ok_or(Error::UnknownPlayer(id))?.current_time;
        if seconds.is_nan() || seconds <= 0.0 {
            return Ok(());
        }
        let target = start + seconds;
        let mut step = 1.0;
        loop {
            let mut position = start + step * self.tick;
            if position >= target - POSITION_EPSILON {
                position = target;
            }
            let mut raised = 0;
            self.transition(id, sink, |p| {
                let events = p.advance_to(position);
                raised = events.len();
                events
            })?;
            if raised == 0 || position >= target || self.state(id).map_or(true, |s| s.ended) {
                break;
            }
            step += 1.0;
        }
        Ok(())
    }

    fn transition<F>(&self, id: PlayerId, sink: &dyn SignalSink, f: F) -> Result<()>
    where
        F: FnOnce(&mut SimulatedPlayer) -> Vec<&'static str>,
    {
        let events = {
            let mut players = lock(&self.players);
            let player = index(id).and_then(|i| players.get_mut(i)).ok_or(Error::UnknownPlayer(id))?;
            f(player)
        };
        // Delivered with no lock held: the sink reads player state back.
        for event_type in events {
            if self.is_listening(event_type) {
                sink.deliver(&MediaSignal::new(id, event_type));
            } else {
                trace!("{}: {} raised with no listener", id, event_type);
            }
        }
        Ok(())
    }

    fn is_listening(&self, event_type: &str) -> bool {
        lock(&self.listeners).iter().any(|k| k.event_type() == event_type)
    }

    // Players matching `selector`, in document order.
    fn resolve(&self, selector: &str) -> Result<Vec<PlayerId>> {
        if let Some(ids) = lock(&self.matched).get(selector) {
            return Ok(ids.clone());
        }
        let parsed = parse_selector(selector)?;
        let media = parse_selector(MEDIA_ELEMENTS)?;
        let document = Html::parse_document(&self.source);
        let ids: Vec<PlayerId> = document
            .select(&media)
            .enumerate()
            .filter(|(_, el)| parsed.matches(el))
            .map(|(i, _)| PlayerId(i as u64 + 1))
            .collect();
        trace!("'{}' matches {} player(s)", selector, ids.len());
        lock(&self.matched).insert(selector.to_string(), ids.clone());
        Ok(ids)
    }
}

fn index(id: PlayerId) -> Option<usize> {
    id.0.checked_sub(1).map(|i| i as usize)
}

impl MediaHost for HtmlDocument {
    fn players(&self) -> Vec<PlayerId> {
        (1..=lock(&self.players).len() as u64).map(PlayerId).collect()
    }

    fn matches(&self, player: PlayerId, selector: &str) -> Result<bool> {
        let known = index(player).is_some_and(|i| i < lock(&self.players).len());
        if !known {
            return Err(Error::UnknownPlayer(player));
        }
        Ok(self.resolve(selector)?.contains(&player))
    }

    fn select(&self, selector: &str) -> Result<Vec<PlayerId>> {
        self.resolve(selector)
    }

    fn state(&self, player: PlayerId) -> Option<PlayerState> {
        let players = lock(&self.players);
        index(player).and_then(|i| players.get(i)).map(SimulatedPlayer::snapshot)
    }

    fn add_listener(&self, kind: &ListenerKind) {
        lock(&self.listeners).insert(kind.clone());
    }

    fn remove_listener(&self, kind: &ListenerKind) {
        lock(&self.listeners).remove(kind);
    }
}
