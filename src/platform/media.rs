//! Simulated media playback for deterministic tests and replays

use super::PlayerState;

/// Interval between `timeupdate` signals while playing, in seconds.
pub const TIMEUPDATE_INTERVAL: f64 = 0.25;

/// Positions this close to the duration count as the end.
pub const POSITION_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Playing,
    Paused,
    Ended,
}

/// In-memory media element.
///
/// Each transition returns the native event names it raises, in the order a
/// browser raises them.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    tag: String,
    current_time: f64,
    duration: f64,
    state: MediaState,
}

impl SimulatedPlayer {
    pub fn new(tag: &str) -> Self {
        SimulatedPlayer {
            tag: tag.to_ascii_lowercase(),
            current_time: 0.0,
            duration: f64::NAN,
            state: MediaState::Paused,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            current_time: self.current_time,
            duration: self.duration,
            ended: self.state == MediaState::Ended,
        }
    }

    /// Load a new source. NaN or infinite durations model unknown lengths and streams.
    pub fn load(&mut self, duration: f64) -> Vec<&'static str> {
        let mut events = Vec::new();
        if self.state == MediaState::Playing {
            events.push("pause");
        }
        self.current_time = 0.0;
        self.state = MediaState::Paused;
        self.duration = duration;
        events.extend(["durationchange", "loadedmetadata"]);
        events
    }

    pub fn play(&mut self) -> Vec<&'static str> {
        match self.state {
            MediaState::Playing => Vec::new(),
            MediaState::Paused => {
                self.state = MediaState::Playing;
                vec!["play", "playing"]
            }
            MediaState::Ended => {
                // Playing an ended element restarts it from the beginning.
                self.current_time = 0.0;
                self.state = MediaState::Playing;
                vec!["play", "seeking", "timeupdate", "seeked", "playing"]
            }
        }
    }

    pub fn pause(&mut self) -> Vec<&'static str> {
        if self.state != MediaState::Playing {
            return Vec::new();
        }
        self.state = MediaState::Paused;
        vec!["timeupdate", "pause"]
    }

    pub fn seek(&mut self, seconds: f64) -> Vec<&'static str> {
        let was_playing = self.state == MediaState::Playing;
        self.current_time = self.clamp(seconds);
        if self.state == MediaState::Ended {
            self.state = MediaState::Paused;
        }
        let mut events = vec!["seeking", "timeupdate", "seeked"];
        if self.at_end() {
            events.extend(self.finish(was_playing));
        }
        events
    }

    /// Play forward by `seconds`; does nothing unless playing.
    pub fn advance(&mut self, seconds: f64) -> Vec<&'static str> {
        self.advance_to(self.current_time + seconds)
    }

    /// Play forward to `position`. Positions at or behind the current one
    /// raise nothing.
    pub fn advance_to(&mut self, position: f64) -> Vec<&'static str> {
        if self.state != MediaState::Playing || position <= self.current_time {
            return Vec::new();
        }
        self.current_time = self.clamp(position);
        let mut events = vec!["timeupdate"];
        if self.at_end() {
            events.extend(self.finish(true));
        }
        events
    }

    fn finish(&mut self, was_playing: bool) -> Vec<&'static str> {
        self.state = MediaState::Ended;
        if was_playing {
            vec!["pause", "ended"]
        } else {
            vec!["ended"]
        }
    }

    fn at_end(&self) -> bool {
        self.duration.is_finite() && self.current_time >= self.duration
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = seconds.max(0.0);
        if self.duration.is_finite() && seconds >= self.duration - POSITION_EPSILON {
            self.duration
        } else {
            seconds
        }
    }
}
