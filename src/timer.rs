// src/timer.rs

//! # Stability Timer
//!
//! Tracks how long a condition has held without interruption. Every phase
//! transition of the sequencer is gated on one of these timers reaching a
//! hold time, so a single good sample never counts as arrival.

use log::debug;

/// Advances a stability timer.
///
/// Returns the new `since` marker and the continuous duration in range.
/// Leaving the range always clears the timer.
pub fn update_stability_timer(
    in_range: bool,
    in_tolerance_since: Option<f64>,
    now: f64,
) -> (Option<f64>, Option<f64>) {
    match (in_range, in_tolerance_since) {
        (true, None) => (Some(now), Some(0.0)),
        (true, Some(since)) => (Some(since), Some(now - since)),
        (false, _) => (None, None),
    }
}

/// Named stability timer that logs when it starts and when it is broken.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityTimer {
    label: &'static str,
    since: Option<f64>,
}

impl StabilityTimer {
    /// Creates an idle timer.
    pub const fn new(label: &'static str) -> Self {
        Self { label, since: None }
    }

    /// Time at which the current run started.
    pub fn since(&self) -> Option<f64> {
        self.since
    }

    /// Updates the timer and returns the held duration, if in range.
    pub fn update(&mut self, in_range: bool, now: f64) -> Option<f64> {
        self.update_with(in_range, now, false)
    }

    /// Like [`update`](Self::update) but can keep quiet about leaving the range.
    pub fn update_with(&mut self, in_range: bool, now: f64, suppress_exit_log: bool) -> Option<f64> {
        let (since, duration) = update_stability_timer(in_range, self.since, now);
        match (self.since, since) {
            (None, Some(_)) => debug!("{}: entered tolerance", self.label),
            (Some(start), None) if !suppress_exit_log => {
                debug!("{}: left tolerance after {:.2}s", self.label, now - start)
            }
            _ => {}
        }
        self.since = since;
        duration
    }

    /// Clears the timer.
    pub fn reset(&mut self) {
        self.since = None;
    }
}
