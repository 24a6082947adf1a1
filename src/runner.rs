// src/runner.rs

//! # Mission Runner
//!
//! Periodic host loop around a [`WaypointSequencer`]: wait for the first
//! pose, tick at `control_frequency`, and always finish with neutral
//! sticks, whether the mission completed or was aborted.
//!
//! Time and cancellation are traits so the loop can run against a
//! simulated clock.

use crate::config::{ControlConfig, HeightSource};
use crate::error::Error;
use crate::io::{EmergencyStop, Pose, PoseSource, StickCommand, StickSink};
use crate::mission::Mission;
use crate::sequencer::WaypointSequencer;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delay between polls while waiting for the first pose.
const FIRST_POSE_POLL: f64 = 0.1;
/// Delay after a tick without a pose sample.
const MISSING_POSE_RETRY: f64 = 0.05;
/// Interval between status lines.
const STATUS_INTERVAL: f64 = 0.5;
/// Neutral commands sent when the loop stops.
const NEUTRAL_REPEATS: usize = 5;
/// Delay between those commands.
const NEUTRAL_REPEAT_INTERVAL: f64 = 0.1;

/// Source of time in seconds.
pub trait Clock {
    /// Seconds since an arbitrary fixed origin.
    fn now(&self) -> f64;

    /// Blocks for `seconds`.
    fn sleep(&self, seconds: f64);
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// A clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, seconds: f64) {
        if seconds > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

/// Cooperative cancellation, polled once per tick.
pub trait AbortSignal {
    /// Whether the mission should stop.
    fn should_abort(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn should_abort(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl AbortSignal for Arc<AtomicBool> {
    fn should_abort(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Every task point was completed.
    Completed {
        /// Control ticks executed.
        ticks: u64,
        /// Seconds from the first pose to completion.
        elapsed: f64,
    },
    /// The abort signal was raised.
    Aborted,
}

/// The I/O a run talks to.
pub struct Vehicle<'a, P, S, E> {
    /// Pose samples.
    pub pose: &'a mut P,
    /// Stick commands.
    pub sticks: &'a mut S,
    /// Brake requests.
    pub stop: &'a mut E,
}

/// Runs a mission to completion or abort.
pub struct MissionRunner {
    sequencer: WaypointSequencer,
    height_zero: Option<f64>,
}

impl MissionRunner {
    /// Validates the configuration and mission.
    pub fn new(config: ControlConfig, mission: Mission) -> Result<Self, Error> {
        Ok(MissionRunner {
            sequencer: WaypointSequencer::new(config, mission)?,
            height_zero: None,
        })
    }

    /// The wrapped sequencer.
    pub fn sequencer(&self) -> &WaypointSequencer {
        &self.sequencer
    }

    /// Reads a complete pose, applying the configured height source.
    ///
    /// With `slam_zero_at_start` the first SLAM height becomes zero.
    pub fn read_pose<P: PoseSource>(&mut self, source: &mut P) -> Option<Pose> {
        let (x, y, z) = source.get_position()?;
        let yaw = source.get_yaw()?;
        let vertical = &self.sequencer.config().vertical;
        let z = match vertical.height_source {
            HeightSource::Slam if vertical.slam_zero_at_start => {
                z - *self.height_zero.get_or_insert(z)
            }
            HeightSource::Slam => z,
            HeightSource::Relative => source.get_relative_height()?,
        };
        Some(Pose::new(x, y, z, yaw))
    }

    /// Flies the mission. Returns once DONE is reached or `abort` is
    /// raised; in both cases the vehicle is left on neutral sticks.
    pub fn run<P, S, E, C, A>(
        &mut self,
        vehicle: Vehicle<'_, P, S, E>,
        clock: &C,
        abort: &A,
    ) -> Outcome
    where
        P: PoseSource,
        S: StickSink,
        E: EmergencyStop,
        C: Clock,
        A: AbortSignal + ?Sized,
    {
        let Vehicle { pose, sticks, stop } = vehicle;

        let first = loop {
            if abort.should_abort() {
                return self.finish(sticks, clock, Outcome::Aborted);
            }
            if let Some(first) = self.read_pose(pose) {
                break first;
            }
            clock.sleep(FIRST_POSE_POLL);
        };
        let started_at = clock.now();
        self.sequencer.start(first, started_at);

        let interval = self.sequencer.config().control_interval();
        let total = self.sequencer.mission().total_tasks();
        let mut last_status: Option<f64> = None;
        loop {
            if abort.should_abort() {
                warn!("mission aborted in {}", self.sequencer.phase());
                return self.finish(sticks, clock, Outcome::Aborted);
            }
            let loop_start = clock.now();
            let Some(current) = self.read_pose(pose) else {
                clock.sleep(MISSING_POSE_RETRY);
                continue;
            };

            let report = self.sequencer.step(current, loop_start);
            if report.emergency_stop {
                stop.send_stop();
            }
            sticks.send(&report.command);

            if last_status.map_or(true, |last| loop_start - last >= STATUS_INTERVAL) {
                info!(
                    "#{:04} | WP{}/{} | {} | dist {:5.1}cm | Out:P{:+5.0}/R{:+5.0}/Y{:+5.0}",
                    report.loop_count,
                    self.sequencer.context().waypoint_index,
                    total.map_or_else(|| "-".to_string(), |total| total.to_string()),
                    report.phase_label,
                    report.distance * 100.0,
                    report.pitch_offset,
                    report.roll_offset,
                    report.yaw_offset
                );
                last_status = Some(loop_start);
            }

            if self.sequencer.is_done() {
                let outcome = Outcome::Completed {
                    ticks: report.loop_count,
                    elapsed: clock.now() - started_at,
                };
                return self.finish(sticks, clock, outcome);
            }

            clock.sleep(interval - (clock.now() - loop_start));
        }
    }

    fn finish<S: StickSink, C: Clock>(&self, sticks: &mut S, clock: &C, outcome: Outcome) -> Outcome {
        let neutral = StickCommand::neutral();
        for _ in 0..NEUTRAL_REPEATS {
            sticks.send(&neutral);
            clock.sleep(NEUTRAL_REPEAT_INTERVAL);
        }
        info!("mission finished: {:?}", outcome);
        outcome
    }
}
