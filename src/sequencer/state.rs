// src/sequencer/state.rs

//! Mutable state owned by one [`WaypointSequencer`](crate::WaypointSequencer).

use crate::mission::MissionPoint;
use crate::timer::StabilityTimer;
use core::fmt;

/// Outer phase of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Holding the task heading at a waypoint.
    Task,
    /// Turning in place toward the next waypoint.
    Align,
    /// Flying to the next waypoint.
    Move,
    /// Climbing or descending to the waypoint height.
    Vertical,
    /// Mission finished. Terminal.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Task => "TASK",
            Phase::Align => "ALIGN",
            Phase::Move => "MOVE",
            Phase::Vertical => "VERT",
            Phase::Done => "DONE",
        })
    }
}

/// Sub-state of planar control during a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneMode {
    /// Normal PID approach.
    Approach,
    /// Neutral sticks to kill residual velocity.
    Brake,
    /// High-gain final centring.
    Settle,
}

impl fmt::Display for PlaneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaneMode::Approach => "APPROACH",
            PlaneMode::Brake => "BRAKE",
            PlaneMode::Settle => "SETTLE",
        })
    }
}

/// Approach, brake and settle bookkeeping for one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneControlState {
    /// Current sub-state.
    pub mode: PlaneMode,
    /// When the brake started.
    pub brake_started_at: Option<f64>,
    /// Brakes issued on this leg.
    pub brake_count: u32,
    /// When settling started.
    pub settle_started_at: Option<f64>,
}

impl PlaneControlState {
    /// Fresh state at the start of a leg.
    pub const fn new() -> Self {
        Self {
            mode: PlaneMode::Approach,
            brake_started_at: None,
            brake_count: 0,
            settle_started_at: None,
        }
    }

    /// Position hold without any brake left, used when a mission starts
    /// on top of its first waypoint.
    pub const fn holding(now: f64, brake_max_count: u32) -> Self {
        Self {
            mode: PlaneMode::Settle,
            brake_started_at: None,
            brake_count: brake_max_count,
            settle_started_at: Some(now),
        }
    }
}

impl Default for PlaneControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase, timers and counters of a running mission.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    /// Outer phase.
    pub phase: Phase,
    /// Planar sub-state.
    pub plane: PlaneControlState,
    /// Heading hold timer (ALIGN and TASK).
    pub yaw_timer: StabilityTimer,
    /// Planar arrival timer (MOVE).
    pub plane_timer: StabilityTimer,
    /// Height arrival timer (VERTICAL).
    pub z_timer: StabilityTimer,
    /// Start of the current leg's active control.
    pub control_start_time: f64,
    /// Ticks processed.
    pub loop_count: u64,
    /// Photo already requested at this task point.
    pub task_photo_taken: bool,
    /// Task points completed.
    pub task_completed_count: usize,
}

impl ControlState {
    /// Initial state.
    pub fn new(now: f64) -> Self {
        Self {
            phase: Phase::Task,
            plane: PlaneControlState::new(),
            yaw_timer: StabilityTimer::new("yaw"),
            plane_timer: StabilityTimer::new("plane"),
            z_timer: StabilityTimer::new("height"),
            control_start_time: now,
            loop_count: 0,
            task_photo_taken: false,
            task_completed_count: 0,
        }
    }

    /// Clears per-leg state before heading for the next waypoint.
    pub fn reset_for_next_leg(&mut self, now: f64) {
        self.plane = PlaneControlState::new();
        self.yaw_timer.reset();
        self.plane_timer.reset();
        self.z_timer.reset();
        self.task_photo_taken = false;
        self.control_start_time = now;
    }
}

/// Where the mission currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionContext {
    /// Last waypoint arrived at (or the initial target).
    pub current: MissionPoint,
    /// Index of `current` in the mission.
    pub current_index: usize,
    /// Waypoints arrived at so far.
    pub waypoint_index: usize,
    /// Next leg's target and its index, computed one step ahead.
    pub move_target: Option<(usize, MissionPoint)>,
    /// Bearing of the next leg in degrees.
    pub move_yaw: Option<f64>,
}

impl MissionContext {
    /// Context positioned on the initial target.
    pub const fn new(initial: MissionPoint) -> Self {
        Self {
            current: initial,
            current_index: 0,
            waypoint_index: 0,
            move_target: None,
            move_yaw: None,
        }
    }

    /// The target of the leg being flown, falling back to `current`.
    pub fn leg_target(&self) -> MissionPoint {
        self.move_target.map_or(self.current, |(_, point)| point)
    }
}
