// src/sequencer/report.rs

//! Per-tick diagnostics and mission lifecycle events.

use crate::controller::PidComponents;
use crate::io::{Pose, StickCommand};
use crate::sequencer::{Phase, PlaneMode};

/// Lifecycle signal raised during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissionEvent {
    /// The outer phase changed.
    PhaseChanged {
        /// Phase before the tick.
        from: Phase,
        /// Phase after the tick.
        to: Phase,
    },
    /// The vehicle held position at a waypoint long enough.
    WaypointReached {
        /// Mission index of the waypoint.
        index: usize,
        /// Waypoints reached so far, this one included.
        count: usize,
        /// Time spent flying the leg.
        elapsed: f64,
    },
    /// The camera should be triggered.
    PhotoRequested {
        /// Mission index of the waypoint.
        index: usize,
    },
    /// A task point was completed, with or without a dwell.
    TaskCompleted {
        /// Mission index of the waypoint.
        index: usize,
        /// Task points completed so far.
        completed: usize,
        /// Task points in the mission, `None` for a patrol.
        total: Option<usize>,
    },
    /// Every task point is done.
    MissionComplete,
}

/// Everything the sequencer decided in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick counter.
    pub loop_count: u64,
    /// Phase after the tick.
    pub phase: Phase,
    /// Planar sub-state after the tick.
    pub plane_mode: PlaneMode,
    /// Human readable phase, e.g. `ALIGN  42.0%` or `MOVE-SETTLE`.
    pub phase_label: String,
    /// Target position `(x, y, z)`.
    pub target: (f64, f64, f64),
    /// Target heading in degrees.
    pub target_yaw: f64,
    /// Measured pose.
    pub current: Pose,
    /// Planar distance to the target.
    pub distance: f64,
    /// Roll stick offset.
    pub roll_offset: f64,
    /// Pitch stick offset.
    pub pitch_offset: f64,
    /// Yaw stick offset.
    pub yaw_offset: f64,
    /// Throttle offset from the vertical PID.
    pub throttle_offset: f64,
    /// Forward axis terms.
    pub forward_pid: PidComponents<f64>,
    /// Lateral axis terms.
    pub lateral_pid: PidComponents<f64>,
    /// Heading terms.
    pub yaw_pid: PidComponents<f64>,
    /// Vertical terms.
    pub vertical_pid: PidComponents<f64>,
    /// Command for the stick sink.
    pub command: StickCommand,
    /// A brake started; the host should send an emergency stop.
    pub emergency_stop: bool,
    /// Events raised this tick, in order.
    pub events: Vec<MissionEvent>,
}

/// Formats the phase label shown in status lines.
///
/// `progress` is the heading progress in percent for ALIGN and TASK.
pub fn phase_label(phase: Phase, plane_mode: PlaneMode, progress: Option<f64>) -> String {
    match (phase, progress) {
        (Phase::Task | Phase::Align, Some(percent)) => format!("{} {:5.1}%", phase, percent),
        (Phase::Move, _) => format!("{}-{}", phase, plane_mode),
        _ => phase.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test every label form.
    #[test]
    fn test_phase_labels() {
        assert_eq!(phase_label(Phase::Align, PlaneMode::Approach, Some(42.0)), "ALIGN  42.0%");
        assert_eq!(phase_label(Phase::Task, PlaneMode::Settle, Some(100.0)), "TASK 100.0%");
        assert_eq!(phase_label(Phase::Task, PlaneMode::Settle, None), "TASK");
        assert_eq!(phase_label(Phase::Vertical, PlaneMode::Settle, None), "VERT");
        assert_eq!(phase_label(Phase::Move, PlaneMode::Brake, None), "MOVE-BRAKE");
        assert_eq!(phase_label(Phase::Done, PlaneMode::Approach, Some(3.0)), "DONE");
    }
}
