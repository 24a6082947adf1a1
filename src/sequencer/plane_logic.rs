// src/sequencer/plane_logic.rs

//! # Approach, Brake and Settle
//!
//! One planar control step per tick. The sub-states are evaluated in
//! order APPROACH, BRAKE, SETTLE and a transition falls through to the
//! next state within the same tick, so entering BRAKE issues the neutral
//! command immediately and leaving it can hand over to SETTLE at once.

use crate::config::BrakeConfig;
use crate::controller::{PlaneController, PlaneOutput};
use crate::io::stick_value;
use crate::sequencer::{PlaneControlState, PlaneMode};
use log::debug;

/// What the planar loop wants sent this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneCommand {
    /// Absolute roll and pitch sticks.
    Sticks {
        /// Roll stick.
        roll: i32,
        /// Pitch stick.
        pitch: i32,
    },
    /// Every axis centred.
    Neutral,
}

/// Result of [`plane_control_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneStep {
    /// Controller output, zero when no PID ran.
    pub output: PlaneOutput,
    /// Command to send, if any.
    pub command: Option<PlaneCommand>,
    /// A brake started this tick.
    pub emergency_stop: bool,
}

/// Runs one tick of the planar sub-state machine on a body-frame error.
#[allow(clippy::too_many_arguments)]
pub fn plane_control_step(
    state: &mut PlaneControlState,
    config: &BrakeConfig,
    approach: &mut PlaneController,
    settle: &mut PlaneController,
    error_forward: f64,
    error_lateral: f64,
    distance: f64,
    now: f64,
) -> PlaneStep {
    let mut step = PlaneStep {
        output: PlaneOutput::default(),
        command: None,
        emergency_stop: false,
    };

    if state.mode == PlaneMode::Approach {
        if distance <= config.brake_distance && state.brake_count < config.brake_max_count {
            debug!("plane: brake at {:.3} m", distance);
            state.mode = PlaneMode::Brake;
            state.brake_started_at = Some(now);
            state.brake_count += 1;
            approach.reset();
            settle.reset();
            step.emergency_stop = true;
        } else if distance <= config.settle_distance {
            debug!("plane: settle at {:.3} m", distance);
            state.mode = PlaneMode::Settle;
            settle.reset();
            state.settle_started_at = Some(now);
        } else {
            step.output = approach.compute(error_forward, error_lateral, 0.0, 0.0, now);
            step.command = Some(sticks(&step.output));
        }
    }

    if state.mode == PlaneMode::Brake {
        let started = *state.brake_started_at.get_or_insert(now);
        step.command = Some(PlaneCommand::Neutral);
        if now - started >= config.brake_hold_time {
            debug!("plane: brake released");
            state.mode = PlaneMode::Settle;
            settle.reset();
            state.settle_started_at = Some(now);
        }
    }

    if state.mode == PlaneMode::Settle {
        let timed_out = state
            .settle_started_at
            .map_or(false, |started| now - started >= config.settle_timeout);
        if distance > config.settle_distance || timed_out {
            debug!(
                "plane: back to approach ({:.3} m{})",
                distance,
                if timed_out { ", settle timed out" } else { "" }
            );
            state.mode = PlaneMode::Approach;
            approach.reset();
            state.settle_started_at = None;
        } else {
            step.output = settle.compute(error_forward, error_lateral, 0.0, 0.0, now);
            step.command = Some(sticks(&step.output));
        }
    }

    step
}

fn sticks(output: &PlaneOutput) -> PlaneCommand {
    PlaneCommand::Sticks {
        roll: stick_value(output.roll_offset),
        pitch: stick_value(output.pitch_offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;

    struct Fixture {
        state: PlaneControlState,
        config: BrakeConfig,
        approach: PlaneController,
        settle: PlaneController,
    }

    impl Fixture {
        fn new() -> Self {
            let config = ControlConfig::default();
            Fixture {
                state: PlaneControlState::new(),
                config: config.brake,
                approach: PlaneController::with_config(config.approach_controller()),
                settle: PlaneController::with_config(config.settle_controller()),
            }
        }

        fn step(&mut self, distance: f64, now: f64) -> PlaneStep {
            plane_control_step(
                &mut self.state,
                &self.config,
                &mut self.approach,
                &mut self.settle,
                distance,
                0.0,
                distance,
                now,
            )
        }
    }

    /// Test that far away the approach controller drives the sticks.
    #[test]
    fn test_approach_outside_brake_distance() {
        let mut fixture = Fixture::new();

        let step = fixture.step(1.0, 0.0);

        assert_eq!(fixture.state.mode, PlaneMode::Approach);
        assert!(!step.emergency_stop);
        assert!(
            matches!(step.command, Some(PlaneCommand::Sticks { pitch, .. }) if pitch > 1024),
            "Forward error should push the pitch stick forward."
        );
    }

    /// Test brake entry, hold and hand-over to settle.
    #[test]
    fn test_brake_then_settle() {
        let mut fixture = Fixture::new();

        let step = fixture.step(0.12, 0.0);
        assert_eq!(fixture.state.mode, PlaneMode::Brake);
        assert!(step.emergency_stop, "Entering brake sends a stop.");
        assert_eq!(step.command, Some(PlaneCommand::Neutral));

        let step = fixture.step(0.12, 0.25);
        assert_eq!(fixture.state.mode, PlaneMode::Brake);
        assert!(!step.emergency_stop, "The stop is sent once.");
        assert_eq!(step.command, Some(PlaneCommand::Neutral));

        let step = fixture.step(0.12, 0.5);
        assert_eq!(fixture.state.mode, PlaneMode::Settle);
        assert!(
            matches!(step.command, Some(PlaneCommand::Sticks { .. })),
            "Settle takes over in the same tick."
        );
    }

    /// Test that a second crossing of the brake distance does not brake again.
    #[test]
    fn test_brake_is_one_shot() {
        let mut fixture = Fixture::new();

        let _ = fixture.step(0.25, 0.0);
        assert_eq!(fixture.state.mode, PlaneMode::Brake);
        let _ = fixture.step(0.25, 1.0);
        assert_eq!(
            fixture.state.mode,
            PlaneMode::Approach,
            "Released outside the settle radius, control returns to approach."
        );

        let _ = fixture.step(0.6, 1.1);
        let step = fixture.step(0.25, 1.2);
        assert_eq!(fixture.state.mode, PlaneMode::Approach, "Brake budget is spent.");
        assert!(!step.emergency_stop);
        assert_eq!(fixture.state.brake_count, 1);

        let _ = fixture.step(0.1, 1.3);
        assert_eq!(fixture.state.mode, PlaneMode::Settle);
    }

    /// Test the fall-backs out of settle.
    #[test]
    fn test_settle_exits() {
        let mut fixture = Fixture::new();
        fixture.state = PlaneControlState::holding(0.0, 1);

        let _ = fixture.step(0.05, 1.0);
        assert_eq!(fixture.state.mode, PlaneMode::Settle);

        let step = fixture.step(0.2, 1.1);
        assert_eq!(fixture.state.mode, PlaneMode::Approach, "Drifting out re-approaches.");
        assert_eq!(step.command, None, "No command on the hand-over tick.");

        let _ = fixture.step(0.05, 1.2);
        assert_eq!(fixture.state.mode, PlaneMode::Settle);
        let _ = fixture.step(0.05, 6.2);
        assert_eq!(fixture.state.mode, PlaneMode::Approach, "A stuck settle times out.");
    }
}
