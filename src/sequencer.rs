// src/sequencer.rs

//! # Waypoint Sequencer
//!
//! The outer phase machine of a mission. Every tick takes one pose sample
//! and produces one [`TickReport`] whose `command` is the stick update to
//! send:
//!
//! ```text
//!   ALIGN -> MOVE -> VERTICAL -> TASK -> ALIGN -> ... -> DONE
//!                        \________________/
//!                     (point without a task)
//! ```
//!
//! - **ALIGN** turns in place toward the bearing of the next leg.
//! - **MOVE** flies the leg with the approach/brake/settle machine in
//!   [`plane_logic`] while holding the bearing.
//! - **VERTICAL** corrects height while holding position and heading.
//! - **TASK** holds the waypoint's task heading for `task_hold_time`.
//! - **DONE** only ever sends neutral sticks.
//!
//! Each transition is gated by a [`StabilityTimer`](crate::StabilityTimer)
//! and resets the controllers it hands over from.

use crate::angle::{bearing, world_to_body};
use crate::config::ControlConfig;
use crate::controller::{AxisPid, PidComponents, PlaneController, YawOnlyController};
use crate::error::Error;
use crate::io::{stick_value, throttle_value, Pose, StickCommand};
use crate::mission::{Mission, MissionPoint};
use log::{info, trace};

pub mod plane_logic;
pub mod report;
pub mod state;

pub use plane_logic::*;
pub use report::*;
pub use state::*;

/// Accumulates the outputs of one tick.
struct Tick {
    events: Vec<MissionEvent>,
    command: StickCommand,
    emergency_stop: bool,
    progress: Option<(Phase, f64)>,
    distance: Option<f64>,
    roll_offset: f64,
    pitch_offset: f64,
    yaw_offset: f64,
    throttle_offset: f64,
    forward_pid: PidComponents<f64>,
    lateral_pid: PidComponents<f64>,
    yaw_pid: PidComponents<f64>,
    vertical_pid: PidComponents<f64>,
}

impl Tick {
    fn new() -> Self {
        Tick {
            events: Vec::new(),
            command: StickCommand::default(),
            emergency_stop: false,
            progress: None,
            distance: None,
            roll_offset: 0.0,
            pitch_offset: 0.0,
            yaw_offset: 0.0,
            throttle_offset: 0.0,
            forward_pid: PidComponents::default(),
            lateral_pid: PidComponents::default(),
            yaw_pid: PidComponents::default(),
            vertical_pid: PidComponents::default(),
        }
    }
}

/// Drives a vehicle through a [`Mission`].
pub struct WaypointSequencer {
    config: ControlConfig,
    mission: Mission,
    approach: PlaneController,
    settle: PlaneController,
    yaw: YawOnlyController,
    vertical: AxisPid<f64>,
    state: ControlState,
    context: MissionContext,
    started: bool,
}

impl WaypointSequencer {
    /// Validates `config` and prepares the controllers.
    pub fn new(config: ControlConfig, mission: Mission) -> Result<Self, Error> {
        config.validate()?;
        let context = MissionContext::new(*mission.initial());
        Ok(WaypointSequencer {
            approach: PlaneController::with_config(config.approach_controller()),
            settle: PlaneController::with_config(config.settle_controller()),
            yaw: YawOnlyController::with_config(config.yaw_controller()),
            vertical: AxisPid::with_config(config.vertical_controller()),
            state: ControlState::new(0.0),
            context,
            started: false,
            config,
            mission,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// The mission being flown.
    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    /// Current outer phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether the mission is finished.
    pub fn is_done(&self) -> bool {
        self.state.phase == Phase::Done
    }

    /// Phase, timers and counters.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Waypoint bookkeeping.
    pub fn context(&self) -> &MissionContext {
        &self.context
    }

    /// Chooses the first phase from the first pose.
    ///
    /// Already on the initial target: TASK. Above or below it: VERTICAL.
    /// Anywhere else: ALIGN toward it. Called by the first
    /// [`step`](Self::step) if the host does not call it.
    pub fn start(&mut self, pose: Pose, now: f64) -> Phase {
        self.state = ControlState::new(now);
        self.context = MissionContext::new(*self.mission.initial());
        self.reset_controllers();
        self.vertical.reset();

        let initial = self.context.current;
        let distance = PlaneController::distance(initial.x, initial.y, pose.x, pose.y);
        let on_height = (pose.z - initial.z).abs() <= self.config.vertical.tolerance;
        let hold = PlaneControlState::holding(now, self.config.brake.brake_max_count);

        self.state.phase = if distance <= self.config.plane.tolerance_xy && on_height {
            self.state.plane = hold;
            Phase::Task
        } else if distance <= self.config.plane.tolerance_xy {
            self.state.plane = hold;
            Phase::Vertical
        } else {
            self.context.move_target = Some((0, initial));
            self.context.move_yaw = Some(bearing(pose.x, pose.y, initial.x, initial.y));
            Phase::Align
        };
        self.started = true;
        info!(
            "mission start at ({:.2}, {:.2}, {:.2}) in {}, {} task points",
            pose.x,
            pose.y,
            pose.z,
            self.state.phase,
            self.mission
                .total_tasks()
                .map_or_else(|| "unbounded".to_string(), |total| total.to_string())
        );
        self.state.phase
    }

    /// Runs one control tick on `pose` at time `now` (seconds).
    pub fn step(&mut self, pose: Pose, now: f64) -> TickReport {
        if !self.started {
            self.start(pose, now);
        }
        self.state.loop_count += 1;
        let mut tick = Tick::new();

        let (target, target_yaw) = match self.state.phase {
            Phase::Align | Phase::Move => (
                self.context.leg_target(),
                self.context.move_yaw.unwrap_or(pose.yaw),
            ),
            _ => (self.context.current, self.context.current.yaw),
        };

        match self.state.phase {
            Phase::Task => self.task_step(pose, now, &mut tick),
            Phase::Align => self.align_step(pose, now, &mut tick),
            Phase::Move | Phase::Vertical => self.position_step(pose, now, &mut tick),
            Phase::Done => {}
        }

        if self.state.phase == Phase::Done {
            tick.command = StickCommand::neutral();
        }
        self.report(pose, target, target_yaw, tick)
    }

    fn report(&self, pose: Pose, target: MissionPoint, target_yaw: f64, tick: Tick) -> TickReport {
        let phase = self.state.phase;
        let progress = tick
            .progress
            .and_then(|(measured, percent)| (measured == phase).then_some(percent));
        let report = TickReport {
            loop_count: self.state.loop_count,
            phase,
            plane_mode: self.state.plane.mode,
            phase_label: phase_label(phase, self.state.plane.mode, progress),
            target: (target.x, target.y, target.z),
            target_yaw,
            current: pose,
            distance: tick
                .distance
                .unwrap_or_else(|| PlaneController::distance(target.x, target.y, pose.x, pose.y)),
            roll_offset: tick.roll_offset,
            pitch_offset: tick.pitch_offset,
            yaw_offset: tick.yaw_offset,
            throttle_offset: tick.throttle_offset,
            forward_pid: tick.forward_pid,
            lateral_pid: tick.lateral_pid,
            yaw_pid: tick.yaw_pid,
            vertical_pid: tick.vertical_pid,
            command: tick.command,
            emergency_stop: tick.emergency_stop,
            events: tick.events,
        };
        trace!(
            "#{:04} {} target ({:+.2}, {:+.2}, {:+.2}, {:+.1}) current ({:+.2}, {:+.2}, {:+.2}, {:+.1}) dist {:.3} out P{:+.0}/R{:+.0}/Y{:+.0}/T{:+.0}",
            report.loop_count,
            report.phase_label,
            report.target.0,
            report.target.1,
            report.target.2,
            report.target_yaw,
            pose.x,
            pose.y,
            pose.z,
            pose.yaw,
            report.distance,
            report.pitch_offset,
            report.roll_offset,
            report.yaw_offset,
            report.throttle_offset
        );
        report
    }

    fn task_step(&mut self, pose: Pose, now: f64, tick: &mut Tick) {
        let target_yaw = self.context.current.yaw;
        let error = YawOnlyController::error(target_yaw, pose.yaw);
        tick.progress = Some((Phase::Task, self.heading_progress(error)));

        let held = self
            .state
            .yaw_timer
            .update(error < self.config.yaw.tolerance, now);
        if held == Some(0.0) && !self.state.task_photo_taken {
            let index = self.context.current_index;
            if !self.mission.is_final(index) && self.mission.task_required(index) {
                info!("photo at waypoint {}", index);
                tick.events.push(MissionEvent::PhotoRequested { index });
            }
            self.state.task_photo_taken = true;
        }
        if held.map_or(false, |held| held >= self.config.task_hold_time) {
            // The yaw loop starts fresh on the next heading.
            self.yaw.reset();
            self.complete_task(now, tick);
            return;
        }

        self.yaw_step(target_yaw, pose.yaw, now, tick);
    }

    fn align_step(&mut self, pose: Pose, now: f64, tick: &mut Tick) {
        self.ensure_move_target();
        let target_yaw = self.context.move_yaw.unwrap_or(pose.yaw);
        let error = YawOnlyController::error(target_yaw, pose.yaw);
        tick.progress = Some((Phase::Align, self.heading_progress(error)));

        let held = self
            .state
            .yaw_timer
            .update(error < self.config.yaw.tolerance, now);
        if held.map_or(false, |held| held >= self.config.yaw.arrival_stable_time) {
            self.yaw.reset();
            self.state.yaw_timer.reset();
            self.state.control_start_time = now;
            self.set_phase(Phase::Move, tick);
        }

        self.yaw_step(target_yaw, pose.yaw, now, tick);
    }

    /// MOVE and VERTICAL: planar control toward the leg target (MOVE) or
    /// hold over the arrived waypoint (VERTICAL), heading hold on the leg
    /// bearing, and the height loop in VERTICAL.
    fn position_step(&mut self, pose: Pose, now: f64, tick: &mut Tick) {
        let target = match self.state.phase {
            Phase::Move => self.context.leg_target(),
            _ => self.context.current,
        };
        let yaw_for_control = if pose.yaw.abs() <= self.config.plane.yaw_zero_threshold_deg {
            0.0
        } else {
            pose.yaw
        };
        let (error_forward, error_lateral) =
            world_to_body(target.x - pose.x, target.y - pose.y, yaw_for_control);
        let distance = PlaneController::distance(target.x, target.y, pose.x, pose.y);
        tick.distance = Some(distance);

        let heading = self.context.move_yaw.unwrap_or(self.context.current.yaw);
        self.yaw_step(heading, pose.yaw, now, tick);

        if self.state.phase == Phase::Move {
            let braking = self.state.plane.mode == PlaneMode::Brake;
            let held = self.state.plane_timer.update_with(
                distance < self.config.plane.tolerance_xy,
                now,
                braking,
            );
            let cooled_down = match (braking, self.state.plane.brake_started_at) {
                (true, Some(started)) => now - started >= self.config.brake.brake_hold_time,
                _ => true,
            };
            if cooled_down
                && held.map_or(false, |held| held >= self.config.plane.arrival_stable_time)
            {
                self.arrive(distance, now, tick);
            }
        }

        if self.state.phase == Phase::Vertical {
            self.vertical_step(pose, now, tick);
        }

        if matches!(self.state.phase, Phase::Move | Phase::Vertical | Phase::Task) {
            let step = plane_control_step(
                &mut self.state.plane,
                &self.config.brake,
                &mut self.approach,
                &mut self.settle,
                error_forward,
                error_lateral,
                distance,
                now,
            );
            tick.roll_offset = step.output.roll_offset;
            tick.pitch_offset = step.output.pitch_offset;
            tick.forward_pid = step.output.forward;
            tick.lateral_pid = step.output.lateral;
            if step.emergency_stop {
                info!("brake at {:.3} m from waypoint", distance);
                tick.emergency_stop = true;
            }
            match step.command {
                Some(PlaneCommand::Sticks { roll, pitch }) => {
                    tick.command.roll = Some(roll);
                    tick.command.pitch = Some(pitch);
                }
                Some(PlaneCommand::Neutral) => tick.command = StickCommand::neutral(),
                None => {}
            }
        }
    }

    fn vertical_step(&mut self, pose: Pose, now: f64, tick: &mut Tick) {
        let error = self.context.current.z - pose.z;
        let held = self
            .state
            .z_timer
            .update(error.abs() <= self.config.vertical.tolerance, now);

        if held.map_or(false, |held| held >= self.config.vertical.arrival_stable_time) {
            self.vertical.reset();
            self.yaw.reset();
            self.state.z_timer.reset();
            self.state.yaw_timer.reset();
            self.state.task_photo_taken = false;
            self.ensure_move_target();

            if self.mission.task_required(self.context.current_index) {
                self.set_phase(Phase::Task, tick);
            } else {
                self.complete_task(now, tick);
            }
        } else {
            let (output, components) = self.vertical.compute(error, now);
            tick.throttle_offset = output;
            tick.vertical_pid = components;
            tick.command.throttle = Some(throttle_value(output));
        }
    }

    fn yaw_step(&mut self, target_yaw: f64, current_yaw: f64, now: f64, tick: &mut Tick) {
        let (mut offset, components) = self.yaw.compute(target_yaw, current_yaw, now);
        let deadzone = self.config.yaw.deadzone;
        if deadzone > 0.0 && offset.abs() < deadzone {
            offset = 0.0;
        }
        tick.yaw_offset = offset;
        tick.yaw_pid = components;
        tick.command.yaw = Some(stick_value(offset));
    }

    fn arrive(&mut self, distance: f64, now: f64, tick: &mut Tick) {
        if let Some((index, point)) = self.context.move_target {
            self.context.current = point;
            self.context.current_index = index;
        }
        self.context.move_target = None;
        self.context.waypoint_index += 1;
        let elapsed = now - self.state.control_start_time;
        info!(
            "reached waypoint {} ({:.2}, {:.2}) within {:.1} cm after {:.2}s",
            self.context.current_index,
            self.context.current.x,
            self.context.current.y,
            distance * 100.0,
            elapsed
        );
        tick.events.push(MissionEvent::WaypointReached {
            index: self.context.current_index,
            count: self.context.waypoint_index,
            elapsed,
        });

        self.state.plane_timer.reset();
        self.state.z_timer.reset();
        self.state.yaw_timer.reset();
        self.reset_controllers();
        self.set_phase(Phase::Vertical, tick);
    }

    fn complete_task(&mut self, now: f64, tick: &mut Tick) {
        self.state.task_completed_count += 1;
        let completed = self.state.task_completed_count;
        let total = self.mission.total_tasks();
        tick.events.push(MissionEvent::TaskCompleted {
            index: self.context.current_index,
            completed,
            total,
        });

        if total.map_or(false, |total| completed >= total) {
            info!("mission complete, {} task points", completed);
            tick.events.push(MissionEvent::MissionComplete);
            self.reset_controllers();
            self.vertical.reset();
            self.set_phase(Phase::Done, tick);
            return;
        }

        self.state.reset_for_next_leg(now);
        self.reset_controllers();
        self.ensure_move_target();
        if let Some((index, point)) = self.context.move_target {
            info!(
                "next waypoint {} ({:.2}, {:.2}, {:.2}), task heading {:.1}",
                index, point.x, point.y, point.z, point.yaw
            );
        }
        self.set_phase(Phase::Align, tick);
    }

    /// Computes the next leg's target unless one is already pending.
    fn ensure_move_target(&mut self) {
        if self.context.move_target.is_some() {
            return;
        }
        let current = self.context.current;
        let (index, point) = self.mission.next_target(
            &current,
            self.context.current_index,
            self.context.waypoint_index + 1,
        );
        self.context.move_target = Some((index, point));
        self.context.move_yaw = Some(bearing(current.x, current.y, point.x, point.y));
    }

    fn set_phase(&mut self, to: Phase, tick: &mut Tick) {
        let from = self.state.phase;
        if from != to {
            info!("phase {} -> {}", from, to);
            self.state.phase = to;
            tick.events.push(MissionEvent::PhaseChanged { from, to });
        }
    }

    fn reset_controllers(&mut self) {
        self.approach.reset();
        self.settle.reset();
        self.yaw.reset();
    }

    fn heading_progress(&self, error: f64) -> f64 {
        ((1.0 - error / self.config.yaw.tolerance) * 100.0).clamp(0.0, 100.0)
    }
}
