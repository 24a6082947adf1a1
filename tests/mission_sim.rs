// tests/mission_sim.rs

//! Flies whole missions against a point-mass vehicle whose velocities
//! follow the stick commands directly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use waypoint_flight_control::angle::{normalize, shortest_error};
use waypoint_flight_control::*;

const DT: f64 = 0.02;
/// Stick offset for 1 m/s of horizontal or vertical speed.
const SPEED_SCALE: f64 = 330.0;
/// Stick offset for 90 deg/s of yaw rate.
const YAW_SCALE: f64 = 440.0;

#[derive(Debug, Clone, Copy)]
struct PointMass {
    pose: Pose,
}

impl PointMass {
    fn at(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        PointMass {
            pose: Pose::new(x, y, z, yaw),
        }
    }

    fn advance(&mut self, command: &StickCommand, dt: f64) {
        let (roll, pitch, yaw, throttle) = command.resolved();
        let forward = f64::from(pitch - NEUTRAL) / SPEED_SCALE;
        let left = -f64::from(roll - NEUTRAL) / SPEED_SCALE;
        let yaw_rate = -f64::from(yaw - NEUTRAL) / YAW_SCALE * 90.0;
        let climb = f64::from(throttle - NEUTRAL) / SPEED_SCALE;

        let (sin, cos) = self.pose.yaw.to_radians().sin_cos();
        self.pose.x += (forward * cos - left * sin) * dt;
        self.pose.y += (forward * sin + left * cos) * dt;
        self.pose.z += climb * dt;
        self.pose.yaw = normalize(self.pose.yaw + yaw_rate * dt);
    }
}

struct Flight {
    reports: Vec<TickReport>,
    stops: usize,
    vehicle: PointMass,
}

/// Steps `sequencer` until DONE or `limit` seconds. `disturb` may move the
/// vehicle after each tick.
fn fly<F>(sequencer: &mut WaypointSequencer, start: PointMass, limit: f64, mut disturb: F) -> Flight
where
    F: FnMut(&TickReport, usize, &mut PointMass),
{
    let mut flight = Flight {
        reports: Vec::new(),
        stops: 0,
        vehicle: start,
    };
    let ticks = (limit / DT) as usize;
    for tick in 0..ticks {
        let now = tick as f64 * DT;
        let report = sequencer.step(flight.vehicle.pose, now);
        if report.emergency_stop {
            flight.stops += 1;
        }
        flight.vehicle.advance(&report.command, DT);
        disturb(&report, flight.stops, &mut flight.vehicle);
        let done = report.phase == Phase::Done;
        flight.reports.push(report);
        if done {
            break;
        }
    }
    flight
}

fn sequencer(mission: Mission) -> WaypointSequencer {
    WaypointSequencer::new(ControlConfig::default(), mission).unwrap()
}

fn phase_changes(reports: &[TickReport]) -> Vec<(Phase, Phase)> {
    reports
        .iter()
        .flat_map(|report| report.events.iter())
        .filter_map(|event| match event {
            MissionEvent::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

fn change_time(reports: &[TickReport], to: Phase) -> Option<f64> {
    reports.iter().enumerate().find_map(|(tick, report)| {
        report
            .events
            .iter()
            .any(|event| matches!(event, MissionEvent::PhaseChanged { to: phase, .. } if *phase == to))
            .then(|| tick as f64 * DT)
    })
}

/// Test a single-waypoint mission from take-off position to DONE.
#[test]
fn test_single_waypoint_mission() {
    let point = MissionPoint::new(1.0, 0.0, 1.0, 0.0);
    let mut sequencer = sequencer(Mission::from_points(vec![point]).unwrap());

    let flight = fly(&mut sequencer, PointMass::at(0.0, 0.0, 1.0, 0.0), 60.0, |_, _, _| {});

    assert!(sequencer.is_done(), "Mission should finish within 60s.");
    assert_eq!(flight.reports[0].phase, Phase::Align);
    assert_eq!(
        phase_changes(&flight.reports),
        vec![
            (Phase::Align, Phase::Move),
            (Phase::Move, Phase::Vertical),
            (Phase::Vertical, Phase::Task),
            (Phase::Task, Phase::Done),
        ]
    );

    let mut closest = f64::INFINITY;
    for report in flight.reports.iter().filter(|report| report.phase == Phase::Move) {
        closest = closest.min(report.distance);
        assert!(
            report.distance <= closest + 0.1,
            "Distance grew to {:.3} after reaching {:.3}",
            report.distance,
            closest
        );
    }
    assert_eq!(flight.stops, 1, "One brake on the leg.");

    let task_start = change_time(&flight.reports, Phase::Task).unwrap_or(f64::NAN);
    let task_end = change_time(&flight.reports, Phase::Done).unwrap_or(f64::NAN);
    let dwell = task_end - task_start;
    assert!(
        dwell >= 1.0 && dwell <= 1.0 + 3.0 * DT,
        "TASK should last task_hold_time, lasted {:.3}",
        dwell
    );

    let photos: Vec<&MissionEvent> = flight
        .reports
        .iter()
        .flat_map(|report| report.events.iter())
        .filter(|event| matches!(event, MissionEvent::PhotoRequested { .. }))
        .collect();
    assert_eq!(photos, vec![&MissionEvent::PhotoRequested { index: 0 }]);

    let last = flight.reports.last().map(|report| report.command);
    assert_eq!(last, Some(StickCommand::neutral()), "DONE leaves the sticks centred.");
    let pose = flight.vehicle.pose;
    assert!((pose.x - 1.0).abs() < 0.1 && pose.y.abs() < 0.1);
}

/// Test a turn, a climb and a point without a task.
#[test]
fn test_two_waypoints_with_climb() {
    let points = vec![
        MissionPoint::new(1.0, 0.0, 1.0, 0.0),
        MissionPoint::new(1.0, 1.0, 1.5, 90.0).with_photo(false),
    ];
    let mut sequencer = sequencer(Mission::from_points(points).unwrap());

    let flight = fly(&mut sequencer, PointMass::at(0.0, 0.0, 1.0, 0.0), 120.0, |_, _, _| {});

    assert!(sequencer.is_done(), "Mission should finish within 120s.");
    assert_eq!(
        phase_changes(&flight.reports),
        vec![
            (Phase::Align, Phase::Move),
            (Phase::Move, Phase::Vertical),
            (Phase::Vertical, Phase::Task),
            (Phase::Task, Phase::Align),
            (Phase::Align, Phase::Move),
            (Phase::Move, Phase::Vertical),
            (Phase::Vertical, Phase::Done),
        ]
    );

    let reached: Vec<usize> = flight
        .reports
        .iter()
        .flat_map(|report| report.events.iter())
        .filter_map(|event| match event {
            MissionEvent::WaypointReached { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(reached, vec![0, 1]);
    assert_eq!(flight.stops, 2, "One brake per leg.");

    let pose = flight.vehicle.pose;
    assert!((pose.z - 1.5).abs() <= 0.08, "Climbed to {:.3}", pose.z);
    assert!(
        ((pose.x - 1.0).powi(2) + (pose.y - 1.0).powi(2)).sqrt() < 0.1,
        "Ended at ({:.3}, {:.3})",
        pose.x,
        pose.y
    );
    assert!(shortest_error(90.0, pose.yaw).abs() < 2.0, "Heading {:.2}", pose.yaw);
}

/// Test that a gust after the brake does not trigger a second brake.
#[test]
fn test_brake_fires_once_per_leg() {
    let point = MissionPoint::new(2.0, 0.0, 1.0, 0.0);
    let mut sequencer = sequencer(Mission::from_points(vec![point]).unwrap());
    let mut gusted = false;

    let flight = fly(
        &mut sequencer,
        PointMass::at(0.0, 0.0, 1.0, 0.0),
        120.0,
        |report, stops, vehicle| {
            if !gusted && stops == 1 && report.plane_mode == PlaneMode::Settle {
                vehicle.pose.x -= 0.6;
                gusted = true;
            }
        },
    );

    assert!(gusted, "The vehicle should reach SETTLE.");
    assert!(sequencer.is_done(), "Mission should recover from the gust.");
    assert_eq!(flight.stops, 1, "The brake budget is one per leg.");
}

/// Test a seeded random mission end to end.
#[test]
fn test_random_mission() {
    let config = ControlConfig::default();
    let mission = Mission::random(3, &config, Some(11)).unwrap();
    assert_eq!(mission.total_tasks(), Some(4));
    let mut sequencer = WaypointSequencer::new(config, mission).unwrap();

    let flight = fly(&mut sequencer, PointMass::at(0.0, 0.0, 1.0, 0.0), 600.0, |_, _, _| {});

    assert!(sequencer.is_done(), "Random mission should finish.");
    assert_eq!(flight.reports[0].phase, Phase::Task, "Starts on the origin.");
    assert_eq!(flight.stops, 3, "One brake per leg.");
    let completed = flight
        .reports
        .iter()
        .flat_map(|report| report.events.iter())
        .filter(|event| matches!(event, MissionEvent::TaskCompleted { .. }))
        .count();
    assert_eq!(completed, 4);
    assert!(
        flight
            .reports
            .iter()
            .flat_map(|report| report.events.iter())
            .all(|event| !matches!(event, MissionEvent::PhotoRequested { index: 0 })),
        "The origin has no task."
    );
}

/// Simulated world shared by every host-side handle.
struct World {
    vehicle: PointMass,
    command: StickCommand,
    now: f64,
    sent: Vec<StickCommand>,
    stops: usize,
}

#[derive(Clone)]
struct Host(Rc<RefCell<World>>);

impl Host {
    fn new(vehicle: PointMass) -> Self {
        Host(Rc::new(RefCell::new(World {
            vehicle,
            command: StickCommand::neutral(),
            now: 0.0,
            sent: Vec::new(),
            stops: 0,
        })))
    }
}

impl PoseSource for Host {
    fn get_position(&mut self) -> Option<(f64, f64, f64)> {
        let pose = self.0.borrow().vehicle.pose;
        Some((pose.x, pose.y, pose.z))
    }

    fn get_yaw(&mut self) -> Option<f64> {
        Some(self.0.borrow().vehicle.pose.yaw)
    }
}

impl StickSink for Host {
    fn send(&mut self, command: &StickCommand) {
        let mut world = self.0.borrow_mut();
        world.command = *command;
        world.sent.push(*command);
    }
}

impl EmergencyStop for Host {
    fn send_stop(&mut self) {
        self.0.borrow_mut().stops += 1;
    }
}

impl Clock for Host {
    fn now(&self) -> f64 {
        self.0.borrow().now
    }

    fn sleep(&self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }
        let mut world = self.0.borrow_mut();
        let command = world.command;
        world.vehicle.advance(&command, seconds);
        world.now += seconds;
    }
}

/// Raises the abort after a number of polls.
struct AbortAfter {
    polls: Cell<usize>,
}

impl AbortSignal for AbortAfter {
    fn should_abort(&self) -> bool {
        let left = self.polls.get();
        self.polls.set(left.saturating_sub(1));
        left == 0
    }
}

fn runner_config() -> ControlConfig {
    let mut config = ControlConfig::default();
    config.vertical.slam_zero_at_start = false;
    config
}

/// Test the runner flying a mission through the host traits.
#[test]
fn test_runner_completes_mission() {
    let mission = Mission::from_points(vec![MissionPoint::new(1.0, 0.0, 1.0, 0.0)]).unwrap();
    let mut runner = MissionRunner::new(runner_config(), mission).unwrap();
    let host = Host::new(PointMass::at(0.0, 0.0, 1.0, 0.0));
    let (mut pose, mut sticks, mut stop) = (host.clone(), host.clone(), host.clone());
    let abort = AbortAfter {
        polls: Cell::new(usize::MAX),
    };

    let outcome = runner.run(
        Vehicle {
            pose: &mut pose,
            sticks: &mut sticks,
            stop: &mut stop,
        },
        &host,
        &abort,
    );

    assert!(matches!(outcome, Outcome::Completed { .. }), "Got {:?}", outcome);
    assert!(runner.sequencer().is_done());
    let world = host.0.borrow();
    assert_eq!(world.stops, 1);
    let tail = &world.sent[world.sent.len() - 5..];
    assert!(tail.iter().all(StickCommand::is_neutral));
}

/// Test an abort in the middle of a leg.
#[test]
fn test_runner_abort_mid_flight() {
    let mission = Mission::from_points(vec![MissionPoint::new(2.0, 0.0, 1.0, 0.0)]).unwrap();
    let mut runner = MissionRunner::new(runner_config(), mission).unwrap();
    let host = Host::new(PointMass::at(0.0, 0.0, 1.0, 0.0));
    let (mut pose, mut sticks, mut stop) = (host.clone(), host.clone(), host.clone());
    let abort = AbortAfter {
        polls: Cell::new(100),
    };

    let outcome = runner.run(
        Vehicle {
            pose: &mut pose,
            sticks: &mut sticks,
            stop: &mut stop,
        },
        &host,
        &abort,
    );

    assert_eq!(outcome, Outcome::Aborted);
    assert!(!runner.sequencer().is_done());
    let world = host.0.borrow();
    assert_eq!(world.sent.len(), 99 + 5, "One command per tick, then the neutral tail.");
    assert!(world.sent[world.sent.len() - 5..].iter().all(StickCommand::is_neutral));
}
