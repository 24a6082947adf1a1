// src/mission.rs

//! # Mission Model
//!
//! A mission is an ordered list of task points. The first one is the
//! initial target the vehicle starts from, and an optional final point
//! (return to home) is visited last. Every point counts towards mission
//! completion; points with `take_photo = false` are passed through
//! without the TASK dwell.
//!
//! Points are either given up front ([`Mission::from_points`],
//! [`Mission::random`]) or drawn one leg ahead forever
//! ([`Mission::patrol`]).

use crate::config::ControlConfig;
use crate::error::{ConfigError, MissionError};
use serde::{Deserialize, Serialize};

pub mod targets;
pub use targets::*;

fn default_take_photo() -> bool {
    true
}

/// A waypoint with a task heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionPoint {
    /// X in meters.
    pub x: f64,
    /// Y in meters.
    pub y: f64,
    /// Height in meters.
    pub z: f64,
    /// Task heading in degrees.
    pub yaw: f64,
    /// Whether the TASK dwell runs at this point.
    #[serde(default = "default_take_photo", alias = "takePhoto")]
    pub take_photo: bool,
}

impl MissionPoint {
    /// A point with the TASK dwell enabled.
    pub const fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            take_photo: true,
        }
    }

    /// Sets the TASK flag.
    pub const fn with_photo(mut self, take_photo: bool) -> Self {
        self.take_photo = take_photo;
        self
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.yaw.is_finite()
    }
}

/// Builds a point from a coordinate row.
///
/// Four or more values are `x, y, z, yaw`; three are `x, y, z` with the
/// fallback heading; two are `x, y` with both fallbacks.
pub fn parse_waypoint(
    index: usize,
    values: &[f64],
    fallback_z: f64,
    fallback_yaw: f64,
) -> Result<MissionPoint, MissionError> {
    match *values {
        [x, y, z, yaw, ..] => Ok(MissionPoint::new(x, y, z, yaw)),
        [x, y, z] => Ok(MissionPoint::new(x, y, z, fallback_yaw)),
        [x, y] => Ok(MissionPoint::new(x, y, fallback_z, fallback_yaw)),
        _ => Err(MissionError::MalformedWaypoint {
            index,
            len: values.len(),
        }),
    }
}

/// Ordered task points, optionally extended by a live random generator.
#[derive(Debug, Clone)]
pub struct Mission {
    points: Vec<MissionPoint>,
    final_index: Option<usize>,
    patrol: Option<RandomTargets>,
}

impl Mission {
    /// A mission over `points`; the first one is the initial target.
    pub fn from_points(points: Vec<MissionPoint>) -> Result<Self, MissionError> {
        if points.is_empty() {
            return Err(MissionError::Empty);
        }
        if let Some(index) = points.iter().position(|point| !point.is_finite()) {
            return Err(MissionError::NonFinite(index));
        }
        Ok(Mission {
            points,
            final_index: None,
            patrol: None,
        })
    }

    /// A mission from coordinate rows (see [`parse_waypoint`]). Missing
    /// headings cycle through `fallback_yaws`, or 0 when it is empty.
    pub fn from_coordinates<R: AsRef<[f64]>>(
        rows: &[R],
        fallback_z: f64,
        fallback_yaws: &[f64],
    ) -> Result<Self, MissionError> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let fallback_yaw = match fallback_yaws.len() {
                    0 => 0.0,
                    len => fallback_yaws[index % len],
                };
                parse_waypoint(index, row.as_ref(), fallback_z, fallback_yaw)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_points(points)
    }

    /// Appends a final point visited after every other one.
    pub fn with_final(mut self, point: MissionPoint) -> Result<Self, MissionError> {
        if !point.is_finite() {
            return Err(MissionError::NonFinite(self.points.len()));
        }
        self.final_index = Some(self.points.len());
        self.points.push(point);
        Ok(self)
    }

    /// A procedurally generated mission of `count` legs starting at the
    /// origin. The origin itself is passed through without a dwell.
    pub fn random(
        count: usize,
        config: &ControlConfig,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut targets = RandomTargets::new(config.random, config.vertical.target_height, seed)?;
        let origin = MissionPoint::new(0.0, 0.0, config.vertical.target_height, 0.0)
            .with_photo(false);

        let mut points = Vec::with_capacity(count + 1);
        points.push(origin);
        let mut current = origin;
        for step in 1..=count {
            current = targets.next_target(&current, step);
            points.push(current);
        }
        Ok(Mission {
            points,
            final_index: None,
            patrol: None,
        })
    }

    /// An endless mission that draws each next target one leg ahead.
    pub fn patrol(config: &ControlConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let height = config.vertical.target_height;
        Ok(Mission {
            points: vec![MissionPoint::new(0.0, 0.0, height, 0.0)],
            final_index: None,
            patrol: Some(RandomTargets::new(config.random, height, seed)?),
        })
    }

    /// The initial target.
    pub fn initial(&self) -> &MissionPoint {
        &self.points[0]
    }

    /// All listed points, the final one included.
    pub fn points(&self) -> &[MissionPoint] {
        &self.points
    }

    /// Number of task points that complete the mission, `None` for a patrol.
    pub fn total_tasks(&self) -> Option<usize> {
        match self.patrol {
            Some(_) => None,
            None => Some(self.points.len()),
        }
    }

    /// Whether `index` is the final (return) point.
    pub fn is_final(&self, index: usize) -> bool {
        self.final_index == Some(index)
    }

    /// Whether the point at `index` requires the TASK dwell. Generated
    /// patrol points always do.
    pub fn task_required(&self, index: usize) -> bool {
        self.points.get(index).map_or(true, |point| point.take_photo)
    }

    /// The target after the point at `index`, reached as leg `step_index`.
    ///
    /// Listed missions wrap around; patrols draw a fresh random point.
    pub(crate) fn next_target(
        &mut self,
        current: &MissionPoint,
        index: usize,
        step_index: usize,
    ) -> (usize, MissionPoint) {
        match self.patrol.as_mut() {
            Some(targets) => (index + 1, targets.next_target(current, step_index)),
            None => {
                let next = (index + 1) % self.points.len();
                (next, self.points[next])
            }
        }
    }
}
