// src/mission/targets.rs

//! # Random Target Generation
//!
//! Reject-and-retry sampling of waypoints, headings and heights. Every
//! sampler gives up after `max_attempts` draws and returns the previous
//! value unchanged, which is a valid (if unambitious) target.

use crate::angle::shortest_error;
use crate::config::RandomTargetConfig;
use crate::error::ConfigError;
use crate::mission::MissionPoint;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Distance band a new waypoint has to fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound, unbounded if `None`.
    pub max: Option<f64>,
}

impl DistanceBand {
    /// Whether `distance` lies in the band.
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min && self.max.map_or(true, |max| distance <= max)
    }
}

/// Seeded generator for procedurally built missions.
#[derive(Debug, Clone)]
pub struct RandomTargets {
    config: RandomTargetConfig,
    target_height: f64,
    rng: StdRng,
}

impl RandomTargets {
    /// Creates a generator. `None` seeds from system entropy.
    ///
    /// Fails on a configuration whose ranges cannot be sampled.
    pub fn new(
        config: RandomTargetConfig,
        target_height: f64,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !target_height.is_finite() {
            return Err(ConfigError::NonFinite("vertical.target_height", target_height));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(RandomTargets {
            config,
            target_height,
            rng,
        })
    }

    /// Band used for the leg ending at `step_index`.
    ///
    /// Odd steps are short hops, even steps long ones, unless `only_far`.
    pub fn band_for_step(&self, step_index: usize) -> DistanceBand {
        if !self.config.only_far && step_index % 2 == 1 {
            DistanceBand {
                min: self.config.near_min_distance,
                max: Some(self.config.near_max_distance),
            }
        } else {
            DistanceBand {
                min: self.config.far_min_distance,
                max: None,
            }
        }
    }

    /// Draws a waypoint inside the square bound whose distance from
    /// `current` lies in `band`. Falls back to `current`.
    pub fn waypoint(&mut self, current: (f64, f64), band: DistanceBand) -> (f64, f64) {
        let bound = self.config.bound;
        for _ in 0..self.config.max_attempts {
            let x = self.rng.gen_range(-bound..=bound);
            let y = self.rng.gen_range(-bound..=bound);
            if band.contains((x - current.0).hypot(y - current.1)) {
                return (x, y);
            }
        }
        warn!(
            "no waypoint within {:?} of ({:.2}, {:.2}), staying put",
            band, current.0, current.1
        );
        current
    }

    /// Draws a heading at least `min_angle_diff` away from `previous`.
    /// Falls back to `previous`.
    pub fn yaw(&mut self, previous: f64) -> f64 {
        for _ in 0..self.config.max_attempts {
            let candidate = self.rng.gen_range(-180.0..180.0);
            if shortest_error(candidate, previous).abs() >= self.config.min_angle_diff {
                return candidate;
            }
        }
        warn!("no heading {:.1} deg away from {:.1}, keeping it", self.config.min_angle_diff, previous);
        previous
    }

    /// Draws a height from the configured range, or returns the fixed
    /// target height when random heights are disabled. Falls back to
    /// `previous`.
    pub fn height(&mut self, previous: f64) -> f64 {
        let Some(range) = self.config.height else {
            return self.target_height;
        };
        for _ in 0..self.config.max_attempts {
            let candidate = self.rng.gen_range(range.min..=range.max);
            if (candidate - previous).abs() >= range.min_delta {
                return candidate;
            }
        }
        warn!("no height {:.2} m away from {:.2}, keeping it", range.min_delta, previous);
        previous
    }

    /// The target following `current` for the leg ending at `step_index`.
    pub fn next_target(&mut self, current: &MissionPoint, step_index: usize) -> MissionPoint {
        let band = self.band_for_step(step_index);
        let (x, y) = self.waypoint((current.x, current.y), band);
        let z = self.height(current.z);
        let yaw = self.yaw(current.yaw);
        MissionPoint::new(x, y, z, yaw)
    }
}
