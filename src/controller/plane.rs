// src/controller/plane.rs

//! # Plane Position Controller
//!
//! Two independent PID axes over a planar error. The forward axis drives
//! the pitch stick and the lateral (left positive) axis drives the roll
//! stick with its sign inverted. When a [`GainSchedule`] is configured the
//! gains of both axes are re-derived from the distance to target before
//! every compute.

use crate::controller::{AxisPid, AxisPidConfig, Gains, PidComponents, ResetMask};
use serde::{Deserialize, Serialize};

/// Multipliers applied to the base gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainScale {
    /// Proportional multiplier.
    pub kp_scale: f64,
    /// Integral multiplier.
    pub ki_scale: f64,
    /// Derivative multiplier.
    pub kd_scale: f64,
}

impl GainScale {
    /// Scale that leaves the gains unchanged.
    pub const UNITY: Self = Self {
        kp_scale: 1.0,
        ki_scale: 1.0,
        kd_scale: 1.0,
    };

    /// Component-wise linear interpolation, `ratio = 0` gives `self`.
    pub fn lerp(&self, other: &Self, ratio: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * ratio;
        Self {
            kp_scale: mix(self.kp_scale, other.kp_scale),
            ki_scale: mix(self.ki_scale, other.ki_scale),
            kd_scale: mix(self.kd_scale, other.kd_scale),
        }
    }

    /// Applies this scale to a set of base gains.
    pub fn apply(&self, base: Gains<f64>) -> Gains<f64> {
        Gains::new(
            base.kp * self.kp_scale,
            base.ki * self.ki_scale,
            base.kd * self.kd_scale,
        )
    }
}

impl Default for GainScale {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Gain scales used at and beyond each end of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainProfile {
    /// Applied at `distance >= distance_far`.
    pub far: GainScale,
    /// Applied at `distance <= distance_near`.
    pub near: GainScale,
}

impl Default for GainProfile {
    fn default() -> Self {
        Self {
            far: GainScale {
                kp_scale: 0.85,
                ki_scale: 0.0,
                kd_scale: 1.6,
            },
            near: GainScale::UNITY,
        }
    }
}

/// Distance-based gain schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSchedule {
    /// Upper interpolation bound in meters.
    pub distance_far: f64,
    /// Lower interpolation bound in meters.
    pub distance_near: f64,
    /// Scales at both bounds.
    pub profile: GainProfile,
}

impl GainSchedule {
    /// The gain scale at `distance`.
    ///
    /// Linear between the bounds, clamped to the nearest bound outside.
    pub fn scale_at(&self, distance: f64) -> GainScale {
        if distance >= self.distance_far {
            self.profile.far
        } else if distance > self.distance_near && self.distance_far > self.distance_near {
            let ratio = (distance - self.distance_near) / (self.distance_far - self.distance_near);
            self.profile.near.lerp(&self.profile.far, ratio)
        } else {
            self.profile.near
        }
    }
}

/// Output of one plane controller step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaneOutput {
    /// Roll stick offset (negated lateral output).
    pub roll_offset: f64,
    /// Pitch stick offset (forward output).
    pub pitch_offset: f64,
    /// Forward axis terms.
    pub forward: PidComponents<f64>,
    /// Lateral axis terms.
    pub lateral: PidComponents<f64>,
}

/// Configuration for a [`PlaneController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneControllerConfig {
    /// Base gains shared by both axes.
    pub gains: Gains<f64>,
    /// Symmetric stick offset limit.
    pub output_limit: f64,
    /// Derivative smoothing for both axes.
    pub d_filter_alpha: Option<f64>,
    /// Gain schedule, if enabled.
    pub schedule: Option<GainSchedule>,
}

/// Forward and lateral PID pair with optional gain scheduling.
pub struct PlaneController {
    forward: AxisPid<f64>,
    lateral: AxisPid<f64>,
    base: Gains<f64>,
    output_limit: f64,
    schedule: Option<GainSchedule>,
}

impl PlaneController {
    /// Creates a new controller using the provided configuration
    pub fn with_config(config: PlaneControllerConfig) -> Self {
        let axis = AxisPidConfig {
            gains: config.gains,
            output_limit: Some(config.output_limit),
            i_activation_threshold: None,
            d_filter_alpha: config.d_filter_alpha,
        };
        PlaneController {
            forward: AxisPid::with_config(axis),
            lateral: AxisPid::with_config(axis),
            base: config.gains,
            output_limit: config.output_limit,
            schedule: config.schedule,
        }
    }

    /// Computes stick offsets driving `current` toward `target`.
    ///
    /// The first coordinate is forward, the second lateral (left positive).
    pub fn compute(
        &mut self,
        target_x: f64,
        target_y: f64,
        current_x: f64,
        current_y: f64,
        now: f64,
    ) -> PlaneOutput {
        let error_x = target_x - current_x;
        let error_y = target_y - current_y;

        if let Some(schedule) = self.schedule {
            let gains = schedule.scale_at(error_x.hypot(error_y)).apply(self.base);
            self.forward.set_effective_gains(gains);
            self.lateral.set_effective_gains(gains);
        }

        let (pitch, forward) = self.forward.compute(error_x, now);
        let (lateral_output, lateral) = self.lateral.compute(error_y, now);

        let limit = self.output_limit;
        PlaneOutput {
            roll_offset: -lateral_output.clamp(-limit, limit),
            pitch_offset: pitch.clamp(-limit, limit),
            forward,
            lateral,
        }
    }

    /// Gains the next compute on the forward axis will use.
    pub fn effective_gains(&self) -> Gains<f64> {
        self.forward.effective_gains()
    }

    /// Resets both axes.
    pub fn reset(&mut self) {
        self.forward.reset();
        self.lateral.reset();
    }

    /// Resets the selected terms on both axes.
    pub fn selective_reset(&mut self, mask: ResetMask) {
        self.forward.selective_reset(mask);
        self.lateral.selective_reset(mask);
    }

    /// Planar distance between two points.
    pub fn distance(target_x: f64, target_y: f64, current_x: f64, current_y: f64) -> f64 {
        (target_x - current_x).hypot(target_y - current_y)
    }
}
