// src/controller/yaw.rs

//! # Yaw-Only Controller
//!
//! Heading hold over the shortest-path yaw error. A positive error
//! (counter-clockwise rotation needed) produces a negative stick offset.

use crate::angle::shortest_error;
use crate::controller::{AxisPid, AxisPidConfig, Gains, PidComponents};

/// Configuration for a [`YawOnlyController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawControllerConfig {
    /// PID gains in stick units per degree.
    pub gains: Gains<f64>,
    /// Symmetric stick offset limit.
    pub output_limit: f64,
    /// Integration only happens while `|error|` is within this many degrees.
    pub i_activation_error: Option<f64>,
}

/// Single-axis heading controller.
pub struct YawOnlyController {
    pid: AxisPid<f64>,
}

impl YawOnlyController {
    /// Creates a new controller using the provided configuration
    pub fn with_config(config: YawControllerConfig) -> Self {
        YawOnlyController {
            pid: AxisPid::with_config(AxisPidConfig {
                gains: config.gains,
                output_limit: Some(config.output_limit),
                i_activation_threshold: config.i_activation_error,
                d_filter_alpha: None,
            }),
        }
    }

    /// Yaw stick offset turning `current_yaw` toward `target_yaw`.
    pub fn compute(
        &mut self,
        target_yaw: f64,
        current_yaw: f64,
        now: f64,
    ) -> (f64, PidComponents<f64>) {
        let error = shortest_error(target_yaw, current_yaw);
        let (output, components) = self.pid.compute(error, now);
        (-output, components)
    }

    /// Absolute shortest-path error in degrees.
    pub fn error(target_yaw: f64, current_yaw: f64) -> f64 {
        shortest_error(target_yaw, current_yaw).abs()
    }

    /// Resets the PID state.
    pub fn reset(&mut self) {
        self.pid.reset();
    }
}
