// src/pid/axis.rs

//! # Single-Axis PID Control Module
//!
//! This module provides a compute function and control data structure
//! for a single position-style PID axis with an integral activation band,
//! conditional anti-windup, and an integral bound tied to the output limit.

use crate::pid::Number;
use piddiy::PidController;

/// Control data for the single-axis PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisControlData<T> {
    /// The current error (target minus measurement).
    pub error: T,
    /// The time delta since the last computation. Zero on the first call.
    pub dt: T,
    /// The derivative term. [`AxisPid`](crate::controller::AxisPid) passes
    /// the filtered `kd * de/dt` here and runs the controller with a unit `kd`.
    pub derivative: T,
    /// Symmetric output limit. Enables anti-windup and the integral bound.
    pub output_limit: Option<T>,
    /// Integration only happens while `|error|` stays inside this band.
    pub i_activation_threshold: Option<T>,
}

/// Single-axis PID compute callback.
///
/// The integral only moves when `dt > 0`. Outside the activation band the
/// accumulator is zeroed. Inside it, a candidate integral is rejected when
/// the resulting output would saturate in the direction of the error.
pub fn compute_axis<T: Number>(
    pid: &mut PidController<T, AxisControlData<T>>,
    data: AxisControlData<T>,
) -> (T, T, T) {
    let error = data.error;
    let mut integral = pid.integral;

    if T::zero() < data.dt {
        let outside_band = match data.i_activation_threshold {
            Some(threshold) => threshold < error.magnitude(),
            None => false,
        };
        if outside_band {
            integral = T::zero();
        } else {
            let candidate = integral + error * data.dt;
            match data.output_limit {
                Some(limit) if T::zero() < limit && T::zero() < pid.ki => {
                    let output = pid.kp * error + pid.kd * data.derivative + pid.ki * candidate;
                    let saturated = limit <= output.magnitude();
                    let same_direction = T::zero() < error * output;
                    if !(saturated && same_direction) {
                        integral = candidate;
                    }
                    let max_integral = limit / pid.ki;
                    integral = integral.clamp(-max_integral, max_integral);
                }
                _ => integral = candidate,
            }
        }
    }

    (error, integral, data.derivative)
}
