// src/controller/axis.rs

//! # Single-Axis PID Controller
//!
//! Wraps a `piddiy` controller driven by [`compute_axis`] with the time
//! bookkeeping, derivative filtering, and output clamping needed by the
//! position loops. Base gains are kept apart from the effective gains so a
//! scheduler can rescale the axis before each compute without losing the
//! configured values.
//!
//! The low-pass filter works on the weighted D term, `kd * de/dt`, so a
//! gain change only affects the newest sample. The inner controller
//! therefore runs with a unit `kd` and receives the filtered term.

use crate::pid::{compute_axis, AxisControlData, Number};
use piddiy::PidController;
use serde::{Deserialize, Serialize};

/// Proportional, integral, and derivative coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
}

impl<T> Gains<T> {
    /// Creates a gain set.
    pub const fn new(kp: T, ki: T, kd: T) -> Self {
        Self { kp, ki, kd }
    }
}

/// The three terms that made up one PID output, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidComponents<T> {
    /// Proportional term.
    pub p: T,
    /// Integral term.
    pub i: T,
    /// Derivative term.
    pub d: T,
}

impl<T: Copy> PidComponents<T> {
    /// The components as a `(p, i, d)` tuple.
    pub fn as_tuple(&self) -> (T, T, T) {
        (self.p, self.i, self.d)
    }
}

/// Selects which PID terms [`AxisPid::selective_reset`] clears.
///
/// The P term has no state; its flag is accepted for symmetry only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetMask {
    /// Reset the proportional term.
    pub p: bool,
    /// Reset the integral accumulator.
    pub i: bool,
    /// Reset the derivative history and the time base.
    pub d: bool,
}

impl ResetMask {
    /// Reset everything.
    pub const ALL: Self = Self {
        p: true,
        i: true,
        d: true,
    };
    /// Only clear the integral accumulator.
    pub const INTEGRAL: Self = Self {
        p: false,
        i: true,
        d: false,
    };
    /// Only clear the derivative history.
    pub const DERIVATIVE: Self = Self {
        p: false,
        i: false,
        d: true,
    };
}

/// Static configuration of one PID axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPidConfig<T> {
    /// Base gains.
    pub gains: Gains<T>,
    /// Symmetric output clamp.
    pub output_limit: Option<T>,
    /// Integration is only active while `|error|` is at or below this value.
    pub i_activation_threshold: Option<T>,
    /// Exponential smoothing coefficient in `(0, 1]` for the D term.
    pub d_filter_alpha: Option<T>,
}

impl<T: Number> AxisPidConfig<T> {
    /// A configuration with the given gains and no limits or filtering.
    pub fn new(gains: Gains<T>) -> Self {
        Self {
            gains,
            output_limit: None,
            i_activation_threshold: None,
            d_filter_alpha: None,
        }
    }
}

/// Single-axis PID controller with clamping, activation band, conditional
/// anti-windup, and derivative low-pass filtering.
pub struct AxisPid<T: Number> {
    pid: PidController<T, AxisControlData<T>>,
    base: Gains<T>,
    gains: Gains<T>,
    output_limit: Option<T>,
    i_activation_threshold: Option<T>,
    d_filter_alpha: Option<T>,
    last_time: Option<T>,
    last_d_term: Option<T>,
}

impl<T: Number> AxisPid<T> {
    /// Creates a new controller using the provided configuration
    pub fn with_config(config: AxisPidConfig<T>) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_axis)
            .set_point(T::zero())
            .kp(config.gains.kp)
            .ki(config.gains.ki)
            .kd(T::one());

        AxisPid {
            pid,
            base: config.gains,
            gains: config.gains,
            output_limit: config.output_limit,
            i_activation_threshold: config.i_activation_threshold,
            d_filter_alpha: config.d_filter_alpha,
            last_time: None,
            last_d_term: None,
        }
    }

    /// Creates a controller with the given gains and no limits.
    pub fn new(gains: Gains<T>) -> Self {
        Self::with_config(AxisPidConfig::new(gains))
    }

    /// The configured gains.
    pub fn base_gains(&self) -> Gains<T> {
        self.base
    }

    /// The gains the next [`compute`](Self::compute) call will use.
    pub fn effective_gains(&self) -> Gains<T> {
        self.gains
    }

    /// Overrides the gains used by the next compute call.
    pub fn set_effective_gains(&mut self, gains: Gains<T>) {
        self.gains = gains;
        self.pid.kp(gains.kp).ki(gains.ki);
    }

    /// The stored integral accumulator (error × seconds).
    pub fn integral(&self) -> T {
        self.pid.integral
    }

    /// Computes the clamped output for `error` at time `now` (seconds).
    ///
    /// The first call after construction or [`reset`](Self::reset) has
    /// `dt = 0` and therefore contributes no integral or derivative.
    pub fn compute(&mut self, error: T, now: T) -> (T, PidComponents<T>) {
        let dt = match self.last_time {
            Some(last_time) => now - last_time,
            None => T::zero(),
        };

        let raw_d_term = if T::zero() < dt {
            self.gains.kd * (error - self.pid.error) / dt
        } else {
            T::zero()
        };
        let d_term = match (self.d_filter_alpha, self.last_d_term) {
            (Some(alpha), Some(previous)) => alpha * raw_d_term + (T::one() - alpha) * previous,
            _ => raw_d_term,
        };

        let data = AxisControlData {
            error,
            dt,
            derivative: d_term,
            output_limit: self.output_limit,
            i_activation_threshold: self.i_activation_threshold,
        };
        let mut output = self.pid.compute(data);

        let components = PidComponents {
            p: self.pid.kp * error,
            i: self.pid.ki * self.pid.integral,
            d: d_term,
        };
        if let Some(limit) = self.output_limit {
            output = output.clamp(-limit, limit);
        }

        self.last_d_term = Some(d_term);
        self.last_time = Some(now);
        (output, components)
    }

    /// Clears all state so the next compute behaves like a first call.
    pub fn reset(&mut self) {
        self.selective_reset(ResetMask::ALL);
    }

    /// Clears only the selected terms.
    pub fn selective_reset(&mut self, mask: ResetMask) {
        if mask.i {
            self.pid.integral = T::zero();
        }
        if mask.d {
            self.pid.error = T::zero();
            self.last_time = None;
            self.last_d_term = None;
        }
    }
}
