// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute callback and control data structure
//! used by every single-axis PID in the crate, together with the numeric
//! trait the PID layer is generic over.

use piddiy::Number as PiddiyNumber;

pub mod axis;
pub use axis::*;

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }

    /// Absolute value without requiring a float type.
    fn magnitude(self) -> Self {
        if self < Self::zero() {
            -self
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}
