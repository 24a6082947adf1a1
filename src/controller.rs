// src/controller.rs

//! # Position and Heading Controllers
//!
//! Controllers built on the single-axis PID in [`axis`]:
//!
//! - [`AxisPid`] is one PID axis with clamping, filtering and anti-windup.
//!   The vertical loop uses it directly.
//! - [`PlaneController`] pairs two axes for forward and lateral body-frame
//!   error and can rescale them with a distance-based [`GainSchedule`].
//! - [`YawOnlyController`] runs one axis over the shortest-path yaw error.

pub mod axis;
pub mod plane;
pub mod yaw;

pub use axis::*;
pub use plane::*;
pub use yaw::*;
