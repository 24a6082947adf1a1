// src/lib.rs

//! # Waypoint Flight Control
//!
//! Waypoint sequencing for a multirotor flown through normalized stick
//! commands. A [`WaypointSequencer`] turns a stream of pose samples into
//! stick updates, moving through ALIGN, MOVE, VERTICAL and TASK for each
//! [`MissionPoint`] until the mission is DONE.
//!
//! The control stack, bottom-up:
//!
//! - [`pid`]: the single-axis PID compute callback on top of `piddiy`.
//! - [`controller`]: axis, planar (with gain scheduling) and yaw controllers.
//! - [`timer`]: the stability timer that gates every phase transition.
//! - [`sequencer`]: the phase machine and the approach/brake/settle loop.
//! - [`runner`]: a periodic host loop around the sequencer.
//!
//! Hosts provide pose samples and accept stick commands through the
//! traits in [`io`].

#![deny(missing_docs)]

pub mod angle;
pub mod config;
pub mod controller;
pub mod error;
pub mod io;
pub mod mission;
pub mod pid;
pub mod runner;
pub mod sequencer;
pub mod timer;

#[doc(inline)]
pub use config::{ControlConfig, HeightSource};
#[doc(inline)]
pub use error::{ConfigError, Error, MissionError};
#[doc(inline)]
pub use io::{
    EmergencyStop, Pose, PoseSource, StickCommand, StickSink, NEUTRAL, THROTTLE_MAX, THROTTLE_MIN,
};
#[doc(inline)]
pub use mission::{Mission, MissionPoint};
#[doc(inline)]
pub use runner::{AbortSignal, Clock, MissionRunner, MonotonicClock, Outcome, Vehicle};
#[doc(inline)]
pub use sequencer::{MissionEvent, Phase, PlaneMode, TickReport, WaypointSequencer};
#[doc(inline)]
pub use timer::StabilityTimer;

#[cfg(test)]
mod test_utils;
