// src/io.rs

//! # Vehicle I/O Seams
//!
//! The sequencer never talks to a vehicle itself. Hosts provide pose
//! samples through [`PoseSource`] and receive stick commands through
//! [`StickSink`] and [`EmergencyStop`]; the transport behind them is
//! opaque to this crate.

/// Stick value of a centred axis.
pub const NEUTRAL: i32 = 1024;

/// Lowest absolute throttle the vehicle accepts.
pub const THROTTLE_MIN: i32 = 364;

/// Highest absolute throttle the vehicle accepts.
pub const THROTTLE_MAX: i32 = 1684;

/// Absolute stick value for an offset from neutral, truncated toward zero.
pub fn stick_value(offset: f64) -> i32 {
    (f64::from(NEUTRAL) + offset) as i32
}

/// Absolute throttle for an offset, limited to the hardware envelope.
pub fn throttle_value(offset: f64) -> i32 {
    stick_value(offset).clamp(THROTTLE_MIN, THROTTLE_MAX)
}

/// Vehicle pose in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// X in meters.
    pub x: f64,
    /// Y in meters.
    pub y: f64,
    /// Z (height) in meters.
    pub z: f64,
    /// Heading in degrees, any range.
    pub yaw: f64,
}

impl Pose {
    /// Creates a pose.
    pub const fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }
}

/// Partial stick update. `None` axes are centred by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickCommand {
    /// Roll stick.
    pub roll: Option<i32>,
    /// Pitch stick.
    pub pitch: Option<i32>,
    /// Yaw stick.
    pub yaw: Option<i32>,
    /// Throttle stick.
    pub throttle: Option<i32>,
}

impl StickCommand {
    /// All axes centred.
    pub const fn neutral() -> Self {
        Self {
            roll: Some(NEUTRAL),
            pitch: Some(NEUTRAL),
            yaw: Some(NEUTRAL),
            throttle: Some(NEUTRAL),
        }
    }

    /// Absolute `(roll, pitch, yaw, throttle)` with omitted axes centred.
    pub fn resolved(&self) -> (i32, i32, i32, i32) {
        (
            self.roll.unwrap_or(NEUTRAL),
            self.pitch.unwrap_or(NEUTRAL),
            self.yaw.unwrap_or(NEUTRAL),
            self.throttle.unwrap_or(NEUTRAL),
        )
    }

    /// Whether every axis resolves to neutral.
    pub fn is_neutral(&self) -> bool {
        self.resolved() == (NEUTRAL, NEUTRAL, NEUTRAL, NEUTRAL)
    }
}

/// Latest-value pose reads. Implementations must not block.
pub trait PoseSource {
    /// Latest `(x, y, z)` in meters, if any.
    fn get_position(&mut self) -> Option<(f64, f64, f64)>;

    /// Latest heading in degrees, if any.
    fn get_yaw(&mut self) -> Option<f64>;

    /// Latest height above the take-off point, for sources that have one.
    fn get_relative_height(&mut self) -> Option<f64> {
        None
    }
}

/// Accepts stick commands.
pub trait StickSink {
    /// Sends one command. No acknowledgement is expected.
    fn send(&mut self, command: &StickCommand);
}

/// Full-stop request to the vehicle.
pub trait EmergencyStop {
    /// Sends the stop.
    fn send_stop(&mut self);
}
