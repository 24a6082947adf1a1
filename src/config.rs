// src/config.rs

//! # Control Configuration
//!
//! All tunables of the waypoint sequencer in one immutable value that is
//! handed to [`WaypointSequencer::new`](crate::WaypointSequencer::new).
//! Every section derives `serde` traits with container defaults, so a host
//! only has to spell out the fields it wants to change.
//!
//! The defaults are the tuned values the controller was flown with:
//! 50 Hz control, 5 cm / 2° arrival tolerance, stick offsets limited to
//! 330 (plane, throttle) and 440 (yaw) around [`NEUTRAL`](crate::NEUTRAL).

use crate::controller::{
    AxisPidConfig, GainProfile, GainSchedule, Gains, PlaneControllerConfig, YawControllerConfig,
};
use crate::error::ConfigError;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Where the vertical loop reads its height from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightSource {
    /// The `z` of the position fix.
    #[default]
    Slam,
    /// A separate relative-height reading from the vehicle.
    Relative,
}

impl FromStr for HeightSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slam" => Ok(HeightSource::Slam),
            "relative" => Ok(HeightSource::Relative),
            _ => Err(ConfigError::HeightSource(s.to_string())),
        }
    }
}

/// Gain schedule section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainScheduleConfig {
    /// Rescale the approach gains with distance.
    pub enabled: bool,
    /// Distance at and beyond which the far profile applies.
    pub distance_far: f64,
    /// Distance at and below which the near profile applies.
    pub distance_near: f64,
    /// Far and near gain scales.
    pub profile: GainProfile,
}

impl Default for GainScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_far: 0.6,
            distance_near: 0.25,
            profile: GainProfile::default(),
        }
    }
}

impl GainScheduleConfig {
    /// The schedule, if enabled.
    pub fn schedule(&self) -> Option<GainSchedule> {
        self.enabled.then_some(GainSchedule {
            distance_far: self.distance_far,
            distance_near: self.distance_near,
            profile: self.profile,
        })
    }
}

/// Planar position loop section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// Approach gains (before scheduling).
    pub gains: Gains<f64>,
    /// Gains of the dedicated settle controller.
    pub settle_gains: Gains<f64>,
    /// Roll and pitch offset limit.
    pub max_stick_output: f64,
    /// Derivative smoothing for both plane controllers.
    pub d_filter_alpha: Option<f64>,
    /// Arrival radius in meters.
    pub tolerance_xy: f64,
    /// Time the vehicle must stay within `tolerance_xy`.
    pub arrival_stable_time: f64,
    /// Headings within this many degrees of 0 are treated as exactly 0
    /// when rotating errors into the body frame.
    pub yaw_zero_threshold_deg: f64,
    /// Distance-based gain schedule for the approach controller.
    pub gain_schedule: GainScheduleConfig,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            gains: Gains::new(150.0, 40.0, 110.0),
            settle_gains: Gains::new(220.0, 60.0, 140.0),
            max_stick_output: 330.0,
            d_filter_alpha: Some(0.2),
            tolerance_xy: 0.05,
            arrival_stable_time: 1.0,
            yaw_zero_threshold_deg: 1.0,
            gain_schedule: GainScheduleConfig::default(),
        }
    }
}

/// Brake and settle sub-state section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    /// Distance at which the one-shot brake fires.
    pub brake_distance: f64,
    /// Number of brakes allowed per leg.
    pub brake_max_count: u32,
    /// Duration of the neutral-stick brake.
    pub brake_hold_time: f64,
    /// Radius inside which the settle controller takes over.
    pub settle_distance: f64,
    /// Settle time after which control falls back to approach.
    pub settle_timeout: f64,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            brake_distance: 0.3,
            brake_max_count: 1,
            brake_hold_time: 0.5,
            settle_distance: 0.15,
            settle_timeout: 5.0,
        }
    }
}

/// Heading loop section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YawConfig {
    /// Gains in stick units per degree.
    pub gains: Gains<f64>,
    /// Yaw offset limit.
    pub max_stick_output: f64,
    /// Heading arrival tolerance in degrees.
    pub tolerance: f64,
    /// Time the heading must stay within tolerance in ALIGN.
    pub arrival_stable_time: f64,
    /// Integration band in degrees.
    pub i_activation_error: Option<f64>,
    /// Offsets smaller than this are sent as zero. Zero disables it.
    pub deadzone: f64,
}

impl Default for YawConfig {
    fn default() -> Self {
        Self {
            gains: Gains::new(30.0, 5.0, 1.0),
            max_stick_output: 440.0,
            tolerance: 2.0,
            arrival_stable_time: 0.5,
            i_activation_error: Some(10.0),
            deadzone: 0.0,
        }
    }
}

/// Vertical loop section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalConfig {
    /// Gains in stick units per meter.
    pub gains: Gains<f64>,
    /// Integration band in meters.
    pub i_activation_error: Option<f64>,
    /// Height arrival tolerance in meters.
    pub tolerance: f64,
    /// Throttle offset limit of the PID.
    pub max_throttle_output: f64,
    /// Time the height must stay within tolerance.
    pub arrival_stable_time: f64,
    /// Height used when a waypoint does not give one.
    pub target_height: f64,
    /// Height measurement to use.
    pub height_source: HeightSource,
    /// Subtract the first SLAM height so the take-off point is zero.
    pub slam_zero_at_start: bool,
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            gains: Gains::new(400.0, 30.0, 50.0),
            i_activation_error: Some(0.05),
            tolerance: 0.08,
            max_throttle_output: 330.0,
            arrival_stable_time: 1.0,
            target_height: 1.0,
            height_source: HeightSource::Slam,
            slam_zero_at_start: true,
        }
    }
}

/// Random height band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightRange {
    /// Lowest height.
    pub min: f64,
    /// Highest height.
    pub max: f64,
    /// Minimum change from the previous height.
    pub min_delta: f64,
}

/// Random target generation section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomTargetConfig {
    /// Half side of the square that waypoints are drawn from.
    pub bound: f64,
    /// Lower distance of the near band (odd steps).
    pub near_min_distance: f64,
    /// Upper distance of the near band.
    pub near_max_distance: f64,
    /// Lower distance of the far band (even steps), unbounded above.
    pub far_min_distance: f64,
    /// Always use the far band.
    pub only_far: bool,
    /// Minimum heading change between targets in degrees.
    pub min_angle_diff: f64,
    /// Samples drawn before falling back to the previous value.
    pub max_attempts: u32,
    /// Random heights. `None` keeps the configured target height.
    pub height: Option<HeightRange>,
}

impl Default for RandomTargetConfig {
    fn default() -> Self {
        Self {
            bound: 1.25,
            near_min_distance: 0.25,
            near_max_distance: 0.30,
            far_min_distance: 1.0,
            only_far: false,
            min_angle_diff: 45.0,
            max_attempts: 50,
            height: None,
        }
    }
}

impl RandomTargetConfig {
    /// Checks the sampling ranges. Every range handed to the generator
    /// must be finite and ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("random.bound", self.bound)?;
        non_negative("random.near_min_distance", self.near_min_distance)?;
        non_negative("random.near_max_distance", self.near_max_distance)?;
        non_negative("random.far_min_distance", self.far_min_distance)?;
        if self.near_min_distance > self.near_max_distance {
            return Err(ConfigError::InvertedRange(
                "random.near_distance",
                self.near_min_distance,
                self.near_max_distance,
            ));
        }
        non_negative("random.min_angle_diff", self.min_angle_diff)?;
        positive("random.max_attempts", f64::from(self.max_attempts))?;
        if let Some(height) = self.height {
            finite("random.height.min", height.min)?;
            finite("random.height.max", height.max)?;
            if height.min > height.max {
                return Err(ConfigError::InvertedRange("random.height", height.min, height.max));
            }
            non_negative("random.height.min_delta", height.min_delta)?;
        }
        Ok(())
    }
}

/// Complete sequencer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Control loop rate in Hz.
    pub control_frequency: f64,
    /// Dwell time at the task heading.
    pub task_hold_time: f64,
    /// Planar position loop.
    pub plane: PlaneConfig,
    /// Brake and settle behavior.
    pub brake: BrakeConfig,
    /// Heading loop.
    pub yaw: YawConfig,
    /// Vertical loop.
    pub vertical: VerticalConfig,
    /// Random target generation.
    pub random: RandomTargetConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            control_frequency: 50.0,
            task_hold_time: 1.0,
            plane: PlaneConfig::default(),
            brake: BrakeConfig::default(),
            yaw: YawConfig::default(),
            vertical: VerticalConfig::default(),
            random: RandomTargetConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive(field, value))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative(field, value))
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite(field, value))
    }
}

fn gains(field: &'static str, gains: &Gains<f64>) -> Result<(), ConfigError> {
    non_negative(field, gains.kp)?;
    non_negative(field, gains.ki)?;
    non_negative(field, gains.kd)
}

impl ControlConfig {
    /// Checks every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("control_frequency", self.control_frequency)?;
        non_negative("task_hold_time", self.task_hold_time)?;

        let plane = &self.plane;
        gains("plane.gains", &plane.gains)?;
        gains("plane.settle_gains", &plane.settle_gains)?;
        positive("plane.max_stick_output", plane.max_stick_output)?;
        positive("plane.tolerance_xy", plane.tolerance_xy)?;
        non_negative("plane.arrival_stable_time", plane.arrival_stable_time)?;
        non_negative("plane.yaw_zero_threshold_deg", plane.yaw_zero_threshold_deg)?;
        if let Some(alpha) = plane.d_filter_alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(ConfigError::OutOfUnitRange("plane.d_filter_alpha", alpha));
            }
        }
        let schedule = &plane.gain_schedule;
        if schedule.enabled {
            non_negative("plane.gain_schedule.distance_near", schedule.distance_near)?;
            if schedule.distance_far <= schedule.distance_near {
                return Err(ConfigError::ScheduleBounds {
                    far: schedule.distance_far,
                    near: schedule.distance_near,
                });
            }
        }

        let brake = &self.brake;
        non_negative("brake.brake_distance", brake.brake_distance)?;
        non_negative("brake.brake_hold_time", brake.brake_hold_time)?;
        non_negative("brake.settle_distance", brake.settle_distance)?;
        positive("brake.settle_timeout", brake.settle_timeout)?;

        let yaw = &self.yaw;
        gains("yaw.gains", &yaw.gains)?;
        positive("yaw.max_stick_output", yaw.max_stick_output)?;
        positive("yaw.tolerance", yaw.tolerance)?;
        non_negative("yaw.arrival_stable_time", yaw.arrival_stable_time)?;
        non_negative("yaw.deadzone", yaw.deadzone)?;

        let vertical = &self.vertical;
        gains("vertical.gains", &vertical.gains)?;
        finite("vertical.target_height", vertical.target_height)?;
        positive("vertical.tolerance", vertical.tolerance)?;
        positive("vertical.max_throttle_output", vertical.max_throttle_output)?;
        non_negative("vertical.arrival_stable_time", vertical.arrival_stable_time)?;

        self.random.validate()
    }

    /// Seconds between control ticks.
    pub fn control_interval(&self) -> f64 {
        1.0 / self.control_frequency
    }

    /// Approach controller, gain scheduled when enabled.
    pub fn approach_controller(&self) -> PlaneControllerConfig {
        PlaneControllerConfig {
            gains: self.plane.gains,
            output_limit: self.plane.max_stick_output,
            d_filter_alpha: self.plane.d_filter_alpha,
            schedule: self.plane.gain_schedule.schedule(),
        }
    }

    /// Settle controller, never scheduled.
    pub fn settle_controller(&self) -> PlaneControllerConfig {
        PlaneControllerConfig {
            gains: self.plane.settle_gains,
            schedule: None,
            ..self.approach_controller()
        }
    }

    /// Heading controller.
    pub fn yaw_controller(&self) -> YawControllerConfig {
        YawControllerConfig {
            gains: self.yaw.gains,
            output_limit: self.yaw.max_stick_output,
            i_activation_error: self.yaw.i_activation_error,
        }
    }

    /// Vertical PID.
    pub fn vertical_controller(&self) -> AxisPidConfig<f64> {
        AxisPidConfig {
            gains: self.vertical.gains,
            output_limit: Some(self.vertical.max_throttle_output),
            i_activation_threshold: self.vertical.i_activation_error,
            d_filter_alpha: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the defaults pass validation.
    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ControlConfig::default().validate(), Ok(()));
        assert_eq!(ControlConfig::default().control_interval(), 0.02);
    }

    /// Test that a zero control frequency is rejected.
    #[test]
    fn test_zero_frequency_rejected() {
        let config = ControlConfig {
            control_frequency: 0.0,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive("control_frequency", 0.0))
        );
    }

    /// Test schedule and filter checks.
    #[test]
    fn test_schedule_and_filter_rejected() {
        let mut config = ControlConfig::default();
        config.plane.gain_schedule.distance_far = 0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScheduleBounds { .. })
        ));

        config.plane.gain_schedule.enabled = false;
        assert_eq!(config.validate(), Ok(()), "Disabled schedule is not checked.");

        config.plane.d_filter_alpha = Some(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange("plane.d_filter_alpha", _))
        ));
    }

    /// Test the random target section on its own and through the full config.
    #[test]
    fn test_random_section_rejected() {
        let mut random = RandomTargetConfig {
            bound: -1.0,
            ..Default::default()
        };
        assert_eq!(random.validate(), Err(ConfigError::NotPositive("random.bound", -1.0)));

        random.bound = 1.0;
        random.height = Some(HeightRange {
            min: f64::NAN,
            max: 1.5,
            min_delta: 0.1,
        });
        assert!(matches!(
            random.validate(),
            Err(ConfigError::NonFinite("random.height.min", _))
        ));

        let config = ControlConfig {
            random: RandomTargetConfig {
                near_max_distance: 0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange("random.near_distance", 0.25, 0.1)),
            "Full validation should cover the random section."
        );
    }

    /// Test the height source selector.
    #[test]
    fn test_height_source_parse() {
        assert_eq!("slam".parse::<HeightSource>(), Ok(HeightSource::Slam));
        assert_eq!(" Relative ".parse::<HeightSource>(), Ok(HeightSource::Relative));
        assert_eq!(
            "baro".parse::<HeightSource>(),
            Err(ConfigError::HeightSource("baro".to_string()))
        );
    }

    /// Test that partial documents fill in defaults.
    #[test]
    fn test_partial_deserialize() {
        let json = r#"{
            "control_frequency": 20,
            "plane": { "tolerance_xy": 0.1 },
            "vertical": { "height_source": "relative" }
        }"#;

        let config: ControlConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.control_frequency, 20.0);
        assert_eq!(config.plane.tolerance_xy, 0.1);
        assert_eq!(config.plane.gains, Gains::new(150.0, 40.0, 110.0));
        assert_eq!(config.vertical.height_source, HeightSource::Relative);
        assert_eq!(config.brake, BrakeConfig::default());
    }

    /// Test the derived controller configurations.
    #[test]
    fn test_controller_configs() {
        let config = ControlConfig::default();

        assert!(config.approach_controller().schedule.is_some());
        let settle = config.settle_controller();
        assert!(settle.schedule.is_none(), "Settle is never scheduled.");
        assert_eq!(settle.gains, config.plane.settle_gains);
        assert_eq!(config.vertical_controller().output_limit, Some(330.0));
    }
}
