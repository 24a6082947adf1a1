// src/error.rs

//! Error types. Both kinds are raised while a mission is being set up,
//! before any stick command is issued.

/// Invalid control configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero or negative.
    #[error("{0} must be positive, got {1}")]
    NotPositive(&'static str, f64),

    /// A value that must be zero or more was negative.
    #[error("{0} must not be negative, got {1}")]
    Negative(&'static str, f64),

    /// A NaN or infinite value where any finite number is allowed.
    #[error("{0} must be finite, got {1}")]
    NonFinite(&'static str, f64),

    /// A smoothing coefficient outside `(0, 1]`.
    #[error("{0} must be in (0, 1], got {1}")]
    OutOfUnitRange(&'static str, f64),

    /// Gain schedule with `distance_far <= distance_near`.
    #[error("gain schedule distance_far ({far}) must exceed distance_near ({near})")]
    ScheduleBounds {
        /// Configured far bound.
        far: f64,
        /// Configured near bound.
        near: f64,
    },

    /// A `[min, max]` pair with `min > max`.
    #[error("{0}: minimum {1} exceeds maximum {2}")]
    InvertedRange(&'static str, f64, f64),

    /// Unrecognized height source selector.
    #[error("unknown height source: {0:?}")]
    HeightSource(String),
}

/// Invalid mission definition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MissionError {
    /// A waypoint with fewer than two coordinates.
    #[error("waypoint {index} needs at least x and y, got {len} values")]
    MalformedWaypoint {
        /// Position of the waypoint in the mission.
        index: usize,
        /// Number of values supplied.
        len: usize,
    },

    /// A mission without any points.
    #[error("mission has no waypoints")]
    Empty,

    /// A waypoint with a NaN or infinite value.
    #[error("waypoint {0} has a non-finite coordinate")]
    NonFinite(usize),
}

/// Top-level error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// See [`ConfigError`].
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// See [`MissionError`].
    #[error("mission error: {0}")]
    Mission(#[from] MissionError),
}
