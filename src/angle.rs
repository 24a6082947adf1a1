// src/angle.rs

//! # Angle Helpers
//!
//! Yaw arithmetic in degrees. Every heading comparison in the crate goes
//! through [`shortest_error`] so that control is continuous across the
//! ±180° seam.

use num_traits::Float;

fn deg<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::zero)
}

/// Maps any degree value into `(-180, 180]`.
///
/// Non-finite input is returned unchanged.
pub fn normalize<T: Float>(angle: T) -> T {
    if !angle.is_finite() {
        return angle;
    }
    let full = deg::<T>(360.0);
    let half = deg::<T>(180.0);
    let mut angle = angle % full;
    while angle > half {
        angle = angle - full;
    }
    while angle <= -half {
        angle = angle + full;
    }
    angle
}

/// Signed shortest rotation from `current` to `target`, in `(-180, 180]`.
///
/// A positive result means a counter-clockwise rotation is needed.
/// With `current = 179.9` and `target = -179.9` the result is `+0.2`.
pub fn shortest_error<T: Float>(target: T, current: T) -> T {
    let full = deg::<T>(360.0);
    let half = deg::<T>(180.0);
    let error = normalize(target) - normalize(current);
    if error > half {
        error - full
    } else if error <= -half {
        error + full
    } else {
        error
    }
}

/// Bearing in degrees of the segment from `(x1, y1)` to `(x2, y2)`.
pub fn bearing<T: Float>(x1: T, y1: T, x2: T, y2: T) -> T {
    (y2 - y1).atan2(x2 - x1).to_degrees()
}

/// Rotates a world-frame XY error into the body frame of a vehicle
/// heading `yaw_deg`. Returns `(forward, lateral)` with lateral positive
/// to the left.
pub fn world_to_body<T: Float>(error_x: T, error_y: T, yaw_deg: T) -> (T, T) {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    (cos * error_x + sin * error_y, -sin * error_x + cos * error_y)
}

/// Extracts yaw in degrees from a `(qx, qy, qz, qw)` quaternion.
pub fn quaternion_to_yaw<T: Float>(qx: T, qy: T, qz: T, qw: T) -> T {
    let two = deg::<T>(2.0);
    let siny = two * (qw * qz + qx * qy);
    let cosy = T::one() - two * (qy * qy + qz * qz);
    siny.atan2(cosy).to_degrees()
}
