use crate::linalg::Vector3;
use std::f64::consts::TAU;

/// Standard gravity, in m/s^2, used to convert specific impulse to mass flow.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Wraps an angle to [0, 2π).
pub fn wrap_to_two_pi(angle_rad: f64) -> f64 {
    let wrapped = angle_rad.rem_euclid(TAU);
    if wrapped == TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle to [-π, π).
pub fn wrap_to_pi(angle_rad: f64) -> f64 {
    wrap_to_two_pi(angle_rad + std::f64::consts::PI) - std::f64::consts::PI
}

/// Signed shortest arc from `from_rad` to `to_rad`, in [-π, π).
pub fn shortest_arc(from_rad: f64, to_rad: f64) -> f64 {
    wrap_to_pi(to_rad - from_rad)
}

/// Root sum square of the componentwise difference of two vectors.
pub fn rss_errors(computed: &Vector3<f64>, truth: &Vector3<f64>) -> f64 {
    (computed - truth).norm()
}
