//! Utility maths functions
//!
//! Planar functions work in the horizontal X-Z plane with Y up, and measure
//! yaw from the +Z axis towards the +X axis, so that a yaw of `psi` points
//! along `(sin(psi), 0, cos(psi))`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Unit, Vector3};
use num_traits::Float;

// ---------------------------------------------------------------------------
// SCALAR FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    rem_euclid(angle + pi_t, tau_t) - pi_t
}

// ---------------------------------------------------------------------------
// PLANAR FUNCTIONS
// ---------------------------------------------------------------------------

/// Magnitude of the horizontal (X-Z) part of a vector.
pub fn planar_norm(v: &Vector3<f64>) -> f64 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Project a vector onto the horizontal plane, discarding the Y component.
pub fn planar(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, 0.0, v.z)
}

/// Normalised horizontal part of a vector, or `None` if its planar magnitude
/// is not greater than `epsilon`.
pub fn planar_normalize(v: &Vector3<f64>, epsilon: f64) -> Option<Vector3<f64>> {
    let norm = planar_norm(v);

    if norm > epsilon {
        Some(planar(v) / norm)
    } else {
        None
    }
}

/// Yaw of the vector in the horizontal plane, in the range `[-pi, pi]`.
pub fn planar_yaw(v: &Vector3<f64>) -> f64 {
    v.x.atan2(v.z)
}

/// Unit horizontal vector pointing along the given yaw.
pub fn planar_direction(yaw_rad: f64) -> Vector3<f64> {
    Vector3::new(yaw_rad.sin(), 0.0, yaw_rad.cos())
}

/// Signed yaw which rotates `from` onto `to` in the horizontal plane.
pub fn yaw_between(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    wrap_pi(planar_yaw(to) - planar_yaw(from))
}

/// Signed angle of the rotation about `axis` taking `a` onto `b`, measured
/// after projecting both vectors onto the plane normal to `axis`.
///
/// Returns zero if either projection is degenerate.
pub fn signed_angle_about(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    axis: &Unit<Vector3<f64>>,
) -> f64 {
    let a_proj = a - axis.as_ref() * axis.dot(a);
    let b_proj = b - axis.as_ref() * axis.dot(b);

    if a_proj.norm_squared() < std::f64::EPSILON || b_proj.norm_squared() < std::f64::EPSILON {
        return 0.0;
    }

    axis.dot(&a_proj.cross(&b_proj)).atan2(a_proj.dot(&b_proj))
}

/// Move `current` in a straight line towards `target` by at most
/// `max_delta`, landing exactly on `target` once it is within reach.
pub fn move_towards(
    current: &Vector3<f64>,
    target: &Vector3<f64>,
    max_delta: f64,
) -> Vector3<f64> {
    let delta = target - current;
    let dist = delta.norm();

    if dist <= max_delta || dist == 0.0 {
        *target
    } else {
        current + delta / dist * max_delta
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
