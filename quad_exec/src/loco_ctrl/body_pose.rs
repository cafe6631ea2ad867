//! Body pose reconstruction
//!
//! The body is never driven directly: its position follows the centroid of the feet and its
//! orientation is derived from how the feet are laid out. Left/right and front/hind centroids give
//! roll, pitch and yaw. The body itself only takes the yaw, while the skeleton and rig are eased
//! towards the full attitude.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::Serialize;
use util::maths::{clamp, planar, planar_norm, planar_yaw, signed_angle_about};

use super::{Limb, LimbSide};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Planar separation of the front and hind centroids below which the heading is held.
const MIN_YAW_SEPARATION_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose of the character's body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyPose {
    /// Position of the body in the world frame.
    pub position_m: Vector3<f64>,

    /// Attitude of the body, a pure rotation about the vertical.
    pub attitude_q: UnitQuaternion<f64>,

    /// Attitude of the skeleton, including roll and pitch.
    pub skeleton_q: UnitQuaternion<f64>,

    /// Attitude of the IK rig, including roll and pitch.
    pub rig_q: UnitQuaternion<f64>,
}

/// Reconstructs the body pose from the positions of the feet.
#[derive(Debug, Clone)]
pub struct BodyPoseReconstructor {
    /// Offset from the centroid of the feet to the body when the rig is upright
    default_position_offset_m: Vector3<f64>,

    /// Offset from the centroid of the feet to the body, tilted with the rig
    position_offset_m: Vector3<f64>,

    /// Skeleton attitude relative to the body's yaw at start up
    skeleton_offset_q: UnitQuaternion<f64>,

    /// Rig attitude relative to the body's yaw at start up
    rig_offset_q: UnitQuaternion<f64>,

    /// Rate at which the skeleton and rig approach their target attitudes
    smoothing_rate_hz: f64,
}

/// Centroids of the limb groups.
struct Centroids {
    all_m: Vector3<f64>,
    left_m: Vector3<f64>,
    right_m: Vector3<f64>,
    front_m: Vector3<f64>,
    hind_m: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BodyPose {
    /// A pose with the skeleton and rig aligned with the body.
    pub fn new(position_m: Vector3<f64>, attitude_q: UnitQuaternion<f64>) -> Self {
        Self {
            position_m,
            attitude_q,
            skeleton_q: attitude_q,
            rig_q: attitude_q,
        }
    }

    /// The body's forward axis (+Z) in the world frame.
    pub fn forward(&self) -> Vector3<f64> {
        self.attitude_q * Vector3::z()
    }

    /// The body's lateral axis (+X), pointing towards the left limbs.
    pub fn left(&self) -> Vector3<f64> {
        self.attitude_q * Vector3::x()
    }

    /// The body's up axis (+Y).
    pub fn up(&self) -> Vector3<f64> {
        self.attitude_q * Vector3::y()
    }

    /// Heading of the body about the vertical.
    pub fn yaw_rad(&self) -> f64 {
        planar_yaw(&self.forward())
    }
}

impl BodyPoseReconstructor {
    /// Measure the offsets between the body and its stable feet.
    pub fn new(body: &BodyPose, limbs: &[Limb], smoothing_rate_hz: f64) -> Self {
        let centroid_m = limbs
            .iter()
            .fold(Vector3::zeros(), |acc, l| acc + l.stable_position_m())
            / limbs.len().max(1) as f64;

        let default_position_offset_m = body.position_m - centroid_m;

        // Rotation offsets are taken relative to the body's yaw so that they can be reapplied
        // under any heading.
        let yaw_q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), body.yaw_rad());
        let skeleton_offset_q = yaw_q.inverse() * body.skeleton_q;
        let rig_offset_q = yaw_q.inverse() * body.rig_q;

        Self {
            default_position_offset_m,
            position_offset_m: default_position_offset_m,
            skeleton_offset_q,
            rig_offset_q,
            smoothing_rate_hz,
        }
    }

    /// Current offset from the centroid of the feet to the body.
    pub fn position_offset_m(&self) -> Vector3<f64> {
        self.position_offset_m
    }

    /// Update the body pose to fit the current positions of the feet.
    ///
    /// Foot positions are unchanged by the update.
    pub fn update(&mut self, body: &mut BodyPose, limbs: &mut [Limb], dt_s: f64) {
        if limbs.is_empty() {
            return;
        }

        let cached_m: Vec<Vector3<f64>> = limbs.iter().map(|l| l.position_m()).collect();
        let c = Centroids::new(limbs);

        // ---- POSITION ----

        body.position_m = c.all_m + self.position_offset_m;

        // ---- ORIENTATION ----

        let front_to_hind_m = c.front_m - c.hind_m;

        if planar_norm(&front_to_hind_m) > MIN_YAW_SEPARATION_M {
            body.attitude_q = UnitQuaternion::from_axis_angle(
                &Vector3::y_axis(),
                planar_yaw(&planar(&front_to_hind_m)),
            );
        }

        let forward_axis = Unit::new_normalize(body.forward());
        let left_axis = Unit::new_normalize(body.left());

        let roll_rad = signed_angle_about(&body.left(), &(c.left_m - c.right_m), &forward_axis);
        let pitch_rad = signed_angle_about(&body.forward(), &front_to_hind_m, &left_axis);

        let roll_q = UnitQuaternion::from_axis_angle(&forward_axis, roll_rad);
        let pitch_q = UnitQuaternion::from_axis_angle(&left_axis, pitch_rad);
        let tilt_q = roll_q * pitch_q * body.attitude_q;

        let t = clamp(&(self.smoothing_rate_hz * dt_s), &0.0, &1.0);
        body.skeleton_q = ease(&body.skeleton_q, &(tilt_q * self.skeleton_offset_q), t);
        body.rig_q = ease(&body.rig_q, &(tilt_q * self.rig_offset_q), t);

        // Keep the body resting on the feet as the rig tilts
        let rig_up = body.rig_q * Vector3::y();
        let tilt_offset_q =
            UnitQuaternion::rotation_between(&Vector3::y(), &rig_up).unwrap_or_else(UnitQuaternion::identity);
        self.position_offset_m = tilt_offset_q * self.default_position_offset_m;

        trace!(
            "Body pose: pos {:?}, yaw {:.3} rad, roll {:.3} rad, pitch {:.3} rad",
            body.position_m.as_slice(),
            body.yaw_rad(),
            roll_rad,
            pitch_rad
        );

        // Restore the feet
        for (limb, pos_m) in limbs.iter_mut().zip(cached_m) {
            limb.set_position_m(pos_m);
        }
    }
}

impl Centroids {
    fn new(limbs: &[Limb]) -> Self {
        let half = limbs.len() / 2;
        let mut c = Self {
            all_m: Vector3::zeros(),
            left_m: Vector3::zeros(),
            right_m: Vector3::zeros(),
            front_m: Vector3::zeros(),
            hind_m: Vector3::zeros(),
        };
        let (mut num_left, mut num_right) = (0usize, 0usize);

        for (i, limb) in limbs.iter().enumerate() {
            let p = limb.position_m();
            c.all_m += p;

            match limb.side() {
                LimbSide::Left => {
                    c.left_m += p;
                    num_left += 1;
                }
                LimbSide::Right => {
                    c.right_m += p;
                    num_right += 1;
                }
            }

            if i < half {
                c.front_m += p;
            } else {
                c.hind_m += p;
            }
        }

        c.all_m /= limbs.len().max(1) as f64;
        c.left_m /= num_left.max(1) as f64;
        c.right_m /= num_right.max(1) as f64;
        c.front_m /= half.max(1) as f64;
        c.hind_m /= (limbs.len() - half).max(1) as f64;

        c
    }
}

/// Normalised linear interpolation along the shortest arc.
fn ease(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    if from.coords.dot(&to.coords) < 0.0 {
        let flipped = UnitQuaternion::new_unchecked(-to.into_inner());
        from.nlerp(&flipped, t)
    } else {
        from.nlerp(to, t)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
