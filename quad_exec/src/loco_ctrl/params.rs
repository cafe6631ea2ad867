//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::probe::LayerMask;
use serde::{Deserialize, Serialize};

use super::{LocoCtrlError, StepCurves};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
///
/// Any field missing from a parameter file takes its default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GAIT ----
    /// Number of steps taken per second. One step is one pass of the gait phase from 0 to 1.
    ///
    /// Units: 1/seconds
    pub steps_per_second: f64,

    /// Distance ahead of the stable position that a full step lands.
    ///
    /// Units: meters
    pub stride_length_m: f64,

    /// Largest rise between a stable position and its landing point that can be stepped up.
    ///
    /// Units: meters
    pub max_step_height_m: f64,

    /// Phase lag between a front limb and the hind limb on the same side, as a fraction of a step.
    pub gait_stagger: f64,

    // ---- RECENTER ----
    /// Size of each turn-in-place sub-step.
    ///
    /// Units: radians
    pub turn_substep_angle_rad: f64,

    /// If false every turn goes straight to the final rest pose with no intermediate waypoints.
    pub turn_substeps_enabled: bool,

    /// Delay between the start of each pair of limbs moving within a recenter pass.
    ///
    /// Units: seconds
    pub recenter_stagger_s: f64,

    /// Recenter foot speed as a multiple of `steps_per_second`.
    ///
    /// Units: meters per step
    pub recenter_speed_factor: f64,

    /// Height the feet are lifted to while recentering.
    ///
    /// Units: meters
    pub recenter_lift_m: f64,

    /// Feet closer than this (horizontally) to their target are no longer lifted.
    ///
    /// Units: meters
    pub recenter_lift_threshold_m: f64,

    /// Feet within this distance of their recenter target are considered arrived.
    ///
    /// Units: meters
    pub arrival_tolerance_m: f64,

    // ---- GROUND PROBING ----
    /// Height above the query point that ground probes are cast down from.
    ///
    /// Units: meters
    pub probe_clearance_m: f64,

    /// Maximum length of a ground probe.
    ///
    /// Units: meters
    pub probe_max_distance_m: f64,

    /// Geometry layers which can be walked on.
    pub ground_layers: LayerMask,

    // ---- BODY ----
    /// Rate at which the skeleton and rig rotations approach their targets.
    ///
    /// Units: 1/seconds
    pub body_smoothing_rate_hz: f64,

    /// Squared distance between normalised directions under which a move request is considered to
    /// be along the current heading.
    pub forward_facing_tolerance: f64,

    /// Planar magnitude under which a move direction is treated as zero.
    pub move_epsilon: f64,

    // ---- CURVES ----
    /// Step animation curves.
    pub curves: StepCurves,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            steps_per_second: 1.5,
            stride_length_m: 1.0,
            max_step_height_m: 0.5,
            gait_stagger: 0.425,
            turn_substep_angle_rad: std::f64::consts::FRAC_PI_6,
            turn_substeps_enabled: true,
            recenter_stagger_s: 0.075,
            recenter_speed_factor: 2.0,
            recenter_lift_m: 0.5,
            recenter_lift_threshold_m: 0.2,
            arrival_tolerance_m: 1e-6,
            probe_clearance_m: 100.0,
            probe_max_distance_m: 500.0,
            ground_layers: LayerMask::GROUND,
            body_smoothing_rate_hz: 1.0,
            forward_facing_tolerance: 0.1,
            move_epsilon: 1e-6,
            curves: StepCurves::default(),
        }
    }
}

impl Params {
    /// Check the parameters can drive the controller.
    pub fn validate(&self) -> Result<(), LocoCtrlError> {
        positive("steps_per_second", self.steps_per_second)?;
        positive("stride_length_m", self.stride_length_m)?;
        positive("recenter_speed_factor", self.recenter_speed_factor)?;
        positive("probe_max_distance_m", self.probe_max_distance_m)?;

        if self.turn_substeps_enabled {
            positive("turn_substep_angle_rad", self.turn_substep_angle_rad)?;
        }

        non_negative("max_step_height_m", self.max_step_height_m)?;
        non_negative("recenter_stagger_s", self.recenter_stagger_s)?;
        non_negative("recenter_lift_m", self.recenter_lift_m)?;
        non_negative("recenter_lift_threshold_m", self.recenter_lift_threshold_m)?;
        non_negative("arrival_tolerance_m", self.arrival_tolerance_m)?;
        non_negative("body_smoothing_rate_hz", self.body_smoothing_rate_hz)?;
        non_negative("move_epsilon", self.move_epsilon)?;

        if !(0.0..1.0).contains(&self.gait_stagger) {
            return Err(LocoCtrlError::InvalidParam {
                name: "gait_stagger",
                reason: format!("expected a value in [0, 1), found {}", self.gait_stagger),
            });
        }

        Ok(())
    }

    /// Speed at which feet move while recentering.
    ///
    /// Units: meters/second
    pub fn recenter_speed_ms(&self) -> f64 {
        self.recenter_speed_factor * self.steps_per_second
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), LocoCtrlError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(LocoCtrlError::InvalidParam {
            name,
            reason: format!("expected a positive value, found {}", value),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), LocoCtrlError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(LocoCtrlError::InvalidParam {
            name,
            reason: format!("expected a non-negative value, found {}", value),
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
