//! # Ground probe interface
//!
//! A ground probe resolves a ray against walkable geometry. Implementations must be free of side
//! effects, as the controller calls them several times per limb per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A bitmask of geometry layers which a probe may hit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

/// The contact found by a probe.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProbeHit {
    /// Contact point in the world frame
    pub point_m: Vector3<f64>,

    /// Unit normal of the surface at the contact point
    pub normal: Vector3<f64>,

    /// Distance along the ray from the origin to the contact point
    pub distance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A query against the terrain.
pub trait GroundProbe {
    /// Cast a ray from `origin_m` along `direction` (unit length), returning the nearest contact on
    /// geometry in `layers` within `max_distance_m`, or `None` if nothing was hit.
    fn probe(
        &self,
        origin_m: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance_m: f64,
        layers: LayerMask,
    ) -> Option<ProbeHit>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LayerMask {
    /// Mask which matches no layers
    pub const NONE: LayerMask = LayerMask(0);

    /// The default walkable ground layer
    pub const GROUND: LayerMask = LayerMask(1);

    /// Mask which matches all layers
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// True if any of the layers in `other` are included in this mask.
    pub fn contains(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::GROUND
    }
}

impl<P: GroundProbe + ?Sized> GroundProbe for Box<P> {
    fn probe(
        &self,
        origin_m: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance_m: f64,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        (**self).probe(origin_m, direction, max_distance_m, layers)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
