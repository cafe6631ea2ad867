//! Simulated terrain
//!
//! Terrain is modelled as a heightfield over the horizontal plane. Probes cast straight down are
//! evaluated directly from the height at the origin, other directions are marched along the ray
//! and refined by bisection once they pass below the surface.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::probe::{GroundProbe, LayerMask, ProbeHit};
use nalgebra::Vector3;
use noise::{NoiseFn, Perlin, Seedable};
use serde::{Deserialize, Serialize};
use util::maths::planar_norm;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Step length used when marching along a ray.
const MARCH_STEP_M: f64 = 0.05;

/// Number of bisection iterations used to refine a crossing found by marching.
const BISECTION_ITERATIONS: usize = 40;

/// Planar extent of a unit direction under which it is treated as straight down.
const STRAIGHT_DOWN_TOLERANCE: f64 = 1e-12;

/// Offset used to estimate surface normals by central differences.
const NORMAL_SAMPLE_OFFSET_M: f64 = 1e-4;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A surface defined by its height at each horizontal position.
pub trait Heightfield {
    /// Height of the surface at the given horizontal position.
    fn height_m(&self, x_m: f64, z_m: f64) -> f64;

    /// The layer the surface belongs to.
    fn layer(&self) -> LayerMask;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    height_m: f64,
    layer: LayerMask,
}

/// A horizontal plane with a ledge running along the X axis. Ground at or beyond `edge_z_m` is
/// raised by `step_height_m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepGround {
    base_height_m: f64,
    step_height_m: f64,
    edge_z_m: f64,
    layer: LayerMask,
}

/// Rolling terrain generated from Perlin noise.
pub struct PerlinGround {
    perlin: Perlin,
    amplitude_m: f64,
    wavelength_m: f64,
    base_height_m: f64,
    layer: LayerMask,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Terrain selection for the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TerrainParams {
    Flat {
        height_m: f64,
    },
    Step {
        base_height_m: f64,
        step_height_m: f64,
        edge_z_m: f64,
    },
    Perlin {
        seed: u32,
        amplitude_m: f64,
        wavelength_m: f64,
        base_height_m: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TerrainParams {
    /// Build the selected terrain.
    pub fn build(&self) -> Box<dyn GroundProbe> {
        match *self {
            TerrainParams::Flat { height_m } => Box::new(FlatGround::new(height_m)),
            TerrainParams::Step {
                base_height_m,
                step_height_m,
                edge_z_m,
            } => Box::new(StepGround::new(base_height_m, step_height_m, edge_z_m)),
            TerrainParams::Perlin {
                seed,
                amplitude_m,
                wavelength_m,
                base_height_m,
            } => Box::new(PerlinGround::new(
                seed,
                amplitude_m,
                wavelength_m,
                base_height_m,
            )),
        }
    }
}

impl Default for TerrainParams {
    fn default() -> Self {
        TerrainParams::Flat { height_m: 0.0 }
    }
}

impl FlatGround {
    pub fn new(height_m: f64) -> Self {
        Self {
            height_m,
            layer: LayerMask::GROUND,
        }
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }
}

impl Heightfield for FlatGround {
    fn height_m(&self, _: f64, _: f64) -> f64 {
        self.height_m
    }

    fn layer(&self) -> LayerMask {
        self.layer
    }
}

impl StepGround {
    pub fn new(base_height_m: f64, step_height_m: f64, edge_z_m: f64) -> Self {
        Self {
            base_height_m,
            step_height_m,
            edge_z_m,
            layer: LayerMask::GROUND,
        }
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }
}

impl Heightfield for StepGround {
    fn height_m(&self, _: f64, z_m: f64) -> f64 {
        if z_m >= self.edge_z_m {
            self.base_height_m + self.step_height_m
        } else {
            self.base_height_m
        }
    }

    fn layer(&self) -> LayerMask {
        self.layer
    }
}

impl PerlinGround {
    /// Create a new terrain. Heights vary by up to `amplitude_m` either side of `base_height_m`,
    /// with features roughly `wavelength_m` across.
    pub fn new(seed: u32, amplitude_m: f64, wavelength_m: f64, base_height_m: f64) -> Self {
        Self {
            perlin: Perlin::new().set_seed(seed),
            amplitude_m,
            wavelength_m,
            base_height_m,
            layer: LayerMask::GROUND,
        }
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }
}

impl Heightfield for PerlinGround {
    fn height_m(&self, x_m: f64, z_m: f64) -> f64 {
        self.base_height_m
            + self.amplitude_m * self.perlin.get([x_m / self.wavelength_m, z_m / self.wavelength_m])
    }

    fn layer(&self) -> LayerMask {
        self.layer
    }
}

impl GroundProbe for FlatGround {
    fn probe(
        &self,
        origin_m: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance_m: f64,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        probe_heightfield(self, origin_m, direction, max_distance_m, layers)
    }
}

impl GroundProbe for StepGround {
    fn probe(
        &self,
        origin_m: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance_m: f64,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        probe_heightfield(self, origin_m, direction, max_distance_m, layers)
    }
}

impl GroundProbe for PerlinGround {
    fn probe(
        &self,
        origin_m: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance_m: f64,
        layers: LayerMask,
    ) -> Option<ProbeHit> {
        probe_heightfield(self, origin_m, direction, max_distance_m, layers)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Cast a ray against a heightfield.
///
/// Returns `None` if the heightfield is not in `layers`, if the origin is below the surface or if
/// the surface is not reached within `max_distance_m`.
pub fn probe_heightfield<H: Heightfield + ?Sized>(
    field: &H,
    origin_m: &Vector3<f64>,
    direction: &Vector3<f64>,
    max_distance_m: f64,
    layers: LayerMask,
) -> Option<ProbeHit> {
    if !layers.contains(field.layer()) {
        return None;
    }

    let direction = direction.try_normalize(f64::EPSILON)?;

    // Height of the ray above the surface at distance `s` along it
    let clearance_m = |s: f64| {
        let p = origin_m + direction * s;
        p.y - field.height_m(p.x, p.z)
    };

    if clearance_m(0.0) < 0.0 {
        return None;
    }

    if planar_norm(&direction) < STRAIGHT_DOWN_TOLERANCE && direction.y < 0.0 {
        let distance_m = clearance_m(0.0);

        return if distance_m <= max_distance_m {
            let point_m = Vector3::new(
                origin_m.x,
                field.height_m(origin_m.x, origin_m.z),
                origin_m.z,
            );
            Some(hit(field, point_m, distance_m))
        } else {
            None
        };
    }

    let mut prev_s = 0.0;
    while prev_s < max_distance_m {
        let s = (prev_s + MARCH_STEP_M).min(max_distance_m);

        if clearance_m(s) <= 0.0 {
            let (mut lo, mut hi) = (prev_s, s);
            for _ in 0..BISECTION_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if clearance_m(mid) > 0.0 {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }

            return Some(hit(field, origin_m + direction * hi, hi));
        }

        prev_s = s;
    }

    None
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn hit<H: Heightfield + ?Sized>(field: &H, point_m: Vector3<f64>, distance_m: f64) -> ProbeHit {
    let e = NORMAL_SAMPLE_OFFSET_M;
    let dh_dx = (field.height_m(point_m.x + e, point_m.z) - field.height_m(point_m.x - e, point_m.z))
        / (2.0 * e);
    let dh_dz = (field.height_m(point_m.x, point_m.z + e) - field.height_m(point_m.x, point_m.z - e))
        / (2.0 * e);

    ProbeHit {
        point_m,
        normal: Vector3::new(-dh_dx, 1.0, -dh_dz).normalize(),
        distance_m,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_straight_down() {
        let ground = FlatGround::new(0.5);
        let hit = ground
            .probe(
                &Vector3::new(1.0, 10.0, -2.0),
                &-Vector3::y(),
                100.0,
                LayerMask::GROUND,
            )
            .unwrap();

        assert_eq!(hit.point_m, Vector3::new(1.0, 0.5, -2.0));
        assert_eq!(hit.distance_m, 9.5);
        assert_relative_eq!(hit.normal, Vector3::y());

        // Out of range
        assert!(ground
            .probe(&Vector3::new(0.0, 10.0, 0.0), &-Vector3::y(), 5.0, LayerMask::GROUND)
            .is_none());

        // Starting under the ground
        assert!(ground
            .probe(&Vector3::new(0.0, 0.0, 0.0), &-Vector3::y(), 5.0, LayerMask::GROUND)
            .is_none());
    }

    #[test]
    fn test_layer_filter() {
        let ground = FlatGround::new(0.0).with_layer(LayerMask(0b100));
        let origin = Vector3::new(0.0, 1.0, 0.0);

        assert!(ground
            .probe(&origin, &-Vector3::y(), 10.0, LayerMask::GROUND)
            .is_none());
        assert!(ground
            .probe(&origin, &-Vector3::y(), 10.0, LayerMask::ALL)
            .is_some());
    }

    #[test]
    fn test_oblique_ray() {
        let ground = FlatGround::new(0.0);
        let hit = ground
            .probe(
                &Vector3::new(0.0, 1.0, 0.0),
                &Vector3::new(1.0, -1.0, 0.0),
                10.0,
                LayerMask::GROUND,
            )
            .unwrap();

        assert_relative_eq!(hit.point_m, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.distance_m, 2f64.sqrt(), epsilon = 1e-9);

        // Rays which never come down miss
        assert!(ground
            .probe(&Vector3::new(0.0, 1.0, 0.0), &Vector3::x(), 10.0, LayerMask::GROUND)
            .is_none());
    }

    #[test]
    fn test_step_ground() {
        let ground = StepGround::new(0.0, 0.4, 2.0);

        assert_eq!(ground.height_m(0.0, 1.9), 0.0);
        assert_eq!(ground.height_m(0.0, 2.0), 0.4);

        // A horizontal ray below the ledge hits its face
        let hit = ground
            .probe(
                &Vector3::new(0.0, 0.2, 0.0),
                &Vector3::z(),
                10.0,
                LayerMask::GROUND,
            )
            .unwrap();
        assert_relative_eq!(hit.point_m.z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_perlin_ground() {
        let ground = PerlinGround::new(3, 0.5, 4.0, 1.0);
        let other = PerlinGround::new(3, 0.5, 4.0, 1.0);

        for i in 0..50 {
            let x = i as f64 * 0.37 - 9.0;
            let z = i as f64 * -0.21 + 4.0;

            let h = ground.height_m(x, z);
            assert_eq!(h, other.height_m(x, z));
            assert!((h - 1.0).abs() <= 1.0);

            let hit = ground
                .probe(&Vector3::new(x, 50.0, z), &-Vector3::y(), 100.0, LayerMask::GROUND)
                .unwrap();
            assert_relative_eq!(hit.point_m.y, h);
            assert_relative_eq!(hit.normal.norm(), 1.0, epsilon = 1e-12);
            assert!(hit.normal.y > 0.0);
        }
    }

    #[test]
    fn test_terrain_params() {
        let params: TerrainParams = util::params::from_str(
            "type = \"Step\"\nbase_height_m = 0.0\nstep_height_m = 0.3\nedge_z_m = 1.0",
        )
        .unwrap();
        let ground = params.build();

        let hit = ground
            .probe(&Vector3::new(0.0, 5.0, 1.5), &-Vector3::y(), 10.0, LayerMask::GROUND)
            .unwrap();
        assert_relative_eq!(hit.point_m.y, 0.3);
    }
}
