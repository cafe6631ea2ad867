//! # Quadruped Executable Parameters
//!
//! This module provides parameters for the quadruped executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::sim::{RigParams, TerrainParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadExecParams {
    /// Geometry of the simulated rig
    pub rig: RigParams,

    /// Terrain the rig walks on
    pub terrain: TerrainParams,

    /// Time to keep running after the last TC of a script.
    ///
    /// Units: seconds
    pub end_of_script_margin_s: f64,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_exec_params() {
        let params: QuadExecParams = util::params::from_str(
            r#"
            end_of_script_margin_s = 2.0

            [rig]
            body_height_m = 1.2

            [terrain]
            type = "Perlin"
            seed = 4
            amplitude_m = 0.2
            wavelength_m = 5.0
            base_height_m = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(params.end_of_script_margin_s, 2.0);
        assert_eq!(params.rig.body_height_m, 1.2);
        assert_eq!(params.rig.half_width_m, RigParams::default().half_width_m);
        assert!(matches!(params.terrain, TerrainParams::Perlin { seed: 4, .. }));
    }
}
