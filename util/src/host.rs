//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable holding the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "QUAD_SW_ROOT";

/// Get the root directory of the quadruped software, which contains the
/// `params` and `sessions` directories.
pub fn get_quad_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
