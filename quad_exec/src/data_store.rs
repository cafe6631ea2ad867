//! # Data Store

use log::{info, warn};
use thiserror::Error;

use crate::{loco_ctrl, CYCLE_PERIOD_S};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the controller has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
}

/// Errors which can occur when leaving safe mode.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SafeModeError {
    #[error("Safe mode was entered because of {current:?}, cannot clear it for {requested:?}")]
    CauseMismatch {
        current: SafeModeCause,
        requested: SafeModeCause,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Safe mode variables
    /// Determines if the controller is in safe mode.
    pub safe: bool,

    /// Gives the reason for the controller being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // LocoCtrl
    pub loco_ctrl: loco_ctrl::LocoCtrl,
    pub loco_ctrl_input: loco_ctrl::InputData,
    pub loco_ctrl_output: Option<loco_ctrl::OutputData>,
    pub loco_ctrl_status_rpt: loco_ctrl::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    pub fn new(loco_ctrl: loco_ctrl::LocoCtrl) -> Self {
        Self {
            num_cycles: 0,
            sim_time_s: 0.0,
            safe: false,
            safe_cause: None,
            loco_ctrl,
            loco_ctrl_input: loco_ctrl::InputData::default(),
            loco_ctrl_output: None,
            loco_ctrl_status_rpt: loco_ctrl::StatusReport::default(),
        }
    }

    /// Puts the controller into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            // Make loco_ctrl safe
            self.loco_ctrl.stop();
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// To remove safe mode the provided cause must match the initial reason for safe mode being
    /// enabled. If safe mode was not enabled `Ok(())` is returned.
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), SafeModeError> {
        match self.safe_cause {
            None => Ok(()),
            Some(root_cause) if root_cause == cause => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                Ok(())
            }
            Some(root_cause) => Err(SafeModeError::CauseMismatch {
                current: root_cause,
                requested: cause,
            }),
        }
    }

    /// Clear items that need wiping at the start of the cycle.
    pub fn cycle_start(&mut self) {
        self.loco_ctrl_input = loco_ctrl::InputData::default();
    }

    /// Advance the cycle counters.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
        self.sim_time_s += CYCLE_PERIOD_S;
    }
}
