//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use crate::data_store::{DataStore, SafeModeCause};
use comms_if::tc::{Tc, TcResponse};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. While in safe mode only the
/// `MakeUnsafe` TC is executed.
pub fn exec(ds: &mut DataStore, tc: &Tc) -> TcResponse {
    if ds.safe && !matches!(tc, Tc::MakeUnsafe) {
        warn!("Cannot execute {:?} while in safe mode", tc);
        return TcResponse::CannotExecute;
    }

    match tc {
        Tc::Heartbeat => (),
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            if let Err(e) = ds.make_unsafe(SafeModeCause::MakeSafeTc) {
                warn!("{}", e);
                return TcResponse::CannotExecute;
            }
        }
        Tc::LocoCtrlMove(m) => ds.loco_ctrl_input.cmd = Some(*m),
    }

    TcResponse::Ok
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
