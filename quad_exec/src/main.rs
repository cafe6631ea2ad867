//! Main quadruped executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the simulated rig and terrain
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Locomotion control processing
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `loco_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use quad_lib::{
    data_store::DataStore,
    loco_ctrl::{self, LocoCtrl},
    params::QuadExecParams,
    sim::quadruped_limb_specs,
    tc_processor, CYCLE_PERIOD_S,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use comms_if::tc::TcResponse;
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "quad_exec", about = "Procedural quadruped locomotion simulation")]
struct Opts {
    /// Path to the TC script to execute.
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Run in real time rather than as fast as possible.
    #[structopt(short, long)]
    realtime: bool,

    /// Name of the LocoCtrl parameter file in the params directory.
    #[structopt(long, default_value = "loco_ctrl.toml")]
    loco_ctrl_params: String,

    /// Name of the executable parameter file in the params directory.
    #[structopt(long, default_value = "quad_exec.toml")]
    exec_params: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("quad_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Quadruped Locomotion Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: QuadExecParams = util::params::load(&opts.exec_params)
        .wrap_err("Could not load exec params")?;
    let loco_ctrl_params: loco_ctrl::Params = util::params::load(&opts.loco_ctrl_params)
        .wrap_err("Could not load LocoCtrl params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    info!("Loading script from {:?}", opts.script);

    let mut script =
        ScriptInterpreter::new(&opts.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        script.get_duration(),
        script.get_num_tcs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let loco_ctrl = LocoCtrl::init(
        loco_ctrl::InitData {
            params: loco_ctrl_params,
            core: Some(exec_params.rig.core_pose()),
            limbs: quadruped_limb_specs(&exec_params.rig),
            probe: exec_params.terrain.build(),
        },
        Some(&session),
    )
    .wrap_err("Failed to initialise LocoCtrl")?;
    info!("LocoCtrl init complete");

    let mut ds = DataStore::new(loco_ctrl);

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut end_time_s: Option<f64> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        match script.get_pending_tcs(ds.sim_time_s) {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec.iter() {
                    if tc_processor::exec(&mut ds, tc) != TcResponse::Ok {
                        warn!("TC not executed: {:?}", tc);
                    }
                }
            }
            PendingTcs::EndOfScript => {
                if end_time_s.is_none() {
                    info!("End of TC script reached");
                    end_time_s = Some(ds.sim_time_s + exec_params.end_of_script_margin_s);
                }
            }
        }

        if let Some(t) = end_time_s {
            if ds.sim_time_s >= t {
                info!("Stopping");
                break;
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (output, report) = ds
            .loco_ctrl
            .proc(&ds.loco_ctrl_input)
            .wrap_err("Error during LocoCtrl processing")?;

        trace!("LocoCtrl status: {:?}", report);
        ds.loco_ctrl_output = Some(output);
        ds.loco_ctrl_status_rpt = report;

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.loco_ctrl.write() {
            warn!("Could not archive LocoCtrl: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        ds.cycle_end();

        if opts.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    info!(
        "End of execution after {} cycles, body at {:?}",
        ds.num_cycles,
        ds.loco_ctrl.body().position_m.as_slice()
    );

    Ok(())
}
