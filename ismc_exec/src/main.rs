//! Main ISMC executable entry point.
//!
//! # Architecture
//!
//! The executable flies a single trajectory against the simulated vehicle:
//!
//!     - Initialise the session and logging
//!     - Load the controller, loop and simulation parameters
//!     - Load the trajectory
//!     - Start the simulated vehicle and wait for its first state estimate
//!     - Run the control loop over the whole trajectory
//!     - Save the mission diagnostics into the session
//!
//! # Usage
//!
//! ```text
//! ismc_exec <TRAJ_PATH> [--s-int-seed <x> <y> <z>] [--log-level <level>]
//! ```
//!
//! Parameter files are read from `$ISMC_SW_ROOT/params`, and sessions are created in
//! `$ISMC_SW_ROOT/sessions`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use ismc_lib::{
    frame::FrameVector,
    sched::{self, ControlLoopScheduler, MonotonicTicker},
    sim::{self, SimVehicle},
    smc::SlidingModeController,
    state_cell::StateCell,
    traj::Trajectory,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How long to wait for the first complete state estimate before giving up.
const INITIAL_STATE_TIMEOUT: Duration = Duration::from_secs(5);

const INITIAL_STATE_POLL_PERIOD: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Integral sliding mode trajectory controller.
#[derive(Debug, StructOpt)]
#[structopt(name = "ismc_exec")]
struct Opts {
    /// Path to the trajectory JSON file.
    #[structopt(parse(from_os_str))]
    traj_path: PathBuf,

    /// Initial value of the sliding integral in the control frame, as three values.
    #[structopt(long = "s-int-seed", number_of_values = 3, allow_hyphen_values = true)]
    s_int_seed: Option<Vec<f64>>,

    /// Minimum log level, must be `info` or more verbose.
    #[structopt(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    let opts = Opts::from_args();

    // Initialise session
    let session = Session::new("ismc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("ISMC Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let controller =
        SlidingModeController::init("smc.toml").wrap_err("Failed to initialise the controller")?;
    let sched_params =
        sched::Params::load("sched.toml").wrap_err("Could not load the loop params")?;
    let sim_params = sim::Params::load("sim.toml").wrap_err("Could not load the sim params")?;

    info!("Exec parameters loaded");

    let s_int_seed = match opts.s_int_seed {
        Some(ref v) if v.len() == 3 => FrameVector::new(v[0], v[1], v[2]),
        Some(ref v) => {
            return Err(eyre!(
                "Expected three values for the integral seed, found {}",
                v.len()
            ))
        }
        None => FrameVector::zeros(),
    };

    // ---- LOAD TRAJECTORY ----

    let traj = Trajectory::load(&opts.traj_path)
        .wrap_err_with(|| format!("Failed to load trajectory from {:?}", opts.traj_path))?;

    info!(
        "Loaded trajectory with {} samples ({:.02} s)",
        traj.len(),
        traj.len() as f64 / sched_params.outer_rate_hz
    );

    // ---- INITIALISE VEHICLE ----

    let cell = Arc::new(StateCell::new());
    let vehicle =
        SimVehicle::start(&sim_params, cell.clone()).wrap_err("Failed to start the SimVehicle")?;
    info!("SimVehicle started");

    let wait_start = Instant::now();
    while cell.estimate().is_none() {
        if wait_start.elapsed() > INITIAL_STATE_TIMEOUT {
            return Err(eyre!(
                "No state estimate received within {:?}",
                INITIAL_STATE_TIMEOUT
            ));
        }
        thread::sleep(INITIAL_STATE_POLL_PERIOD);
    }

    // ---- INITIALISE LOOP ----

    // An outer tick later than one inner period has missed an inner tick
    let outer = MonotonicTicker::new("Outer", sched_params.outer_rate_hz)
        .wrap_err("Failed to create the outer ticker")?
        .with_overrun_tolerance(Duration::from_secs_f64(
            1.0 / sched_params.inner_rate_hz(),
        ));
    let inner = MonotonicTicker::new("Inner", sched_params.inner_rate_hz())
        .wrap_err("Failed to create the inner ticker")?;

    let mut scheduler =
        ControlLoopScheduler::new(sched_params, controller, cell, vehicle, outer, inner)
            .wrap_err("Failed to create the control loop")?
            .with_archives(&session)
            .wrap_err("Failed to set up the loop archives")?;

    // ---- MAIN LOOP ----

    info!("Beginning mission\n");

    let log = scheduler
        .run(&traj, s_int_seed)
        .wrap_err("Mission failed")?;

    info!(
        "Sent {} setpoints, {} outer and {} inner overruns",
        scheduler.actuator().num_setpoints(),
        scheduler.outer_ticker().num_overruns(),
        scheduler.inner_ticker().num_overruns()
    );

    // ---- SHUTDOWN ----

    session.save("ismc/mission_log.json", log);

    // Stops the vehicle
    drop(scheduler);

    info!("End of execution");

    session.exit();

    Ok(())
}
