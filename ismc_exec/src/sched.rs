//! # Control loop scheduler
//!
//! Drives the controller over a trajectory with a two-tier fixed-rate loop. For every sample of
//! the trajectory:
//!
//! 1. **Compute**: evaluate the control law using the cached state and the current integral, and
//!    rotate the command into the world frame.
//! 2. **Inner block**, repeated `inner_ticks_per_outer` times: publish the command, read the
//!    current position, refresh the integral, wait for the next inner tick.
//! 3. **Advance**: wait for the outer tick, refresh the cached state, record the diagnostics.
//!
//! The frame transform is built from the heading in the state cell when the mission starts and is
//! held fixed until the end of the mission, even if the vehicle yaws.
//!
//! Timing comes from a pair of [`TickSource`]s so that the loop can be driven by the monotonic
//! clock in flight and by hand in tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use crate::frame::{Control, FrameTransform, FrameVector, World};
use crate::smc::{
    ControlState, DesiredState, Diagnostics, IntegralAccumulator, SlidingModeController, SmcError,
};
use crate::state_cell::StateCell;
use crate::traj::Trajectory;
use comms_if::eqpt::setpoint::AccelSetpoint;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    session::{self, Session},
    time,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of periodic ticks.
pub trait TickSource {
    /// Restart the tick sequence from now.
    fn reset(&mut self);

    /// Block until the next tick.
    fn wait_next(&mut self);
}

/// Interface through which setpoints reach the vehicle.
pub trait ActuationInterface {
    /// Send a setpoint to the vehicle. Called once per inner tick.
    fn send_setpoint(&mut self, setpoint: &AccelSetpoint);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the control loop.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Rate at which the control law is evaluated and the trajectory advanced.
    ///
    /// Units: hertz
    pub outer_rate_hz: f64,

    /// Number of times each command is repeated (and the integral refreshed) per outer tick.
    pub inner_ticks_per_outer: u32,
}

/// Tick source backed by the monotonic clock.
///
/// Tick `n` is due at `start + n * period`, so the deadlines do not drift with sleep jitter and
/// two tickers reset together stay in phase. A tick which is already due returns immediately.
/// Lateness up to the overrun tolerance is absorbed silently; beyond it the overrun is logged
/// and the sequence restarts from the current time rather than trying to catch up.
pub struct MonotonicTicker {
    name: &'static str,

    /// Units: seconds
    period_s: f64,

    /// Lateness beyond which a tick is counted as an overrun, one period by default
    overrun_tolerance: Duration,

    /// Start of the current tick sequence
    start: Instant,

    /// Ticks elapsed since `start`
    num_ticks: u32,

    num_overruns: u64,
}

/// Tick source which never blocks, used to step the loop deterministically.
#[derive(Debug, Default)]
pub struct ManualTicker {
    num_ticks: u64,
}

/// Diagnostics computed from the initial state before the first tick.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct SeedDiagnostics {
    pub p_e: FrameVector<Control>,
    pub v_e: FrameVector<Control>,
    pub s_0: FrameVector<Control>,
}

/// Diagnostics of one outer tick.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct TickDiagnostics {
    /// Index of the trajectory sample flown during this tick
    pub index: usize,

    /// Desired heading of the sample, if the trajectory has one
    pub heading_d_rad: Option<f64>,

    /// Controller diagnostics
    pub ctrl: Diagnostics,

    /// The command actually sent
    pub command_world: FrameVector<World>,

    /// Value of the integral at the end of the inner block
    pub s_int: FrameVector<Control>,
}

/// The full diagnostic history of a mission.
#[derive(Debug, Clone, Serialize)]
pub struct MissionLog {
    /// Heading used to build the frame transform
    pub heading_rad: f64,

    pub seed: SeedDiagnostics,

    pub ticks: Vec<TickDiagnostics>,
}

/// Runs the controller over a trajectory.
pub struct ControlLoopScheduler<A, O, I>
where
    A: ActuationInterface,
    O: TickSource,
    I: TickSource,
{
    params: Params,

    controller: SlidingModeController,

    cell: Arc<StateCell>,

    actuator: A,

    outer: O,
    inner: I,

    archives: Option<LoopArchives>,
}

/// Flat CSV record of one outer tick.
#[derive(Debug, Serialize)]
struct DiagnosticsRecord {
    time_s: f64,
    index: usize,
    p_e_x: f64,
    p_e_y: f64,
    p_e_z: f64,
    v_e_x: f64,
    v_e_y: f64,
    v_e_z: f64,
    s_0_x: f64,
    s_0_y: f64,
    s_0_z: f64,
    sat_x: f64,
    sat_y: f64,
    sat_z: f64,
    s_int_x: f64,
    s_int_y: f64,
    s_int_z: f64,
}

/// Flat CSV record of one published command.
#[derive(Debug, Serialize)]
struct CommandRecord {
    time_s: f64,
    index: usize,
    inner_tick: u32,
    accel_x_mss: f64,
    accel_y_mss: f64,
    accel_z_mss: f64,
}

struct LoopArchives {
    diag: Archiver,
    cmds: Archiver,

    pending_diag: Option<DiagnosticsRecord>,
    pending_cmds: Vec<CommandRecord>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid loop configuration: {0}")]
    InvalidConfiguration(String),

    /// The state cell has never received a position and heading, so there is nothing to build
    /// the frame transform from.
    #[error("No initial state estimate is available")]
    NoInitialState,

    #[error("Controller error: {0}")]
    SmcError(SmcError),

    #[error("Could not create the loop archives: {0}")]
    ArchiveError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Load and validate the parameters from a file in the params directory.
    pub fn load(params_path: &str) -> Result<Self, SchedError> {
        let params: Self =
            util::params::load(params_path).map_err(SchedError::ParamLoadError)?;
        params.validate()?;

        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SchedError> {
        if time::rate_to_period_s(self.outer_rate_hz).is_none() {
            return Err(SchedError::InvalidConfiguration(format!(
                "outer rate must be positive, found {} Hz",
                self.outer_rate_hz
            )));
        }

        if self.inner_ticks_per_outer < 1 {
            return Err(SchedError::InvalidConfiguration(String::from(
                "there must be at least one inner tick per outer tick",
            )));
        }

        Ok(())
    }

    /// Rate of the inner ticks.
    ///
    /// Units: hertz
    pub fn inner_rate_hz(&self) -> f64 {
        self.outer_rate_hz * self.inner_ticks_per_outer as f64
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            outer_rate_hz: 10.0,
            inner_ticks_per_outer: 3,
        }
    }
}

impl MonotonicTicker {
    pub fn new(name: &'static str, rate_hz: f64) -> Result<Self, SchedError> {
        let period_s = time::rate_to_period_s(rate_hz).ok_or_else(|| {
            SchedError::InvalidConfiguration(format!(
                "{} ticker rate must be positive, found {} Hz",
                name, rate_hz
            ))
        })?;

        Ok(Self {
            name,
            period_s,
            overrun_tolerance: Duration::from_secs_f64(period_s),
            start: Instant::now(),
            num_ticks: 0,
            num_overruns: 0,
        })
    }

    /// Set how late a tick may be before it counts as an overrun.
    pub fn with_overrun_tolerance(mut self, tolerance: Duration) -> Self {
        self.overrun_tolerance = tolerance;
        self
    }

    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }
}

impl TickSource for MonotonicTicker {
    fn reset(&mut self) {
        self.start = Instant::now();
        self.num_ticks = 0;
    }

    fn wait_next(&mut self) {
        self.num_ticks += 1;

        let deadline =
            self.start + Duration::from_secs_f64(self.period_s * self.num_ticks as f64);
        let now = Instant::now();

        match deadline.checked_duration_since(now) {
            Some(d) => thread::sleep(d),
            None => {
                let lateness = now - deadline;

                if lateness > self.overrun_tolerance {
                    warn!(
                        "{} tick overran by {:.6} s",
                        self.name,
                        lateness.as_secs_f64()
                    );
                    self.num_overruns += 1;
                    self.start = now;
                    self.num_ticks = 0;
                }
            }
        }
    }
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks since the last reset.
    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }
}

impl TickSource for ManualTicker {
    fn reset(&mut self) {
        self.num_ticks = 0;
    }

    fn wait_next(&mut self) {
        self.num_ticks += 1;
    }
}

impl MissionLog {
    /// Number of diagnostic rows including the seed.
    pub fn num_rows(&self) -> usize {
        self.ticks.len() + 1
    }
}

impl<A, O, I> ControlLoopScheduler<A, O, I>
where
    A: ActuationInterface,
    O: TickSource,
    I: TickSource,
{
    /// Create a new scheduler.
    pub fn new(
        params: Params,
        controller: SlidingModeController,
        cell: Arc<StateCell>,
        actuator: A,
        outer: O,
        inner: I,
    ) -> Result<Self, SchedError> {
        params.validate()?;

        Ok(Self {
            params,
            controller,
            cell,
            actuator,
            outer,
            inner,
            archives: None,
        })
    }

    /// Archive the loop's diagnostics and commands into the given session.
    pub fn with_archives(mut self, session: &Session) -> Result<Self, SchedError> {
        self.archives = Some(LoopArchives {
            diag: Archiver::from_path(session, "ismc/diagnostics.csv")
                .map_err(SchedError::ArchiveError)?,
            cmds: Archiver::from_path(session, "ismc/commands.csv")
                .map_err(SchedError::ArchiveError)?,
            pending_diag: None,
            pending_cmds: Vec::new(),
        });

        Ok(self)
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn outer_ticker(&self) -> &O {
        &self.outer
    }

    pub fn inner_ticker(&self) -> &I {
        &self.inner
    }

    pub fn controller(&self) -> &SlidingModeController {
        &self.controller
    }

    /// Fly the whole trajectory.
    ///
    /// `s_int_seed` is the initial value of the integral, in the control frame.
    pub fn run(
        &mut self,
        traj: &Trajectory,
        s_int_seed: FrameVector<Control>,
    ) -> Result<MissionLog, SchedError> {
        // ---- SETUP ----

        let initial = self.cell.estimate().ok_or(SchedError::NoInitialState)?;

        let transform = FrameTransform::from_heading(initial.heading_rad);
        let mut current = ControlState::from_estimate(&initial, &transform);

        let mut integral = IntegralAccumulator::new(
            s_int_seed,
            current.position_m,
            self.params.inner_rate_hz(),
        )
        .map_err(SchedError::SmcError)?;

        let seed = {
            let desired = DesiredState::from_sample(traj.first(), &transform);
            let surface =
                self.controller
                    .surface()
                    .compute(&current, &desired, &FrameVector::zeros());
            SeedDiagnostics {
                p_e: surface.p_e,
                v_e: surface.v_e,
                s_0: surface.s_0,
            }
        };

        info!(
            "Starting mission: {} samples at {} Hz, {} inner ticks per sample, heading {:.4} rad",
            traj.len(),
            self.params.outer_rate_hz,
            self.params.inner_ticks_per_outer,
            transform.heading_rad()
        );

        let mut log = MissionLog {
            heading_rad: transform.heading_rad(),
            seed,
            ticks: Vec::with_capacity(traj.len()),
        };

        self.outer.reset();
        self.inner.reset();

        // ---- MAIN LOOP ----

        for sample in traj {
            // ---- COMPUTE ----

            let desired = DesiredState::from_sample(sample, &transform);
            let (cmd, diag) = self
                .controller
                .evaluate(&current, &desired, &integral.value());

            let cmd_world = transform.forward(cmd);
            let setpoint = AccelSetpoint::accel_only(cmd_world.to_array());

            // ---- INNER BLOCK ----

            for k in 0..self.params.inner_ticks_per_outer {
                self.actuator.send_setpoint(&setpoint);

                let p = self.read_state(&transform, &current).position_m;
                integral.refresh(&desired.position_m, &p);

                if let Some(ref mut a) = self.archives {
                    a.pending_cmds.push(CommandRecord {
                        time_s: session::get_elapsed_seconds(),
                        index: sample.index,
                        inner_tick: k,
                        accel_x_mss: cmd_world.x(),
                        accel_y_mss: cmd_world.y(),
                        accel_z_mss: cmd_world.z(),
                    });
                }

                self.inner.wait_next();
            }

            // ---- ADVANCE ----

            self.outer.wait_next();

            current = self.read_state(&transform, &current);

            let tick = TickDiagnostics {
                index: sample.index,
                heading_d_rad: sample.heading_rad,
                ctrl: diag,
                command_world: cmd_world,
                s_int: integral.value(),
            };

            debug!(
                "Tick {}: p_e = {}, s0 = {}, cmd = {}",
                tick.index, tick.ctrl.p_e, tick.ctrl.s_0, tick.command_world
            );

            if let Some(ref mut a) = self.archives {
                a.pending_diag = Some(DiagnosticsRecord::from(&tick));
                if let Err(e) = a.write() {
                    warn!("Could not write loop archives: {}", e);
                }
            }

            log.ticks.push(tick);
        }

        info!(
            "Mission complete, final position error {:.4} m",
            log.ticks.last().map(|t| t.ctrl.p_e.norm()).unwrap_or(0.0)
        );

        Ok(log)
    }

    /// Read the latest state from the cell, falling back to the last known state if the cell has
    /// lost its estimate.
    fn read_state(&self, transform: &FrameTransform, last: &ControlState) -> ControlState {
        match self.cell.estimate() {
            Some(est) => ControlState::from_estimate(&est, transform),
            None => *last,
        }
    }
}

impl From<&TickDiagnostics> for DiagnosticsRecord {
    fn from(tick: &TickDiagnostics) -> Self {
        let d = &tick.ctrl;
        Self {
            time_s: session::get_elapsed_seconds(),
            index: tick.index,
            p_e_x: d.p_e.x(),
            p_e_y: d.p_e.y(),
            p_e_z: d.p_e.z(),
            v_e_x: d.v_e.x(),
            v_e_y: d.v_e.y(),
            v_e_z: d.v_e.z(),
            s_0_x: d.s_0.x(),
            s_0_y: d.s_0.y(),
            s_0_z: d.s_0.z(),
            sat_x: d.sat.x(),
            sat_y: d.sat.y(),
            sat_z: d.sat.z(),
            s_int_x: tick.s_int.x(),
            s_int_y: tick.s_int.y(),
            s_int_z: tick.s_int.z(),
        }
    }
}

impl Archived for LoopArchives {
    fn write(&mut self) -> Result<(), ArchiveError> {
        for rec in self.pending_cmds.drain(..) {
            self.cmds.serialise(rec)?;
        }

        if let Some(rec) = self.pending_diag.take() {
            self.diag.serialise(rec)?;
        }

        Ok(())
    }
}
