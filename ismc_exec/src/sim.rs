//! # Simulated vehicle
//!
//! A point mass with linear drag, standing in for the autopilot and airframe during development.
//! The autopilot is assumed to realise the commanded inertial acceleration perfectly, so the only
//! dynamics are
//!
//! ```text
//! p_ddot = a_cmd - (d_p * p_dot) / m
//! ```
//!
//! [`PointMassSim`] is stepped by hand, which is what the tests use. [`SimVehicle`] runs it in a
//! background thread at a fixed rate, consuming the latest setpoint and publishing state updates
//! into a [`StateCell`], just as the autopilot link would.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use arc_swap::ArcSwapOption;
use log::{debug, warn};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::sched::ActuationInterface;
use crate::state_cell::StateCell;
use comms_if::eqpt::{
    setpoint::{AccelSetpoint, FRAME_LOCAL_NED},
    state::{StateUpdate, STANDARD_GRAVITY_MSS},
};
use util::time;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated vehicle.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Units: kilograms
    pub mass_kg: f64,

    /// Diagonal of the linear drag matrix.
    ///
    /// Units: kilograms/second
    pub drag_diag: [f64; 3],

    /// Units: meters
    pub init_position_m: [f64; 3],

    /// Units: radians
    pub init_heading_rad: f64,

    /// Rate at which the simulation is stepped and state published.
    ///
    /// Units: hertz
    pub rate_hz: f64,
}

/// Point mass integrated with semi-implicit Euler.
#[derive(Debug, Clone)]
pub struct PointMassSim {
    position_m: Vector3<f64>,
    velocity_ms: Vector3<f64>,
    accel_mss: Vector3<f64>,
    heading_rad: f64,

    mass_kg: f64,
    drag_diag: Vector3<f64>,
}

/// A simulated vehicle running in a background thread.
pub struct SimVehicle {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,

    /// Latest setpoint sent to the vehicle
    setpoint: Arc<ArcSwapOption<AccelSetpoint>>,

    num_setpoints: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid simulation parameters: {0}")]
    InvalidConfiguration(String),

    #[error("Could not start the simulation thread: {0}")]
    ThreadSpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Params {
    /// Load and validate the parameters from a file in the params directory.
    pub fn load(params_path: &str) -> Result<Self, SimError> {
        let params: Self = util::params::load(params_path).map_err(SimError::ParamLoadError)?;
        params.validate()?;

        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.mass_kg.is_finite() && self.mass_kg > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "mass must be positive, found {} kg",
                self.mass_kg
            )));
        }

        if time::rate_to_period_s(self.rate_hz).is_none() {
            return Err(SimError::InvalidConfiguration(format!(
                "rate must be positive, found {} Hz",
                self.rate_hz
            )));
        }

        Ok(())
    }
}

impl PointMassSim {
    /// Create a new simulation at rest in the initial position.
    pub fn new(params: &Params) -> Self {
        Self {
            position_m: Vector3::from(params.init_position_m),
            velocity_ms: Vector3::zeros(),
            accel_mss: Vector3::zeros(),
            heading_rad: params.init_heading_rad,
            mass_kg: params.mass_kg,
            drag_diag: Vector3::from(params.drag_diag),
        }
    }

    /// Advance the simulation by `dt_s` seconds under the given commanded acceleration.
    pub fn step(&mut self, accel_cmd_mss: &[f64; 3], dt_s: f64) {
        let drag = self.drag_diag.component_mul(&self.velocity_ms) / self.mass_kg;

        self.accel_mss = Vector3::from(*accel_cmd_mss) - drag;
        self.velocity_ms += self.accel_mss * dt_s;
        self.position_m += self.velocity_ms * dt_s;
    }

    pub fn position_m(&self) -> [f64; 3] {
        [self.position_m[0], self.position_m[1], self.position_m[2]]
    }

    pub fn velocity_ms(&self) -> [f64; 3] {
        [self.velocity_ms[0], self.velocity_ms[1], self.velocity_ms[2]]
    }

    /// The state updates an autopilot would publish for the current state.
    ///
    /// The IMU acceleration includes gravity, as a real accelerometer at rest reads `+g` on the
    /// vertical axis.
    pub fn updates(&self) -> [StateUpdate; 3] {
        let half = self.heading_rad / 2.0;

        [
            StateUpdate::Position {
                position_m: self.position_m(),
            },
            StateUpdate::Velocity {
                velocity_ms: self.velocity_ms(),
            },
            StateUpdate::Imu {
                linear_accel_mss: [
                    self.accel_mss[0],
                    self.accel_mss[1],
                    self.accel_mss[2] + STANDARD_GRAVITY_MSS,
                ],
                attitude_q: [half.cos(), 0.0, 0.0, half.sin()],
            },
        ]
    }

    /// Apply the current state to a state cell.
    pub fn publish(&self, cell: &StateCell) {
        for update in self.updates().iter() {
            cell.apply(*update);
        }
    }
}

impl SimVehicle {
    /// Start the simulated vehicle.
    ///
    /// The initial state is published into the cell before this function returns.
    pub fn start(params: &Params, cell: Arc<StateCell>) -> Result<Self, SimError> {
        params.validate()?;

        let sim = PointMassSim::new(params);
        sim.publish(&cell);

        let period = Duration::from_secs_f64(1.0 / params.rate_hz);

        let bg_run = Arc::new(AtomicBool::new(true));
        let setpoint = Arc::new(ArcSwapOption::empty());

        let bg_run_clone = bg_run.clone();
        let setpoint_clone = setpoint.clone();

        let bg_jh = thread::Builder::new()
            .name(String::from("sim_vehicle"))
            .spawn(move || bg_thread(sim, period, bg_run_clone, setpoint_clone, cell))
            .map_err(SimError::ThreadSpawnError)?;

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            setpoint,
            num_setpoints: 0,
        })
    }

    pub fn num_setpoints(&self) -> u64 {
        self.num_setpoints
    }

    /// Stop the background thread.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("SimVehicle background thread panicked");
            }
        }
    }
}

impl ActuationInterface for SimVehicle {
    fn send_setpoint(&mut self, setpoint: &AccelSetpoint) {
        self.setpoint.store(Some(Arc::new(*setpoint)));
        self.num_setpoints += 1;
    }
}

impl Drop for SimVehicle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, steps the simulation and publishes the new state.
fn bg_thread(
    mut sim: PointMassSim,
    period: Duration,
    run: Arc<AtomicBool>,
    setpoint: Arc<ArcSwapOption<AccelSetpoint>>,
    cell: Arc<StateCell>,
) {
    let dt_s = period.as_secs_f64();
    let mut warned = false;

    while run.load(Ordering::Relaxed) {
        let accel = match setpoint.load_full() {
            Some(sp) if sp.is_accel_only() && sp.coordinate_frame == FRAME_LOCAL_NED => sp.accel_mss,
            Some(sp) => {
                if !warned {
                    warn!("SimVehicle only supports acceleration setpoints, got {:?}", sp);
                    warned = true;
                }
                [0.0; 3]
            }
            None => [0.0; 3],
        };

        sim.step(&accel, dt_s);
        sim.publish(&cell);

        thread::sleep(period);
    }

    debug!("SimVehicle stopped at {:?}", sim.position_m());
}
