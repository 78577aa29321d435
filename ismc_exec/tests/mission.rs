//! Closed loop mission tests.
//!
//! The controller flies against a point mass stepped once per inner tick, so these tests are fully
//! deterministic and run as fast as the machine allows.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use std::sync::Arc;

use comms_if::eqpt::setpoint::AccelSetpoint;
use ismc_lib::{
    frame::FrameVector,
    sched::{self, ActuationInterface, ControlLoopScheduler, ManualTicker, MissionLog},
    sim::{self, PointMassSim},
    smc::{self, SlidingModeController},
    state_cell::StateCell,
    traj::{Trajectory, TrajectorySample},
};

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

/// Vehicle which advances the simulation by one inner period for every setpoint it receives.
struct SteppedVehicle {
    sim: PointMassSim,
    cell: Arc<StateCell>,
    dt_s: f64,
}

impl ActuationInterface for SteppedVehicle {
    fn send_setpoint(&mut self, setpoint: &AccelSetpoint) {
        assert!(setpoint.is_accel_only());

        self.sim.step(&setpoint.accel_mss, self.dt_s);
        self.sim.publish(&self.cell);
    }
}

fn sim_params(heading_rad: f64, drag_diag: [f64; 3]) -> sim::Params {
    sim::Params {
        mass_kg: 1.5,
        drag_diag,
        init_position_m: [0.0, 0.0, 0.0],
        init_heading_rad: heading_rad,
        rate_hz: 30.0,
    }
}

fn fly(traj: &Trajectory, sim_params: &sim::Params) -> (MissionLog, [f64; 3]) {
    let sched_params = sched::Params::default();

    let cell = Arc::new(StateCell::new());
    let sim = PointMassSim::new(sim_params);
    sim.publish(&cell);

    let vehicle = SteppedVehicle {
        sim,
        cell: cell.clone(),
        dt_s: 1.0 / sched_params.inner_rate_hz(),
    };

    let mut scheduler = ControlLoopScheduler::new(
        sched_params,
        SlidingModeController::new(smc::Params::default()).unwrap(),
        cell,
        vehicle,
        ManualTicker::new(),
        ManualTicker::new(),
    )
    .unwrap();

    let log = scheduler.run(traj, FrameVector::zeros()).unwrap();

    (log, scheduler.actuator().sim.position_m())
}

fn hover(target: [f64; 3], n: usize) -> Trajectory {
    Trajectory::new(
        (0..n)
            .map(|i| TrajectorySample {
                index: i,
                position_m: FrameVector::from_array(target),
                velocity_ms: FrameVector::zeros(),
                accel_mss: FrameVector::zeros(),
                heading_rad: None,
            })
            .collect(),
    )
    .unwrap()
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn test_climb_to_hover() {
    let target = [0.0, 0.0, 1.0];
    let (log, final_pos) = fly(&hover(target, 200), &sim_params(0.0, [0.0; 3]));

    assert_eq!(log.num_rows(), 201);

    // First command climbs
    assert!(log.ticks[0].command_world.z() > 0.0);

    assert!(
        distance(final_pos, target) < 0.05,
        "Final position {:?} too far from {:?}",
        final_pos,
        target
    );
    assert!(log.ticks[199].ctrl.p_e.norm() < 0.05);
}

#[test]
fn test_hover_any_heading() {
    for &heading in &[0.7, -2.5, std::f64::consts::FRAC_PI_2] {
        for &target in &[[1.0, -1.0, 2.0], [-2.0, 0.5, 1.5]] {
            let (log, final_pos) = fly(&hover(target, 200), &sim_params(heading, [0.0; 3]));

            assert!(
                distance(final_pos, target) < 0.05,
                "Heading {}: final position {:?} too far from {:?}",
                heading,
                final_pos,
                target
            );
            assert!((log.heading_rad - heading).abs() < 1e-9);
        }
    }
}

#[test]
fn test_circle_mission() {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "missions", "circle.json"]
        .iter()
        .collect();
    let traj = Trajectory::load(&path).unwrap();

    for &drag in &[[0.0; 3], [0.05, 0.05, 0.1]] {
        let (log, _) = fly(&traj, &sim_params(0.7, drag));

        assert_eq!(log.num_rows(), traj.len() + 1);

        for tick in log.ticks.iter() {
            assert!(
                tick.ctrl.p_e.norm() < 0.3,
                "Tracking error {} at sample {}",
                tick.ctrl.p_e.norm(),
                tick.index
            );
            assert!(tick.heading_d_rad.is_some());
        }
    }
}

#[test]
fn test_deterministic() {
    let traj = hover([0.3, 0.2, 1.0], 50);

    let (a, _) = fly(&traj, &sim_params(0.4, [0.1, 0.1, 0.1]));
    let (b, _) = fly(&traj, &sim_params(0.4, [0.1, 0.1, 0.1]));

    for (x, y) in a.ticks.iter().zip(b.ticks.iter()) {
        for i in 0..3 {
            assert_eq!(x.s_int[i].to_bits(), y.s_int[i].to_bits());
            assert_eq!(
                x.command_world[i].to_bits(),
                y.command_world[i].to_bits()
            );
        }
    }
}
