//! # Sliding mode controller
//!
//! Combines the sliding surface and the saturation stage into a commanded acceleration:
//!
//! ```text
//! E_hat     = E + sat(s0)
//! p_ddot_c  = E_hat + g - (d_p * p_dot) / m
//! ```
//!
//! Everything here is in the control frame. The caller rotates the command into the world frame
//! before sending it to the vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Params, SlidingSurface, SmcError, SurfaceEstimator};
use crate::frame::{Control, FrameTransform, FrameVector};
use crate::state_cell::EstimatedState;
use crate::traj::TrajectorySample;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The vehicle state as seen by the controller.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ControlState {
    pub position_m: FrameVector<Control>,
    pub velocity_ms: FrameVector<Control>,
}

/// The desired state for one outer tick.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DesiredState {
    pub position_m: FrameVector<Control>,
    pub velocity_ms: FrameVector<Control>,
    pub accel_mss: FrameVector<Control>,
}

/// Diagnostics from a single evaluation of the control law.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub p_e: FrameVector<Control>,
    pub v_e: FrameVector<Control>,
    pub s_0: FrameVector<Control>,
    pub nominal: FrameVector<Control>,

    /// Output of the saturation stage
    pub sat: FrameVector<Control>,

    /// Commanded acceleration
    pub command: FrameVector<Control>,
}

/// Integral sliding mode controller.
pub struct SlidingModeController {
    params: Params,

    surface: SurfaceEstimator,

    /// Diagnostics of the most recent evaluation
    last: Option<Diagnostics>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlState {
    /// Rotate a state estimate into the control frame.
    pub fn from_estimate(state: &EstimatedState, transform: &FrameTransform) -> Self {
        Self {
            position_m: transform.inverse(state.position_m),
            velocity_ms: transform.inverse(state.velocity_ms),
        }
    }
}

impl DesiredState {
    /// Rotate a trajectory sample into the control frame.
    pub fn from_sample(sample: &TrajectorySample, transform: &FrameTransform) -> Self {
        Self {
            position_m: transform.inverse(sample.position_m),
            velocity_ms: transform.inverse(sample.velocity_ms),
            accel_mss: transform.inverse(sample.accel_mss),
        }
    }
}

impl From<SlidingSurface> for Diagnostics {
    fn from(surface: SlidingSurface) -> Self {
        Self {
            p_e: surface.p_e,
            v_e: surface.v_e,
            s_0: surface.s_0,
            nominal: surface.nominal,
            ..Default::default()
        }
    }
}

impl SlidingModeController {
    /// Create a new controller.
    ///
    /// Fails with `InvalidConfiguration` if the parameters are not usable, for instance if the
    /// mass is not positive.
    pub fn new(params: Params) -> Result<Self, SmcError> {
        params.validate()?;

        Ok(Self {
            surface: SurfaceEstimator::new(&params),
            params,
            last: None,
        })
    }

    /// Load the parameters from a file in the params directory and build the controller.
    pub fn init(params_path: &str) -> Result<Self, SmcError> {
        let params = util::params::load(params_path).map_err(SmcError::ParamLoadError)?;

        Self::new(params)
    }

    pub fn surface(&self) -> &SurfaceEstimator {
        &self.surface
    }

    /// Diagnostics of the most recent call to `evaluate`, if any.
    pub fn last(&self) -> Option<&Diagnostics> {
        self.last.as_ref()
    }

    /// Evaluate the control law.
    ///
    /// Returns the commanded acceleration in the control frame along with the diagnostics of
    /// this evaluation, which are also kept as the controller's latest.
    pub fn evaluate(
        &mut self,
        current: &ControlState,
        desired: &DesiredState,
        s_int: &FrameVector<Control>,
    ) -> (FrameVector<Control>, Diagnostics) {
        let surface = self.surface.compute(current, desired, s_int);

        let sat = self.params.saturation.saturate(&surface.s_0);
        let nominal_hat = surface.nominal + sat;

        let command = nominal_hat + self.surface.gravity()
            - self.surface.drag_accel(&current.velocity_ms);

        trace!(
            "SMC: s0 = {}, sat = {}, cmd = {}",
            surface.s_0, sat, command
        );

        let diag = Diagnostics {
            sat,
            command,
            ..Diagnostics::from(surface)
        };
        self.last = Some(diag);

        (command, diag)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::World;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_mass() {
        for &m in &[0.0, -2.0] {
            let params = Params {
                mass_kg: m,
                ..Default::default()
            };
            assert!(matches!(
                SlidingModeController::new(params),
                Err(SmcError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_climb_from_rest() {
        let mut ctrl = SlidingModeController::new(Params::default()).unwrap();
        assert!(ctrl.last().is_none());

        let current = ControlState::default();
        let desired = DesiredState {
            position_m: FrameVector::new(0.0, 0.0, 1.0),
            ..Default::default()
        };

        let (cmd, diag) = ctrl.evaluate(&current, &desired, &FrameVector::zeros());

        assert_eq!(diag.p_e.to_array(), [0.0, 0.0, 1.0]);
        assert_eq!(diag.v_e.to_array(), [0.0, 0.0, 0.0]);
        assert!(cmd.z() > 0.0);

        // s0_z = 0.9 is outside both bands so the correction saturates at 0.95, on top of the
        // proportional 0.25 from alpha_1
        assert_eq!(diag.sat.z(), 0.95);
        assert_relative_eq!(cmd.z(), 1.2, epsilon = 1e-12);
        assert_eq!(cmd.x(), 0.0);
        assert_eq!(cmd.y(), 0.0);

        assert_eq!(ctrl.last(), Some(&diag));
    }

    #[test]
    fn test_inner_band_saturation() {
        let mut ctrl = SlidingModeController::new(Params::default()).unwrap();

        // Only a small vertical velocity error, so s0_z = 0.005
        let current = ControlState::default();
        let desired = DesiredState {
            velocity_ms: FrameVector::new(0.0, 0.0, 0.005),
            ..Default::default()
        };

        let (_, diag) = ctrl.evaluate(&current, &desired, &FrameVector::zeros());

        assert_eq!(diag.s_0.z(), 0.005);
        assert_eq!(diag.sat.z(), 0.1 * 0.005 / 0.01);
        assert_relative_eq!(diag.sat.z(), 0.05, max_relative = 1e-15);
    }

    #[test]
    fn test_drag_cancels() {
        // The drag compensation in the nominal term and the command cancel out, so the
        // command does not depend on drag at all
        let current = ControlState {
            position_m: FrameVector::new(0.1, 0.2, 0.3),
            velocity_ms: FrameVector::new(2.0, -1.0, 0.5),
        };
        let desired = DesiredState {
            position_m: FrameVector::new(0.0, 0.5, 0.0),
            velocity_ms: FrameVector::new(1.0, 0.0, 0.0),
            accel_mss: FrameVector::new(0.0, 0.1, 0.0),
        };
        let s_int = FrameVector::new(0.05, 0.0, -0.02);

        let mut no_drag = SlidingModeController::new(Params::default()).unwrap();
        let mut drag = SlidingModeController::new(Params {
            drag_diag: [0.3, 0.3, 0.6],
            ..Default::default()
        })
        .unwrap();

        let (a, _) = no_drag.evaluate(&current, &desired, &s_int);
        let (b, _) = drag.evaluate(&current, &desired, &s_int);

        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_from_estimate() {
        let t = FrameTransform::from_heading(std::f64::consts::FRAC_PI_2);
        let est = EstimatedState {
            position_m: FrameVector::<World>::new(0.0, 2.0, 1.0),
            velocity_ms: FrameVector::<World>::new(-1.0, 0.0, 0.0),
            ..Default::default()
        };

        let cs = ControlState::from_estimate(&est, &t);

        assert_relative_eq!(cs.position_m.x(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(cs.position_m.y(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(cs.position_m.z(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cs.velocity_ms.x(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(cs.velocity_ms.y(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_sample() {
        // A world frame sample seen from a vehicle which started the mission facing world +Y
        let t = FrameTransform::from_heading(std::f64::consts::FRAC_PI_2);
        let sample = TrajectorySample {
            index: 0,
            position_m: FrameVector::<World>::new(0.0, 3.0, 1.0),
            velocity_ms: FrameVector::<World>::new(1.0, 0.0, 0.0),
            accel_mss: FrameVector::<World>::new(0.0, 0.0, -0.5),
            heading_rad: None,
        };

        let des = DesiredState::from_sample(&sample, &t);

        assert_relative_eq!(des.position_m.x(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(des.position_m.y(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(des.position_m.z(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(des.velocity_ms.x(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(des.velocity_ms.y(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(des.accel_mss.z(), -0.5, epsilon = 1e-12);
    }
}
