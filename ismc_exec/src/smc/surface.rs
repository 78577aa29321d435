//! # Sliding surface estimator
//!
//! Computes the tracking errors, the integral sliding variable and the nominal
//! (feedforward plus linear feedback) term from the current and desired states.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Matrix3;
use serde::Serialize;

// Internal
use super::{ControlState, DesiredState, Params};
use crate::frame::{Control, FrameVector};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Evaluates the sliding surface for a given set of inputs.
#[derive(Debug, Clone)]
pub struct SurfaceEstimator {
    alpha_1: f64,
    alpha_2: f64,

    /// Drag coupling matrix `d_p`
    drag: Matrix3<f64>,

    mass_kg: f64,

    gravity: FrameVector<Control>,
}

/// The output of a single surface evaluation, all in the control frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct SlidingSurface {
    /// Position error `p_d - p`
    pub p_e: FrameVector<Control>,

    /// Velocity error `p_dot_d - p_dot`
    pub v_e: FrameVector<Control>,

    /// Sliding variable
    pub s_0: FrameVector<Control>,

    /// Nominal term `E`
    pub nominal: FrameVector<Control>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SurfaceEstimator {
    /// Create a new estimator from the controller parameters.
    ///
    /// The parameters are assumed to have already been validated.
    pub fn new(params: &Params) -> Self {
        Self {
            alpha_1: params.alpha_1,
            alpha_2: params.alpha_2,
            drag: params.drag_matrix(),
            mass_kg: params.mass_kg,
            gravity: params.gravity(),
        }
    }

    pub fn gravity(&self) -> FrameVector<Control> {
        self.gravity
    }

    /// Acceleration due to drag at the given velocity, `(d_p * v) / m`.
    pub fn drag_accel(&self, velocity_ms: &FrameVector<Control>) -> FrameVector<Control> {
        velocity_ms.transform_by(&self.drag) / self.mass_kg
    }

    /// Evaluate the surface.
    ///
    /// ```text
    /// p_e = p_d - p
    /// v_e = p_dot_d - p_dot
    /// s0  = alpha_1 * s_int + alpha_2 * p_e + v_e
    /// E   = alpha_1 * p_e + alpha_2 * v_e - g + p_ddot_d + (d_p * p_dot) / m
    /// ```
    pub fn compute(
        &self,
        current: &ControlState,
        desired: &DesiredState,
        s_int: &FrameVector<Control>,
    ) -> SlidingSurface {
        let p_e = desired.position_m - current.position_m;
        let v_e = desired.velocity_ms - current.velocity_ms;

        let s_0 = self.alpha_1 * *s_int + self.alpha_2 * p_e + v_e;

        let nominal = self.alpha_1 * p_e + self.alpha_2 * v_e - self.gravity
            + desired.accel_mss
            + self.drag_accel(&current.velocity_ms);

        SlidingSurface {
            p_e,
            v_e,
            s_0,
            nominal,
        }
    }
}
