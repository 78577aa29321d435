//! Sliding mode controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

// Internal
use super::{SaturationTable, SmcError};
use crate::frame::{Control, FrameVector};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the sliding mode controller.
///
/// Set once when the controller is built and never modified afterwards.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Mass of the vehicle, must be positive.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Gain on the position error integral in the sliding variable, and on the position error
    /// in the nominal term.
    pub alpha_1: f64,

    /// Gain on the position error in the sliding variable, and on the velocity error in the
    /// nominal term.
    pub alpha_2: f64,

    /// Diagonal of the linear drag coupling matrix `d_p`.
    ///
    /// Units: kilograms/second
    pub drag_diag: [f64; 3],

    /// Gravity vector.
    ///
    /// Units: meters/second^2
    #[serde(default = "default_gravity")]
    pub gravity_mss: [f64; 3],

    /// Per-axis saturation bands applied to the sliding variable
    #[serde(default)]
    pub saturation: SaturationTable,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Reference tuning for a 1.5 kg quadrotor with negligible drag.
    fn default() -> Self {
        Self {
            mass_kg: 1.5,
            alpha_1: 0.25,
            alpha_2: 0.9,
            drag_diag: [0.0; 3],
            gravity_mss: default_gravity(),
            saturation: SaturationTable::default(),
        }
    }
}

impl Params {
    /// Check the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), SmcError> {
        if !(self.mass_kg.is_finite() && self.mass_kg > 0.0) {
            return Err(SmcError::InvalidConfiguration(format!(
                "mass must be positive, found {} kg",
                self.mass_kg
            )));
        }

        if !(self.alpha_1.is_finite() && self.alpha_2.is_finite()) {
            return Err(SmcError::InvalidConfiguration(format!(
                "gains must be finite, found alpha_1 = {}, alpha_2 = {}",
                self.alpha_1, self.alpha_2
            )));
        }

        if self
            .drag_diag
            .iter()
            .chain(self.gravity_mss.iter())
            .any(|v| !v.is_finite())
        {
            return Err(SmcError::InvalidConfiguration(String::from(
                "drag and gravity must be finite",
            )));
        }

        self.saturation.validate()
    }

    /// The drag coupling matrix `d_p`.
    pub fn drag_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::from(self.drag_diag))
    }

    /// The gravity vector.
    ///
    /// Gravity is vertical so it is the same in the world and control frames.
    pub fn gravity(&self) -> FrameVector<Control> {
        FrameVector::from_array(self.gravity_mss)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.8]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let params: Params = util::params::parse(
            "mass_kg = 1.5\n\
             alpha_1 = 0.25\n\
             alpha_2 = 0.9\n\
             drag_diag = [0.0, 0.0, 0.0]\n",
        )
        .unwrap();

        assert_eq!(params.gravity_mss, [0.0, 0.0, -9.8]);
        assert_eq!(params.saturation, SaturationTable::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_file() {
        let params: Params = util::params::load_from_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/smc.toml"
        ))
        .unwrap();
        let default = Params::default();

        assert_eq!(params.mass_kg, default.mass_kg);
        assert_eq!(params.alpha_1, default.alpha_1);
        assert_eq!(params.alpha_2, default.alpha_2);
        assert_eq!(params.drag_diag, default.drag_diag);
        assert_eq!(params.gravity_mss, default.gravity_mss);
        assert_eq!(params.saturation, default.saturation);
    }

    #[test]
    fn test_invalid_mass() {
        for &m in &[0.0, -1.5, f64::NAN] {
            let params = Params {
                mass_kg: m,
                ..Default::default()
            };

            match params.validate() {
                Err(SmcError::InvalidConfiguration(_)) => (),
                r => panic!("Expected invalid configuration for m = {}, got {:?}", m, r),
            }
        }
    }

    #[test]
    fn test_drag_matrix() {
        let params = Params {
            drag_diag: [0.1, 0.2, 0.3],
            ..Default::default()
        };
        let d = params.drag_matrix();

        assert_eq!(d[(0, 0)], 0.1);
        assert_eq!(d[(1, 1)], 0.2);
        assert_eq!(d[(2, 2)], 0.3);
        assert_eq!(d[(0, 1)], 0.0);
    }
}
