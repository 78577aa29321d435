//! # Sliding mode control module
//!
//! This module provides the integral sliding mode controller (ISMC) which computes the
//! acceleration demand needed to follow the trajectory. It is split into:
//!
//! - [`surface`] - tracking errors, the sliding variable and the nominal term,
//! - [`saturation`] - the boundary layer approximation of `sign` applied to the sliding
//!   variable,
//! - [`controller`] - the composition of the two into a commanded acceleration,
//! - [`integral`] - the running integral of position error, refreshed at the inner loop rate.
//!
//! All vectors handled by this module are in the control frame.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod integral;
mod params;
pub mod saturation;
pub mod surface;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
pub use integral::IntegralAccumulator;
pub use params::*;
pub use saturation::{AxisSaturation, SatBand, SaturationTable};
pub use surface::{SlidingSurface, SurfaceEstimator};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during setup of the controller.
#[derive(Debug, thiserror::Error)]
pub enum SmcError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
