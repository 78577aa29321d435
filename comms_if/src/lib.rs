//! # Communications interface crate.
//!
//! Provides the interface structures exchanged between the controller and the vehicle, namely
//! state estimates coming in from the vehicle and setpoints going out to it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Setpoint and state definitions for equipment (the autopilot)
pub mod eqpt;
