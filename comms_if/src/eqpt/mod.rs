//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the vehicle's autopilot.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod setpoint;
pub mod state;
