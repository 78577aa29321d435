//! # ISMC library.
//!
//! This library allows other crates in the workspace, as well as the integration tests and
//! benchmarks, to access items defined inside the controller crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Coordinate frames - frame-tagged vectors and the heading transform between them
pub mod frame;

/// Control loop scheduler - runs the controller over a trajectory at fixed rates
pub mod sched;

/// Simulated vehicle - point mass stand-in for the autopilot
pub mod sim;

/// Sliding mode controller - computes acceleration commands from the tracking error
pub mod smc;

/// State cell - lock-free store for the latest vehicle state estimate
pub mod state_cell;

/// Trajectory - the sequence of desired states flown during a mission
pub mod traj;
