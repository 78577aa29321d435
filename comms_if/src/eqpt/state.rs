//! # Vehicle State Equipment Data
//!
//! The autopilot publishes its estimate of the vehicle's state as independent streams. Each
//! stream arrives as one [`StateUpdate`] whenever the autopilot produces it, there is no
//! guarantee of ordering or rate between streams.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Standard gravity as included in the IMU's linear acceleration measurement.
///
/// Units: meters/second^2
pub const STANDARD_GRAVITY_MSS: f64 = 9.80665;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single delivery from the vehicle's state estimator. All vectors are in the world frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum StateUpdate {
    /// Local position estimate
    Position {
        position_m: [f64; 3],
    },

    /// Local linear velocity estimate
    Velocity {
        velocity_ms: [f64; 3],
    },

    /// IMU data
    Imu {
        /// Measured linear acceleration, including gravity on the z axis
        linear_accel_mss: [f64; 3],

        /// Attitude quaternion in `[w, x, y, z]` order
        attitude_q: [f64; 4],
    },
}
