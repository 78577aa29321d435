//! # Setpoint Equipment Commands
//!
//! Setpoints follow the MAVLink `SET_POSITION_TARGET_LOCAL_NED` convention: every field is
//! present on the wire and the `type_mask` tells the autopilot which ones to ignore.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Local north-east-down coordinate frame identifier
pub const FRAME_LOCAL_NED: u8 = 1;

/// Bits of the setpoint type mask. A set bit means the autopilot ignores that field.
pub mod type_mask {
    pub const IGNORE_PX: u16 = 1 << 0;
    pub const IGNORE_PY: u16 = 1 << 1;
    pub const IGNORE_PZ: u16 = 1 << 2;
    pub const IGNORE_VX: u16 = 1 << 3;
    pub const IGNORE_VY: u16 = 1 << 4;
    pub const IGNORE_VZ: u16 = 1 << 5;
    pub const IGNORE_AFX: u16 = 1 << 6;
    pub const IGNORE_AFY: u16 = 1 << 7;
    pub const IGNORE_AFZ: u16 = 1 << 8;
    pub const FORCE: u16 = 1 << 9;
    pub const IGNORE_YAW: u16 = 1 << 10;
    pub const IGNORE_YAW_RATE: u16 = 1 << 11;

    /// Mask which leaves only the acceleration fields active.
    pub const ACCEL_ONLY: u16 = IGNORE_PX
        | IGNORE_PY
        | IGNORE_PZ
        | IGNORE_VX
        | IGNORE_VY
        | IGNORE_VZ
        | IGNORE_YAW
        | IGNORE_YAW_RATE;

    /// All acceleration/force related bits
    pub(crate) const ACCEL_BITS: u16 = IGNORE_AFX | IGNORE_AFY | IGNORE_AFZ | FORCE;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An inertial acceleration setpoint sent to the autopilot.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct AccelSetpoint {
    /// Coordinate frame the setpoint is expressed in
    pub coordinate_frame: u8,

    /// Which fields the autopilot shall ignore, see [`type_mask`]
    pub type_mask: u16,

    /// Demanded acceleration in the world frame
    ///
    /// Units: meters/second^2
    pub accel_mss: [f64; 3],
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl AccelSetpoint {
    /// Build a setpoint which only commands the given acceleration.
    pub fn accel_only(accel_mss: [f64; 3]) -> Self {
        Self {
            coordinate_frame: FRAME_LOCAL_NED,
            type_mask: type_mask::ACCEL_ONLY,
            accel_mss,
        }
    }

    /// True if the acceleration fields are the only active fields of this setpoint.
    pub fn is_accel_only(&self) -> bool {
        self.type_mask & !type_mask::ACCEL_BITS == type_mask::ACCEL_ONLY
            && self.type_mask & type_mask::ACCEL_BITS == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accel_only_mask() {
        assert_eq!(type_mask::ACCEL_ONLY, 3135);

        let sp = AccelSetpoint::accel_only([0.0, 0.0, 1.2]);
        assert!(sp.is_accel_only());
        assert_eq!(sp.coordinate_frame, FRAME_LOCAL_NED);

        let mut forced = sp;
        forced.type_mask |= type_mask::FORCE;
        assert!(!forced.is_accel_only());

        let mut with_pos = sp;
        with_pos.type_mask &= !type_mask::IGNORE_PZ;
        assert!(!with_pos.is_accel_only());
    }

    #[test]
    fn test_setpoint_json() {
        let sp = AccelSetpoint::accel_only([1.0, -2.0, 0.5]);
        let json = serde_json::to_string(&sp).unwrap();
        assert!(json.contains("\"type_mask\":3135"));
    }
}
