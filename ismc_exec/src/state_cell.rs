//! # State cell
//!
//! Single-slot store for the latest vehicle state estimate. The state provider writes into the
//! cell from its own thread as updates arrive, while the control loop takes atomic snapshots
//! without ever blocking on the writer.
//!
//! Updates for each quantity arrive independently, so a snapshot may mix values of different
//! ages. This is tolerated: the controller always uses the most recent value of each quantity.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use arc_swap::ArcSwap;
use nalgebra::{Quaternion, UnitQuaternion};

// Internal
use crate::frame::{FrameVector, World};
use comms_if::eqpt::state::{StateUpdate, STANDARD_GRAVITY_MSS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw contents of the cell. Quantities which have not been received yet are `None`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct VehicleState {
    pub position_m: Option<FrameVector<World>>,
    pub velocity_ms: Option<FrameVector<World>>,

    /// Linear acceleration with gravity removed
    pub accel_mss: Option<FrameVector<World>>,

    /// Yaw about the world Z axis
    pub heading_rad: Option<f64>,

    /// Number of updates applied to the cell
    pub num_updates: u64,
}

/// A complete state estimate.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct EstimatedState {
    pub position_m: FrameVector<World>,
    pub velocity_ms: FrameVector<World>,
    pub accel_mss: FrameVector<World>,
    pub heading_rad: f64,
}

/// Lock-free single-slot state store.
pub struct StateCell {
    inner: ArcSwap<VehicleState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Fold an update into this state.
    pub fn apply(&mut self, update: &StateUpdate) {
        match *update {
            StateUpdate::Position { position_m } => {
                self.position_m = Some(FrameVector::from_array(position_m));
            }
            StateUpdate::Velocity { velocity_ms } => {
                self.velocity_ms = Some(FrameVector::from_array(velocity_ms));
            }
            StateUpdate::Imu {
                linear_accel_mss,
                attitude_q,
            } => {
                let mut accel = linear_accel_mss;
                accel[2] -= STANDARD_GRAVITY_MSS;
                self.accel_mss = Some(FrameVector::from_array(accel));

                self.heading_rad = Some(heading_from_quaternion(attitude_q));
            }
        }

        self.num_updates += 1;
    }

    /// Get the complete estimate, if enough has been received.
    ///
    /// Position and heading are required. Velocity and acceleration default to zero until they
    /// are first received, which matches a vehicle sitting at rest.
    pub fn estimate(&self) -> Option<EstimatedState> {
        Some(EstimatedState {
            position_m: self.position_m?,
            velocity_ms: self.velocity_ms.unwrap_or_default(),
            accel_mss: self.accel_mss.unwrap_or_default(),
            heading_rad: self.heading_rad?,
        })
    }
}

impl StateCell {
    /// Create a new empty cell.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(VehicleState::default()),
        }
    }

    /// Take a snapshot of the current contents.
    pub fn snapshot(&self) -> VehicleState {
        **self.inner.load()
    }

    /// Get the complete estimate from the current contents, if available.
    pub fn estimate(&self) -> Option<EstimatedState> {
        self.snapshot().estimate()
    }

    /// Apply an update from the state provider.
    pub fn apply(&self, update: StateUpdate) {
        self.inner.rcu(|old| {
            let mut new = **old;
            new.apply(&update);
            new
        });
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Yaw of a `[w, x, y, z]` attitude quaternion.
fn heading_from_quaternion(q: [f64; 4]) -> f64 {
    let uq = UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]));
    uq.euler_angles().2
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::thread;

    fn yaw_quaternion(yaw: f64) -> [f64; 4] {
        [(yaw / 2.0).cos(), 0.0, 0.0, (yaw / 2.0).sin()]
    }

    #[test]
    fn test_incomplete() {
        let cell = StateCell::new();
        assert!(cell.estimate().is_none());

        cell.apply(StateUpdate::Position {
            position_m: [1.0, 2.0, 3.0],
        });
        assert!(cell.estimate().is_none());

        cell.apply(StateUpdate::Imu {
            linear_accel_mss: [0.0, 0.0, STANDARD_GRAVITY_MSS],
            attitude_q: yaw_quaternion(0.5),
        });

        let est = cell.estimate().unwrap();
        assert_eq!(est.position_m.to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(est.velocity_ms.to_array(), [0.0; 3]);
        assert_eq!(est.accel_mss.to_array(), [0.0; 3]);
        assert_relative_eq!(est.heading_rad, 0.5, epsilon = 1e-12);
        assert_eq!(cell.snapshot().num_updates, 2);
    }

    #[test]
    fn test_latest_wins() {
        let cell = StateCell::new();

        for i in 0..10 {
            cell.apply(StateUpdate::Velocity {
                velocity_ms: [i as f64, 0.0, 0.0],
            });
        }

        assert_eq!(cell.snapshot().velocity_ms.unwrap().x(), 9.0);
    }

    #[test]
    fn test_heading_from_quaternion() {
        for &yaw in &[0.0, 0.3, -1.2, 3.0, -3.0] {
            assert_relative_eq!(
                heading_from_quaternion(yaw_quaternion(yaw)),
                yaw,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_concurrent_writers() {
        let cell = Arc::new(StateCell::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        cell.apply(StateUpdate::Position {
                            position_m: [t as f64, i as f64, 0.0],
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // No update is lost
        assert_eq!(cell.snapshot().num_updates, 1000);
    }
}
