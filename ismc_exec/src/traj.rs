//! # Trajectory
//!
//! A trajectory is the ordered, fixed-length sequence of desired states flown during a mission,
//! one sample per outer control tick. Trajectories are loaded from JSON files holding one array
//! per axis and derivative:
//!
//! ```json
//! {
//!     "x": [...], "x_dot": [...], "x_ddot": [...],
//!     "y": [...], "y_dot": [...], "y_ddot": [...],
//!     "z": [...], "z_dot": [...], "z_ddot": [...],
//!     "psi": [...]
//! }
//! ```
//!
//! All arrays must have the same length. The `psi` (desired heading) track is optional.
//!
//! Samples are in the world frame. When the mission starts they are rotated into the control
//! frame by the heading captured at that moment, so a trajectory generated relative to the
//! vehicle's own heading must be rotated into the world frame before it is flown.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Internal
use crate::frame::{FrameVector, World};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One desired state of the trajectory, in the world frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    /// Index of the sample within the trajectory
    pub index: usize,

    pub position_m: FrameVector<World>,
    pub velocity_ms: FrameVector<World>,
    pub accel_mss: FrameVector<World>,

    /// Desired heading. Only recorded, attitude is left to the autopilot.
    pub heading_rad: Option<f64>,
}

/// The per-axis tracks as stored in a trajectory file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrajectoryTracks {
    pub x: Vec<f64>,
    pub x_dot: Vec<f64>,
    pub x_ddot: Vec<f64>,
    pub y: Vec<f64>,
    pub y_dot: Vec<f64>,
    pub y_ddot: Vec<f64>,
    pub z: Vec<f64>,
    pub z_dot: Vec<f64>,
    pub z_ddot: Vec<f64>,

    #[serde(default)]
    pub psi: Option<Vec<f64>>,
}

/// A non-empty, read-only sequence of trajectory samples.
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Invalid trajectory: {0}")]
    InvalidConfiguration(String),

    #[error("Track {track} has {found} samples, expected {expected}")]
    TrackLengthMismatch {
        track: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Could not load the trajectory file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not deserialise the trajectory file: {0}")]
    DeserialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from a list of samples.
    ///
    /// Sample indices are reassigned to their position in the list.
    pub fn new(mut samples: Vec<TrajectorySample>) -> Result<Self, TrajectoryError> {
        if samples.is_empty() {
            return Err(TrajectoryError::InvalidConfiguration(String::from(
                "the trajectory contains no samples",
            )));
        }

        for (i, s) in samples.iter_mut().enumerate() {
            if !(s.position_m.is_finite() && s.velocity_ms.is_finite() && s.accel_mss.is_finite())
            {
                return Err(TrajectoryError::InvalidConfiguration(format!(
                    "sample {} is not finite",
                    i
                )));
            }
            s.index = i;
        }

        Ok(Self { samples })
    }

    /// Build a trajectory from the per-axis tracks.
    pub fn from_tracks(tracks: &TrajectoryTracks) -> Result<Self, TrajectoryError> {
        let expected = tracks.x.len();

        let mut named = vec![
            ("x_dot", &tracks.x_dot),
            ("x_ddot", &tracks.x_ddot),
            ("y", &tracks.y),
            ("y_dot", &tracks.y_dot),
            ("y_ddot", &tracks.y_ddot),
            ("z", &tracks.z),
            ("z_dot", &tracks.z_dot),
            ("z_ddot", &tracks.z_ddot),
        ];
        if let Some(ref psi) = tracks.psi {
            named.push(("psi", psi));
        }

        for (track, values) in named {
            if values.len() != expected {
                return Err(TrajectoryError::TrackLengthMismatch {
                    track,
                    expected,
                    found: values.len(),
                });
            }
        }

        let samples = (0..expected)
            .map(|i| TrajectorySample {
                index: i,
                position_m: FrameVector::new(tracks.x[i], tracks.y[i], tracks.z[i]),
                velocity_ms: FrameVector::new(tracks.x_dot[i], tracks.y_dot[i], tracks.z_dot[i]),
                accel_mss: FrameVector::new(
                    tracks.x_ddot[i],
                    tracks.y_ddot[i],
                    tracks.z_ddot[i],
                ),
                heading_rad: tracks.psi.as_ref().map(|p| p[i]),
            })
            .collect();

        Self::new(samples)
    }

    /// Parse a trajectory from a JSON string.
    pub fn parse(json: &str) -> Result<Self, TrajectoryError> {
        let tracks: TrajectoryTracks =
            serde_json::from_str(json).map_err(TrajectoryError::DeserialiseError)?;

        Self::from_tracks(&tracks)
    }

    /// Load a trajectory from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let json = fs::read_to_string(path).map_err(TrajectoryError::FileLoadError)?;

        Self::parse(&json)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> &TrajectorySample {
        // Construction guarantees at least one sample
        &self.samples[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectorySample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectorySample;
    type IntoIter = std::slice::Iter<'a, TrajectorySample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
