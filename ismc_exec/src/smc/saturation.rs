//! # Boundary layer saturation
//!
//! Ideal sliding mode control applies `sign(s0)`, which switches infinitely fast around the
//! sliding surface and makes the actuators chatter. Instead each axis uses a piecewise-linear
//! approximation: inside a band around zero the output is proportional to `s0`, outside all
//! bands it is the saturated `max_gain * sign(s0)`.
//!
//! Bands are checked in order and the first one containing `s0` wins. Band membership is a
//! strict open interval, so a value sitting exactly on a band edge falls through to the next
//! band, or to the saturated value.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::SmcError;
use crate::frame::{Control, FrameVector};
use util::maths::sign;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One linear band of an axis' saturation function.
///
/// Within `(lo, hi)` the output is `gain * s0 / scale`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SatBand {
    /// Lower (exclusive) bound of the band
    pub lo: f64,

    /// Upper (exclusive) bound of the band
    pub hi: f64,

    /// Output at `s0 == scale`
    pub gain: f64,

    /// Normalising value of the band, usually equal to `hi`
    pub scale: f64,
}

/// Saturation function for a single axis.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AxisSaturation {
    /// Bands in order of precedence
    pub bands: Vec<SatBand>,

    /// Magnitude of the output when `s0` is outside every band
    pub max_gain: f64,
}

/// Saturation functions for all three control frame axes.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SaturationTable {
    pub x: AxisSaturation,
    pub y: AxisSaturation,
    pub z: AxisSaturation,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SatBand {
    /// Band symmetric about zero, normalised by its upper bound.
    pub const fn symmetric(half_width: f64, gain: f64) -> Self {
        Self {
            lo: -half_width,
            hi: half_width,
            gain,
            scale: half_width,
        }
    }

    pub fn contains(&self, s0: f64) -> bool {
        self.lo < s0 && s0 < self.hi
    }

    pub fn eval(&self, s0: f64) -> f64 {
        self.gain * s0 / self.scale
    }
}

impl AxisSaturation {
    /// Evaluate the saturation function for this axis.
    pub fn eval(&self, s0: f64) -> f64 {
        match self.bands.iter().find(|b| b.contains(s0)) {
            Some(band) => band.eval(s0),
            None => self.max_gain * sign(s0),
        }
    }

    fn validate(&self, axis: &str) -> Result<(), SmcError> {
        let invalid = |reason: String| {
            Err(SmcError::InvalidConfiguration(format!(
                "saturation table for axis {}: {}",
                axis, reason
            )))
        };

        if !(self.max_gain.is_finite() && self.max_gain >= 0.0) {
            return invalid(format!("max_gain must be non-negative, found {}", self.max_gain));
        }

        for (i, band) in self.bands.iter().enumerate() {
            if !(band.lo.is_finite() && band.hi.is_finite() && band.lo < band.hi) {
                return invalid(format!("band {} has an empty interval", i));
            }
            // Negative gains or scales would invert the corrective direction
            if !(band.gain.is_finite() && band.gain >= 0.0) {
                return invalid(format!("band {} gain must be non-negative", i));
            }
            if !(band.scale.is_finite() && band.scale > 0.0) {
                return invalid(format!("band {} scale must be positive", i));
            }
        }

        Ok(())
    }
}

impl SaturationTable {
    /// Apply the saturation function to each axis of the sliding variable.
    pub fn saturate(&self, s0: &FrameVector<Control>) -> FrameVector<Control> {
        FrameVector::new(
            self.x.eval(s0.x()),
            self.y.eval(s0.y()),
            self.z.eval(s0.z()),
        )
    }

    pub(crate) fn validate(&self) -> Result<(), SmcError> {
        self.x.validate("x")?;
        self.y.validate("y")?;
        self.z.validate("z")
    }
}

impl Default for SaturationTable {
    /// The flight-tested bands.
    ///
    /// The y axis is deliberately asymmetric: its second band only covers negative values, is
    /// normalised by 0.8 rather than its upper bound, and positive values above 0.3 go straight
    /// to the saturated output.
    fn default() -> Self {
        Self {
            x: AxisSaturation {
                bands: vec![SatBand::symmetric(0.05, 0.05), SatBand::symmetric(0.3, 0.7)],
                max_gain: 0.85,
            },
            y: AxisSaturation {
                bands: vec![
                    SatBand::symmetric(0.3, 0.7),
                    SatBand {
                        lo: -0.8,
                        hi: 0.0,
                        gain: 1.1,
                        scale: 0.8,
                    },
                ],
                max_gain: 1.5,
            },
            z: AxisSaturation {
                bands: vec![SatBand::symmetric(0.01, 0.1), SatBand::symmetric(0.08, 0.75)],
                max_gain: 0.95,
            },
        }
    }
}
