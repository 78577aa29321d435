//! # Integral accumulator
//!
//! Keeps the running integral of the position error used by the sliding variable. The integral is
//! refreshed at the inner (command repeat) rate with the trapezoidal rule:
//!
//! ```text
//! s_int += (2 * p_d - p_current - p_previous) / (2 * inner_rate_hz)
//! ```
//!
//! which is the mean of the position errors at the previous and current refreshes multiplied by
//! the inner period.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::SmcError;
use crate::frame::{Control, FrameVector};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IntegralAccumulator {
    s_int: FrameVector<Control>,

    /// Position at the previous refresh
    p_prev: FrameVector<Control>,

    /// `2 * inner_rate_hz`
    divisor: f64,

    num_refreshes: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IntegralAccumulator {
    /// Create a new accumulator.
    ///
    /// `seed` is the initial value of the integral (usually zero), `p_initial` the vehicle
    /// position at mission start.
    pub fn new(
        seed: FrameVector<Control>,
        p_initial: FrameVector<Control>,
        inner_rate_hz: f64,
    ) -> Result<Self, SmcError> {
        if !(inner_rate_hz.is_finite() && inner_rate_hz > 0.0) {
            return Err(SmcError::InvalidConfiguration(format!(
                "inner rate must be positive, found {} Hz",
                inner_rate_hz
            )));
        }

        if !(seed.is_finite() && p_initial.is_finite()) {
            return Err(SmcError::InvalidConfiguration(String::from(
                "integral seed and initial position must be finite",
            )));
        }

        Ok(Self {
            s_int: seed,
            p_prev: p_initial,
            divisor: 2.0 * inner_rate_hz,
            num_refreshes: 0,
        })
    }

    /// Current value of the integral.
    pub fn value(&self) -> FrameVector<Control> {
        self.s_int
    }

    pub fn divisor(&self) -> f64 {
        self.divisor
    }

    pub fn num_refreshes(&self) -> u64 {
        self.num_refreshes
    }

    /// Refresh the integral with the current desired and measured positions, returning the new
    /// value.
    pub fn refresh(
        &mut self,
        p_desired: &FrameVector<Control>,
        p_current: &FrameVector<Control>,
    ) -> FrameVector<Control> {
        self.s_int += (2.0 * *p_desired - *p_current - self.p_prev) / self.divisor;
        self.p_prev = *p_current;
        self.num_refreshes += 1;

        self.s_int
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_divisor() {
        let acc = IntegralAccumulator::new(FrameVector::zeros(), FrameVector::zeros(), 30.0)
            .unwrap();
        assert_eq!(acc.divisor(), 60.0);

        assert!(matches!(
            IntegralAccumulator::new(FrameVector::zeros(), FrameVector::zeros(), 0.0),
            Err(SmcError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_refresh() {
        let mut acc = IntegralAccumulator::new(
            FrameVector::new(0.1, 0.0, 0.0),
            FrameVector::new(0.0, 0.0, 0.0),
            30.0,
        )
        .unwrap();

        let p_d = FrameVector::new(1.0, 2.0, 3.0);

        // First refresh uses the initial position as the previous one
        let s = acc.refresh(&p_d, &FrameVector::new(0.0, 0.0, 0.0));
        assert_eq!(
            s.to_array(),
            [0.1 + 2.0 / 60.0, 4.0 / 60.0, 6.0 / 60.0]
        );

        // Second refresh uses the position from the first
        let s = acc.refresh(&p_d, &FrameVector::new(1.0, 2.0, 3.0));
        assert_eq!(
            s.to_array(),
            [
                0.1 + 2.0 / 60.0 + 1.0 / 60.0,
                4.0 / 60.0 + 2.0 / 60.0,
                6.0 / 60.0 + 3.0 / 60.0
            ]
        );

        // On target with a settled previous position nothing changes
        let before = acc.value();
        let s = acc.refresh(&p_d, &p_d);
        assert_eq!(s, before);

        assert_eq!(acc.num_refreshes(), 3);
    }

    #[test]
    fn test_deterministic() {
        let run = || {
            let mut acc = IntegralAccumulator::new(
                FrameVector::new(0.01, -0.02, 0.03),
                FrameVector::new(0.3, 0.1, -0.7),
                30.0,
            )
            .unwrap();

            let mut out = Vec::new();
            for i in 0..500 {
                let t = i as f64 * 0.0137;
                let p_d = FrameVector::new(t.sin(), t.cos(), 0.1 * t);
                let p = FrameVector::new(0.9 * t.sin(), 1.1 * t.cos(), 0.1 * t - 0.05);
                out.push(acc.refresh(&p_d, &p).to_array());
            }
            out
        };

        let a = run();
        let b = run();

        for (x, y) in a.iter().zip(b.iter()) {
            for i in 0..3 {
                assert_eq!(x[i].to_bits(), y[i].to_bits());
            }
        }
    }
}
