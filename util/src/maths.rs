//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Three-valued sign of a value.
///
/// Unlike `Float::signum` this returns zero for both `+0.0` and `-0.0`, and `NAN` for `NAN`.
pub fn sign<T>(value: T) -> T
where
    T: Float,
{
    if value.is_nan() {
        value
    } else if value > T::zero() {
        T::one()
    } else if value < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_to_pi<T>(angle_rad: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    rem_euclid(angle_rad + pi_t, tau_t) - pi_t
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sign() {
        assert_eq!(sign(2.5f64), 1.0);
        assert_eq!(sign(-1e-300f64), -1.0);
        assert_eq!(sign(0.0f64), 0.0);
        assert_eq!(sign(-0.0f64), 0.0);
        assert!(sign(f64::NAN).is_nan());
    }

    #[test]
    fn test_wrap_to_pi() {
        const PI: f64 = std::f64::consts::PI;
        const TAU: f64 = std::f64::consts::TAU;

        assert!((wrap_to_pi(0.5f64) - 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(0.5f64 + TAU) - 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(-0.5f64 - 2.0 * TAU) + 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(PI + 0.25) - (0.25 - PI)).abs() < 1e-12);
    }
}
