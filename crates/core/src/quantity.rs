//! Floating-point quantity comparison.
//!
//! Quantities are kilograms entered with two decimals. Every comparison
//! between a submitted quantity and a derived one goes through [`Tolerance`]
//! so the same epsilon rule applies everywhere.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Relative + absolute tolerance, combined the way `math.isclose` combines them:
/// two values are close when their difference is within either bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            relative: 1e-5,
            absolute: 1e-5,
        }
    }
}

impl Tolerance {
    pub const fn new(relative: f64, absolute: f64) -> Self {
        Self { relative, absolute }
    }

    /// Both bounds must be finite and non-negative; anything else makes every
    /// comparison trivially true or false.
    pub fn check(&self) -> DomainResult<()> {
        for (name, bound) in [("relative", self.relative), ("absolute", self.absolute)] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(DomainError::validation(format!(
                    "{name} tolerance must be a finite, non-negative number (got {bound})"
                )));
            }
        }
        Ok(())
    }

    /// Infinities are only close to themselves.
    pub fn approx_eq(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        if !a.is_finite() || !b.is_finite() {
            return false;
        }
        let diff = (a - b).abs();
        let scale = a.abs().max(b.abs());
        diff <= (self.relative * scale).max(self.absolute)
    }

    /// `a >= b`, treating values within tolerance as equal.
    pub fn approx_ge(&self, a: f64, b: f64) -> bool {
        a >= b || self.approx_eq(a, b)
    }

    /// `a > b` by more than the tolerance.
    pub fn definitely_gt(&self, a: f64, b: f64) -> bool {
        a > b && !self.approx_eq(a, b)
    }

    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.absolute
    }

    /// Whether `value` is a whole multiple of `step`.
    ///
    /// Only the absolute bound applies here: the remainder is compared against
    /// zero and against `step` itself, since `%` on floats can land just below it.
    pub fn is_multiple_of(&self, value: f64, step: f64) -> bool {
        if step <= 0.0 {
            return false;
        }
        let remainder = value.rem_euclid(step);
        remainder <= self.absolute || (step - remainder) <= self.absolute
    }

    /// Whether `value` covers a whole `step`, forgiving only absolute noise.
    ///
    /// Used when filling lots one by one: the relative bound would let a lot
    /// that is a few grams short count as full on heavy lots.
    pub fn fills(&self, value: f64, step: f64) -> bool {
        value + self.absolute >= step
    }

    /// Number of whole `step`s contained in `value`, forgiving values that sit
    /// just below a boundary (`74.999999 / 25` counts as 3).
    ///
    /// `None` when the count is not a finite number that fits in a `u64`.
    pub fn whole_steps(&self, value: f64, step: f64) -> Option<u64> {
        if step <= 0.0 || value <= 0.0 {
            return Some(0);
        }
        let raw = value / step;
        let rounded = raw.round();
        let steps = if (rounded * step - value).abs() <= self.absolute {
            rounded
        } else {
            raw.floor()
        };
        // u64::MAX as f64 rounds up to 2^64, which is itself out of range.
        if !steps.is_finite() || steps >= u64::MAX as f64 {
            return None;
        }
        Some(steps as u64)
    }
}

/// A usable quantity or weight: finite and strictly positive. NaN fails.
pub fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Round a quantity to two decimal places (the precision quantities are entered at).
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn close_values_compare_equal() {
        let tol = Tolerance::default();
        assert!(tol.approx_eq(25.000001, 25.0));
        assert!(!tol.approx_eq(26.0, 25.0));
        assert!(tol.approx_eq(0.0, 0.000001));
    }

    #[test]
    fn ordering_helpers_respect_tolerance() {
        let tol = Tolerance::default();
        assert!(tol.approx_ge(24.999999, 25.0));
        assert!(!tol.approx_ge(24.9, 25.0));
        assert!(tol.definitely_gt(25.1, 25.0));
        assert!(!tol.definitely_gt(25.000001, 25.0));
    }

    #[test]
    fn multiples_tolerate_float_remainders() {
        let tol = Tolerance::default();
        assert!(tol.is_multiple_of(100.0, 25.0));
        assert!(tol.is_multiple_of(0.3, 0.1));
        assert!(!tol.is_multiple_of(90.0, 25.0));
        assert!(!tol.is_multiple_of(10.0, 0.0));
    }

    #[test]
    fn whole_steps_forgive_boundary_noise() {
        let tol = Tolerance::default();
        assert_eq!(tol.whole_steps(74.999999, 25.0), Some(3));
        assert_eq!(tol.whole_steps(57.0, 25.0), Some(2));
        assert_eq!(tol.whole_steps(7.0, 25.0), Some(0));
        assert_eq!(tol.whole_steps(0.3, 0.1), Some(3));
        assert_eq!(tol.whole_steps(99_999.99, 10_000.0), Some(9));
    }

    #[test]
    fn whole_steps_refuses_counts_beyond_u64() {
        let tol = Tolerance::default();
        assert_eq!(tol.whole_steps(f64::MAX, 1e-300), None);
        assert_eq!(tol.whole_steps(f64::INFINITY, 25.0), None);
        assert_eq!(tol.whole_steps(1e7, 0.01), Some(1_000_000_000));
    }

    #[test]
    fn infinities_are_not_close_to_finite_values() {
        let tol = Tolerance::default();
        assert!(!tol.approx_eq(f64::INFINITY, 75.0));
        assert!(!tol.approx_eq(75.0, f64::INFINITY));
        assert!(!tol.approx_ge(f64::NEG_INFINITY, 0.0));
        assert!(tol.approx_eq(f64::INFINITY, f64::INFINITY));
    }

    #[test]
    fn positive_finite_excludes_edges() {
        assert!(is_positive_finite(0.01));
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(!is_positive_finite(value), "{value}");
        }
    }

    #[test]
    fn tolerance_bounds_are_checked() {
        assert!(Tolerance::default().check().is_ok());
        assert!(Tolerance::new(0.0, 0.0).check().is_ok());
        assert!(Tolerance::new(-1e-5, 1e-5).check().is_err());
        assert!(Tolerance::new(1e-5, f64::NAN).check().is_err());
        assert!(Tolerance::new(f64::INFINITY, 1e-5).check().is_err());
    }

    #[test]
    fn fills_ignores_the_relative_bound() {
        let tol = Tolerance::default();
        assert!(tol.fills(24.999999, 25.0));
        assert!(!tol.fills(999.99, 1_000.0));
        assert!(tol.approx_eq(999.99, 1_000.0));
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_to_cents(7.004), 7.0);
        assert_eq!(round_to_cents(7.006), 7.01);
    }

    proptest! {
        #[test]
        fn approx_eq_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerance::default();
            prop_assert_eq!(tol.approx_eq(a, b), tol.approx_eq(b, a));
        }

        #[test]
        fn whole_steps_times_step_never_exceeds_value(
            value in 0.01f64..100_000.0,
            step in 0.01f64..1_000.0,
        ) {
            let tol = Tolerance::default();
            let steps = tol.whole_steps(value, step).unwrap() as f64;
            prop_assert!(tol.approx_ge(value, steps * step));
        }
    }
}
