//! Numeric helpers and DSP building blocks shared by the granulator and its effect.

pub mod dsp;
pub mod smoothed;

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
macro_rules! assert_eq_with_epsilon {
    ($x:expr, $y:expr, $d:expr) => {
        if ($x - $y).abs() > $d {
            panic!(
                "assertion failed: {} is not within {} of {}",
                $x, $d, $y
            );
        }
    };
}

#[cfg(test)]
pub(crate) use assert_eq_with_epsilon;

// -------------------------------------------------------------------------------------------------

/// Sign of a value with the non-negative convention used for derivative classes:
/// returns `1.0` for values >= 0 and `-1.0` otherwise.
#[inline(always)]
pub fn sign(value: f64) -> f64 {
    if value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

// -------------------------------------------------------------------------------------------------

/// Divide `numerator` by `denominator`, clamping the denominator's magnitude to at least
/// `epsilon`. The denominator's sign is preserved (zero counts as positive), so the result is
/// finite for all finite inputs.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64, epsilon: f64) -> f64 {
    debug_assert!(epsilon > 0.0, "Invalid epsilon");
    let denominator = if denominator.abs() < epsilon {
        sign(denominator) * epsilon
    } else {
        denominator
    };
    numerator / denominator
}

// -------------------------------------------------------------------------------------------------

/// Wrap the given value into range `[0, length)`.
///
/// Non-finite values map to `0.0`. Unlike a plain `rem_euclid`, the result never equals
/// `length`, even when tiny negative values round up.
#[inline]
pub fn wrap(value: f64, length: f64) -> f64 {
    debug_assert!(length > 0.0, "Invalid wrap length");
    if !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(length);
    if wrapped < length {
        wrapped
    } else {
        0.0
    }
}

// -------------------------------------------------------------------------------------------------

/// Convert a normalized level value to a linear gain, using a squared-law curve.
#[inline(always)]
pub fn level_to_gain(level: f32) -> f32 {
    let level = level.clamp(0.0, 1.0);
    level * level
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_division() {
        assert_eq!(safe_div(1.0, 2.0, 1e-9), 0.5);
        assert_eq!(safe_div(-3.0, -1.5, 1e-9), 2.0);
        // zero denominators count as positive
        assert_eq!(safe_div(1.0, 0.0, 0.5), 2.0);
        assert_eq!(safe_div(1.0, -0.25, 0.5), -2.0);
        assert_eq!(safe_div(0.0, 0.0, 1e-9), 0.0);
        assert!(safe_div(1.0, 0.0, 1e-9).is_finite());
    }

    #[test]
    fn wrapping() {
        assert_eq!(wrap(0.0, 8.0), 0.0);
        assert_eq!(wrap(8.0, 8.0), 0.0);
        assert_eq!(wrap(9.5, 8.0), 1.5);
        assert_eq!(wrap(-0.5, 8.0), 7.5);
        assert_eq!(wrap(-16.0, 8.0), 0.0);
        assert_eq!(wrap(f64::NAN, 8.0), 0.0);
        assert_eq!(wrap(f64::INFINITY, 8.0), 0.0);
        let tiny = wrap(-1e-20, 8.0);
        assert!((0.0..8.0).contains(&tiny));
    }

    #[test]
    fn level_curve() {
        assert_eq!(level_to_gain(0.0), 0.0);
        assert_eq!(level_to_gain(1.0), 1.0);
        assert_eq_with_epsilon!(level_to_gain(0.5), 0.25, 1e-6);
        assert_eq!(level_to_gain(2.0), 1.0);
        assert_eq!(sign(0.0), 1.0);
        assert_eq!(sign(-0.1), -1.0);
    }
}
