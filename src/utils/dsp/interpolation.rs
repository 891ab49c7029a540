//! Fractional sample interpolators.

// -------------------------------------------------------------------------------------------------

/// Linear interpolation between `y0` and `y1`.
#[inline(always)]
pub fn linear(y0: f32, y1: f32, fraction: f32) -> f32 {
    y0 + (y1 - y0) * fraction
}

// -------------------------------------------------------------------------------------------------

/// 4-point, 3rd-order Hermite interpolation (x-form) between `y0` and `y1`, using the previous
/// sample `ym1` and the sample after next `y2` as support points.
///
/// See "Polynomial Interpolators for High-Quality Resampling of Oversampled Audio" by Olli
/// Niemitalo, p. 43: <http://yehar.com/blog/wp-content/uploads/2009/08/deip.pdf>
#[inline]
pub fn hermite4(ym1: f32, y0: f32, y1: f32, y2: f32, fraction: f32) -> f32 {
    debug_assert!((0.0..=1.0).contains(&fraction));
    let c0 = y0;
    let c1 = (y1 - ym1) * 0.5;
    let c2 = ym1 - y0 * 2.5 + y1 * 2.0 - y2 * 0.5;
    let c3 = (y2 - ym1) * 0.5 + (y0 - y1) * 1.5;
    ((c3 * fraction + c2) * fraction + c1) * fraction + c0
}

// -------------------------------------------------------------------------------------------------
