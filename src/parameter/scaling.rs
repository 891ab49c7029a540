// -------------------------------------------------------------------------------------------------

/// Float parameter scaling, applied to convert normalized UI or automation values to the internal
/// parameter values.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum ParameterScaling {
    /// Linear scaling: `y = x`.
    #[default]
    Linear,

    /// Exponential scaling: `y = x^factor`. Factor must be > 0.0.
    ///
    /// Factors > 1.0 spend more of the normalized range on the lower part of the value range,
    /// which is what e.g. rates in Hz usually want.
    Exponential(f32),
}

impl ParameterScaling {
    /// Apply scaling to a normalized value.
    pub fn scale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(*factor),
        }
    }

    /// Apply inverse scaling to a normalized value.
    pub fn unscale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(1.0 / factor.max(0.001)),
        }
    }

    pub(crate) const fn validate(&self) {
        match self {
            ParameterScaling::Linear => {}
            ParameterScaling::Exponential(factor) => {
                assert!(
                    *factor > 0.0,
                    "Invalid exponential parameter scaling factor (must be > 0)"
                );
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    #[test]
    fn scaling() {
        let linear = ParameterScaling::Linear;
        assert_eq!(linear.scale(0.25), 0.25);
        assert_eq!(linear.unscale(0.25), 0.25);

        let exponential = ParameterScaling::Exponential(2.0);
        assert_eq!(exponential.scale(0.0), 0.0);
        assert_eq!(exponential.scale(1.0), 1.0);
        assert_eq_with_epsilon!(exponential.scale(0.5), 0.25, 1e-6);
        assert_eq_with_epsilon!(exponential.unscale(0.25), 0.5, 1e-6);
        for value in [0.1, 0.33, 0.9] {
            assert_eq_with_epsilon!(exponential.unscale(exponential.scale(value)), value, 1e-5);
        }
    }
}
