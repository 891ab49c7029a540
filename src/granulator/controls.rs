//! Control signal shaping which feeds the grain engine: pitch modulation curves, base read
//! position drift and output driven position self-modulation.

use crate::utils::{dsp::lowpass::OnePoleLowpass, wrap};

// -------------------------------------------------------------------------------------------------

/// Lowest self-modulation smoothing cutoff in Hz.
pub const MIN_SELF_MODULATION_CUTOFF: f64 = 0.1;
/// Highest self-modulation smoothing cutoff in Hz.
pub const MAX_SELF_MODULATION_CUTOFF: f64 = 20000.0;

// -------------------------------------------------------------------------------------------------

/// Exponent of the pitch ramp for the given normalized pitch modulation amount in range
/// `-1..=1`: `base^modulation`. A modulation of 0 results in a linear ramp (exponent 1).
#[inline]
pub fn pitch_modulation_exponent(base: f64, modulation: f64) -> f64 {
    let modulation = if modulation.is_finite() {
        modulation.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    base.powf(modulation)
}

/// Cutoff frequency in Hz of the self-modulation smoother for the given normalized rate in
/// range `0..=1`, using an exponential curve between
/// [`MIN_SELF_MODULATION_CUTOFF`] and [`MAX_SELF_MODULATION_CUTOFF`].
#[inline]
pub fn self_modulation_cutoff(rate: f64) -> f64 {
    let rate = if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    MIN_SELF_MODULATION_CUTOFF
        * (MAX_SELF_MODULATION_CUTOFF / MIN_SELF_MODULATION_CUTOFF).powf(rate)
}

// -------------------------------------------------------------------------------------------------

/// Calculates the base read position of grains, in samples behind the history's write pointer.
///
/// The position combines three sources:
/// - the buffer region, scaled by the buffer's capacity,
/// - a drift, which accumulates `1 - time_factor` per tick: with a time factor of 1 the read
///   region moves along with the input, with 0 it stays fixed on the buffer content and negative
///   factors move it backwards,
/// - a self-modulation jitter, derived from the lowpass filtered generator output.
#[derive(Debug, Clone)]
pub struct PositionModulator {
    capacity: f64,
    sample_rate: u32,
    drift: f64,
    smoother: OnePoleLowpass,
}

impl PositionModulator {
    pub fn new(capacity: usize, sample_rate: u32) -> Self {
        debug_assert!(capacity > 0, "Invalid capacity");
        let mut smoother = OnePoleLowpass::new();
        smoother.set_cutoff(sample_rate, self_modulation_cutoff(0.5));
        Self {
            capacity: capacity as f64,
            sample_rate,
            drift: 0.0,
            smoother,
        }
    }

    /// Current drift offset in samples.
    #[inline(always)]
    pub fn drift(&self) -> f64 {
        self.drift
    }

    /// Set the normalized self-modulation rate, which controls the smoother's cutoff.
    pub fn set_self_modulation_rate(&mut self, rate: f64) {
        self.smoother
            .set_cutoff(self.sample_rate, self_modulation_cutoff(rate));
    }

    /// Clear drift and smoother state.
    pub fn reset(&mut self) {
        self.drift = 0.0;
        self.smoother.reset();
    }

    /// Calculate the base position for the current tick and advance the drift.
    ///
    /// `feedback` is the generator's most recent (pre gain) output sample.
    #[inline]
    pub fn process(&mut self, region: f64, time_factor: f64, depth: f64, feedback: f32) -> f64 {
        let jitter_source = self.smoother.process_sample(feedback as f64);
        let region = region.clamp(0.0, 1.0) * (self.capacity - 1.0);
        let jitter = depth.clamp(0.0, 1.0) * self.capacity * jitter_source;
        let position = wrap(region + self.drift + jitter, self.capacity);
        if time_factor.is_finite() {
            self.drift = wrap(self.drift + 1.0 - time_factor, self.capacity);
        }
        position
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    #[test]
    fn curves() {
        assert_eq!(pitch_modulation_exponent(4.0, 0.0), 1.0);
        assert_eq!(pitch_modulation_exponent(4.0, 1.0), 4.0);
        assert_eq!(pitch_modulation_exponent(4.0, -1.0), 0.25);
        assert_eq!(pitch_modulation_exponent(4.0, 10.0), 4.0);
        assert_eq!(pitch_modulation_exponent(4.0, f64::NAN), 1.0);

        assert_eq_with_epsilon!(self_modulation_cutoff(0.0), MIN_SELF_MODULATION_CUTOFF, 1e-9);
        assert_eq_with_epsilon!(self_modulation_cutoff(1.0), MAX_SELF_MODULATION_CUTOFF, 1e-6);
        assert!(self_modulation_cutoff(0.5) > MIN_SELF_MODULATION_CUTOFF);
        assert!(self_modulation_cutoff(0.5) < MAX_SELF_MODULATION_CUTOFF);
    }

    #[test]
    fn region_and_drift() {
        let mut modulator = PositionModulator::new(1024, 44100);
        assert_eq!(modulator.process(0.0, 1.0, 0.0, 0.0), 0.0);
        assert_eq!(modulator.process(1.0, 1.0, 0.0, 0.0), 1023.0);
        assert_eq!(modulator.drift(), 0.0);

        // frozen read region: position grows with time
        for expected in 0..4 {
            assert_eq!(modulator.process(0.0, 0.0, 0.0, 0.0), expected as f64);
        }
        modulator.reset();
        // reversed read region: wraps around
        modulator.process(0.0, 2.0, 0.0, 0.0);
        assert_eq!(modulator.process(0.0, 2.0, 0.0, 0.0), 1023.0);
    }

    #[test]
    fn self_modulation() {
        let mut modulator = PositionModulator::new(1024, 44100);
        modulator.set_self_modulation_rate(1.0);
        // no depth, no jitter
        assert_eq!(modulator.process(0.0, 1.0, 0.0, 1.0), 0.0);
        let position = modulator.process(0.0, 1.0, 1.0, 1.0);
        assert!(position > 0.0 && position < 1024.0);
        // negative feedback wraps to the buffer end
        modulator.reset();
        let position = modulator.process(0.0, 1.0, 1.0, -0.25);
        assert!(position > 512.0 && position < 1024.0);
    }
}
