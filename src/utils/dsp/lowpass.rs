//! One-pole lowpass smoothing filter.

use std::f64::consts::TAU;

// -------------------------------------------------------------------------------------------------

/// One-pole lowpass filter: `y(n) = (1 - b) * x(n) + b * y(n-1)` with `b = e^(-2π·fc/sr)`.
///
/// Used to smooth control signals, such as the granulator's self-modulation source.
#[derive(Debug, Clone)]
pub struct OnePoleLowpass {
    y1: f64, // previous output
    b: f64,  // feedback coefficient
}

impl OnePoleLowpass {
    /// Create a new filter which passes everything through until a cutoff is set.
    pub fn new() -> Self {
        Self { y1: 0.0, b: 0.0 }
    }

    /// Set a new cutoff frequency in Hz. Cutoffs are clamped to range `0..nyquist`.
    pub fn set_cutoff(&mut self, sample_rate: u32, cutoff: f64) {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        let nyquist = sample_rate as f64 / 2.0;
        let cutoff = if cutoff.is_finite() {
            cutoff.clamp(0.0, nyquist)
        } else {
            nyquist
        };
        self.b = (-TAU * cutoff / sample_rate as f64).exp();
    }

    /// Current feedback coefficient.
    pub fn coefficient(&self) -> f64 {
        self.b
    }

    /// Clear the filter's memory.
    pub fn reset(&mut self) {
        self.y1 = 0.0;
    }

    /// Process a single sample.
    #[inline]
    pub fn process_sample(&mut self, sample: f64) -> f64 {
        self.y1 = (1.0 - self.b) * sample + self.b * self.y1;
        self.y1
    }
}

impl Default for OnePoleLowpass {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
