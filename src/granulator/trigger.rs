//! Grain trigger: rate driven, zero crossing gated grain boundaries.

// -------------------------------------------------------------------------------------------------

/// Fires "new grain" events.
///
/// A phase accumulator advances by `rate / sample_rate` each tick. Once it reached 1.0, the
/// trigger waits for the next zero crossing of the generator's output, fires and restarts the
/// phase at 0. Grain durations thus jitter around the nominal `1 / rate` period so they always
/// end on a clean splice point. When the output never crosses zero, the trigger never fires and
/// the current grain simply continues.
#[derive(Debug, Default, Clone)]
pub struct GrainTrigger {
    phase: f64,
}

impl GrainTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase. Values >= 1.0 mean the trigger is armed and waits for a zero crossing.
    #[inline(always)]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// True when the nominal grain period elapsed.
    #[inline(always)]
    pub fn is_armed(&self) -> bool {
        self.phase >= 1.0
    }

    /// Restart the phase.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance the phase by one tick and return true when a new grain should start.
    /// Negative or non-finite rates do not advance the phase.
    #[inline]
    pub fn process(&mut self, rate: f64, sample_rate: u32, at_zero_crossing: bool) -> bool {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        if rate.is_finite() && rate > 0.0 {
            self.phase += rate / sample_rate as f64;
        }
        if self.phase >= 1.0 && at_zero_crossing {
            self.phase = 0.0;
            true
        } else {
            false
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_crossings_after_period() {
        let mut trigger = GrainTrigger::new();
        // 4 ticks per period
        let (rate, sample_rate) = (250.0, 1000);
        let fired = (0..3)
            .map(|_| trigger.process(rate, sample_rate, true))
            .collect::<Vec<_>>();
        assert_eq!(fired, vec![false, false, false]);
        assert!(trigger.process(rate, sample_rate, true));
        assert_eq!(trigger.phase(), 0.0);

        // armed, but waiting for a crossing
        for _ in 0..10 {
            assert!(!trigger.process(rate, sample_rate, false));
        }
        assert!(trigger.is_armed());
        assert!(trigger.process(rate, sample_rate, true));
        assert!(!trigger.is_armed());
    }

    #[test]
    fn invalid_rates_never_fire() {
        let mut trigger = GrainTrigger::new();
        for rate in [0.0, -10.0, f64::NAN] {
            for _ in 0..1000 {
                assert!(!trigger.process(rate, 44100, true));
            }
        }
        assert_eq!(trigger.phase(), 0.0);
    }
}
