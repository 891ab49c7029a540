//! Playback address generation: grain start offsets, pitch ramps and continuity correction.

use super::{controls::pitch_modulation_exponent, GrainControls, GranulatorConfig};
use crate::utils::{
    dsp::{
        history::HistoryBuffer,
        zero_crossing::{DerivativeClass, SignalShape, ZeroCrossingMemory},
    },
    safe_div, sign, wrap,
};

// -------------------------------------------------------------------------------------------------

/// Parameters of the active grain, latched at its trigger and immutable until the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainState {
    /// Playback speed and direction multiplier.
    pub pitch: f64,
    /// Nominal grain rate in Hz.
    pub rate: f64,
    /// Base read position (zero crossing recall depth) in samples.
    pub position: f64,
    /// Playback direction: `1.0` forward, `-1.0` backward.
    pub direction: f64,
    /// Pitch ramp exponent.
    pub exponent: f64,
    /// Cursor delay at the start of the grain.
    pub start_delay: f64,
}

impl Default for GrainState {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
            position: 0.0,
            direction: 1.0,
            exponent: 1.0,
            start_delay: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Describes the splice point that got chosen for a new grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splice {
    /// Write pointer of the history at the time of the trigger.
    pub tick: u64,
    /// Derivative class of the generator's output when leaving the previous grain.
    pub output_class: DerivativeClass,
    /// Class that got looked up in the zero crossing memory (direction adjusted).
    pub matched_class: DerivativeClass,
    /// Buffer index of the matching zero crossing, `None` when the memory had no crossing of
    /// the matched class at the requested depth, or when the crossing got overwritten since then.
    /// The grain then continues at the old cursor.
    pub source_index: Option<usize>,
    /// Output slope expressed in units of the source slope at the matched crossing.
    pub ratio: f64,
    /// Cursor delay at the start of the new grain.
    pub start_delay: f64,
}

// -------------------------------------------------------------------------------------------------

/// Generates the playback cursor of the grain engine.
///
/// The cursor is a fractional delay behind the history's write pointer. At each trigger, a new
/// start delay gets calculated from the classified zero crossing memory and the continuity
/// correction. Between triggers, the delay follows the grain's pitch ramp, so the read position
/// advances `pitch` samples per tick.
#[derive(Debug, Clone)]
pub struct PlaybackAddress {
    grain: GrainState,
    ramp: f64,
    delay: f64,
    capacity: f64,
    epsilon: f64,
    pitch_modulation_base: f64,
}

impl PlaybackAddress {
    pub fn new(config: &GranulatorConfig) -> Self {
        Self {
            grain: GrainState::default(),
            ramp: 0.0,
            delay: 0.0,
            capacity: config.capacity as f64,
            epsilon: config.epsilon,
            pitch_modulation_base: config.pitch_modulation_base,
        }
    }

    /// Latched state of the active grain.
    #[inline(always)]
    pub fn grain(&self) -> &GrainState {
        &self.grain
    }

    /// Most recent cursor delay.
    #[inline(always)]
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Grain progress: 0 at the trigger, 1 after the nominal grain duration.
    #[inline(always)]
    pub fn ramp(&self) -> f64 {
        self.ramp
    }

    /// Return to the initial grain, which reads the most recent input sample.
    pub fn reset(&mut self) {
        self.grain = GrainState::default();
        self.ramp = 0.0;
        self.delay = 0.0;
    }

    /// Start a new grain: latch the given controls and calculate the new start delay.
    ///
    /// `output` is the shape of the generator's most recent output sample and `history` and
    /// `memory` must already contain the current tick's input.
    pub fn retrigger(
        &mut self,
        controls: &GrainControls,
        output: SignalShape,
        history: &HistoryBuffer,
        memory: &ZeroCrossingMemory,
    ) -> Splice {
        let pitch = if controls.pitch.is_finite() {
            controls.pitch
        } else {
            1.0
        };
        let direction = sign(pitch);
        let position = wrap(controls.position, self.capacity);

        // reversed playback needs shapes which match when being read backwards
        let output_class = output.class();
        let matched_class = if direction > 0.0 {
            output_class
        } else {
            output_class.reversed()
        };

        let source_index = memory.recall(matched_class, position as usize);
        let (start_delay, ratio) = match source_index {
            Some(index) => {
                let source_slope = history.difference_at(index) as f64;
                let ratio = safe_div(output.d1 as f64, direction * source_slope, self.epsilon);
                // first sample behind the crossing in playback direction
                let start_index = if direction > 0.0 {
                    index as f64
                } else {
                    index as f64 - 1.0
                };
                let start_age = wrap(
                    history.current_index() as f64 - start_index,
                    self.capacity,
                );
                // start positions ahead of the most recent sample read the most recent sample
                let start_delay = wrap((start_age - direction * ratio).max(0.0), self.capacity);
                (start_delay, ratio)
            }
            None => {
                // continue where the previous grain is at, with the new speed
                (wrap(self.delay + 1.0 - pitch, self.capacity), 0.0)
            }
        };

        self.grain = GrainState {
            pitch,
            rate: controls.rate,
            position,
            direction,
            exponent: pitch_modulation_exponent(
                self.pitch_modulation_base,
                controls.pitch_modulation,
            ),
            start_delay,
        };
        self.ramp = 0.0;

        Splice {
            tick: history.write_pointer(),
            output_class,
            matched_class,
            source_index,
            ratio,
            start_delay,
        }
    }

    /// Calculate the cursor delay for the current tick and advance the grain's pitch ramp.
    ///
    /// `available` is the number of history samples which got written so far. When the cursor
    /// would read a slot that never got written, the grain continues at the opposite end of the
    /// written history: at the most recent sample when it moves into the past, at the oldest one
    /// when it moves ahead of the write pointer.
    #[inline]
    pub fn advance(&mut self, sample_rate: u32, available: usize) -> f64 {
        let sample_rate = sample_rate as f64;
        let shift = safe_div(1.0 - self.grain.pitch, self.grain.rate, self.epsilon)
            * self.ramp.powf(self.grain.exponent)
            * sample_rate;
        let mut delay = wrap(self.grain.start_delay + shift, self.capacity);
        let available = available.max(1) as f64;
        if delay >= available {
            let target = if self.grain.pitch < 1.0 {
                0.0
            } else {
                available - 1.0
            };
            self.grain.start_delay = wrap(self.grain.start_delay + target - delay, self.capacity);
            delay = target;
        }
        self.delay = delay;
        if self.grain.rate.is_finite() && self.grain.rate > 0.0 {
            self.ramp += self.grain.rate / sample_rate;
        }
        self.delay
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    fn config() -> GranulatorConfig {
        GranulatorConfig::default().capacity(64)
    }

    fn fill(signal: &[f32], history: &mut HistoryBuffer, memory: &mut ZeroCrossingMemory) {
        for &x in signal {
            let position = history.write_pointer();
            history.write(x);
            memory.process(x, position);
        }
    }

    #[test]
    fn initial_grain_reads_input() {
        let mut address = PlaybackAddress::new(&config());
        for available in 1..100 {
            assert_eq!(address.advance(44100, available), 0.0);
        }
        address.reset();
        assert_eq!(address.ramp(), 0.0);
    }

    #[test]
    fn pitch_ramps() {
        let mut address = PlaybackAddress::new(&config());
        let history = HistoryBuffer::new(64).unwrap();
        let memory = ZeroCrossingMemory::new(64).unwrap();
        let controls = GrainControls {
            pitch: 0.5,
            rate: 100.0,
            ..GrainControls::default()
        };
        address.retrigger(&controls, SignalShape::default(), &history, &memory);
        // read position advances by half a sample per tick: delay grows by 0.5
        let delays = (0..4).map(|_| address.advance(1000, 64)).collect::<Vec<_>>();
        let start = delays[0];
        for (tick, delay) in delays.into_iter().enumerate() {
            assert_eq_with_epsilon!(delay, wrap(start + 0.5 * tick as f64, 64.0), 1e-9);
        }

        // exponential ramps bend the shift curve
        let controls = GrainControls {
            pitch: 0.0,
            rate: 100.0,
            pitch_modulation: 1.0,
            ..GrainControls::default()
        };
        address.retrigger(&controls, SignalShape::default(), &history, &memory);
        assert_eq!(address.grain().exponent, GranulatorConfig::DEFAULT_PITCH_MODULATION_BASE);
        let start = address.advance(1000, 64);
        let first = address.advance(1000, 64) - start;
        assert!(first > 0.0 && first < 1.0);
    }

    #[test]
    fn forward_splice() {
        let config = config();
        let mut history = HistoryBuffer::new(config.capacity).unwrap();
        let mut memory = ZeroCrossingMemory::new(config.capacity).unwrap();
        // rising crossing with a slope of 0.5 at index 2
        fill(&[-0.5, -0.25, 0.25, 0.75, 1.0, 1.0], &mut history, &mut memory);
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(2));

        let mut address = PlaybackAddress::new(&config);
        let output = SignalShape {
            d1: 0.25,
            d2: 0.1,
            zero_crossing: true,
        };
        let splice = address.retrigger(&GrainControls::default(), output, &history, &memory);
        assert_eq!(splice.output_class, DerivativeClass::PP);
        assert_eq!(splice.matched_class, DerivativeClass::PP);
        assert_eq!(splice.source_index, Some(2));
        assert_eq_with_epsilon!(splice.ratio, 0.5, 1e-9);
        // read position 2.5, written index 5
        assert_eq_with_epsilon!(splice.start_delay, 2.5, 1e-9);
        assert_eq_with_epsilon!(address.advance(44100, history.available()), 2.5, 1e-9);
        assert_eq!(address.grain().direction, 1.0);
    }

    #[test]
    fn reverse_splice() {
        let config = config();
        let mut history = HistoryBuffer::new(config.capacity).unwrap();
        let mut memory = ZeroCrossingMemory::new(config.capacity).unwrap();
        // falling crossing at index 2: read backwards it rises from index 1 on
        fill(&[1.0, 0.5, -0.5, -1.0, -1.0], &mut history, &mut memory);
        assert_eq!(memory.recall(DerivativeClass::NN, 0), Some(2));

        let mut address = PlaybackAddress::new(&config);
        // rising and bending up: read backwards, the source bends up before the crossing too
        let output = SignalShape {
            d1: 1.0,
            d2: 0.5,
            zero_crossing: true,
        };
        let controls = GrainControls {
            pitch: -1.0,
            ..GrainControls::default()
        };
        let splice = address.retrigger(&controls, output, &history, &memory);
        assert_eq!(splice.output_class, DerivativeClass::PP);
        assert_eq!(splice.matched_class, DerivativeClass::NN);
        assert_eq!(splice.source_index, Some(2));
        assert_eq_with_epsilon!(splice.ratio, 1.0, 1e-9);
        // start at index 1, one ratio step backwards: index 0, written index 4
        assert_eq_with_epsilon!(splice.start_delay, 4.0, 1e-9);
        assert_eq!(address.grain().direction, -1.0);
        // delay grows by two samples per tick when reading backwards
        let first = address.advance(44100, 64);
        let second = address.advance(44100, 64);
        assert_eq_with_epsilon!(first, 4.0, 1e-9);
        assert_eq_with_epsilon!(second, 6.0, 1e-6);
    }

    #[test]
    fn missing_crossings_continue_grain() {
        let config = config();
        let history = HistoryBuffer::new(config.capacity).unwrap();
        let memory = ZeroCrossingMemory::new(config.capacity).unwrap();
        let mut address = PlaybackAddress::new(&config);
        let delay = address.advance(44100, 1);
        let splice = address.retrigger(
            &GrainControls::default(),
            SignalShape::default(),
            &history,
            &memory,
        );
        assert_eq!(splice.source_index, None);
        assert_eq!(splice.start_delay, delay);
    }

    #[test]
    fn flat_sources_stay_finite() {
        let config = config();
        let mut history = HistoryBuffer::new(config.capacity).unwrap();
        let mut memory = ZeroCrossingMemory::new(config.capacity).unwrap();
        fill(&[-1.0, 1.0], &mut history, &mut memory);
        // make the source slope at the crossing vanish
        let mut flat = history.clone();
        flat.flush();
        flat.write(0.0);
        flat.write(0.0);

        let mut address = PlaybackAddress::new(&config);
        let output = SignalShape {
            d1: 0.5,
            d2: 0.5,
            zero_crossing: true,
        };
        let controls = GrainControls {
            pitch: 16.0,
            rate: 0.0,
            pitch_modulation: -1.0,
            position: f64::NAN,
        };
        let splice = address.retrigger(&controls, output, &flat, &memory);
        assert!(splice.ratio.is_finite());
        for _ in 0..100 {
            let delay = address.advance(44100, flat.available());
            assert!(delay.is_finite() && (0.0..2.0).contains(&delay));
        }
    }

    #[test]
    fn start_positions_never_pass_the_write_pointer() {
        let config = config();
        let mut history = HistoryBuffer::new(config.capacity).unwrap();
        let mut memory = ZeroCrossingMemory::new(config.capacity).unwrap();
        // rising crossing at the most recently written index
        fill(&[-1.0, -1.0, -0.5, 0.5], &mut history, &mut memory);
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(3));

        let mut address = PlaybackAddress::new(&config);
        let output = SignalShape {
            d1: 0.5,
            d2: 0.25,
            zero_crossing: true,
        };
        let splice = address.retrigger(&GrainControls::default(), output, &history, &memory);
        assert_eq!(splice.source_index, Some(3));
        assert_eq_with_epsilon!(splice.ratio, 0.5, 1e-9);
        assert_eq!(splice.start_delay, 0.0);
        assert_eq!(address.advance(44100, history.available()), 0.0);
    }

    #[test]
    fn unwritten_history_is_skipped() {
        let config = config();
        let mut address = PlaybackAddress::new(&config);
        let history = HistoryBuffer::new(config.capacity).unwrap();
        let memory = ZeroCrossingMemory::new(config.capacity).unwrap();

        // backwards: the cursor returns to the most recent sample instead of reading past the
        // oldest written one
        let controls = GrainControls {
            pitch: -1.0,
            rate: 100.0,
            ..GrainControls::default()
        };
        address.retrigger(&controls, SignalShape::default(), &history, &memory);
        let delays = (0..10)
            .map(|_| address.advance(1000, 9))
            .collect::<Vec<_>>();
        let expected = [2.0, 4.0, 6.0, 8.0, 0.0, 2.0, 4.0, 6.0, 8.0, 0.0];
        for (delay, expected) in delays.into_iter().zip(expected) {
            assert_eq_with_epsilon!(delay, expected, 1e-6);
        }

        // forwards: reads ahead of the write pointer continue at the oldest written sample
        let controls = GrainControls {
            pitch: 3.0,
            rate: 100.0,
            ..GrainControls::default()
        };
        address.retrigger(&controls, SignalShape::default(), &history, &memory);
        for available in 20..40 {
            let delay = address.advance(1000, available);
            assert!(delay < available as f64);
        }
    }
}
