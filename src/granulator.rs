//! Zero crossing aligned grain engine.
//!
//! The engine concatenates grains which are cut from a rolling history of its input signal.
//! Every splice happens at a zero crossing of the output and continues at a zero crossing in the
//! history, which has the same first and second difference sign pattern as the output has when
//! leaving the previous grain. Grains never overlap and are not windowed.

use crate::{
    utils::dsp::{
        history::HistoryBuffer,
        zero_crossing::{DifferenceTracker, ZeroCrossingMemory},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

pub mod address;
pub mod capture;
pub mod controls;
pub mod trigger;

use address::{GrainState, PlaybackAddress, Splice};
use capture::{InputCapture, InputMode};
use trigger::GrainTrigger;

// -------------------------------------------------------------------------------------------------

/// Static configuration of a [`GrainEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GranulatorConfig {
    /// By default 2^20. Number of samples the history buffer and the zero crossing memory
    /// hold. Must be a power of two.
    pub capacity: usize,
    /// By default 1e-9. Smallest denominator magnitude used in divisions of the continuity
    /// correction and pitch shift terms.
    pub epsilon: f64,
    /// By default 4.0. Base of the pitch modulation curve: a pitch modulation amount `m` in
    /// range `-1..=1` results in a pitch ramp exponent of `base^m`.
    pub pitch_modulation_base: f64,
}

impl Default for GranulatorConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            epsilon: Self::DEFAULT_EPSILON,
            pitch_modulation_base: Self::DEFAULT_PITCH_MODULATION_BASE,
        }
    }
}

impl GranulatorConfig {
    pub const DEFAULT_CAPACITY: usize = 1 << 20;
    pub const DEFAULT_EPSILON: f64 = 1e-9;
    pub const DEFAULT_PITCH_MODULATION_BASE: f64 = 4.0;

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn pitch_modulation_base(mut self, base: f64) -> Self {
        self.pitch_modulation_base = base;
        self
    }

    /// Validate all parameters. Returns Error::InvalidCapacity or Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        HistoryBuffer::validate_capacity(self.capacity)?;
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(Error::ParameterError(format!(
                "granulator config 'epsilon' value is '{}'",
                self.epsilon
            )));
        }
        if !(self.pitch_modulation_base > 0.0 && self.pitch_modulation_base.is_finite()) {
            return Err(Error::ParameterError(format!(
                "granulator config 'pitch_modulation_base' value is '{}'",
                self.pitch_modulation_base
            )));
        }
        Ok(())
    }

    /// Memory in bytes the history buffer and zero crossing records of an engine occupy.
    pub fn memory_footprint(&self) -> usize {
        self.capacity * (std::mem::size_of::<f32>() + 4 * std::mem::size_of::<u64>())
    }
}

// -------------------------------------------------------------------------------------------------

/// Control values which are consumed by the grain engine. They get latched into the grain's
/// state at each trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainControls {
    /// Playback speed and direction multiplier. Negative values play grains backwards.
    pub pitch: f64,
    /// Shape of the pitch ramp within a grain, in range `-1..=1`.
    pub pitch_modulation: f64,
    /// Nominal grain rate in Hz.
    pub rate: f64,
    /// Base read position: how many samples behind the write pointer splice points are searched.
    pub position: f64,
}

impl Default for GrainControls {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            pitch_modulation: 0.0,
            rate: 20.0,
            position: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Self-referential, single sample grain generator.
///
/// Each tick the engine
/// 1. captures the input into the history buffer and zero crossing memory,
/// 2. evaluates the grain trigger against its own previous output,
/// 3. on triggers calculates a new, continuity corrected grain start,
/// 4. advances the playback cursor,
/// 5. reads the history at the cursor, which becomes the output and the next tick's feedback.
///
/// All memory is allocated in [`GrainEngine::new`]: processing never allocates or blocks.
#[derive(Debug, Clone)]
pub struct GrainEngine {
    config: GranulatorConfig,
    sample_rate: u32,
    history: HistoryBuffer,
    memory: ZeroCrossingMemory,
    capture: InputCapture,
    trigger: GrainTrigger,
    address: PlaybackAddress,
    output: DifferenceTracker,
    last_splice: Option<Splice>,
    splice_count: u64,
}

impl GrainEngine {
    /// Create a new engine with the given config and sample rate.
    pub fn new(config: GranulatorConfig, sample_rate: u32) -> Result<Self, Error> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        let history = HistoryBuffer::new(config.capacity)?;
        let memory = ZeroCrossingMemory::new(config.capacity)?;
        log::info!(
            "Created grain engine with a capacity of {} samples ({:.1} s, {} KiB) at {} Hz",
            config.capacity,
            config.capacity as f64 / sample_rate as f64,
            config.memory_footprint() / 1024,
            sample_rate
        );
        Ok(Self {
            config,
            sample_rate,
            history,
            memory,
            capture: InputCapture::default(),
            trigger: GrainTrigger::new(),
            address: PlaybackAddress::new(&config),
            output: DifferenceTracker::new(),
            last_splice: None,
            splice_count: 0,
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &GranulatorConfig {
        &self.config
    }

    /// The engine's sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Capacity of the history buffer in samples.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// The rolling input history.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Classified zero crossings of the input history.
    pub fn memory(&self) -> &ZeroCrossingMemory {
        &self.memory
    }

    /// Current input mode.
    pub fn input_mode(&self) -> InputMode {
        self.capture.mode()
    }

    /// Set a new input mode: live or frozen history.
    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.capture.set_mode(mode);
    }

    /// Latched state of the active grain.
    pub fn grain(&self) -> &GrainState {
        self.address.grain()
    }

    /// Most recent playback cursor delay.
    pub fn cursor(&self) -> f64 {
        self.address.delay()
    }

    /// Most recent output sample.
    pub fn last_output(&self) -> f32 {
        self.output.last_sample()
    }

    /// The most recent splice, if any grain got triggered yet.
    pub fn last_splice(&self) -> Option<&Splice> {
        self.last_splice.as_ref()
    }

    /// Number of grains that got triggered since creation or the last reset.
    pub fn splice_count(&self) -> u64 {
        self.splice_count
    }

    /// Clear the history, all zero crossing records and all grain state.
    pub fn reset(&mut self) {
        log::debug!("Resetting grain engine");
        self.history.flush();
        self.memory.reset();
        self.trigger.reset();
        self.address.reset();
        self.output.reset();
        self.last_splice = None;
        self.splice_count = 0;
    }

    /// Process a single sample: consume one input sample and produce one output sample.
    #[inline]
    pub fn tick(&mut self, input: f32, controls: &GrainControls) -> f32 {
        self.capture
            .process(input, &mut self.history, &mut self.memory);

        // feedback: the shape of the previous tick's output
        let feedback = self.output.shape();
        if self
            .trigger
            .process(controls.rate, self.sample_rate, feedback.zero_crossing)
        {
            let splice = self
                .address
                .retrigger(controls, feedback, &self.history, &self.memory);
            log::trace!(
                "Grain #{} at tick {}: {} -> {} (index {:?}, ratio {:.3}, delay {:.3})",
                self.splice_count,
                splice.tick,
                splice.output_class,
                splice.matched_class,
                splice.source_index,
                splice.ratio,
                splice.start_delay
            );
            self.last_splice = Some(splice);
            self.splice_count += 1;
        }

        let delay = self
            .address
            .advance(self.sample_rate, self.history.available());
        let mut sample = self.history.read_variable(delay);
        if !sample.is_finite() {
            sample = 0.0;
        }
        self.output.process(sample);
        sample
    }

    /// Process a block of samples with constant controls. `input` and `output` must have the
    /// same length.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32], controls: &GrainControls) {
        debug_assert_eq!(input.len(), output.len());
        for (input, output) in input.iter().zip(output.iter_mut()) {
            *output = self.tick(*input, controls);
        }
    }
}

// -------------------------------------------------------------------------------------------------
