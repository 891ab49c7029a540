use four_cc::FourCC;

use crate::{
    effect::Effect,
    granulator::{
        capture::InputMode, controls::PositionModulator, GrainControls, GrainEngine,
        GranulatorConfig,
    },
    parameter::{
        BooleanParameter, BooleanParameterValue, FloatParameter, FloatParameterValue,
        ParameterValueUpdate, SmoothedParameterValue,
    },
    utils::level_to_gain,
    ClonableParameter, Error, ParameterScaling,
};

// -------------------------------------------------------------------------------------------------

/// Zero crossing aligned granulator effect.
///
/// Mixes all input channels down to a mono signal, feeds it into a [`GrainEngine`] and writes the
/// engine's output, scaled by the output level, into all channels. The grain read position is
/// driven by the region, time factor and self-modulation parameters via a [`PositionModulator`].
///
/// The engine and its history buffer get allocated in [`Effect::initialize`]. Until then,
/// processing passes the input through unchanged.
pub struct GranulatorEffect {
    config: GranulatorConfig,
    channel_count: usize,
    engine: Option<GrainEngine>,
    modulator: Option<PositionModulator>,
    freeze: BooleanParameterValue,
    level: SmoothedParameterValue,
    pitch: FloatParameterValue,
    pitch_modulation: FloatParameterValue,
    rate: FloatParameterValue,
    time_factor: FloatParameterValue,
    region: FloatParameterValue,
    self_modulation_depth: FloatParameterValue,
    self_modulation_rate: FloatParameterValue,
}

impl GranulatorEffect {
    pub const EFFECT_NAME: &str = "Granulator";

    pub const FREEZE: BooleanParameter = BooleanParameter::new(FourCC(*b"frez"), "Freeze", false);
    pub const LEVEL: FloatParameter =
        FloatParameter::new(FourCC(*b"levl"), "Level", 0.0..=1.0, 1.0);
    pub const PITCH: FloatParameter =
        FloatParameter::new(FourCC(*b"ptch"), "Pitch", -16.0..=16.0, 1.0).with_unit("x");
    pub const PITCH_MODULATION: FloatParameter =
        FloatParameter::new(FourCC(*b"pmod"), "Pitch Mod", -1.0..=1.0, 0.0);
    pub const RATE: FloatParameter =
        FloatParameter::new(FourCC(*b"rate"), "Grain Rate", 1.0..=1000.0, 20.0)
            .with_unit("Hz")
            .with_scaling(ParameterScaling::Exponential(3.0));
    pub const TIME_FACTOR: FloatParameter =
        FloatParameter::new(FourCC(*b"time"), "Time Factor", -16.0..=16.0, 1.0).with_unit("x");
    pub const REGION: FloatParameter =
        FloatParameter::new(FourCC(*b"regn"), "Region", 0.0..=1.0, 0.0);
    pub const SELF_MODULATION_DEPTH: FloatParameter =
        FloatParameter::new(FourCC(*b"smdp"), "Self-Mod Depth", 0.0..=1.0, 0.0);
    pub const SELF_MODULATION_RATE: FloatParameter =
        FloatParameter::new(FourCC(*b"smrt"), "Self-Mod Rate", 0.0..=1.0, 0.5);

    /// Create a new granulator with the default engine configuration.
    pub fn new() -> Self {
        Self::with_config(GranulatorConfig::default())
    }

    /// Create a new granulator with the given engine configuration. The configuration gets
    /// validated in [`Effect::initialize`].
    pub fn with_config(config: GranulatorConfig) -> Self {
        Self {
            config,
            channel_count: 0,
            engine: None,
            modulator: None,
            freeze: BooleanParameterValue::from_description(Self::FREEZE),
            level: SmoothedParameterValue::from_description(Self::LEVEL),
            pitch: FloatParameterValue::from_description(Self::PITCH),
            pitch_modulation: FloatParameterValue::from_description(Self::PITCH_MODULATION),
            rate: FloatParameterValue::from_description(Self::RATE),
            time_factor: FloatParameterValue::from_description(Self::TIME_FACTOR),
            region: FloatParameterValue::from_description(Self::REGION),
            self_modulation_depth: FloatParameterValue::from_description(
                Self::SELF_MODULATION_DEPTH,
            ),
            self_modulation_rate: FloatParameterValue::from_description(
                Self::SELF_MODULATION_RATE,
            ),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &GranulatorConfig {
        &self.config
    }

    /// Access to the grain engine. Fails with [`Error::NotInitialized`] until the effect got
    /// initialized.
    pub fn engine(&self) -> Result<&GrainEngine, Error> {
        self.engine.as_ref().ok_or(Error::NotInitialized)
    }

    /// Current input mode, as set by the freeze parameter.
    pub fn input_mode(&self) -> InputMode {
        if self.freeze.value() {
            InputMode::Frozen
        } else {
            InputMode::Live
        }
    }

    fn apply_input_mode(&mut self) {
        let mode = self.input_mode();
        if let Some(engine) = self.engine.as_mut() {
            engine.set_input_mode(mode);
        }
    }

    fn apply_self_modulation_rate(&mut self) {
        let rate = self.self_modulation_rate.value() as f64;
        if let Some(modulator) = self.modulator.as_mut() {
            modulator.set_self_modulation_rate(rate);
        }
    }
}

impl Default for GranulatorEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GranulatorEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn parameters(&self) -> Vec<&dyn ClonableParameter> {
        vec![
            self.freeze.description(),
            self.level.description(),
            self.pitch.description(),
            self.pitch_modulation.description(),
            self.rate.description(),
            self.time_factor.description(),
            self.region.description(),
            self.self_modulation_depth.description(),
            self.self_modulation_rate.description(),
        ]
    }

    fn initialize(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
        _max_frames: usize,
    ) -> Result<(), Error> {
        if channel_count == 0 {
            return Err(Error::InvalidChannelLayout(channel_count));
        }
        let engine = GrainEngine::new(self.config, sample_rate)?;
        self.modulator = Some(PositionModulator::new(self.config.capacity, sample_rate));
        self.engine = Some(engine);
        self.channel_count = channel_count;
        self.level.set_sample_rate(sample_rate);
        self.apply_input_mode();
        self.apply_self_modulation_rate();
        log::info!(
            "Initialized granulator effect with {channel_count} channel(s) at {sample_rate} Hz"
        );
        Ok(())
    }

    fn process(&mut self, output: &mut [f32]) {
        let (Some(engine), Some(modulator)) = (self.engine.as_mut(), self.modulator.as_mut())
        else {
            return;
        };
        let channel_count = self.channel_count;
        debug_assert!(
            output.len() % channel_count == 0,
            "Expecting interleaved buffers with whole frames"
        );
        let pitch = self.pitch.value() as f64;
        let pitch_modulation = self.pitch_modulation.value() as f64;
        let rate = self.rate.value() as f64;
        let time_factor = self.time_factor.value() as f64;
        let region = self.region.value() as f64;
        let depth = self.self_modulation_depth.value() as f64;
        for frame in output.chunks_exact_mut(channel_count) {
            let input = frame.iter().sum::<f32>() / channel_count as f32;
            let position = modulator.process(region, time_factor, depth, engine.last_output());
            let controls = GrainControls {
                pitch,
                pitch_modulation,
                rate,
                position,
            };
            // level is applied outside of the feedback loop
            let sample = engine.tick(input, &controls) * level_to_gain(self.level.next_value());
            frame.fill(sample);
        }
    }

    fn process_tail(&self) -> Option<usize> {
        // frozen or self-sustaining grains may ring forever
        Some(usize::MAX)
    }

    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        match id {
            _ if id == Self::FREEZE.id() => {
                self.freeze.apply_update(value);
                self.apply_input_mode();
            }
            _ if id == Self::LEVEL.id() => self.level.apply_update(value),
            _ if id == Self::PITCH.id() => self.pitch.apply_update(value),
            _ if id == Self::PITCH_MODULATION.id() => self.pitch_modulation.apply_update(value),
            _ if id == Self::RATE.id() => self.rate.apply_update(value),
            _ if id == Self::TIME_FACTOR.id() => self.time_factor.apply_update(value),
            _ if id == Self::REGION.id() => self.region.apply_update(value),
            _ if id == Self::SELF_MODULATION_DEPTH.id() => {
                self.self_modulation_depth.apply_update(value)
            }
            _ if id == Self::SELF_MODULATION_RATE.id() => {
                self.self_modulation_rate.apply_update(value);
                self.apply_self_modulation_rate();
            }
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown parameter: '{id}' for effect '{}'",
                    self.name()
                )))
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
        if let Some(modulator) = self.modulator.as_mut() {
            modulator.reset();
        }
        self.level.init_value_clamped(self.level.target_value());
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn effect(channel_count: usize) -> GranulatorEffect {
        let mut effect =
            GranulatorEffect::with_config(GranulatorConfig::default().capacity(1 << 14));
        effect
            .initialize(SAMPLE_RATE, channel_count, 1024)
            .unwrap();
        effect
    }

    fn stereo_sine(frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|frame| {
                let x = (TAU * 330.0 * frame as f32 / SAMPLE_RATE as f32).sin() * 0.5;
                [x, x]
            })
            .collect()
    }

    fn set(effect: &mut GranulatorEffect, id: FourCC, value: f32) {
        effect
            .process_parameter_update(id, &ParameterValueUpdate::Raw(Box::new(value)))
            .unwrap();
    }

    #[test]
    fn parameter_descriptors() {
        let effect = GranulatorEffect::new();
        let parameters = effect.parameters();
        assert_eq!(parameters.len(), 9);
        let mut ids = parameters.iter().map(|p| p.id().0).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 9);
        for parameter in parameters {
            let default = parameter.default_normalized_value();
            assert!((0.0..=1.0).contains(&default), "{}", parameter.name());
            assert!(!parameter.normalized_value_to_string(default, true).is_empty());
            let clone = parameter.dyn_clone();
            assert_eq!(clone.id(), parameter.id());
        }
    }

    #[test]
    fn parameter_dispatch() {
        let mut effect = effect(1);
        set(&mut effect, GranulatorEffect::PITCH.id(), -2.0);
        assert_eq!(effect.pitch.value(), -2.0);
        // raw values get clamped
        set(&mut effect, GranulatorEffect::RATE.id(), 5000.0);
        assert_eq!(effect.rate.value(), 1000.0);
        effect
            .process_parameter_update(
                GranulatorEffect::RATE.id(),
                &ParameterValueUpdate::Normalized(0.0),
            )
            .unwrap();
        assert_eq!(effect.rate.value(), 1.0);

        assert_eq!(effect.input_mode(), InputMode::Live);
        let (id, update) = GranulatorEffect::FREEZE.value_update(true);
        effect.process_parameter_update(id, &update).unwrap();
        assert_eq!(effect.input_mode(), InputMode::Frozen);
        assert_eq!(effect.engine().unwrap().input_mode(), InputMode::Frozen);

        assert!(matches!(
            effect.process_parameter_update(
                FourCC(*b"nope"),
                &ParameterValueUpdate::Normalized(0.5)
            ),
            Err(Error::ParameterError(_))
        ));
    }

    #[test]
    fn initialization() {
        let mut effect = GranulatorEffect::with_config(GranulatorConfig::default().capacity(64));
        // uninitialized effects pass through
        let mut buffer = vec![0.25; 16];
        effect.process(&mut buffer);
        assert!(buffer.iter().all(|x| *x == 0.25));

        assert!(matches!(
            effect.initialize(SAMPLE_RATE, 0, 16),
            Err(Error::InvalidChannelLayout(0))
        ));
        assert!(matches!(
            effect.initialize(0, 2, 16),
            Err(Error::InvalidSampleRate(0))
        ));
        let mut effect = GranulatorEffect::with_config(GranulatorConfig::default().capacity(100));
        assert!(matches!(
            effect.initialize(SAMPLE_RATE, 2, 16),
            Err(Error::InvalidCapacity(100))
        ));
        assert!(matches!(effect.engine(), Err(Error::NotInitialized)));
    }

    #[test]
    fn stereo_processing() {
        let mut effect = effect(2);
        set(&mut effect, GranulatorEffect::RATE.id(), 200.0);
        set(&mut effect, GranulatorEffect::PITCH.id(), 0.5);
        set(&mut effect, GranulatorEffect::REGION.id(), 0.1);
        let mut buffer = stereo_sine(SAMPLE_RATE as usize / 2);
        for block in buffer.chunks_mut(512) {
            effect.process(block);
        }
        assert!(buffer.iter().all(|x| x.is_finite()));
        assert!(buffer.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(buffer.iter().any(|x| *x != 0.0));
        assert!(effect.engine().unwrap().splice_count() > 0);
    }

    #[test]
    fn level_is_applied_after_the_feedback_loop() {
        let mut loud = effect(2);
        let mut quiet = effect(2);
        for effect in [&mut loud, &mut quiet] {
            set(effect, GranulatorEffect::RATE.id(), 150.0);
            set(effect, GranulatorEffect::SELF_MODULATION_DEPTH.id(), 0.2);
        }
        set(&mut quiet, GranulatorEffect::LEVEL.id(), 0.5);

        let mut loud_buffer = stereo_sine(20000);
        let mut quiet_buffer = loud_buffer.clone();
        loud.process(&mut loud_buffer);
        quiet.process(&mut quiet_buffer);
        assert_eq!(
            loud.engine().unwrap().splice_count(),
            quiet.engine().unwrap().splice_count()
        );
        // once the level ramp finished, the output is exactly the scaled engine output
        for (loud, quiet) in loud_buffer.iter().zip(quiet_buffer.iter()).skip(20000) {
            assert_eq!(*loud * 0.25, *quiet);
        }
    }

    #[test]
    fn silence_after_muting() {
        let mut effect = effect(1);
        set(&mut effect, GranulatorEffect::LEVEL.id(), 0.0);
        let mut buffer = stereo_sine(SAMPLE_RATE as usize / 4);
        effect.process(&mut buffer);
        assert!(buffer.iter().rev().take(1000).all(|x| *x == 0.0));

        effect.reset();
        assert_eq!(effect.engine().unwrap().splice_count(), 0);
        assert_eq!(effect.engine().unwrap().last_output(), 0.0);
    }
}
