//! Renders a synthetic test signal through the granulator effect into a WAV file.

use std::{f32::consts::TAU, io, path::PathBuf};

use arg::{parse_args, Args};

use crossgrain::{
    effects::GranulatorEffect, parameters::ParameterValueUpdate, Effect, Error,
    GranulatorConfig,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 44100;
const BLOCK_SIZE: usize = 512;

const DEFAULT_OUTPUT_PATH: &str = "grains.wav";
const DEFAULT_DURATION: f32 = 10.0;

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Path of the rendered wav file. By default \"grains.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "d", long = "duration")]
    /// Rendered duration in seconds. By default 10.
    duration: Option<f32>,
    #[arg(short = "p", long = "pitch")]
    /// Grain pitch in range -16..16. Negative values play grains backwards.
    pitch: Option<f32>,
    #[arg(short = "r", long = "rate")]
    /// Nominal grain rate in Hz, in range 1..1000.
    rate: Option<f32>,
    #[arg(long = "region")]
    /// Read region in the history buffer, in range 0..1.
    region: Option<f32>,
    #[arg(short = "t", long = "time")]
    /// Time factor of the read region, in range -16..16.
    time_factor: Option<f32>,
    #[arg(short = "f", long = "freeze")]
    /// Freeze the history buffer after the first half of the rendered duration.
    freeze: bool,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

/// Test signal: a sine and saw blend with a slow pitch sweep and a tremolo.
struct TestSignal {
    phase: f32,
    tick: u64,
}

impl TestSignal {
    fn new() -> Self {
        Self { phase: 0.0, tick: 0 }
    }

    fn next(&mut self) -> f32 {
        let time = self.tick as f32 / SAMPLE_RATE as f32;
        let frequency = 110.0 * 2.0_f32.powf((time * 0.25 * TAU).sin() + 1.0);
        self.phase = (self.phase + frequency / SAMPLE_RATE as f32).fract();
        self.tick += 1;
        let sine = (self.phase * TAU).sin();
        let saw = 2.0 * self.phase - 1.0;
        let tremolo = 0.75 + 0.25 * (time * 3.0 * TAU).sin();
        (0.7 * sine + 0.3 * saw) * tremolo * 0.5
    }
}

// -------------------------------------------------------------------------------------------------

fn set_parameter<E: Effect>(
    effect: &mut E,
    id: four_cc::FourCC,
    value: Option<f32>,
) -> Result<(), Error> {
    if let Some(value) = value {
        effect.process_parameter_update(id, &ParameterValueUpdate::Raw(Box::new(value)))?;
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");

    // create and configure the effect
    let mut effect = GranulatorEffect::with_config(GranulatorConfig::default());
    effect.initialize(SAMPLE_RATE, 1, BLOCK_SIZE)?;

    set_parameter(&mut effect, GranulatorEffect::PITCH.id(), args.pitch)?;
    set_parameter(&mut effect, GranulatorEffect::RATE.id(), args.rate)?;
    set_parameter(&mut effect, GranulatorEffect::REGION.id(), args.region)?;
    set_parameter(&mut effect, GranulatorEffect::TIME_FACTOR.id(), args.time_factor)?;

    // render
    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
    let duration = args.duration.unwrap_or(DEFAULT_DURATION).max(0.0);
    let frame_count = (duration * SAMPLE_RATE as f32) as usize;
    let freeze_frame = if args.freeze {
        Some(frame_count / 2)
    } else {
        None
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output_path, spec).map_err(wav_error)?;

    log::info!(
        "Rendering {:.1} seconds of grains into '{}'...",
        duration,
        output_path.display()
    );

    let mut signal = TestSignal::new();
    let mut block = vec![0.0; BLOCK_SIZE];
    let mut frame = 0;
    while frame < frame_count {
        let block_len = BLOCK_SIZE.min(frame_count - frame);
        let block = &mut block[..block_len];
        if freeze_frame.is_some_and(|freeze| (frame..frame + block_len).contains(&freeze)) {
            log::info!("Freezing history buffer");
            let (id, update) = GranulatorEffect::FREEZE.value_update(true);
            effect.process_parameter_update(id, &update)?;
        }
        for sample in block.iter_mut() {
            *sample = signal.next();
        }
        process(&mut effect, block);
        for sample in block.iter() {
            writer.write_sample(*sample).map_err(wav_error)?;
        }
        frame += block_len;
    }
    writer.finalize().map_err(wav_error)?;

    if let Ok(engine) = effect.engine() {
        log::info!(
            "Done: rendered {} grains into {} frames",
            engine.splice_count(),
            frame_count
        );
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

fn process(effect: &mut GranulatorEffect, block: &mut [f32]) {
    #[cfg(feature = "assert-allocs")]
    assert_no_alloc::assert_no_alloc(|| effect.process(block));

    #[cfg(not(feature = "assert-allocs"))]
    effect.process(block);
}

fn wav_error(err: hound::Error) -> Error {
    match err {
        hound::Error::IoError(err) => Error::IoError(err),
        err => Error::IoError(io::Error::other(err)),
    }
}
