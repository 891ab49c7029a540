#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod effect;
mod error;
mod granulator;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use effect::Effect;

pub use granulator::{
    address::{GrainState, Splice},
    capture::InputMode,
    GrainControls, GrainEngine, GranulatorConfig,
};

pub use parameter::{ClonableParameter, Parameter, ParameterScaling, ParameterType};

// public mods
pub mod utils;

pub mod effects {
    //! Host facing effect implementations.

    pub use super::effect::granulator::GranulatorEffect;
}

pub mod parameters {
    //! Parameter descriptors and value wrappers, used by effects.

    pub use super::parameter::{
        BooleanParameter, BooleanParameterValue, FloatParameter, FloatParameterValue,
        ParameterValueUpdate, SmoothedParameterValue,
    };
}

pub mod engine {
    //! Building blocks of the grain engine, for custom hosts and analysis.

    pub use super::granulator::{
        address::PlaybackAddress,
        capture::InputCapture,
        controls::{pitch_modulation_exponent, self_modulation_cutoff, PositionModulator},
        trigger::GrainTrigger,
    };
}
