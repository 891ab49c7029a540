use four_cc::FourCC;

use crate::{parameter::ParameterValueUpdate, ClonableParameter, Error};

// -------------------------------------------------------------------------------------------------

pub mod granulator;

// -------------------------------------------------------------------------------------------------

/// Effects manipulate audio samples in `f32` format and can be `Send` and `Sync`ed across threads.
/// Buffers are interleaved and processed in-place in the audio real-time thread.
///
/// Non real-time thread clients, such as UIs, can query info about an effect's parameter set via
/// [`Effect::parameters`] after creating the effect. Parameter values are changed by passing
/// [`ParameterValueUpdate`]s to [`Effect::process_parameter_update`] in the audio thread, so the
/// processing state never gets mutated from outside of the audio thread.
///
/// NB: all `process_XXX` functions are called in realtime audio threads, so they must not
/// block or allocate! All other functions are called in the main thread to initialize the effect.
pub trait Effect: Send + Sync + 'static {
    /// A unique, static name for the effect, used for logging or in UIs.
    fn name(&self) -> &'static str;

    /// Returns a list of parameter descriptors for this effect.
    ///
    /// This can be used by UIs or automation systems to query available parameters of a specific
    /// effect. This method may only be called on non-real-time threads.
    fn parameters(&self) -> Vec<&dyn ClonableParameter>;

    /// Initializes the effect with the audio output's properties.
    ///
    /// Runs on a non-real-time thread, so it's safe to allocate buffers here. This must be
    /// called before the effect gets processed.
    fn initialize(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
        max_frames: usize,
    ) -> Result<(), Error>;

    /// Processes an interleaved audio buffer in-place, applying the effect.
    ///
    /// This method is called repeatedly on the real-time audio thread. To avoid audio glitches,
    /// it must not block, allocate memory, or perform other time-consuming operations.
    fn process(&mut self, output: &mut [f32]);

    /// Returns the number of audible sample frames this effect will produce after it received
    /// silence. `None` means unknown, `Some(usize::MAX)` signals an infinite tail.
    fn process_tail(&self) -> Option<usize> {
        None
    }

    /// Handles a parameter update in the real-time thread.
    ///
    /// The implementation should match on the `id` and update its internal state accordingly
    /// by using the `value` which can be a raw or normalized value. Unknown ids must be
    /// reported as [`Error::ParameterError`].
    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error>;

    /// Clear all internal processing state, e.g. when the host's transport restarts.
    fn reset(&mut self) {}
}
