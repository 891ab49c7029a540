//! Input capture: the only producer of history buffer and zero crossing memory content.

use crate::utils::dsp::{history::HistoryBuffer, zero_crossing::ZeroCrossingMemory};

// -------------------------------------------------------------------------------------------------

/// Selects how the input signal feeds the granulator's history.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames,
)]
pub enum InputMode {
    /// Continuously overwrite the history with the live input signal.
    #[default]
    Live,
    /// Ignore the input and replay the existing history indefinitely.
    Frozen,
}

// -------------------------------------------------------------------------------------------------

/// Writes one sample per tick into the history buffer and zero crossing memory.
///
/// In [`InputMode::Frozen`] mode the sample which is about to be overwritten gets written
/// back, so the buffer content stays unchanged while the write pointer keeps advancing. The
/// zero crossing memory keeps observing this recirculated stream, so its records stay aligned
/// with the frozen buffer content.
#[derive(Debug, Default, Clone)]
pub struct InputCapture {
    mode: InputMode,
}

impl InputCapture {
    pub fn new(mode: InputMode) -> Self {
        Self { mode }
    }

    /// Current input mode.
    #[inline(always)]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Switch to a new input mode. Takes effect with the next processed sample.
    pub fn set_mode(&mut self, mode: InputMode) {
        if mode != self.mode {
            log::debug!("Switching granulator input mode to '{mode}'");
            self.mode = mode;
        }
    }

    /// Capture a single input sample. Returns the sample that got written to the history.
    #[inline]
    pub fn process(
        &self,
        input: f32,
        history: &mut HistoryBuffer,
        memory: &mut ZeroCrossingMemory,
    ) -> f32 {
        debug_assert_eq!(history.capacity(), memory.capacity());
        let sample = match self.mode {
            InputMode::Live => {
                if input.is_finite() {
                    input
                } else {
                    0.0
                }
            }
            InputMode::Frozen => history.read_fixed(history.capacity() - 1),
        };
        let position = history.write_pointer();
        history.write(sample);
        memory.process(sample, position);
        sample
    }
}

// -------------------------------------------------------------------------------------------------
