use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by crossgrain.
///
/// Errors are only reported while setting up engines and effects or when dispatching parameter
/// updates. The per-sample signal path never fails: numeric edge cases are clamped or wrapped.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    InvalidCapacity(usize),
    InvalidSampleRate(u32),
    InvalidChannelLayout(usize),
    NotInitialized,
    ParameterError(String),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity(capacity) => write!(
                f,
                "Invalid buffer capacity {capacity}: must be a power of two in range 4..=2^30"
            ),
            Self::InvalidSampleRate(sample_rate) => {
                write!(f, "Invalid sample rate: {sample_rate}")
            }
            Self::InvalidChannelLayout(channel_count) => {
                write!(f, "Invalid channel count: {channel_count}")
            }
            Self::NotInitialized => write!(f, "Granulator is not initialized"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}
