//! Signal buffers, detectors and filters used by the grain engine.

pub mod history;
pub mod interpolation;
pub mod lowpass;
pub mod zero_crossing;
