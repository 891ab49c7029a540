//! Rolling sample history with fixed and fractional delay reads.

use assume::assume;

use super::interpolation::{hermite4, linear};
use crate::{utils::wrap, Error};

// -------------------------------------------------------------------------------------------------

/// Fixed capacity circular sample store with one continuously advancing write pointer.
///
/// The buffer always holds the most recent `capacity` samples. Older samples get overwritten,
/// never explicitly removed. All reads wrap their delays or indices into the buffer, so no read
/// can ever index outside of it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    buffer: Vec<f32>,
    buffer_mask: usize,
    write_pointer: u64,
}

impl HistoryBuffer {
    /// Smallest supported capacity: the 4-point interpolator needs 4 distinct samples.
    pub const MIN_CAPACITY: usize = 4;
    /// Largest supported capacity.
    pub const MAX_CAPACITY: usize = 1 << 30;

    /// Create a new, silent history buffer. `capacity` must be a power of two.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        Self::validate_capacity(capacity)?;
        Ok(Self {
            buffer: vec![0.0; capacity],
            buffer_mask: capacity - 1,
            write_pointer: 0,
        })
    }

    /// Check if the given capacity can be used for history buffers and index records.
    pub fn validate_capacity(capacity: usize) -> Result<(), Error> {
        if capacity.is_power_of_two()
            && (Self::MIN_CAPACITY..=Self::MAX_CAPACITY).contains(&capacity)
        {
            Ok(())
        } else {
            Err(Error::InvalidCapacity(capacity))
        }
    }

    /// Number of samples the buffer holds.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of samples written so far.
    #[inline(always)]
    pub fn write_pointer(&self) -> u64 {
        self.write_pointer
    }

    /// Number of samples which got written and not yet overwritten: the write pointer, limited
    /// to the capacity. Slots beyond this count were never written.
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.write_pointer.min(self.buffer.len() as u64) as usize
    }

    /// Buffer index of the most recently written sample.
    #[inline(always)]
    pub fn current_index(&self) -> usize {
        (self.write_pointer.wrapping_sub(1) as usize) & self.buffer_mask
    }

    /// Wrap the given fractional delay into range `[0, capacity)`.
    #[inline]
    pub fn wrap_delay(&self, delay: f64) -> f64 {
        wrap(delay, self.buffer.len() as f64)
    }

    /// Clear all samples and rewind the write pointer.
    pub fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.write_pointer = 0;
    }

    /// Append a single sample, overwriting the oldest one.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        let index = (self.write_pointer as usize) & self.buffer_mask;
        assume!(unsafe: index < self.buffer.len(), "Buffer len is a power of two");
        self.buffer[index] = sample;
        self.write_pointer += 1;
    }

    /// Read the sample at the given absolute buffer index, wrapped into the buffer.
    #[inline(always)]
    pub fn read_at(&self, index: usize) -> f32 {
        let index = index & self.buffer_mask;
        assume!(unsafe: index < self.buffer.len(), "Buffer len is a power of two");
        self.buffer[index]
    }

    /// First difference of the stored signal at the given absolute index:
    /// `x[index] - x[index - 1]`.
    #[inline]
    pub fn difference_at(&self, index: usize) -> f32 {
        self.read_at(index) - self.read_at(index.wrapping_sub(1))
    }

    /// Read the sample that got written `delay` samples ago. A delay of 0 returns the most
    /// recently written sample. Delays are wrapped into the buffer.
    #[inline]
    pub fn read_fixed(&self, delay: usize) -> f32 {
        self.read_at(self.current_index().wrapping_sub(delay))
    }

    /// Read a 4-point Hermite interpolated sample at the given fractional delay. Delays are
    /// wrapped into range `[0, capacity)`. Integer delays return stored samples unchanged.
    #[inline]
    pub fn read_variable(&self, delay: f64) -> f32 {
        let (index, fraction) = self.read_position(delay);
        if fraction == 0.0 {
            return self.read_at(index);
        }
        let ym1 = self.read_at(index.wrapping_sub(1));
        let y0 = self.read_at(index);
        let y1 = self.read_at(index.wrapping_add(1));
        let y2 = self.read_at(index.wrapping_add(2));
        hermite4(ym1, y0, y1, y2, fraction)
    }

    /// Read a linear interpolated sample at the given fractional delay. Delays are wrapped
    /// into range `[0, capacity)`.
    #[inline]
    pub fn read_linear(&self, delay: f64) -> f32 {
        let (index, fraction) = self.read_position(delay);
        linear(
            self.read_at(index),
            self.read_at(index.wrapping_add(1)),
            fraction,
        )
    }

    /// Convert a fractional delay to the integer buffer index and fraction of the read position.
    #[inline]
    fn read_position(&self, delay: f64) -> (usize, f32) {
        let capacity = self.buffer.len() as f64;
        let position = wrap(
            self.current_index() as f64 - self.wrap_delay(delay),
            capacity,
        );
        let position_floor = position.floor();
        let fraction = (position - position_floor) as f32;
        (position_floor as usize & self.buffer_mask, fraction.clamp(0.0, 1.0))
    }
}

// -------------------------------------------------------------------------------------------------
