//! Zero crossing detection and classified zero crossing index memory.

use assume::assume;
use strum::EnumCount;

use super::history::HistoryBuffer;
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Sign pattern of a signal's first and second difference at a zero crossing.
///
/// The first letter is the sign of the first difference, the second letter the sign of the
/// second difference. `P` stands for non-negative, `N` for negative values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::EnumCount,
)]
#[repr(u8)]
pub enum DerivativeClass {
    PP = 0,
    PN = 1,
    NP = 2,
    NN = 3,
}

impl DerivativeClass {
    /// All classes, in record order.
    pub const ALL: [DerivativeClass; DerivativeClass::COUNT] = [
        DerivativeClass::PP,
        DerivativeClass::PN,
        DerivativeClass::NP,
        DerivativeClass::NN,
    ];

    /// Classify the given first and second difference.
    #[inline]
    pub fn from_differences(d1: f32, d2: f32) -> Self {
        match (d1 >= 0.0, d2 >= 0.0) {
            (true, true) => DerivativeClass::PP,
            (true, false) => DerivativeClass::PN,
            (false, true) => DerivativeClass::NP,
            (false, false) => DerivativeClass::NN,
        }
    }

    /// The class a crossing has to be recorded with to continue this class when being played
    /// backwards.
    ///
    /// Time reversal flips the sign of the first difference. Recorded second differences are
    /// measured on the side of the crossing a forward read comes from, which is the side a
    /// backward read leaves to. Across a zero crossing the curvature of an oscillating signal
    /// changes its sign, so the second difference flips too.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            DerivativeClass::PP => DerivativeClass::NN,
            DerivativeClass::PN => DerivativeClass::NP,
            DerivativeClass::NP => DerivativeClass::PN,
            DerivativeClass::NN => DerivativeClass::PP,
        }
    }

    /// True when the first difference of this class is non-negative (a rising crossing).
    #[inline(always)]
    pub fn is_rising(self) -> bool {
        matches!(self, DerivativeClass::PP | DerivativeClass::PN)
    }

    /// Record slot of this class.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

// -------------------------------------------------------------------------------------------------

/// Differences of a signal at a single tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SignalShape {
    /// First difference: `x[t] - x[t-1]`.
    pub d1: f32,
    /// Second difference: `d1[t] - d1[t-1]`.
    pub d2: f32,
    /// True when `x[t] * x[t-1] < 0`.
    pub zero_crossing: bool,
}

impl SignalShape {
    /// Derivative class of this shape.
    #[inline]
    pub fn class(&self) -> DerivativeClass {
        DerivativeClass::from_differences(self.d1, self.d2)
    }
}

// -------------------------------------------------------------------------------------------------

/// Tracks the last two samples of a signal to calculate its first and second differences and
/// detect zero crossings.
#[derive(Debug, Default, Clone)]
pub struct DifferenceTracker {
    x1: f32,
    d1: f32,
    shape: SignalShape,
}

impl DifferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently processed sample.
    #[inline(always)]
    pub fn last_sample(&self) -> f32 {
        self.x1
    }

    /// Shape of the most recently processed sample.
    #[inline(always)]
    pub fn shape(&self) -> SignalShape {
        self.shape
    }

    /// Feed a new sample and return its shape.
    #[inline]
    pub fn process(&mut self, x: f32) -> SignalShape {
        let d1 = x - self.x1;
        let d2 = d1 - self.d1;
        self.shape = SignalShape {
            d1,
            d2,
            zero_crossing: x * self.x1 < 0.0,
        };
        self.x1 = x;
        self.d1 = d1;
        self.shape
    }

    /// Forget all past samples.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// -------------------------------------------------------------------------------------------------

/// Latched write pointer values of the most recent zero crossing for each [`DerivativeClass`].
type IndexRecord = [u64; DerivativeClass::COUNT];

/// Classified zero crossing memory.
///
/// For each [`DerivativeClass`], keeps a latch with the history write pointer value of the most
/// recent zero crossing of that class in the input signal. The latches of every tick are recorded
/// into a ring of `capacity` records, so the state of the latches can be recalled at any depth
/// into the past.
///
/// Records are written at the same buffer index as the input signal's history buffer, so a
/// memory and a [`HistoryBuffer`] of the same capacity stay aligned. Crossings whose samples got
/// overwritten in the history since then are no longer recalled.
#[derive(Debug, Clone)]
pub struct ZeroCrossingMemory {
    records: Vec<IndexRecord>,
    records_mask: usize,
    latches: IndexRecord,
    current_position: u64,
    tracker: DifferenceTracker,
}

impl ZeroCrossingMemory {
    /// Record value of classes which did not see any zero crossing yet.
    const NO_CROSSING: u64 = u64::MAX;

    /// Create a new memory with the given capacity. `capacity` must be a power of two.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        HistoryBuffer::validate_capacity(capacity)?;
        Ok(Self {
            records: vec![[Self::NO_CROSSING; DerivativeClass::COUNT]; capacity],
            records_mask: capacity - 1,
            latches: [Self::NO_CROSSING; DerivativeClass::COUNT],
            current_position: 0,
            tracker: DifferenceTracker::new(),
        })
    }

    /// Number of records the memory holds.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Shape of the most recently processed input sample.
    #[inline(always)]
    pub fn shape(&self) -> SignalShape {
        self.tracker.shape()
    }

    /// Forget all zero crossings.
    pub fn reset(&mut self) {
        self.records.fill([Self::NO_CROSSING; DerivativeClass::COUNT]);
        self.latches = [Self::NO_CROSSING; DerivativeClass::COUNT];
        self.current_position = 0;
        self.tracker.reset();
    }

    /// Process a single input sample which got written at the given history write pointer
    /// value (the pointer value before the write).
    ///
    /// Returns the class of the zero crossing, if the sample completes one.
    #[inline]
    pub fn process(&mut self, x: f32, position: u64) -> Option<DerivativeClass> {
        let shape = self.tracker.process(x);
        let crossing = if shape.zero_crossing {
            let class = shape.class();
            self.latches[class.index()] = position;
            Some(class)
        } else {
            None
        };
        let slot = position as usize & self.records_mask;
        assume!(unsafe: slot < self.records.len(), "Records len is a power of two");
        self.records[slot] = self.latches;
        self.current_position = position;
        crossing
    }

    /// Buffer index of the most recent zero crossing of the given class, as it was recorded
    /// `depth` ticks ago. Depths are wrapped into the memory.
    ///
    /// Returns `None` when no crossing of the class was seen at that time, or when one of the
    /// crossing's two samples got overwritten in the history since then.
    #[inline]
    pub fn recall(&self, class: DerivativeClass, depth: usize) -> Option<usize> {
        let slot = (self.current_position as usize).wrapping_sub(depth) & self.records_mask;
        assume!(unsafe: slot < self.records.len(), "Records len is a power of two");
        match self.records[slot][class.index()] {
            Self::NO_CROSSING => None,
            position => {
                let age = self.current_position.wrapping_sub(position);
                if age < self.records.len() as u64 - 1 {
                    Some(position as usize & self.records_mask)
                } else {
                    None
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn classification() {
        assert_eq!(DerivativeClass::from_differences(1.0, 1.0), DerivativeClass::PP);
        assert_eq!(DerivativeClass::from_differences(0.0, -1.0), DerivativeClass::PN);
        assert_eq!(DerivativeClass::from_differences(-1.0, 0.0), DerivativeClass::NP);
        assert_eq!(DerivativeClass::from_differences(-1.0, -1.0), DerivativeClass::NN);
        for class in DerivativeClass::ALL {
            assert_eq!(class.reversed().reversed(), class);
            assert_ne!(class.reversed().is_rising(), class.is_rising());
            assert_ne!(class.reversed(), class);
            assert_eq!(DerivativeClass::from_str(&class.to_string()).unwrap(), class);
        }
    }

    #[test]
    fn difference_tracking() {
        let mut tracker = DifferenceTracker::new();
        let shape = tracker.process(-1.0);
        assert_eq!(shape.d1, -1.0);
        assert!(!shape.zero_crossing);
        let shape = tracker.process(0.5);
        assert_eq!(shape.d1, 1.5);
        assert_eq!(shape.d2, 2.5);
        assert!(shape.zero_crossing);
        assert_eq!(shape.class(), DerivativeClass::PP);
        // touching zero is not a crossing
        let shape = tracker.process(0.0);
        assert!(!shape.zero_crossing);
        let shape = tracker.process(-0.5);
        assert!(!shape.zero_crossing);
        assert_eq!(tracker.last_sample(), -0.5);
    }

    #[test]
    fn latching() {
        let mut memory = ZeroCrossingMemory::new(16).unwrap();
        let signal = [-1.0, 1.0, 2.0, 2.5, -0.5, -1.0];
        let mut crossings = Vec::new();
        for (position, x) in signal.into_iter().enumerate() {
            crossings.push(memory.process(x, position as u64));
        }
        assert_eq!(
            crossings,
            vec![
                None,
                Some(DerivativeClass::PP),
                None,
                None,
                Some(DerivativeClass::NN),
                None,
            ]
        );
        // latest values
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(1));
        assert_eq!(memory.recall(DerivativeClass::NN, 0), Some(4));
        assert_eq!(memory.recall(DerivativeClass::PN, 0), None);
        assert_eq!(memory.recall(DerivativeClass::NP, 0), None);
        // values held in the past
        assert_eq!(memory.recall(DerivativeClass::NN, 1), Some(4));
        assert_eq!(memory.recall(DerivativeClass::NN, 2), None);
        assert_eq!(memory.recall(DerivativeClass::PP, 4), Some(1));
        assert_eq!(memory.recall(DerivativeClass::PP, 5), None);
        // unwritten slots hold no crossings
        assert_eq!(memory.recall(DerivativeClass::PP, 8), None);
    }

    #[test]
    fn latches_are_overwritten() {
        let mut memory = ZeroCrossingMemory::new(8).unwrap();
        let mut position = 0;
        for _ in 0..4 {
            for x in [-1.0, 1.0] {
                memory.process(x, position);
                position += 1;
            }
        }
        // rising crossings land at odd indices
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(7));
        assert_eq!(memory.recall(DerivativeClass::NN, 0), Some(6));
        assert_eq!(memory.recall(DerivativeClass::NP, 0), None);
        assert_eq!(memory.recall(DerivativeClass::PP, 1), Some(5));
        // depth wraps around the ring
        assert_eq!(memory.recall(DerivativeClass::PP, 8), Some(7));

        memory.reset();
        for class in DerivativeClass::ALL {
            assert_eq!(memory.recall(class, 0), None);
        }
    }

    #[test]
    fn overwritten_crossings_expire() {
        let mut memory = ZeroCrossingMemory::new(8).unwrap();
        let mut position = 0;
        let mut process = |memory: &mut ZeroCrossingMemory, x: f32| {
            memory.process(x, position);
            position += 1;
        };
        // rising crossing between the samples at write pointers 0 and 1
        process(&mut memory, -1.0);
        process(&mut memory, 1.0);
        for _ in 0..6 {
            process(&mut memory, 1.0);
        }
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(1));
        // overwrites the sample in front of the crossing
        process(&mut memory, 1.0);
        assert_eq!(memory.recall(DerivativeClass::PP, 0), None);
        assert_eq!(memory.recall(DerivativeClass::PP, 1), None);
        // a new crossing is recalled at its wrapped buffer index
        process(&mut memory, -1.0);
        process(&mut memory, 1.0);
        assert_eq!(memory.recall(DerivativeClass::PP, 0), Some(2));
        assert_eq!(memory.recall(DerivativeClass::NN, 0), Some(1));
    }

    #[test]
    fn sine_crossings_reverse_into_each_other() {
        let mut memory = ZeroCrossingMemory::new(1 << 12).unwrap();
        let mut counts = [0; DerivativeClass::COUNT];
        for position in 0..2048_u64 {
            let x = (std::f64::consts::TAU * 440.0 * position as f64 / 44100.0).sin() as f32;
            if let Some(class) = memory.process(x, position) {
                counts[class.index()] += 1;
            }
        }
        // curvature of a sine changes its sign with the signal
        assert!(counts[DerivativeClass::PP.index()] > 15);
        assert!(counts[DerivativeClass::NN.index()] > 15);
        assert_eq!(counts[DerivativeClass::PN.index()], 0);
        assert_eq!(counts[DerivativeClass::NP.index()], 0);
        // so reversed reads always find a matching crossing
        for class in [DerivativeClass::PP, DerivativeClass::NN] {
            assert!(memory.recall(class.reversed(), 0).is_some());
        }
    }
}
