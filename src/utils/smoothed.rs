use std::fmt::Debug;

// -------------------------------------------------------------------------------------------------

/// Provides smooth transitions between a current and target f32 value.
/// Used to avoid zipper noise when host controls, such as the output level, change.
pub trait SmoothedValue: Debug {
    /// Access to the current, possibly ramped value.
    #[must_use]
    fn current(&self) -> f32;
    /// Access to the target value.
    #[must_use]
    fn target(&self) -> f32;

    /// Ramp, if needed, and get the current ramped value, else returns the target value.
    #[must_use]
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// Test if ramping is necessary.
    #[must_use]
    fn need_ramp(&self) -> bool;
    /// Move current towards the target value, when ramping is necessary, else does nothing.
    fn ramp(&mut self);

    /// Set current and target to the same value.
    fn init(&mut self, value: f32);
    /// Set a new target value.
    fn set_target(&mut self, target: f32);

    /// Update sample rate of the smoothed value. Ramps are applied once per sample frame, so
    /// the ramp speed needs to be compensated for the sample rate.
    fn set_sample_rate(&mut self, sample_rate: u32);
}

// -------------------------------------------------------------------------------------------------

/// Exponential smoothed value, approaching the target with a configurable inertia.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    inertia: f32,
    sample_rate_comp: f32,
}

impl ExponentialSmoothedValue {
    pub const DEFAULT_INERTIA: f32 = 0.02;

    const REFERENCE_SAMPLE_RATE: f32 = 44100.0;
    const EPSILON: f32 = f32::EPSILON * 100.0;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        Self::with_inertia(value, Self::DEFAULT_INERTIA, sample_rate)
    }

    pub fn with_inertia(value: f32, inertia: f32, sample_rate: u32) -> Self {
        assert!(inertia > 0.0 && inertia <= 1.0, "Invalid inertia");
        assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            current: value,
            target: value,
            inertia,
            sample_rate_comp: Self::REFERENCE_SAMPLE_RATE / sample_rate as f32,
        }
    }

    #[inline(always)]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    fn step(&self) -> f32 {
        // avoid overshooting at low sample rates
        ((self.target - self.current) * self.inertia * self.sample_rate_comp)
            .clamp(-(self.target - self.current).abs(), (self.target - self.current).abs())
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    fn need_ramp(&self) -> bool {
        (self.target - self.current).abs() > Self::EPSILON
    }

    fn ramp(&mut self) {
        self.current += self.step();
        if (self.target - self.current).abs() <= Self::EPSILON {
            self.current = self.target;
        }
    }

    fn init(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        if !self.need_ramp() {
            self.current = target;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        self.sample_rate_comp = Self::REFERENCE_SAMPLE_RATE / sample_rate as f32;
    }
}

impl Default for ExponentialSmoothedValue {
    fn default() -> Self {
        Self::new(0.0, 44100)
    }
}

impl From<f32> for ExponentialSmoothedValue {
    fn from(value: f32) -> Self {
        Self::new(value, 44100)
    }
}

// -------------------------------------------------------------------------------------------------
