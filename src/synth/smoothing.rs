//! Linear parameter ramps.
//!
//! A new target starts a straight-line ramp that lands on the target after a
//! fixed number of samples, so the value always moves monotonically towards
//! it and never overshoots.

#[derive(Debug, Clone)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    step: f32,
    countdown: usize,
    ramp_samples: usize,
}

impl LinearSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            countdown: 0,
            ramp_samples: 0,
        }
    }

    /// Set the ramp length from a sample rate and a time in seconds and
    /// snap to the current target.
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        let samples = (sample_rate.max(0.0) * ramp_seconds.max(0.0)).floor();
        self.ramp_samples = if samples.is_finite() { samples as usize } else { 0 };
        self.set_current_and_target(self.target);
    }

    /// Jump to `value` with no ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.countdown = 0;
    }

    /// Start a ramp from the current value to `value`.
    pub fn set_target(&mut self, value: f32) {
        if value == self.target {
            return;
        }
        if self.ramp_samples == 0 {
            self.set_current_and_target(value);
            return;
        }
        self.target = value;
        self.countdown = self.ramp_samples;
        self.step = (self.target - self.current) / self.countdown as f32;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.countdown == 0 {
            return self.target;
        }
        self.advance(1)
    }

    /// Advance `samples` samples at once.
    pub fn skip(&mut self, samples: usize) -> f32 {
        self.advance(samples)
    }

    // Positions are measured back from the target, so rounding can never
    // carry the value past it.
    fn advance(&mut self, samples: usize) -> f32 {
        if samples >= self.countdown {
            self.current = self.target;
            self.countdown = 0;
            return self.current;
        }
        self.countdown -= samples;
        let value = self.target - self.step * self.countdown as f32;
        self.current = if self.step > 0.0 {
            value.max(self.current).min(self.target)
        } else {
            value.min(self.current).max(self.target)
        };
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.countdown > 0
    }
}

impl Default for LinearSmoother {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_reaches_target_in_fixed_time() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.reset(1000.0, 0.01);
        smoother.set_target(1.0);
        let values: Vec<f32> = (0..10).map(|_| smoother.next_value()).collect();
        assert_eq!(values[9], 1.0);
        assert!(values.windows(2).all(|w| w[1] >= w[0]));
        assert!(!smoother.is_smoothing());
    }

    #[test]
    fn downward_ramp_is_monotonic() {
        let mut smoother = LinearSmoother::new(880.0);
        smoother.reset(48_000.0, 0.05);
        smoother.set_target(440.0);
        let mut previous = smoother.current();
        while smoother.is_smoothing() {
            let value = smoother.next_value();
            assert!(value <= previous);
            assert!(value >= 440.0);
            previous = value;
        }
        assert_eq!(smoother.current(), 440.0);
    }

    #[test]
    fn zero_ramp_snaps() {
        let mut smoother = LinearSmoother::new(1.0);
        smoother.reset(44_100.0, 0.0);
        smoother.set_target(3.0);
        assert_eq!(smoother.current(), 3.0);
    }

    #[test]
    fn skip_lands_on_target() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.reset(100.0, 0.1);
        smoother.set_target(10.0);
        assert!((smoother.skip(5) - 5.0).abs() < 1e-5);
        assert_eq!(smoother.skip(100), 10.0);
    }

    #[test]
    fn tiny_retarget_never_overshoots() {
        for k in 1..200 {
            let target = 440.0 + k as f32 * 0.0013;
            let mut smoother = LinearSmoother::new(440.0);
            smoother.reset(44_100.0, 0.05);
            smoother.set_target(target);
            let mut previous = smoother.current();
            while smoother.is_smoothing() {
                let value = smoother.next_value();
                assert!(value >= previous && value <= target, "{previous} -> {value}");
                previous = value;
            }
            assert_eq!(smoother.current(), target);
        }
    }

    #[test]
    fn skipping_stays_between_start_and_target() {
        let mut smoother = LinearSmoother::new(20_000.0);
        smoother.reset(44_100.0, 0.05);
        smoother.set_target(19_999.9);
        let mut previous = smoother.current();
        for _ in 0..70 {
            let value = smoother.skip(32);
            assert!(value <= previous && value >= 19_999.9);
            previous = value;
        }
        assert_eq!(smoother.current(), 19_999.9);
    }
}
