use super::buffer::AudioBlock;
use super::config::EngineConfig;
use super::prelude::{db_to_gain, flush_denormal, lerp, FRAC_1_SQRT_2, PI};
use super::smoothing::LinearSmoother;

const MIN_CUTOFF_HZ: f32 = 20.0;
const MAX_CUTOFF_HZ: f32 = 20_000.0;

/// Normalised (a0 = 1) biquad coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Second-order low-pass (RBJ Audio EQ Cookbook).
    pub fn low_pass(cutoff: f32, sample_rate: f32, q: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        // Keep the cutoff below Nyquist
        let cutoff = cutoff.max(1.0).min(sample_rate * 0.49);
        let q = q.max(1e-3);

        let omega = 2.0 * PI * cutoff / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::normalised(b0, b1, b2, a0, a1, a2)
    }

    /// Second-order low shelf; `gain` is linear and applies below `frequency`.
    pub fn low_shelf(frequency: f32, sample_rate: f32, q: f32, gain: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let frequency = frequency.max(1.0).min(sample_rate * 0.49);
        let q = q.max(1e-3);

        let a = gain.max(0.0).sqrt();
        let a_minus_1 = a - 1.0;
        let a_plus_1 = a + 1.0;
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let beta = omega.sin() * a.sqrt() / q;
        let a_minus_1_cos = a_minus_1 * cos_omega;

        let b0 = a * (a_plus_1 - a_minus_1_cos + beta);
        let b1 = a * 2.0 * (a_minus_1 - a_plus_1 * cos_omega);
        let b2 = a * (a_plus_1 - a_minus_1_cos - beta);
        let a0 = a_plus_1 + a_minus_1_cos + beta;
        let a1 = -2.0 * (a_minus_1 + a_plus_1 * cos_omega);
        let a2 = a_plus_1 + a_minus_1_cos - beta;

        Self::normalised(b0, b1, b2, a0, a1, a2)
    }

    fn normalised(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv_a0 = a0.recip();
        Self {
            b0: b0 * inv_a0,
            b1: b1 * inv_a0,
            b2: b2 * inv_a0,
            a1: a1 * inv_a0,
            a2: a2 * inv_a0,
        }
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Single-channel biquad, Direct Form I.
#[derive(Clone, Debug, Default)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            ..Default::default()
        }
    }

    /// Swap coefficients, keeping the history.
    pub fn set_coefficients(&mut self, coefficients: BiquadCoefficients) {
        self.coefficients = coefficients;
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coefficients
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);

        output
    }
}

/// Low-pass on a ramped cutoff followed by a fixed-frequency low shelf.
///
/// Low-pass coefficients follow the cutoff ramp every
/// `filter_update_interval` samples. Both filters always run so their
/// history stays warm, but a fully open low-pass and a 0 dB shelf pass
/// their input through unchanged. Entering or leaving the open state
/// crossfades between input and low-pass output over one update interval.
pub struct ToneFilterStage {
    low_pass: Vec<Biquad>,
    low_shelf: Vec<Biquad>,
    cutoff: LinearSmoother,
    applied_cutoff: f32,
    /// Share of the unfiltered input in the low-pass output, 0 or 1 between
    /// crossfades.
    open_mix: f32,
    bass_gain_db: f32,
    sample_rate: f32,
    ramp_seconds: f32,
    shelf_frequency: f32,
    shelf_q: f32,
    update_interval: usize,
}

impl ToneFilterStage {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            low_pass: Vec::new(),
            low_shelf: Vec::new(),
            cutoff: LinearSmoother::new(MAX_CUTOFF_HZ),
            applied_cutoff: MAX_CUTOFF_HZ,
            open_mix: 1.0,
            bass_gain_db: 0.0,
            sample_rate: 44_100.0,
            ramp_seconds: config.filter_ramp_seconds,
            shelf_frequency: config.low_shelf_frequency_hz,
            shelf_q: config.low_shelf_q,
            update_interval: config.filter_update_interval.max(1),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.low_pass = vec![Biquad::default(); num_channels];
        self.low_shelf = vec![Biquad::default(); num_channels];
        self.cutoff.reset(sample_rate, self.ramp_seconds);
        self.applied_cutoff = self.cutoff.current();
        self.open_mix = open_mix_for(self.applied_cutoff);
        self.update_low_pass(self.applied_cutoff);
        self.update_low_shelf(self.bass_gain_db);
    }

    /// Clear filter history and land the cutoff ramp on its target.
    pub fn reset(&mut self) {
        for filter in self.low_pass.iter_mut().chain(self.low_shelf.iter_mut()) {
            filter.reset();
        }
        self.cutoff.set_current_and_target(self.cutoff.target());
        self.applied_cutoff = self.cutoff.current();
        self.open_mix = open_mix_for(self.applied_cutoff);
        self.update_low_pass(self.applied_cutoff);
    }

    /// Smoothed cutoff currently in effect.
    pub fn cutoff(&self) -> f32 {
        self.cutoff.current()
    }

    pub fn process(&mut self, block: &mut AudioBlock, cutoff_hz: f32, bass_gain_db: f32) {
        let cutoff_hz = if cutoff_hz.is_nan() {
            MAX_CUTOFF_HZ
        } else {
            cutoff_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ)
        };
        let bass_gain_db = if bass_gain_db.is_finite() { bass_gain_db } else { 0.0 };

        self.cutoff.set_target(cutoff_hz);
        if bass_gain_db != self.bass_gain_db {
            self.update_low_shelf(bass_gain_db);
        }

        let num_channels = block.num_channels().min(self.low_pass.len());
        let num_samples = block.num_samples();
        let shelf_active = self.bass_gain_db != 0.0;

        let mut start = 0;
        while start < num_samples {
            let len = self.update_interval.min(num_samples - start);
            let cutoff = self.cutoff.skip(len);
            if cutoff != self.applied_cutoff {
                self.applied_cutoff = cutoff;
                self.update_low_pass(cutoff);
            }
            let mix_from = self.open_mix;
            self.open_mix = open_mix_for(cutoff);
            let mix_step = (self.open_mix - mix_from) / len as f32;

            for channel in 0..num_channels {
                let low_pass = &mut self.low_pass[channel];
                let low_shelf = &mut self.low_shelf[channel];
                let samples = block.channel_mut(channel)[start..start + len].iter_mut();
                for (index, sample) in samples.enumerate() {
                    let filtered = low_pass.process(*sample);
                    let mix = mix_from + mix_step * (index + 1) as f32;
                    let toned = if mix >= 1.0 {
                        *sample
                    } else if mix <= 0.0 {
                        filtered
                    } else {
                        lerp(filtered, *sample, mix)
                    };
                    let shelved = low_shelf.process(toned);
                    *sample = if shelf_active { shelved } else { toned };
                }
            }
            start += len;
        }
    }

    fn update_low_pass(&mut self, cutoff: f32) {
        let coefficients = BiquadCoefficients::low_pass(cutoff, self.sample_rate, FRAC_1_SQRT_2);
        for filter in self.low_pass.iter_mut() {
            filter.set_coefficients(coefficients);
        }
    }

    fn update_low_shelf(&mut self, bass_gain_db: f32) {
        self.bass_gain_db = bass_gain_db;
        let coefficients = BiquadCoefficients::low_shelf(
            self.shelf_frequency,
            self.sample_rate,
            self.shelf_q,
            db_to_gain(bass_gain_db),
        );
        for filter in self.low_shelf.iter_mut() {
            filter.set_coefficients(coefficients);
        }
    }
}

fn open_mix_for(cutoff: f32) -> f32 {
    if cutoff >= MAX_CUTOFF_HZ {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settle(filter: &mut Biquad, input: f32, samples: usize) -> f32 {
        (0..samples).fold(0.0, |_, _| filter.process(input))
    }

    #[test]
    fn low_pass_passes_dc_and_blocks_nyquist() {
        let coefficients = BiquadCoefficients::low_pass(1000.0, 48_000.0, FRAC_1_SQRT_2);
        let mut filter = Biquad::new(coefficients);
        assert_relative_eq!(settle(&mut filter, 1.0, 4000), 1.0, epsilon = 1e-4);

        filter.reset();
        let mut peak: f32 = 0.0;
        for n in 0..4000 {
            let input = if n % 2 == 0 { 1.0 } else { -1.0 };
            let output = filter.process(input);
            if n > 2000 {
                peak = peak.max(output.abs());
            }
        }
        assert!(peak < 0.01, "nyquist leaked through: {peak}");
    }

    #[test]
    fn low_shelf_dc_gain_matches_decibels() {
        let gain = db_to_gain(6.0);
        let mut filter = Biquad::new(BiquadCoefficients::low_shelf(150.0, 44_100.0, 1.0, gain));
        assert_relative_eq!(settle(&mut filter, 1.0, 20_000), gain, max_relative = 1e-3);
    }

    #[test]
    fn tiny_feedback_is_flushed() {
        let mut filter = Biquad::new(BiquadCoefficients::low_pass(200.0, 44_100.0, 0.7));
        filter.process(1e-22);
        assert_eq!(filter.y1, 0.0);
    }
}
