//! Freeverb-style stereo reverb.
//!
//! Eight damped feedback combs in parallel feed four series allpasses per
//! channel; the right channel's delays are offset for stereo spread. Dry
//! level is always `1 - wet_level`.

use super::buffer::AudioBlock;
use super::prelude::flush_denormal;
use super::smoothing::LinearSmoother;
use serde::{Deserialize, Serialize};

// Delay lengths in samples at 44.1 kHz.
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_SAMPLE_RATE: f32 = 44_100.0;

const INPUT_GAIN: f32 = 0.015;
const WET_SCALE: f32 = 3.0;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const ALLPASS_FEEDBACK: f32 = 0.5;
const SMOOTHING_SECONDS: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbParameters {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub width: f32,
}

impl ReverbParameters {
    /// Every field clamped to [0, 1]; NaN becomes 0.
    pub fn clamped(self) -> Self {
        let unit = |value: f32| if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self {
            room_size: unit(self.room_size),
            damping: unit(self.damping),
            wet_level: unit(self.wet_level),
            width: unit(self.width),
        }
    }
}

impl Default for ReverbParameters {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            width: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    last: f32,
}

impl CombFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
            last: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let output = self.buffer[self.index];
        // One-pole low-pass in the feedback loop
        self.last = flush_denormal(output * (1.0 - damp) + self.last * damp);
        self.buffer[self.index] = flush_denormal(input + self.last * feedback);
        self.index += 1;
        if self.index == self.buffer.len() {
            self.index = 0;
        }
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.last = 0.0;
    }
}

#[derive(Clone, Debug)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = flush_denormal(input + buffered * ALLPASS_FEEDBACK);
        self.index += 1;
        if self.index == self.buffer.len() {
            self.index = 0;
        }
        buffered - input
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// One channel's comb bank and allpass chain.
#[derive(Clone, Debug, Default)]
struct ReverbChannel {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl ReverbChannel {
    fn new(scale: f32, spread: usize) -> Self {
        let length = |tuning: usize| ((tuning + spread) as f32 * scale).round() as usize;
        Self {
            combs: COMB_TUNINGS.iter().map(|&t| CombFilter::new(length(t))).collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&t| AllpassFilter::new(length(t)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let mut output = 0.0;
        for comb in self.combs.iter_mut() {
            output += comb.process(input, damp, feedback);
        }
        for allpass in self.allpasses.iter_mut() {
            output = allpass.process(output);
        }
        output
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::reset);
        self.allpasses.iter_mut().for_each(AllpassFilter::reset);
    }
}

pub struct ReverbStage {
    parameters: ReverbParameters,
    left: ReverbChannel,
    right: ReverbChannel,
    dry_gain: LinearSmoother,
    wet_gain_1: LinearSmoother,
    wet_gain_2: LinearSmoother,
    damping: LinearSmoother,
    feedback: LinearSmoother,
    // The first parameters after prepare are applied without a ramp.
    snap_next_parameters: bool,
}

impl ReverbStage {
    pub fn new() -> Self {
        let mut stage = Self {
            parameters: ReverbParameters::default(),
            left: ReverbChannel::default(),
            right: ReverbChannel::default(),
            dry_gain: LinearSmoother::default(),
            wet_gain_1: LinearSmoother::default(),
            wet_gain_2: LinearSmoother::default(),
            damping: LinearSmoother::default(),
            feedback: LinearSmoother::default(),
            snap_next_parameters: true,
        };
        stage.apply_targets(true);
        stage
    }

    /// Rebuild the delay lines for `sample_rate` and silence all tails.
    pub fn prepare(&mut self, sample_rate: f32) {
        let scale = sample_rate / TUNING_SAMPLE_RATE;
        self.left = ReverbChannel::new(scale, 0);
        self.right = ReverbChannel::new(scale, STEREO_SPREAD);
        for smoother in self.smoothers_mut() {
            smoother.reset(sample_rate, SMOOTHING_SECONDS);
        }
        self.snap_next_parameters = true;
    }

    /// Silence the tails. Parameters are kept.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        for smoother in self.smoothers_mut() {
            smoother.set_current_and_target(smoother.target());
        }
    }

    pub fn set_parameters(&mut self, parameters: ReverbParameters) {
        let parameters = parameters.clamped();
        let snap = std::mem::take(&mut self.snap_next_parameters);
        if parameters == self.parameters && !snap {
            return;
        }
        self.parameters = parameters;
        self.apply_targets(snap);
    }

    pub fn parameters(&self) -> ReverbParameters {
        self.parameters
    }

    pub fn wet_level(&self) -> f32 {
        self.parameters.wet_level
    }

    pub fn dry_level(&self) -> f32 {
        1.0 - self.parameters.wet_level
    }

    /// Process in place. Mono and stereo blocks are supported; any other
    /// layout passes through.
    pub fn process(&mut self, block: &mut AudioBlock) {
        if let Some((left, right)) = block.stereo_mut() {
            self.process_stereo(left, right);
        } else if block.num_channels() == 1 {
            self.process_mono(block.channel_mut(0));
        }
    }

    fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let damp = self.damping.next_value();
            let feedback = self.feedback.next_value();
            let input = (*l + *r) * INPUT_GAIN;

            let out_l = self.left.process(input, damp, feedback);
            let out_r = self.right.process(input, damp, feedback);

            let dry = self.dry_gain.next_value();
            let wet_1 = self.wet_gain_1.next_value();
            let wet_2 = self.wet_gain_2.next_value();
            *l = out_l * wet_1 + out_r * wet_2 + *l * dry;
            *r = out_r * wet_1 + out_l * wet_2 + *r * dry;
        }
    }

    fn process_mono(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let damp = self.damping.next_value();
            let feedback = self.feedback.next_value();
            let output = self.left.process(*sample * INPUT_GAIN, damp, feedback);

            let dry = self.dry_gain.next_value();
            let wet = self.wet_gain_1.next_value();
            self.wet_gain_2.next_value();
            *sample = output * wet + *sample * dry;
        }
    }

    fn apply_targets(&mut self, snap: bool) {
        let ReverbParameters {
            room_size,
            damping,
            wet_level,
            width,
        } = self.parameters;
        let wet = wet_level * WET_SCALE;
        let targets = [
            1.0 - wet_level,
            0.5 * wet * (1.0 + width),
            0.5 * wet * (1.0 - width),
            damping * DAMP_SCALE,
            room_size * ROOM_SCALE + ROOM_OFFSET,
        ];
        for (smoother, target) in self.smoothers_mut().into_iter().zip(targets) {
            if snap {
                smoother.set_current_and_target(target);
            } else {
                smoother.set_target(target);
            }
        }
    }

    fn smoothers_mut(&mut self) -> [&mut LinearSmoother; 5] {
        [
            &mut self.dry_gain,
            &mut self.wet_gain_1,
            &mut self.wet_gain_2,
            &mut self.damping,
            &mut self.feedback,
        ]
    }
}

impl Default for ReverbStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comb_is_silent_until_its_delay_elapses() {
        let mut comb = CombFilter::new(100);
        for _ in 0..100 {
            assert_eq!(comb.process(1.0, 0.2, 0.84), 0.0);
        }
        assert_eq!(comb.process(1.0, 0.2, 0.84), 1.0);
    }

    #[test]
    fn allpass_first_pass_inverts_input() {
        let mut allpass = AllpassFilter::new(50);
        for _ in 0..50 {
            assert_eq!(allpass.process(1.0), -1.0);
        }
        // buffered 1.0 minus input 1.0
        assert_eq!(allpass.process(1.0), 0.0);
    }

    #[test]
    fn delay_lengths_follow_sample_rate() {
        let channel = ReverbChannel::new(2.0, STEREO_SPREAD);
        assert_eq!(channel.combs[0].buffer.len(), (1116 + 23) * 2);
        assert_eq!(channel.allpasses[3].buffer.len(), (225 + 23) * 2);
    }

    #[test]
    fn decaying_comb_tail_is_flushed_to_zero() {
        let mut comb = CombFilter::new(4);
        comb.process(1.0, 0.0, 0.5);
        for _ in 0..4 * 200 {
            comb.process(0.0, 0.0, 0.5);
        }
        assert!(comb.buffer.iter().all(|s| *s == 0.0));
        assert_eq!(comb.last, 0.0);
    }

    #[test]
    fn decaying_allpass_tail_is_flushed_to_zero() {
        let mut allpass = AllpassFilter::new(3);
        allpass.process(1.0);
        for _ in 0..3 * 200 {
            allpass.process(0.0);
        }
        assert!(allpass.buffer.iter().all(|s| *s == 0.0));
    }
}
