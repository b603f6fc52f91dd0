use super::prelude::TAU;
use super::waveform::Waveform;

const SHAPES: usize = Waveform::ALL.len();

/// Phase-accumulating oscillator over a [`Waveform`].
///
/// Changing the waveform keeps the phase and linearly crossfades from what
/// was sounding to the new shape over a short window, so a switch mid-note
/// never produces a hard step. What was sounding may itself be a mix when
/// the previous crossfade had not finished yet.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    /// Per-shape weights of the mix being faded out.
    fading_from: Option<[f32; SHAPES]>,
    crossfade_remaining: usize,
    crossfade_samples: usize,
    phase: f32,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self {
            waveform: Waveform::Sine,
            fading_from: None,
            crossfade_remaining: 0,
            crossfade_samples: 0,
            phase: 0.0,
            sample_rate: 44_100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, crossfade_seconds: f32) {
        self.sample_rate = sample_rate;
        self.crossfade_samples = (sample_rate * crossfade_seconds).round().max(0.0) as usize;
        self.fading_from = None;
        self.crossfade_remaining = 0;
        self.phase = 0.0;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Switch shape, crossfading from the current one. Phase is untouched.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        if waveform == self.waveform {
            return;
        }
        if self.crossfade_samples > 0 {
            self.fading_from = Some(self.mix_weights());
            self.crossfade_remaining = self.crossfade_samples;
        }
        self.waveform = waveform;
    }

    /// Weight of the faded-out mix for the next sample.
    #[inline]
    fn fade_weight(&self) -> f32 {
        self.crossfade_remaining as f32 / (self.crossfade_samples + 1) as f32
    }

    /// Per-shape weights of what the next sample would contain.
    fn mix_weights(&self) -> [f32; SHAPES] {
        let mut weights = [0.0; SHAPES];
        weights[self.waveform.index()] = 1.0;
        if let Some(from) = self.fading_from {
            let old_weight = self.fade_weight();
            for (weight, previous) in weights.iter_mut().zip(from) {
                *weight += (previous - *weight) * old_weight;
            }
        }
        weights
    }

    /// Switch shape with no crossfade, for a voice that is not sounding.
    pub fn set_waveform_immediate(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        self.fading_from = None;
        self.crossfade_remaining = 0;
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Produce the sample at the current phase, then advance by `frequency`.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32) -> f32 {
        let mut sample = self.waveform.evaluate(self.phase);

        if let Some(from) = self.fading_from {
            let previous: f32 = Waveform::ALL
                .iter()
                .zip(from)
                .filter(|(_, weight)| *weight != 0.0)
                .map(|(shape, weight)| shape.evaluate(self.phase) * weight)
                .sum();
            sample += (previous - sample) * self.fade_weight();
            self.crossfade_remaining -= 1;
            if self.crossfade_remaining == 0 {
                self.fading_from = None;
            }
        }

        self.phase += TAU * frequency / self.sample_rate;
        if self.phase >= TAU || self.phase < 0.0 {
            self.phase = self.phase.rem_euclid(TAU);
        }
        sample
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
