use crate::synth::buffer::AudioBlock;
use crate::synth::prelude::lerp;

const MIN_DRIVE: f32 = 1.0;
const MAX_DRIVE: f32 = 5.0;
const MAX_BIT_DEPTH: f32 = 16.0;
const MIN_BIT_DEPTH: f32 = 4.0;

/// Drive into a tanh soft clipper followed by bit-depth reduction.
///
/// Stateless: every sample is shaped independently, per channel, in place.
#[derive(Debug, Clone)]
pub struct SaturationStage {
    intensity: f32,
    drive: f32,
    levels: f32,
}

impl SaturationStage {
    pub fn new() -> Self {
        Self {
            intensity: 0.0,
            drive: MIN_DRIVE,
            levels: MAX_BIT_DEPTH.exp2(),
        }
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        if intensity == self.intensity {
            return;
        }
        self.intensity = intensity;
        self.drive = lerp(MIN_DRIVE, MAX_DRIVE, intensity);
        self.levels = lerp(MAX_BIT_DEPTH, MIN_BIT_DEPTH, intensity).exp2();
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Shape one sample at the current intensity. Identity at intensity 0.
    #[inline]
    pub fn shape_sample(&self, sample: f32) -> f32 {
        if self.intensity == 0.0 {
            return sample;
        }
        let driven = (sample * self.drive).tanh();
        // tanh rounds to exactly 1.0 for large inputs; keep the top step in range.
        let step = ((driven * 0.5 + 0.5) * self.levels)
            .floor()
            .min(self.levels - 1.0);
        (step / self.levels - 0.5) * 2.0
    }

    pub fn process(&self, block: &mut AudioBlock) {
        if self.intensity == 0.0 {
            return;
        }
        for channel in 0..block.num_channels() {
            for sample in block.channel_mut(channel).iter_mut() {
                *sample = self.shape_sample(*sample);
            }
        }
    }
}

impl Default for SaturationStage {
    fn default() -> Self {
        Self::new()
    }
}
