use crate::synth::prelude::{PI, TAU};
use crate::synth::saturation::SaturationStage;
use serde::{Deserialize, Serialize};

/// Oscillator shapes. Closed set; each variant maps to a pure function of phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

impl Waveform {
    pub const ALL: [Waveform; 3] = [Waveform::Sine, Waveform::Saw, Waveform::Square];

    /// Evaluate the shape at `phase` in radians, expected in [0, 2π).
    #[inline]
    pub fn evaluate(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Saw => phase / PI - 1.0,
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Selector index as stored in the WAVE parameter.
    pub fn index(self) -> usize {
        match self {
            Waveform::Sine => 0,
            Waveform::Saw => 1,
            Waveform::Square => 2,
        }
    }

    /// Map a (possibly fractional) selector value back to a waveform.
    /// Out-of-range values clamp to the nearest shape.
    pub fn from_index(value: f32) -> Self {
        if value.is_nan() {
            return Waveform::Sine;
        }
        match value.round().clamp(0.0, 2.0) as usize {
            0 => Waveform::Sine,
            1 => Waveform::Saw,
            _ => Waveform::Square,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Saw => "Saw",
            Waveform::Square => "Square",
        }
    }

    pub fn cycled(self, direction: CycleDirection) -> Self {
        match (self, direction) {
            (Waveform::Sine, CycleDirection::Forward) => Waveform::Saw,
            (Waveform::Saw, CycleDirection::Forward) => Waveform::Square,
            (Waveform::Square, CycleDirection::Forward) => Waveform::Sine,
            (Waveform::Sine, CycleDirection::Backward) => Waveform::Square,
            (Waveform::Saw, CycleDirection::Backward) => Waveform::Sine,
            (Waveform::Square, CycleDirection::Backward) => Waveform::Saw,
        }
    }
}

/// Fill `output` with one cycle of `waveform` shaped by the saturation
/// transfer curve at `saturation_intensity`.
///
/// This is the data behind a static waveform display: the first point is
/// phase 0 and the last point is phase 2π.
pub fn preview_cycle(waveform: Waveform, saturation_intensity: f32, output: &mut [f32]) {
    let points = output.len();
    if points == 0 {
        return;
    }
    let mut saturation = SaturationStage::new();
    saturation.set_intensity(saturation_intensity);
    let denominator = (points.max(2) - 1) as f32;

    for (i, sample) in output.iter_mut().enumerate() {
        // Keep the final point inside [0, 2π) so Saw ends at its peak.
        let phase = (i as f32 / denominator * TAU).min(TAU - f32::EPSILON);
        *sample = saturation.shape_sample(waveform.evaluate(phase));
    }
}
