use super::buffer::AudioBlock;
use super::config::EngineConfig;
use super::envelope::EnvelopeGenerator;
use super::oscillator::Oscillator;
use super::params::ParameterSnapshot;
use super::prelude::midi_note_to_hz;
use super::smoothing::LinearSmoother;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Sounding,
    Releasing,
}

/// One independently sounding note: oscillator, amplitude envelope and a
/// frequency ramp.
///
/// Voices are created once by the pool and recycled; `prepare` sizes the
/// scratch buffer so rendering never allocates.
pub struct Voice {
    state: VoiceState,
    note_number: Option<u8>,
    velocity_level: f32,
    voice_gain: f32,
    oscillator: Oscillator,
    envelope: EnvelopeGenerator,
    frequency: LinearSmoother,
    scratch: Vec<f32>,
    pitch_ramp_seconds: f32,
    crossfade_seconds: f32,
}

impl Voice {
    /// Creates a new, idle voice.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: VoiceState::Idle,
            note_number: None,
            velocity_level: 0.0,
            voice_gain: config.voice_gain,
            oscillator: Oscillator::new(),
            envelope: EnvelopeGenerator::new(),
            frequency: LinearSmoother::new(0.0),
            scratch: Vec::new(),
            pitch_ramp_seconds: config.pitch_ramp_seconds,
            crossfade_seconds: config.waveform_crossfade_seconds,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.scratch.clear();
        self.scratch.resize(max_block_size, 0.0);
        self.envelope.set_sample_rate(sample_rate);
        self.oscillator.prepare(sample_rate, self.crossfade_seconds);
        self.frequency.reset(sample_rate, self.pitch_ramp_seconds);
        self.clear_note();
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn current_note(&self) -> Option<u8> {
        self.note_number
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn velocity_level(&self) -> f32 {
        self.velocity_level
    }

    /// Current (smoothed) oscillator frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency.current()
    }

    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }

    /// Idle -> Sounding. Velocity is in [0, 1].
    pub fn start_note(&mut self, note_number: u8, velocity: f32, params: &ParameterSnapshot) {
        let velocity = if velocity.is_nan() {
            0.0
        } else {
            velocity.clamp(0.0, 1.0)
        };

        self.envelope.reset();
        self.envelope.set_parameters(params.adsr());
        self.oscillator.set_waveform_immediate(params.waveform);
        self.oscillator.reset_phase();
        // Nothing is sounding yet, so there is no previous pitch to glide
        // from. The envelope restarts at 0, so the jump is inaudible.
        self.frequency.set_current_and_target(target_frequency(note_number, params));

        self.note_number = Some(note_number);
        self.velocity_level = velocity * self.voice_gain;
        self.state = VoiceState::Sounding;
        self.envelope.note_on();
    }

    /// Sounding -> Releasing, or straight to Idle when the tail is not
    /// allowed or there is nothing left to release.
    pub fn stop_note(&mut self, allow_tail_off: bool) {
        if self.state == VoiceState::Idle {
            return;
        }
        if !allow_tail_off {
            self.clear_note();
            return;
        }
        self.envelope.note_off();
        if self.envelope.is_active() {
            self.state = VoiceState::Releasing;
        } else {
            self.clear_note();
        }
    }

    /// Render `num_samples` into `output` starting at `start_sample`, mixing
    /// into every channel. Returns to Idle once the envelope has finished.
    pub fn render(
        &mut self,
        params: &ParameterSnapshot,
        output: &mut AudioBlock,
        start_sample: usize,
        num_samples: usize,
    ) {
        if self.state == VoiceState::Idle || num_samples == 0 {
            return;
        }
        let Some(note_number) = self.note_number else {
            self.clear_note();
            return;
        };

        // Automation lands on sustained notes without a retrigger.
        self.envelope.set_parameters(params.adsr());
        self.oscillator.set_waveform(params.waveform);
        self.frequency.set_target(target_frequency(note_number, params));

        let num_samples = num_samples.min(self.scratch.len());
        let scratch = &mut self.scratch[..num_samples];
        let mut rendered = 0;
        for sample in scratch.iter_mut() {
            let frequency = self.frequency.next_value();
            let raw = self.oscillator.next_sample(frequency);
            *sample = raw * self.envelope.next_sample();
            rendered += 1;
            if !self.envelope.is_active() {
                break;
            }
        }
        scratch[rendered..].fill(0.0);

        output.add_to_all_channels(start_sample, scratch, self.velocity_level);

        if !self.envelope.is_active() {
            self.clear_note();
        }
    }

    /// Fully resets the voice to Idle.
    fn clear_note(&mut self) {
        self.state = VoiceState::Idle;
        self.note_number = None;
        self.velocity_level = 0.0;
        self.envelope.reset();
    }
}

fn target_frequency(note_number: u8, params: &ParameterSnapshot) -> f32 {
    midi_note_to_hz(note_number as f32 + params.pitch_offset_semitones)
}
