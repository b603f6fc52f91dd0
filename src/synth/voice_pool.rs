use super::buffer::AudioBlock;
use super::config::EngineConfig;
use super::params::ParameterSnapshot;
use super::voice::{Voice, VoiceState};

/// Fixed set of voices, allocated once and recycled.
///
/// Allocation takes the first Idle voice by index. When every voice is busy
/// the note is dropped and counted; nothing is stolen.
pub struct VoicePool {
    voices: Vec<Voice>,
    dropped_notes: u64,
}

impl VoicePool {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            voices: (0..config.max_voices).map(|_| Voice::new(config)).collect(),
            dropped_notes: 0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        for voice in self.voices.iter_mut() {
            voice.prepare(sample_rate, max_block_size);
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Start `note_number` on the first Idle voice and return its index, or
    /// `None` when the pool is exhausted.
    pub fn note_on(
        &mut self,
        note_number: u8,
        velocity: f32,
        params: &ParameterSnapshot,
    ) -> Option<usize> {
        // Keep at most one Sounding voice per note.
        for voice in self.voices.iter_mut() {
            if voice.state() == VoiceState::Sounding && voice.current_note() == Some(note_number)
            {
                voice.stop_note(true);
            }
        }

        match self.find_free_voice() {
            Some(index) => {
                self.voices[index].start_note(note_number, velocity, params);
                Some(index)
            }
            None => {
                self.dropped_notes += 1;
                None
            }
        }
    }

    /// Release every voice playing `note_number`. Without tail-off the
    /// voices (including ones already releasing) go straight to Idle.
    pub fn note_off(&mut self, note_number: u8, allow_tail_off: bool) {
        for voice in self.voices.iter_mut() {
            if voice.current_note() != Some(note_number) {
                continue;
            }
            match voice.state() {
                VoiceState::Sounding => voice.stop_note(allow_tail_off),
                VoiceState::Releasing if !allow_tail_off => voice.stop_note(false),
                _ => {}
            }
        }
    }

    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for voice in self.voices.iter_mut() {
            if voice.state() == VoiceState::Sounding || !allow_tail_off {
                voice.stop_note(allow_tail_off);
            }
        }
    }

    /// Mix every non-Idle voice into `output[start_sample..start_sample + num_samples]`.
    pub fn render_block(
        &mut self,
        params: &ParameterSnapshot,
        output: &mut AudioBlock,
        start_sample: usize,
        num_samples: usize,
    ) {
        for voice in self.voices.iter_mut().filter(|voice| !voice.is_idle()) {
            voice.render(params, output, start_sample, num_samples);
        }
    }

    /// Voices that are Sounding or Releasing.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| !voice.is_idle()).count()
    }

    pub fn dropped_notes(&self) -> u64 {
        self.dropped_notes
    }

    fn find_free_voice(&self) -> Option<usize> {
        self.voices.iter().position(Voice::is_idle)
    }
}
