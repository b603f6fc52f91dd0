use crate::error::{Error, Result};

const MAX_NOTE_NUMBER: u8 = 127;
const MAX_MIDI_VELOCITY: f32 = 127.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEventKind {
    /// Velocity in [0, 1].
    On { velocity: f32 },
    Off { allow_tail_off: bool },
}

/// A note-on or note-off, timestamped in samples from the start of the block
/// it is delivered with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub note_number: u8,
    pub kind: NoteEventKind,
    pub sample_offset: usize,
}

impl NoteEvent {
    /// Build an event from raw MIDI-style values.
    pub fn new(note_number: u8, velocity: u8, is_on: bool) -> Result<Self> {
        if note_number > MAX_NOTE_NUMBER {
            return Err(Error::InvalidNote(note_number));
        }
        let kind = if is_on {
            NoteEventKind::On {
                velocity: (velocity.min(127) as f32) / MAX_MIDI_VELOCITY,
            }
        } else {
            NoteEventKind::Off {
                allow_tail_off: true,
            }
        };
        Ok(Self {
            note_number,
            kind,
            sample_offset: 0,
        })
    }

    pub fn note_on(note_number: u8, velocity: f32) -> Self {
        Self {
            note_number,
            kind: NoteEventKind::On { velocity },
            sample_offset: 0,
        }
    }

    pub fn note_off(note_number: u8, allow_tail_off: bool) -> Self {
        Self {
            note_number,
            kind: NoteEventKind::Off { allow_tail_off },
            sample_offset: 0,
        }
    }

    pub fn with_offset(mut self, sample_offset: usize) -> Self {
        self.sample_offset = sample_offset;
        self
    }

    pub fn is_on(&self) -> bool {
        matches!(self.kind, NoteEventKind::On { .. })
    }

    /// Parse a channel voice message. Anything but note-on/note-off yields
    /// `None`; note-on with velocity 0 is a note-off.
    pub fn from_midi(message: &[u8]) -> Option<Self> {
        let [status, note, velocity, ..] = *message else {
            return None;
        };
        match status & 0xF0 {
            0x90 if velocity > 0 => Self::new(note, velocity, true).ok(),
            0x90 | 0x80 => Self::new(note, 0, false).ok(),
            _ => None,
        }
    }
}
