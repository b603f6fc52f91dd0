//! Control values read by the render path.
//!
//! A [`ParameterSnapshot`] is a plain value: the control-state owner builds
//! one, the engine reads it once per block and once per note-on. Presets
//! rewrite a snapshot in one call instead of notifying listeners.

use super::envelope::AdsrParameters;
use super::reverb::ReverbParameters;
use super::waveform::Waveform;
use serde::{Deserialize, Serialize};

/// Parameter identifiers with their ranges and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamId {
    Wave,
    Attack,
    Decay,
    Sustain,
    Release,
    Pitch,
    FilterFreq,
    BassGain,
    ReverbRoomSize,
    ReverbWetLevel,
    ReverbDamping,
    ReverbWidth,
    SaturationAmount,
}

impl ParamId {
    pub const ALL: [ParamId; 13] = [
        ParamId::Wave,
        ParamId::Attack,
        ParamId::Decay,
        ParamId::Sustain,
        ParamId::Release,
        ParamId::Pitch,
        ParamId::FilterFreq,
        ParamId::BassGain,
        ParamId::ReverbRoomSize,
        ParamId::ReverbWetLevel,
        ParamId::ReverbDamping,
        ParamId::ReverbWidth,
        ParamId::SaturationAmount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamId::Wave => "WAVE",
            ParamId::Attack => "ATTACK",
            ParamId::Decay => "DECAY",
            ParamId::Sustain => "SUSTAIN",
            ParamId::Release => "RELEASE",
            ParamId::Pitch => "PITCH",
            ParamId::FilterFreq => "FILTER_FREQ",
            ParamId::BassGain => "BASS_GAIN",
            ParamId::ReverbRoomSize => "REVERB_ROOM_SIZE",
            ParamId::ReverbWetLevel => "REVERB_WET_LEVEL",
            ParamId::ReverbDamping => "REVERB_DAMPING",
            ParamId::ReverbWidth => "REVERB_WIDTH",
            ParamId::SaturationAmount => "SATURATION_AMOUNT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Inclusive (min, max).
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::Wave => (0.0, 2.0),
            ParamId::Attack | ParamId::Decay => (0.01, 1.0),
            ParamId::Release => (0.01, 3.0),
            ParamId::Pitch => (-12.0, 12.0),
            ParamId::FilterFreq => (20.0, 20_000.0),
            ParamId::BassGain => (-24.0, 24.0),
            ParamId::Sustain
            | ParamId::ReverbRoomSize
            | ParamId::ReverbWetLevel
            | ParamId::ReverbDamping
            | ParamId::ReverbWidth
            | ParamId::SaturationAmount => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParamId::Wave => 0.0,
            ParamId::Attack => 0.1,
            ParamId::Decay => 0.2,
            ParamId::Sustain => 0.8,
            ParamId::Release => 0.4,
            ParamId::Pitch => 0.0,
            ParamId::FilterFreq => 20_000.0,
            ParamId::BassGain => 0.0,
            ParamId::ReverbRoomSize => 0.5,
            ParamId::ReverbWetLevel => 0.33,
            ParamId::ReverbDamping => 0.5,
            ParamId::ReverbWidth => 1.0,
            ParamId::SaturationAmount => 0.0,
        }
    }

    /// Clamp into range; NaN falls back to the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

/// Read-only view of every control value at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub waveform: Waveform,
    pub attack_seconds: f32,
    pub decay_seconds: f32,
    pub sustain_level: f32,
    pub release_seconds: f32,
    pub pitch_offset_semitones: f32,
    pub filter_cutoff_hz: f32,
    pub bass_gain_db: f32,
    pub reverb_room_size: f32,
    pub reverb_wet_level: f32,
    pub reverb_damping: f32,
    pub reverb_width: f32,
    pub saturation_intensity: f32,
}

impl ParameterSnapshot {
    /// Copy with every value clamped into its documented range.
    pub fn clamped(&self) -> Self {
        let mut clamped = *self;
        for id in ParamId::ALL {
            clamped.set(id, self.get(id));
        }
        clamped
    }

    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::Wave => self.waveform.index() as f32,
            ParamId::Attack => self.attack_seconds,
            ParamId::Decay => self.decay_seconds,
            ParamId::Sustain => self.sustain_level,
            ParamId::Release => self.release_seconds,
            ParamId::Pitch => self.pitch_offset_semitones,
            ParamId::FilterFreq => self.filter_cutoff_hz,
            ParamId::BassGain => self.bass_gain_db,
            ParamId::ReverbRoomSize => self.reverb_room_size,
            ParamId::ReverbWetLevel => self.reverb_wet_level,
            ParamId::ReverbDamping => self.reverb_damping,
            ParamId::ReverbWidth => self.reverb_width,
            ParamId::SaturationAmount => self.saturation_intensity,
        }
    }

    /// Set one value, clamped into range.
    pub fn set(&mut self, id: ParamId, value: f32) {
        let value = id.clamp(value);
        match id {
            ParamId::Wave => self.waveform = Waveform::from_index(value),
            ParamId::Attack => self.attack_seconds = value,
            ParamId::Decay => self.decay_seconds = value,
            ParamId::Sustain => self.sustain_level = value,
            ParamId::Release => self.release_seconds = value,
            ParamId::Pitch => self.pitch_offset_semitones = value,
            ParamId::FilterFreq => self.filter_cutoff_hz = value,
            ParamId::BassGain => self.bass_gain_db = value,
            ParamId::ReverbRoomSize => self.reverb_room_size = value,
            ParamId::ReverbWetLevel => self.reverb_wet_level = value,
            ParamId::ReverbDamping => self.reverb_damping = value,
            ParamId::ReverbWidth => self.reverb_width = value,
            ParamId::SaturationAmount => self.saturation_intensity = value,
        }
    }

    pub fn adsr(&self) -> AdsrParameters {
        AdsrParameters {
            attack: self.attack_seconds,
            decay: self.decay_seconds,
            sustain: self.sustain_level,
            release: self.release_seconds,
        }
    }

    pub fn reverb(&self) -> ReverbParameters {
        ReverbParameters {
            room_size: self.reverb_room_size,
            damping: self.reverb_damping,
            wet_level: self.reverb_wet_level,
            width: self.reverb_width,
        }
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        let mut snapshot = Self {
            waveform: Waveform::Sine,
            attack_seconds: 0.0,
            decay_seconds: 0.0,
            sustain_level: 0.0,
            release_seconds: 0.0,
            pitch_offset_semitones: 0.0,
            filter_cutoff_hz: 0.0,
            bass_gain_db: 0.0,
            reverb_room_size: 0.0,
            reverb_wet_level: 0.0,
            reverb_damping: 0.0,
            reverb_width: 0.0,
            saturation_intensity: 0.0,
        };
        for id in ParamId::ALL {
            snapshot.set(id, id.default_value());
        }
        snapshot
    }
}

/// Factory sound bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    KlooHorn,
    Fanfar,
    GasanStringDrum,
    OmmniBox,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::KlooHorn,
        Preset::Fanfar,
        Preset::GasanStringDrum,
        Preset::OmmniBox,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::KlooHorn => "Kloo Horn (Flute)",
            Preset::Fanfar => "Fanfar (Steel Drum)",
            Preset::GasanStringDrum => "Gasan String-drum",
            Preset::OmmniBox => "Ommni Box (Clarinet)",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    // (wave, attack, decay, sustain, release, filter cutoff, bass gain)
    fn values(self) -> (Waveform, f32, f32, f32, f32, f32, f32) {
        match self {
            Preset::KlooHorn => (Waveform::Sine, 0.08, 0.3, 0.8, 0.4, 8000.0, -6.0),
            Preset::Fanfar => (Waveform::Sine, 0.01, 0.5, 0.0, 0.3, 12_000.0, 0.0),
            Preset::GasanStringDrum => (Waveform::Saw, 0.02, 0.6, 0.5, 0.8, 6500.0, 3.0),
            Preset::OmmniBox => (Waveform::Square, 0.12, 0.1, 1.0, 0.2, 4000.0, -2.0),
        }
    }

    /// Overwrite the voice and tone values of `snapshot`. Pitch, reverb and
    /// saturation are left as they are.
    pub fn apply(self, snapshot: &mut ParameterSnapshot) {
        let (waveform, attack, decay, sustain, release, cutoff, bass) = self.values();
        snapshot.waveform = waveform;
        snapshot.set(ParamId::Attack, attack);
        snapshot.set(ParamId::Decay, decay);
        snapshot.set(ParamId::Sustain, sustain);
        snapshot.set(ParamId::Release, release);
        snapshot.set(ParamId::FilterFreq, cutoff);
        snapshot.set(ParamId::BassGain, bass);
    }
}
