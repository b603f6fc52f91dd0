use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine-wide settings fixed at construction time.
///
/// Everything here is read outside the audio callback; per-block control
/// values live in [`ParameterSnapshot`](super::params::ParameterSnapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_voices: usize,
    /// Level multiplier applied to note velocity.
    pub voice_gain: f32,
    pub pitch_ramp_seconds: f32,
    pub filter_ramp_seconds: f32,
    pub waveform_crossfade_seconds: f32,
    pub low_shelf_frequency_hz: f32,
    pub low_shelf_q: f32,
    /// Samples between tone filter coefficient updates.
    pub filter_update_interval: usize,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_voices == 0 {
            return Err(Error::InvalidConfig("max_voices must be at least 1".into()));
        }
        if !(self.voice_gain.is_finite() && self.voice_gain >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "voice_gain must be a non-negative number, got {}",
                self.voice_gain
            )));
        }
        for (name, seconds) in [
            ("pitch_ramp_seconds", self.pitch_ramp_seconds),
            ("filter_ramp_seconds", self.filter_ramp_seconds),
            ("waveform_crossfade_seconds", self.waveform_crossfade_seconds),
        ] {
            if !(seconds.is_finite() && seconds >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {seconds}"
                )));
            }
        }
        if !(self.low_shelf_frequency_hz.is_finite() && self.low_shelf_frequency_hz > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "low_shelf_frequency_hz must be positive, got {}",
                self.low_shelf_frequency_hz
            )));
        }
        if !(self.low_shelf_q.is_finite() && self.low_shelf_q > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "low_shelf_q must be positive, got {}",
                self.low_shelf_q
            )));
        }
        if self.filter_update_interval == 0 {
            return Err(Error::InvalidConfig(
                "filter_update_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_voices: 8,
            voice_gain: 0.15,
            pitch_ramp_seconds: 0.05,
            filter_ramp_seconds: 0.05,
            waveform_crossfade_seconds: 0.005,
            low_shelf_frequency_hz: 150.0,
            low_shelf_q: 1.0,
            filter_update_interval: 32,
        }
    }
}
