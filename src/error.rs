//! Error types for cantinasynth.
//!
//! Only setup paths return errors. The render path clamps, drops or
//! silences instead.

use thiserror::Error;

/// Result type alias for cantinasynth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the audio callback.
#[derive(Debug, Error)]
pub enum Error {
    /// Sample rate was zero, negative or not finite.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// Maximum block size was zero.
    #[error("invalid maximum block size: {0}")]
    InvalidBlockSize(usize),

    /// Only mono and stereo output are supported.
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannelCount(usize),

    /// MIDI note numbers are 0-127.
    #[error("invalid MIDI note number: {0}")]
    InvalidNote(u8),

    /// Engine configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Engine configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// I/O error (configuration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device or stream failure in the native host.
    #[error("audio backend error: {0}")]
    AudioBackend(String),

    /// MIDI port failure in the native host.
    #[error("MIDI error: {0}")]
    Midi(String),
}
