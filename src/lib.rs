//! Polyphonic subtractive synthesizer with a fixed effects chain.
//!
//! The real-time core lives in [`synth`]: a fixed pool of voices feeds a
//! tone filter, a reverb and a saturation stage, and every rendered block is
//! handed to a visualization observer without blocking the audio thread.
//! The `native` feature adds a small cpal/midir host used by the demo binary.

pub mod error;
pub mod synth;

#[cfg(feature = "native")]
pub mod audio;
#[cfg(feature = "native")]
pub mod input;
#[cfg(feature = "native")]
pub mod runtime;

pub use error::{Error, Result};
