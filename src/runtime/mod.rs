pub mod native;
pub mod prompt;
pub use native::{start, ControlEvent, HostOptions, NativeSynth};
