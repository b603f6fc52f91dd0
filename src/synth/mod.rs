pub mod buffer;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod note;
pub mod oscillator;
pub mod params;
pub mod prelude;
pub mod reverb;
pub mod saturation;
pub mod smoothing;
pub mod visualization;
pub mod voice;
pub mod voice_pool;
pub mod waveform;

pub use buffer::AudioBlock;
pub use config::EngineConfig;
pub use engine::{ProcessSpec, SynthEngine};
pub use note::{NoteEvent, NoteEventKind};
pub use params::{ParamId, ParameterSnapshot, Preset};
pub use visualization::{visualization_buffer, VisualizationReader, VisualizationWriter};
pub use waveform::{CycleDirection, Waveform};
