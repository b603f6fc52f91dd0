use crate::audio::{AudioBackend, CpalBackend};
use crate::error::Result;
use crate::input::{KeyboardHandler, MidiHandler, MidiPortChoice};
use crate::synth::{
    AudioBlock, CycleDirection, EngineConfig, NoteEvent, ParamId, ParameterSnapshot, Preset,
    SynthEngine, VisualizationReader,
};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

const MAX_ENGINE_CHANNELS: usize = 2;
const MAX_PENDING_NOTES: usize = 256;
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const OBSERVER_INTERVAL: Duration = Duration::from_millis(33);

/// Control-state changes sent from the input side to the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    CycleWaveform { direction: CycleDirection },
    ApplyPreset(Preset),
    SetParameter { id: ParamId, value: f32 },
    AllNotesOff,
    TransportStop,
}

/// Native runtime synth for the cpal backend.
///
/// Owns the engine and the parameter snapshot; input threads talk to it only
/// through channels that are drained at the start of every callback.
pub struct NativeSynth {
    engine: SynthEngine,
    params: ParameterSnapshot,
    note_receiver: Receiver<NoteEvent>,
    control_receiver: Receiver<ControlEvent>,
    pending_notes: Vec<NoteEvent>,
    block: AudioBlock,
}

impl NativeSynth {
    pub fn new(
        engine: SynthEngine,
        note_receiver: Receiver<NoteEvent>,
        control_receiver: Receiver<ControlEvent>,
    ) -> Self {
        Self {
            engine,
            params: ParameterSnapshot::default(),
            note_receiver,
            control_receiver,
            pending_notes: Vec::with_capacity(MAX_PENDING_NOTES),
            block: AudioBlock::default(),
        }
    }

    /// Prepare for a device with `device_channels` interleaved channels.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        device_channels: usize,
    ) -> Result<()> {
        let channels = device_channels.clamp(1, MAX_ENGINE_CHANNELS);
        self.engine.prepare(sample_rate, max_block_size, channels)?;
        self.block = AudioBlock::with_capacity(channels, max_block_size);
        Ok(())
    }

    pub fn params(&self) -> &ParameterSnapshot {
        &self.params
    }

    /// Fill an interleaved device buffer.
    pub fn process(&mut self, output: &mut [f32], output_channels: usize) {
        self.process_control_events();
        self.process_note_events();

        let Some(spec) = self.engine.process_spec() else {
            output.fill(0.0);
            return;
        };
        let output_channels = output_channels.max(1);
        let frames_per_chunk = spec.max_block_size;

        // Queued notes start at the top of the callback.
        let mut events: &[NoteEvent] = &self.pending_notes;
        for chunk in output.chunks_mut(frames_per_chunk * output_channels) {
            let frames = chunk.len() / output_channels;
            self.block.set_size(spec.num_channels, frames);
            self.engine.render_block(events, &self.params, &mut self.block);
            self.block.write_interleaved(chunk, output_channels);
            events = &[];
        }
        self.pending_notes.clear();
    }

    fn process_note_events(&mut self) {
        while self.pending_notes.len() < MAX_PENDING_NOTES {
            match self.note_receiver.try_recv() {
                Ok(event) => self.pending_notes.push(event.with_offset(0)),
                Err(_) => break,
            }
        }
    }

    fn process_control_events(&mut self) {
        while let Ok(event) = self.control_receiver.try_recv() {
            self.apply_control_event(event);
        }
    }

    fn apply_control_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::CycleWaveform { direction } => {
                self.params.waveform = self.params.waveform.cycled(direction);
            }
            ControlEvent::ApplyPreset(preset) => preset.apply(&mut self.params),
            ControlEvent::SetParameter { id, value } => self.params.set(id, value),
            ControlEvent::AllNotesOff => self.engine.all_notes_off(true),
            ControlEvent::TransportStop => self.engine.transport_stop(),
        }
    }
}

/// Poll the visualization reader at display rate and log the output level.
fn spawn_level_observer(mut reader: VisualizationReader) -> std::io::Result<()> {
    thread::Builder::new()
        .name("level-observer".into())
        .spawn(move || {
            let mut block = AudioBlock::default();
            loop {
                if reader.read_into(&mut block) && !block.is_empty() {
                    let (peak, sum_squares) = (0..block.num_channels())
                        .flat_map(|channel| block.channel(channel).iter())
                        .fold((0.0f32, 0.0f32), |(peak, sum), sample| {
                            (peak.max(sample.abs()), sum + sample * sample)
                        });
                    let count = (block.num_channels() * block.num_samples()) as f32;
                    let rms = (sum_squares / count).sqrt();
                    if peak > 0.0 {
                        tracing::debug!(peak, rms, "output level");
                    }
                }
                thread::sleep(OBSERVER_INTERVAL);
            }
        })?;
    Ok(())
}

/// Device and port choices for the desktop host.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    /// Substring of the output device name; prompts when absent.
    pub output_device: Option<String>,
    pub midi_port: MidiPortChoice,
}

/// Run the desktop synth until the process is killed.
pub fn start(config: EngineConfig, options: HostOptions) -> Result<()> {
    let (note_tx, note_rx) = channel();
    let (control_tx, control_rx) = channel();

    let mut engine = SynthEngine::new(config)?;
    let reader = engine.take_visualization_reader();
    let synth = NativeSynth::new(engine, note_rx, control_rx);

    let mut audio_backend = CpalBackend::new(synth, options.output_device);
    audio_backend.start()?;

    if let Some(reader) = reader {
        spawn_level_observer(reader)?;
    }

    let mut keyboard_handler = KeyboardHandler::new(note_tx.clone(), control_tx);
    let mut midi_handler = MidiHandler::new(note_tx, options.midi_port);

    tracing::info!("Synth running: play with A-L / W-O, ',' '.' cycle waveform, 1-4 select preset");
    loop {
        keyboard_handler.update();
        midi_handler.update();
        thread::sleep(INPUT_POLL_INTERVAL);
    }
}
