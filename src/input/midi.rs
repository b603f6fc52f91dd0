use crate::error::{Error, Result};
use crate::runtime::prompt::prompt_choice;
use crate::synth::NoteEvent;
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use std::sync::mpsc::{self, Receiver, Sender};

fn midi_error(err: impl std::fmt::Display) -> Error {
    Error::Midi(err.to_string())
}

/// Which MIDI input to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MidiPortChoice {
    /// Ask on stdin.
    #[default]
    Prompt,
    /// 1-based port number as listed by the prompt.
    Index(usize),
    Disabled,
}

/// Forwards note messages from one MIDI input port to the audio thread.
pub struct MidiHandler {
    // Dropping the connection closes the port.
    _connection: Option<MidiInputConnection<()>>,
    raw_messages: Option<Receiver<Vec<u8>>>,
    note_sender: Sender<NoteEvent>,
}

impl MidiHandler {
    /// Open a MIDI input port. Without one the handler is inert.
    pub fn new(note_sender: Sender<NoteEvent>, choice: MidiPortChoice) -> Self {
        if choice == MidiPortChoice::Disabled {
            tracing::info!("MIDI input disabled");
            return Self::inert(note_sender);
        }
        match Self::connect(note_sender.clone(), choice) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!("MIDI input disabled: {}", e);
                Self::inert(note_sender)
            }
        }
    }

    fn inert(note_sender: Sender<NoteEvent>) -> Self {
        Self {
            _connection: None,
            raw_messages: None,
            note_sender,
        }
    }

    fn connect(note_sender: Sender<NoteEvent>, choice: MidiPortChoice) -> Result<Self> {
        let midi_in = MidiInput::new("cantinasynth input").map_err(midi_error)?;
        let port = Self::select_input_port(&midi_in, choice)?;
        let port_name = midi_in.port_name(&port).map_err(midi_error)?;

        let (raw_sender, raw_messages) = mpsc::channel();
        let connection = midi_in
            .connect(
                &port,
                "cantinasynth-read-input",
                move |_, message, _| {
                    let _ = raw_sender.send(message.to_vec());
                },
                (),
            )
            .map_err(midi_error)?;

        tracing::info!(port = %port_name, "MIDI input opened");
        Ok(Self {
            _connection: Some(connection),
            raw_messages: Some(raw_messages),
            note_sender,
        })
    }

    fn select_input_port(midi_in: &MidiInput, choice: MidiPortChoice) -> Result<MidiInputPort> {
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(midi_error("no MIDI input ports found"));
        }

        let index = match choice {
            MidiPortChoice::Index(number) => number.checked_sub(1),
            _ => {
                let names = ports
                    .iter()
                    .map(|port| midi_in.port_name(port).map_err(midi_error))
                    .collect::<Result<Vec<_>>>()?;
                prompt_choice("Available MIDI input ports", &names)?
            }
        };
        index
            .and_then(|i| ports.get(i))
            .cloned()
            .ok_or_else(|| midi_error("invalid MIDI port selection"))
    }

    /// Forward pending note messages; everything else is ignored.
    pub fn update(&mut self) {
        let Some(raw_messages) = &self.raw_messages else {
            return;
        };
        for event in raw_messages.try_iter().filter_map(|m| NoteEvent::from_midi(&m)) {
            if let Err(e) = self.note_sender.send(event) {
                tracing::warn!("Failed to send MIDI note event: {}", e);
            }
        }
    }
}
