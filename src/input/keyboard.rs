use crate::runtime::ControlEvent;
use crate::synth::{CycleDirection, NoteEvent, Preset};
use device_query::{DeviceQuery, DeviceState, Keycode};
use std::collections::HashMap;
use std::sync::mpsc::Sender;

const KEYBOARD_VELOCITY: u8 = 100;

/// Computer keyboard as a one-and-a-half octave piano plus a few control keys.
pub struct KeyboardHandler {
    device_state: DeviceState,
    key_states: HashMap<Keycode, bool>,
    key_to_note: HashMap<Keycode, u8>,
    control_keys: HashMap<Keycode, bool>,
    note_sender: Sender<NoteEvent>,
    control_sender: Sender<ControlEvent>,
}

impl KeyboardHandler {
    pub fn new(note_sender: Sender<NoteEvent>, control_sender: Sender<ControlEvent>) -> Self {
        let key_to_note: HashMap<Keycode, u8> = [
            // Bottom row: naturals A3..C5
            (Keycode::A, 57),
            (Keycode::S, 59),
            (Keycode::D, 60),
            (Keycode::F, 62),
            (Keycode::G, 64),
            (Keycode::H, 65),
            (Keycode::J, 67),
            (Keycode::K, 69),
            (Keycode::L, 71),
            (Keycode::Semicolon, 72),
            // Top row: sharps
            (Keycode::W, 58),
            (Keycode::R, 61),
            (Keycode::T, 63),
            (Keycode::U, 66),
            (Keycode::I, 68),
            (Keycode::O, 70),
            (Keycode::LeftBracket, 73),
        ]
        .into_iter()
        .collect();

        let key_states = key_to_note.keys().map(|key| (*key, false)).collect();
        let control_keys = Self::control_key_list()
            .into_iter()
            .map(|key| (key, false))
            .collect();

        Self {
            device_state: DeviceState::new(),
            key_states,
            key_to_note,
            control_keys,
            note_sender,
            control_sender,
        }
    }

    fn control_key_list() -> [Keycode; 8] {
        [
            Keycode::Comma,
            Keycode::Dot,
            Keycode::Key1,
            Keycode::Key2,
            Keycode::Key3,
            Keycode::Key4,
            Keycode::Space,
            Keycode::Escape,
        ]
    }

    pub fn update(&mut self) {
        let keys: Vec<Keycode> = self.device_state.get_keys();

        for (key, note) in &self.key_to_note {
            let is_pressed = keys.contains(key);
            let was_pressed = self.key_states.get(key).copied().unwrap_or(false);
            if is_pressed == was_pressed {
                continue;
            }
            tracing::debug!(?key, note, pressed = is_pressed, "Note key");
            let velocity = if is_pressed { KEYBOARD_VELOCITY } else { 0 };
            if let Ok(event) = NoteEvent::new(*note, velocity, is_pressed) {
                if let Err(e) = self.note_sender.send(event) {
                    tracing::warn!("Error sending note event: {}", e);
                }
            }
            self.key_states.insert(*key, is_pressed);
        }

        for key in Self::control_key_list() {
            let is_pressed = keys.contains(&key);
            let was_pressed = self.control_keys.get(&key).copied().unwrap_or(false);
            if is_pressed && !was_pressed {
                if let Some(event) = Self::control_event_for(key) {
                    tracing::info!(?event, "Control key");
                    if let Err(e) = self.control_sender.send(event) {
                        tracing::warn!("Error sending control event: {}", e);
                    }
                }
            }
            self.control_keys.insert(key, is_pressed);
        }
    }

    fn control_event_for(key: Keycode) -> Option<ControlEvent> {
        let preset = |index| Preset::from_index(index).map(ControlEvent::ApplyPreset);
        match key {
            Keycode::Comma => Some(ControlEvent::CycleWaveform {
                direction: CycleDirection::Backward,
            }),
            Keycode::Dot => Some(ControlEvent::CycleWaveform {
                direction: CycleDirection::Forward,
            }),
            Keycode::Key1 => preset(0),
            Keycode::Key2 => preset(1),
            Keycode::Key3 => preset(2),
            Keycode::Key4 => preset(3),
            Keycode::Space => Some(ControlEvent::AllNotesOff),
            Keycode::Escape => Some(ControlEvent::TransportStop),
            _ => None,
        }
    }
}
