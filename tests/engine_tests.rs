use approx::assert_abs_diff_eq;
use cantinasynth::synth::{
    AudioBlock, EngineConfig, NoteEvent, ParameterSnapshot, Preset, SynthEngine,
};
use std::f64::consts::TAU;

const SAMPLE_RATE: f32 = 44_100.0;
const BLOCK: usize = 512;

fn prepared_engine() -> SynthEngine {
    let mut engine = SynthEngine::default();
    engine.prepare(SAMPLE_RATE, BLOCK, 2).unwrap();
    engine
}

/// Default patch with reverb and saturation switched off.
fn dry_params() -> ParameterSnapshot {
    ParameterSnapshot {
        reverb_wet_level: 0.0,
        saturation_intensity: 0.0,
        ..ParameterSnapshot::default()
    }
}

#[test]
fn single_note_matches_reference_tone() {
    let mut engine = prepared_engine();
    let params = dry_params();
    let mut block = AudioBlock::new(2, BLOCK);
    let mut rendered = Vec::new();

    for index in 0..3 {
        let events = if index == 0 {
            vec![NoteEvent::note_on(69, 1.0)]
        } else {
            Vec::new()
        };
        engine.render_block(&events, &params, &mut block);
        assert_eq!(block.channel(0), block.channel(1));
        rendered.extend_from_slice(block.channel(0));
    }

    // Attack of 0.1 s rises by 1/4410 per sample, starting at one step.
    let attack_samples = 0.1 * SAMPLE_RATE as f64;
    for (n, sample) in rendered.iter().enumerate() {
        let envelope = (n + 1) as f64 / attack_samples;
        let expected = 0.15 * envelope * (TAU * 440.0 * n as f64 / SAMPLE_RATE as f64).sin();
        assert_abs_diff_eq!(*sample as f64, expected, epsilon = 1e-4);
    }
    assert_eq!(engine.active_voice_count(), 1);
}

#[test]
fn note_off_without_tail_silences_within_the_block() {
    let mut engine = prepared_engine();
    let params = dry_params();
    let mut block = AudioBlock::new(2, BLOCK);

    engine.render_block(&[NoteEvent::note_on(60, 1.0)], &params, &mut block);
    assert!(block.channel(0).iter().any(|s| *s != 0.0));

    engine.render_block(&[NoteEvent::note_off(60, false)], &params, &mut block);
    assert_eq!(engine.active_voice_count(), 0);
    assert!(block.channel(0).iter().all(|s| *s == 0.0));
    assert!(block.channel(1).iter().all(|s| *s == 0.0));
}

#[test]
fn note_on_and_off_in_one_block_never_sounds() {
    let mut engine = prepared_engine();
    let mut block = AudioBlock::new(2, BLOCK);
    let events = [NoteEvent::note_on(64, 0.8), NoteEvent::note_off(64, false)];

    engine.render_block(&events, &dry_params(), &mut block);

    assert_eq!(engine.active_voice_count(), 0);
    assert!(block.channel(0).iter().all(|s| *s == 0.0));
}

#[test]
fn release_tail_rings_then_voice_returns_to_idle() {
    let mut engine = prepared_engine();
    let params = dry_params();
    let mut block = AudioBlock::new(2, BLOCK);

    engine.render_block(&[NoteEvent::note_on(60, 1.0)], &params, &mut block);
    engine.render_block(&[NoteEvent::note_off(60, true)], &params, &mut block);
    assert_eq!(engine.active_voice_count(), 1);
    assert!(block.channel(0).iter().any(|s| *s != 0.0));

    // Default release is 0.4 s.
    let blocks = (0.4 * SAMPLE_RATE) as usize / BLOCK + 2;
    for _ in 0..blocks {
        engine.render_block(&[], &params, &mut block);
    }
    assert_eq!(engine.active_voice_count(), 0);
}

#[test]
fn events_are_sample_accurate() {
    let mut engine = prepared_engine();
    let mut block = AudioBlock::new(2, BLOCK);
    let events = [NoteEvent::note_on(69, 1.0).with_offset(100)];

    engine.render_block(&events, &dry_params(), &mut block);

    let left = block.channel(0);
    assert!(left[..=100].iter().all(|s| *s == 0.0));
    assert!(left[101] > 0.0);
}

#[test]
fn late_events_apply_at_the_block_end() {
    let mut engine = prepared_engine();
    let mut block = AudioBlock::new(2, BLOCK);
    let events = [NoteEvent::note_on(69, 1.0).with_offset(10 * BLOCK)];

    engine.render_block(&events, &dry_params(), &mut block);

    assert!(block.channel(0).iter().all(|s| *s == 0.0));
    assert_eq!(engine.active_voice_count(), 1);
}

#[test]
fn exhausted_pool_drops_notes() {
    let config = EngineConfig {
        max_voices: 4,
        ..EngineConfig::default()
    };
    let mut engine = SynthEngine::new(config).unwrap();
    engine.prepare(SAMPLE_RATE, BLOCK, 2).unwrap();
    let events: Vec<NoteEvent> = (60..66).map(|note| NoteEvent::note_on(note, 1.0)).collect();
    let mut block = AudioBlock::new(2, BLOCK);

    engine.render_block(&events, &dry_params(), &mut block);

    assert_eq!(engine.active_voice_count(), 4);
    assert_eq!(engine.dropped_note_count(), 2);
}

#[test]
fn pitch_offset_glides_on_a_held_note() {
    let mut engine = prepared_engine();
    let mut params = dry_params();
    let mut block = AudioBlock::new(2, BLOCK);
    engine.render_block(&[NoteEvent::note_on(69, 1.0)], &params, &mut block);

    params.pitch_offset_semitones = 12.0;
    engine.render_block(&[], &params, &mut block);
    let frequency = engine.voices().voices()[0].frequency();
    assert!(frequency > 440.0 && frequency < 880.0, "{frequency}");

    // The 0.05 s ramp is over after a few more blocks.
    for _ in 0..4 {
        engine.render_block(&[], &params, &mut block);
    }
    assert_abs_diff_eq!(engine.voices().voices()[0].frequency(), 880.0, epsilon = 1e-2);
}

#[test]
fn transport_stop_clears_voices_and_tails() {
    let mut engine = prepared_engine();
    let params = ParameterSnapshot {
        reverb_wet_level: 1.0,
        reverb_room_size: 1.0,
        ..ParameterSnapshot::default()
    };
    let mut block = AudioBlock::new(2, BLOCK);
    for note in [60, 64, 67] {
        engine.render_block(&[NoteEvent::note_on(note, 1.0)], &params, &mut block);
    }

    engine.transport_stop();
    engine.render_block(&[], &params, &mut block);

    assert_eq!(engine.active_voice_count(), 0);
    assert!(block.channel(0).iter().all(|s| *s == 0.0));
    assert!(block.channel(1).iter().all(|s| *s == 0.0));
}

#[test]
fn preparing_again_clears_filter_and_reverb_state() {
    let mut engine = prepared_engine();
    let params = ParameterSnapshot {
        reverb_wet_level: 1.0,
        reverb_room_size: 1.0,
        filter_cutoff_hz: 300.0,
        ..ParameterSnapshot::default()
    };
    let mut block = AudioBlock::new(2, BLOCK);
    engine.render_block(&[NoteEvent::note_on(48, 1.0)], &params, &mut block);
    engine.render_block(&[NoteEvent::note_off(48, true)], &params, &mut block);
    assert!(block.channel(0).iter().any(|s| *s != 0.0));

    engine.prepare(48_000.0, 256, 2).unwrap();
    let mut silence = AudioBlock::new(2, 256);
    for _ in 0..4 {
        engine.render_block(&[], &params, &mut silence);
        assert!(silence.channel(0).iter().all(|s| *s == 0.0));
        assert!(silence.channel(1).iter().all(|s| *s == 0.0));
    }
    assert_eq!(engine.active_voice_count(), 0);
}

#[test]
fn every_preset_renders_finite_audio() {
    for preset in Preset::ALL {
        let mut engine = prepared_engine();
        let mut params = ParameterSnapshot::default();
        preset.apply(&mut params);
        let mut block = AudioBlock::new(2, BLOCK);

        engine.render_block(&[NoteEvent::note_on(57, 0.9)], &params, &mut block);
        for _ in 0..8 {
            engine.render_block(&[], &params, &mut block);
        }
        for channel in 0..2 {
            assert!(
                block.channel(channel).iter().all(|s| s.is_finite() && s.abs() <= 1.0),
                "{} produced invalid output",
                preset.name()
            );
        }
    }
}

#[test]
fn mono_preparation_renders_one_channel() {
    let mut engine = SynthEngine::default();
    engine.prepare(48_000.0, 128, 1).unwrap();
    let mut block = AudioBlock::new(1, 128);

    engine.render_block(&[NoteEvent::note_on(72, 1.0)], &ParameterSnapshot::default(), &mut block);

    assert!(block.channel(0).iter().any(|s| *s != 0.0));
}

#[test]
fn visualization_sees_the_rendered_block() {
    let mut engine = prepared_engine();
    let mut reader = engine.take_visualization_reader().unwrap();
    assert!(reader.read().is_empty());

    let mut block = AudioBlock::new(2, BLOCK);
    engine.render_block(&[NoteEvent::note_on(69, 1.0)], &dry_params(), &mut block);

    assert_eq!(reader.read(), block);
    assert_eq!(engine.dropped_visualization_frames(), 0);
}
