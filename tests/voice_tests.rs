use cantinasynth::synth::envelope::{AdsrParameters, EnvelopeGenerator, EnvelopeStage};
use cantinasynth::synth::voice::{Voice, VoiceState};
use cantinasynth::synth::voice_pool::VoicePool;
use cantinasynth::synth::{AudioBlock, EngineConfig, ParameterSnapshot, Waveform};
use proptest::prelude::*;

const SAMPLE_RATE: f32 = 44_100.0;

fn pool(max_voices: usize) -> VoicePool {
    let config = EngineConfig {
        max_voices,
        ..EngineConfig::default()
    };
    let mut pool = VoicePool::new(&config);
    pool.prepare(SAMPLE_RATE, 256);
    pool
}

fn sounding_voices_for(pool: &VoicePool, note: u8) -> usize {
    pool.voices()
        .iter()
        .filter(|v| v.state() == VoiceState::Sounding && v.current_note() == Some(note))
        .count()
}

#[test]
fn note_on_takes_the_first_idle_voice() {
    let mut pool = pool(4);
    let params = ParameterSnapshot::default();

    assert_eq!(pool.note_on(60, 1.0, &params), Some(0));
    assert_eq!(pool.note_on(64, 1.0, &params), Some(1));
    assert_eq!(pool.voices()[1].current_note(), Some(64));
    assert_eq!(pool.voices()[1].velocity_level(), 0.15);
    assert_eq!(pool.active_count(), 2);

    pool.note_off(60, false);
    assert_eq!(pool.note_on(67, 1.0, &params), Some(0));
}

#[test]
fn exhausted_pool_drops_without_stealing() {
    let mut pool = pool(2);
    let params = ParameterSnapshot::default();
    pool.note_on(60, 1.0, &params);
    pool.note_on(62, 1.0, &params);

    assert_eq!(pool.note_on(64, 1.0, &params), None);
    assert_eq!(pool.dropped_notes(), 1);
    let notes: Vec<_> = pool.voices().iter().map(Voice::current_note).collect();
    assert_eq!(notes, vec![Some(60), Some(62)]);
}

#[test]
fn retrigger_keeps_one_sounding_voice_per_note() {
    let mut pool = pool(4);
    let params = ParameterSnapshot::default();
    pool.note_on(60, 1.0, &params);
    pool.note_on(60, 0.5, &params);

    assert_eq!(sounding_voices_for(&pool, 60), 1);
    assert_eq!(pool.voices()[0].state(), VoiceState::Releasing);
    assert_eq!(pool.voices()[1].state(), VoiceState::Sounding);
}

#[test]
fn note_off_reaches_every_matching_voice() {
    let mut pool = pool(4);
    let params = ParameterSnapshot::default();
    pool.note_on(60, 1.0, &params);
    pool.note_on(60, 1.0, &params);
    pool.note_on(62, 1.0, &params);

    pool.note_off(60, false);

    assert_eq!(pool.voices()[0].state(), VoiceState::Idle);
    assert_eq!(pool.voices()[1].state(), VoiceState::Idle);
    assert_eq!(pool.voices()[2].state(), VoiceState::Sounding);
}

#[test]
fn released_voice_returns_to_idle_after_its_tail() {
    let mut pool = pool(1);
    let params = ParameterSnapshot {
        release_seconds: 0.01,
        ..ParameterSnapshot::default()
    };
    let mut block = AudioBlock::new(2, 256);
    pool.note_on(60, 1.0, &params);
    pool.render_block(&params, &mut block, 0, 256);
    pool.note_off(60, true);
    assert_eq!(pool.voices()[0].state(), VoiceState::Releasing);

    // 0.01 s release is 441 samples.
    for _ in 0..3 {
        block.clear();
        pool.render_block(&params, &mut block, 0, 256);
    }
    assert_eq!(pool.active_count(), 0);
    assert!(block.channel(0).iter().all(|s| *s == 0.0));
}

#[test]
fn waveform_switch_mid_note_has_no_step() {
    let config = EngineConfig::default();
    let mut voice = Voice::new(&config);
    voice.prepare(SAMPLE_RATE, 512);
    let mut params = ParameterSnapshot {
        attack_seconds: 0.01,
        ..ParameterSnapshot::default()
    };
    // A0: one cycle lasts ~1600 samples, so no square edge falls in the window.
    voice.start_note(21, 1.0, &params);

    let mut before = AudioBlock::new(1, 100);
    voice.render(&params, &mut before, 0, 100);
    params.waveform = Waveform::Square;
    let mut after = AudioBlock::new(1, 300);
    voice.render(&params, &mut after, 0, 300);

    let samples: Vec<f32> = before
        .channel(0)
        .iter()
        .chain(after.channel(0))
        .copied()
        .collect();
    let largest_step = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(0.0f32, f32::max);
    assert!(largest_step < 0.01, "step of {largest_step}");
}

#[test]
fn switching_twice_within_one_crossfade_has_no_step() {
    let config = EngineConfig::default();
    let mut voice = Voice::new(&config);
    voice.prepare(SAMPLE_RATE, 64);
    let mut params = ParameterSnapshot {
        attack_seconds: 0.001,
        ..ParameterSnapshot::default()
    };
    voice.start_note(21, 1.0, &params);

    // Sine, then square for one block, then saw while the first fade runs.
    let mut samples = Vec::new();
    for waveform in [Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Saw] {
        params.waveform = waveform;
        let mut block = AudioBlock::new(1, 64);
        voice.render(&params, &mut block, 0, 64);
        samples.extend_from_slice(block.channel(0));
    }

    let largest_step = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(0.0f32, f32::max);
    assert!(largest_step < 0.01, "step of {largest_step}");
}

#[test]
fn immediate_stop_skips_the_release_tail() {
    let config = EngineConfig::default();
    let mut voice = Voice::new(&config);
    voice.prepare(SAMPLE_RATE, 128);
    let params = ParameterSnapshot::default();
    voice.start_note(60, 1.0, &params);
    voice.stop_note(false);

    assert!(voice.is_idle());
    assert_eq!(voice.current_note(), None);
    let mut block = AudioBlock::new(1, 128);
    voice.render(&params, &mut block, 0, 128);
    assert!(block.channel(0).iter().all(|s| *s == 0.0));
}

proptest! {
    #[test]
    fn envelope_is_bounded_and_monotonic_per_stage(
        attack in 0.0f32..0.05,
        decay in 0.0f32..0.05,
        sustain in 0.0f32..=1.0,
        release in 0.0f32..0.05,
        hold in 0usize..3000,
    ) {
        let mut envelope = EnvelopeGenerator::new();
        envelope.set_sample_rate(SAMPLE_RATE);
        envelope.set_parameters(AdsrParameters { attack, decay, sustain, release });
        envelope.note_on();

        let mut previous = envelope.level();
        for _ in 0..hold {
            let stage = envelope.stage();
            let level = envelope.next_sample();
            prop_assert!((0.0..=1.0).contains(&level));
            if stage == EnvelopeStage::Attack && envelope.stage() == EnvelopeStage::Attack {
                prop_assert!(level >= previous);
            }
            if stage == EnvelopeStage::Decay {
                prop_assert!(level <= previous);
            }
            previous = level;
        }

        envelope.note_off();
        let mut previous = envelope.level();
        while envelope.is_active() {
            let level = envelope.next_sample();
            prop_assert!((0.0..=1.0).contains(&level));
            prop_assert!(level <= previous);
            previous = level;
        }
        prop_assert_eq!(envelope.level(), 0.0);
    }
}
