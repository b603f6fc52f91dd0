use super::buffer::AudioBlock;
use super::config::EngineConfig;
use super::filter::ToneFilterStage;
use super::note::{NoteEvent, NoteEventKind};
use super::params::ParameterSnapshot;
use super::reverb::ReverbStage;
use super::saturation::SaturationStage;
use super::visualization::{visualization_buffer, VisualizationReader, VisualizationWriter};
use super::voice_pool::VoicePool;
use crate::error::{Error, Result};

const MAX_CHANNELS: usize = 2;

/// The values `prepare` was last called with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub num_channels: usize,
}

/// The real-time rendering pipeline.
///
/// Voices are summed into a master block which then runs through the tone
/// filter, reverb and saturation stages before being copied to the host
/// buffer and published for visualization. Everything the render path
/// touches is sized in [`prepare`](Self::prepare); `render_block` neither
/// allocates nor blocks.
pub struct SynthEngine {
    config: EngineConfig,
    spec: Option<ProcessSpec>,
    voices: VoicePool,
    tone_filter: ToneFilterStage,
    reverb: ReverbStage,
    saturation: SaturationStage,
    master: AudioBlock,
    visualization: VisualizationWriter,
    visualization_reader: Option<VisualizationReader>,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: EngineConfig) -> Self {
        let (visualization, visualization_reader) = visualization_buffer();
        Self {
            voices: VoicePool::new(&config),
            tone_filter: ToneFilterStage::new(&config),
            reverb: ReverbStage::new(),
            saturation: SaturationStage::new(),
            master: AudioBlock::default(),
            visualization,
            visualization_reader: Some(visualization_reader),
            spec: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn process_spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    /// (Re)initialise every buffer, filter and ramp. Must be called before
    /// rendering and again whenever any argument changes.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        num_channels: usize,
    ) -> Result<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(Error::InvalidBlockSize(max_block_size));
        }
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(Error::UnsupportedChannelCount(num_channels));
        }

        self.voices.prepare(sample_rate, max_block_size);
        self.tone_filter.prepare(sample_rate, num_channels);
        self.reverb.prepare(sample_rate);
        self.master = AudioBlock::new(num_channels, max_block_size);
        self.visualization.reserve(num_channels, max_block_size);

        self.spec = Some(ProcessSpec {
            sample_rate,
            max_block_size,
            num_channels,
        });
        tracing::info!(
            sample_rate,
            max_block_size,
            num_channels,
            voices = self.config.max_voices,
            "Synth engine prepared"
        );
        Ok(())
    }

    /// Apply `events` at their sample offsets, render into `output` in place
    /// and publish the result for visualization. An oversized block is
    /// published as its last `max_block_size` samples.
    ///
    /// Events must be sorted by offset; an event earlier than the current
    /// render position is applied at that position and one past the end of
    /// the block is applied at the end.
    pub fn render_block(
        &mut self,
        events: &[NoteEvent],
        params: &ParameterSnapshot,
        output: &mut AudioBlock,
    ) {
        let Some(spec) = self.spec else {
            debug_assert!(false, "render_block called before prepare");
            output.clear();
            return;
        };
        debug_assert!(
            output.num_samples() <= spec.max_block_size,
            "block of {} samples exceeds the prepared maximum of {}",
            output.num_samples(),
            spec.max_block_size
        );
        debug_assert_eq!(
            output.num_channels(),
            spec.num_channels,
            "output channel count differs from the prepared one"
        );

        let params = params.clamped();
        let total = output.num_samples();
        let mut next_event = 0;
        let mut chunk_start = 0;

        // Oversized blocks are rendered in prepared-size chunks.
        loop {
            let chunk_len = spec.max_block_size.min(total - chunk_start);
            let is_last = chunk_start + chunk_len >= total;
            self.render_chunk(
                events,
                &mut next_event,
                &params,
                chunk_start,
                chunk_len,
                is_last,
            );
            self.copy_master_to(output, chunk_start, chunk_len);
            chunk_start += chunk_len;
            if is_last {
                break;
            }
        }
        self.visualization.push(output);
    }

    /// Stop every note, with or without its release tail.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        self.voices.all_notes_off(allow_tail_off);
    }

    /// Silence everything immediately, including reverb and filter tails.
    pub fn transport_stop(&mut self) {
        self.voices.all_notes_off(false);
        self.reverb.reset();
        self.tone_filter.reset();
    }

    /// The observer side of the visualization hand-off. Only the first call
    /// returns it.
    pub fn take_visualization_reader(&mut self) -> Option<VisualizationReader> {
        self.visualization_reader.take()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Note-ons dropped because every voice was busy.
    pub fn dropped_note_count(&self) -> u64 {
        self.voices.dropped_notes()
    }

    pub fn dropped_visualization_frames(&self) -> u64 {
        self.visualization.dropped_count()
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    fn render_chunk(
        &mut self,
        events: &[NoteEvent],
        next_event: &mut usize,
        params: &ParameterSnapshot,
        chunk_start: usize,
        chunk_len: usize,
        is_last: bool,
    ) {
        self.master.set_size(self.master.num_channels(), chunk_len);

        let mut position = 0;
        while let Some(event) = events.get(*next_event) {
            let offset = event.sample_offset.saturating_sub(chunk_start).max(position);
            if offset >= chunk_len && !is_last {
                break;
            }
            let offset = offset.min(chunk_len);
            if offset > position {
                self.voices
                    .render_block(params, &mut self.master, position, offset - position);
                position = offset;
            }
            self.apply_event(event, params);
            *next_event += 1;
        }
        if position < chunk_len {
            self.voices
                .render_block(params, &mut self.master, position, chunk_len - position);
        }

        self.tone_filter
            .process(&mut self.master, params.filter_cutoff_hz, params.bass_gain_db);
        self.reverb.set_parameters(params.reverb());
        self.reverb.process(&mut self.master);
        self.saturation.set_intensity(params.saturation_intensity);
        self.saturation.process(&mut self.master);
    }

    fn apply_event(&mut self, event: &NoteEvent, params: &ParameterSnapshot) {
        match event.kind {
            NoteEventKind::On { velocity } if velocity > 0.0 => {
                self.voices.note_on(event.note_number, velocity, params);
            }
            NoteEventKind::On { .. } => self.voices.note_off(event.note_number, true),
            NoteEventKind::Off { allow_tail_off } => {
                self.voices.note_off(event.note_number, allow_tail_off)
            }
        }
    }

    fn copy_master_to(&self, output: &mut AudioBlock, start: usize, len: usize) {
        let master_channels = self.master.num_channels();
        if master_channels == 0 {
            return;
        }
        for channel in 0..output.num_channels() {
            let source = &self.master.channel(channel.min(master_channels - 1))[..len];
            output.channel_mut(channel)[start..start + len].copy_from_slice(source);
        }
    }
}

impl Default for SynthEngine {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_rejects_bad_arguments() {
        let mut engine = SynthEngine::default();
        assert!(matches!(
            engine.prepare(0.0, 512, 2),
            Err(Error::InvalidSampleRate(_))
        ));
        assert!(matches!(
            engine.prepare(44_100.0, 0, 2),
            Err(Error::InvalidBlockSize(0))
        ));
        assert!(matches!(
            engine.prepare(44_100.0, 512, 6),
            Err(Error::UnsupportedChannelCount(6))
        ));
        assert!(engine.process_spec().is_none());
        engine.prepare(48_000.0, 256, 1).unwrap();
        assert_eq!(engine.process_spec().unwrap().num_channels, 1);
    }

    #[test]
    fn reader_is_handed_out_once() {
        let mut engine = SynthEngine::default();
        assert!(engine.take_visualization_reader().is_some());
        assert!(engine.take_visualization_reader().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_voices: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SynthEngine::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
