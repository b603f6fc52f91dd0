use crate::audio::AudioBackend;
use crate::error::{Error, Result};
use crate::runtime::prompt::{find_by_name, prompt_choice};
use crate::runtime::NativeSynth;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};

const REQUESTED_BUFFER_FRAMES: u32 = 256;

/// Plays a [`NativeSynth`] on a cpal output stream. The synth is moved into
/// the stream callback when the stream is built.
pub struct CpalBackend {
    stream: Option<Stream>,
    synth: Option<NativeSynth>,
    device_name: Option<String>,
}

fn backend_error(err: impl std::fmt::Display) -> Error {
    Error::AudioBackend(err.to_string())
}

impl CpalBackend {
    /// `device_name` picks the first output device whose name contains it;
    /// without it the user is asked (Linux) or the default device is used.
    pub fn new(synth: NativeSynth, device_name: Option<String>) -> Self {
        Self {
            stream: None,
            synth: Some(synth),
            device_name,
        }
    }

    fn select_output_device(&self, host: &cpal::Host) -> Result<cpal::Device> {
        let devices: Vec<cpal::Device> = host.output_devices().map_err(backend_error)?.collect();
        let names: Vec<String> = devices
            .iter()
            .map(|device| device.name().unwrap_or_default())
            .collect();

        let index = match &self.device_name {
            Some(pattern) => Some(
                find_by_name(&names, pattern)
                    .ok_or_else(|| backend_error(format!("no output device matches '{pattern}'")))?,
            ),
            None if cfg!(target_os = "linux") => {
                // ALSA lists every plug and hw alias; only offer the useful ones.
                let candidates: Vec<usize> = (0..names.len())
                    .filter(|&i| {
                        let name = names[i].to_lowercase();
                        name.starts_with("default:") || name.contains("pipewire")
                    })
                    .collect();
                if candidates.is_empty() {
                    None
                } else {
                    let offered: Vec<String> =
                        candidates.iter().map(|&i| names[i].clone()).collect();
                    let choice = prompt_choice("Available output devices", &offered)?
                        .ok_or_else(|| backend_error("invalid device selection"))?;
                    Some(candidates[choice])
                }
            }
            None => None,
        };

        match index {
            Some(index) => devices
                .into_iter()
                .nth(index)
                .ok_or_else(|| backend_error("selected output device not found")),
            None => host
                .default_output_device()
                .ok_or_else(|| backend_error("no output device available")),
        }
    }

    /// Run a throwaway stream to learn how many frames the device actually
    /// asks for per callback.
    fn determine_buffer_size(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<usize> {
        let channels = config.channels as usize;
        let (buffer_size_sender, buffer_size_receiver) = std::sync::mpsc::channel();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    let _ = buffer_size_sender.send(data.len() / channels);
                },
                |err| tracing::error!("Stream error: {}", err),
                None,
            )
            .map_err(backend_error)?;

        stream.play().map_err(backend_error)?;
        let buffer_size = buffer_size_receiver.recv().map_err(backend_error)?;
        stream.pause().map_err(backend_error)?;
        Ok(buffer_size)
    }

    fn build_stream(&mut self) -> Result<Stream> {
        let mut synth = self
            .synth
            .take()
            .ok_or_else(|| backend_error("stream already built"))?;

        let host = cpal::default_host();
        let device = self.select_output_device(&host)?;
        tracing::info!("Selected device: {}", device.name().unwrap_or_default());

        let supported_config = device.default_output_config().map_err(backend_error)?;
        if supported_config.sample_format() != SampleFormat::F32 {
            return Err(backend_error(format!(
                "unsupported sample format {:?}",
                supported_config.sample_format()
            )));
        }
        let mut stream_config: cpal::StreamConfig = supported_config.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(REQUESTED_BUFFER_FRAMES);

        let buffer_size = self.determine_buffer_size(&device, &stream_config)?;
        let sample_rate = stream_config.sample_rate.0 as f32;
        let channels = stream_config.channels as usize;
        synth.prepare(sample_rate, buffer_size, channels)?;
        tracing::info!(sample_rate, buffer_size, channels, "Output stream configured");

        device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    synth.process(data, channels);
                },
                |err| tracing::error!("Stream error: {}", err),
                None,
            )
            .map_err(backend_error)
    }
}

impl AudioBackend for CpalBackend {
    fn start(&mut self) -> Result<()> {
        let stream = self.build_stream()?;
        stream.play().map_err(backend_error)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.pause().map_err(backend_error)?;
        }
        Ok(())
    }
}
