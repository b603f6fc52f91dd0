use cantinasynth::input::MidiPortChoice;
use cantinasynth::runtime::{self, HostOptions};
use cantinasynth::synth::EngineConfig;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Desktop polyphonic synth: computer keyboard and MIDI in, cpal out.
#[derive(Parser, Debug)]
#[command(name = "cantinasynth")]
#[command(version)]
struct Args {
    /// Engine configuration as JSON (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output device whose name contains this text (asks when omitted)
    #[arg(long)]
    device: Option<String>,

    /// MIDI input port number, 1-based (asks when omitted)
    #[arg(long, conflicts_with = "no_midi")]
    midi_port: Option<usize>,

    /// Do not open any MIDI input
    #[arg(long)]
    no_midi: bool,
}

impl Args {
    fn host_options(&self) -> HostOptions {
        let midi_port = match (self.no_midi, self.midi_port) {
            (true, _) => MidiPortChoice::Disabled,
            (false, Some(port)) => MidiPortChoice::Index(port),
            (false, None) => MidiPortChoice::Prompt,
        };
        HostOptions {
            output_device: self.device.clone(),
            midi_port,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path),
        None => Ok(EngineConfig::default()),
    };

    match config.and_then(|config| runtime::start(config, args.host_options())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
