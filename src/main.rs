use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use tempotrack::audio::{AudioSource, DeviceSource, Pcm16StreamSource};
use tempotrack::config::{ChannelRole, TempoConfig};
use tempotrack::output::{BeatOutput, OutputFormat, create_formatter};
use tempotrack::processing::BeatProcessor;

#[derive(Parser, Debug)]
#[command(name = "tempotrack")]
#[command(about = "Real-time beat detection from an audio input", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device name (substring match); default input otherwise
    #[arg(short, long)]
    device: Option<String>,

    /// Read raw 16-bit little-endian stereo PCM from stdin instead of a device
    #[arg(long)]
    stdin: bool,

    /// Sample rate of the input in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Channel carrying the beat
    #[arg(long, value_enum)]
    channel: Option<ChannelRole>,

    /// Fraction of the recent peak a beat must reach (0-1]
    #[arg(long)]
    sensitivity: Option<f32>,

    /// Disable the prefilter
    #[arg(long)]
    no_filter: bool,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = load_config(&args)?;

    eprintln!("=== tempotrack - live beat detection ===");
    eprintln!("Sample rate: {} Hz", config.audio.sample_rate);
    eprintln!("Beat channel: {:?}", config.audio.beat_channel);
    eprintln!(
        "Sensitivity: {}, threshold floor: {}",
        config.stream.sensitivity, config.stream.min_threshold
    );
    if config.prefilter.enabled {
        eprintln!(
            "Prefilter: {} {} order {} at {} Hz",
            config.prefilter.characteristic,
            config.prefilter.kind,
            config.prefilter.order,
            config.prefilter.cutoff_hz
        );
    }
    eprintln!();

    let source: Box<dyn AudioSource> = if args.stdin {
        Box::new(Pcm16StreamSource::new(
            std::io::stdin(),
            config.audio.sample_rate,
            config.audio.buffer_size,
        ))
    } else {
        eprintln!("Starting audio capture...");
        Box::new(DeviceSource::new(&config.audio, args.device.as_deref())?)
    };

    run_processing_loop(source, &config, args.format, args.verbose > 0)
}

fn load_config(args: &Args) -> anyhow::Result<TempoConfig> {
    let mut config = match &args.config {
        Some(path) => TempoConfig::from_toml_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TempoConfig::default(),
    };

    if let Some(rate) = args.sample_rate {
        config.audio.sample_rate = rate;
    }
    if let Some(channel) = args.channel {
        config.audio.beat_channel = channel;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.stream.sensitivity = sensitivity;
    }
    if args.no_filter {
        config.prefilter.enabled = false;
    }
    if args.stdin {
        config.audio.channels = 2;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_processing_loop(
    mut source: Box<dyn AudioSource>,
    config: &TempoConfig,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut processor = BeatProcessor::with_format(config, source.sample_rate(), source.channels())?;
    let formatter = create_formatter(format, verbose);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let mut last_beat = Instant::now();
    let mut last_warning = Instant::now();

    while let Some(audio_data) = source.next_buffer()? {
        for event in processor.process_audio(&audio_data) {
            println!(
                "{}",
                formatter.format(&BeatOutput::new(&event, processor.smoothed_bpm()))
            );
            last_beat = Instant::now();
        }

        // Only warn occasionally to avoid spam
        if last_beat.elapsed() >= Duration::from_secs(4)
            && last_warning.elapsed() >= Duration::from_secs(4)
        {
            log::warn!("No beats in the last 4 seconds");
            last_warning = Instant::now();
        }
    }

    eprintln!("Audio stream closed");
    Ok(())
}
