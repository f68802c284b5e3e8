use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::path::{Path, PathBuf};

use tempotrack::audio::{AudioSource, WavFileSource};
use tempotrack::config::{ChannelRole, TempoConfig, TempoRange};
use tempotrack::output::OutputFormat;
use tempotrack::processing::BeatProcessor;
use tempotrack::signal_processing::{FilterCharacteristic, FilterKind};
use tempotrack::tempo::TempoAnalyzer;
use tempotrack::wav::{WavEncoding, save_wav};

#[derive(Parser, Debug)]
#[command(name = "analyze_wav")]
#[command(about = "Estimate the tempo of WAV files", long_about = None)]
struct Args {
    /// WAV files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tempo range the estimate is folded into (e.g., "90-180")
    #[arg(short, long)]
    range: Option<TempoRange>,

    /// Channel carrying the beat
    #[arg(long, value_enum)]
    channel: Option<ChannelRole>,

    /// Prefilter kind
    #[arg(long, value_enum)]
    filter: Option<FilterKind>,

    /// Prefilter characteristic
    #[arg(long, value_enum)]
    characteristic: Option<FilterCharacteristic>,

    /// Prefilter order
    #[arg(long)]
    order: Option<usize>,

    /// Prefilter cutoff or center frequency in Hz
    #[arg(long)]
    cutoff: Option<f64>,

    /// Analyze the raw signal without a prefilter
    #[arg(long)]
    no_filter: bool,

    /// Skip the streaming detector pass
    #[arg(long)]
    no_stream: bool,

    /// Write the prefiltered beat channel of each file to this directory
    #[arg(long)]
    dump_filtered: Option<PathBuf>,
}

/// Spread of the instantaneous BPMs reported by the streaming pass
#[derive(Debug, Clone, Serialize)]
struct StreamBpm {
    beats_with_bpm: usize,
    mean: f32,
    std_dev: f32,
    min: f32,
    max: f32,
}

impl StreamBpm {
    fn collect(bpms: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut stats: Stats<f32> = Stats::new();
        for bpm in bpms {
            stats.update(bpm as f32);
        }
        (stats.count > 0).then(|| Self {
            beats_with_bpm: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

/// Render an optional value, or `missing` when absent
fn cell<T>(value: Option<T>, missing: &str, render: impl Fn(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| missing.to_string())
}

#[derive(Debug, Clone, Default, Serialize)]
struct FileAnalysis {
    filename: String,
    sample_rate: u32,
    duration_secs: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tempo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_bpm: Option<StreamBpm>,
    stream_beats: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
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

    let config = build_config(&args)?;

    if let Some(ref dir) = args.dump_filtered {
        std::fs::create_dir_all(dir)?;
    }

    let results: Vec<FileAnalysis> = args
        .files
        .iter()
        .map(|path| {
            analyze_file(
                path,
                &config,
                !args.no_stream,
                args.dump_filtered.as_deref(),
            )
        })
        .collect();

    match args.format {
        OutputFormat::Text => print_text(&results, &config),
        OutputFormat::Csv => print_csv(&results),
        OutputFormat::Json => print_json(&results)?,
    }

    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<TempoConfig> {
    let mut config = match &args.config {
        Some(path) => TempoConfig::from_toml_file(path)?,
        None => TempoConfig::default(),
    };

    if let Some(range) = args.range {
        config.batch.set_range(range);
    }
    if let Some(channel) = args.channel {
        config.audio.beat_channel = channel;
    }
    if let Some(kind) = args.filter {
        config.prefilter.kind = kind;
    }
    if let Some(characteristic) = args.characteristic {
        config.prefilter.characteristic = characteristic;
    }
    if let Some(order) = args.order {
        config.prefilter.order = order;
    }
    if let Some(cutoff) = args.cutoff {
        config.prefilter.cutoff_hz = cutoff;
    }
    if args.no_filter {
        config.prefilter.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn analyze_file(
    path: &Path,
    config: &TempoConfig,
    stream_pass: bool,
    dump_dir: Option<&Path>,
) -> FileAnalysis {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match analyze_file_impl(path, &filename, config, stream_pass, dump_dir) {
        Ok(analysis) => analysis,
        Err(e) => FileAnalysis {
            filename,
            error: Some(e.to_string()),
            ..FileAnalysis::default()
        },
    }
}

fn analyze_file_impl(
    path: &Path,
    filename: &str,
    config: &TempoConfig,
    stream_pass: bool,
    dump_dir: Option<&Path>,
) -> anyhow::Result<FileAnalysis> {
    let source = WavFileSource::new(path, config.audio.buffer_size)?;
    let sample_rate = source.sample_rate();
    let channels = source.channels();
    let fs = sample_rate as f32;

    let beat = config.audio.extract_channel(source.samples(), channels);
    let mut analysis = FileAnalysis {
        filename: filename.to_string(),
        sample_rate,
        duration_secs: beat.len() as f32 / fs,
        ..FileAnalysis::default()
    };

    let analyzer = TempoAnalyzer::from_config(config)?;

    if let Some(dir) = dump_dir {
        let filtered = analyzer.prepare(&beat, fs)?;
        let out = dir.join(format!("{}.filtered.wav", filename.trim_end_matches(".wav")));
        save_wav(&out, &filtered, sample_rate, 1, WavEncoding::Float)?;
        log::info!("Wrote {}", out.display());
    }

    match analyzer.guess(&beat, fs) {
        Ok(result) => {
            analysis.bpm = Some(result.bpm);
            analysis.tempo = Some(result.tempo);
            analysis.offset = result.offset;
        }
        Err(e) => analysis.error = Some(e.to_string()),
    }

    if stream_pass {
        let mut processor = BeatProcessor::with_format(config, sample_rate, channels)?;
        let events = processor.process_signal(source.samples());
        analysis.stream_beats = events.len();
        analysis.stream_bpm = StreamBpm::collect(events.iter().filter_map(|e| e.bpm));
    }

    Ok(analysis)
}

fn print_text(results: &[FileAnalysis], config: &TempoConfig) {
    eprintln!(
        "Range: {}-{} BPM, channel: {:?}",
        config.batch.min_tempo, config.batch.max_tempo, config.audio.beat_channel
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

    println!(
        "{:<48} {:>6} {:>10} {:>9} {:>10} {:>8} {:>8}",
        "File", "BPM", "Tempo", "Offset", "StreamBPM", "Std", "Beats"
    );
    println!("{}", "-".repeat(105));

    for result in results {
        let stream = result.stream_bpm.as_ref();
        println!(
            "{:<48} {:>6} {:>10} {:>9} {:>10} {:>8} {:>8}",
            result.filename,
            cell(result.bpm, "-", |b| b.to_string()),
            cell(result.tempo, "-", |t| format!("{:.3}", t)),
            cell(result.offset, "-", |o| format!("{:.4}", o)),
            cell(stream, "-", |s| format!("{:.2}", s.mean)),
            cell(stream, "-", |s| format!("{:.2}", s.std_dev)),
            result.stream_beats
        );
        if let Some(ref err) = result.error {
            println!("  ERROR: {}", err);
        }
    }
}

fn print_csv(results: &[FileAnalysis]) {
    println!(
        "filename,sample_rate,duration_secs,bpm,tempo,offset,stream_bpm_mean,stream_bpm_std,stream_bpm_min,stream_bpm_max,stream_beats,error"
    );
    for result in results {
        let stream = result.stream_bpm.as_ref();
        println!(
            "{},{},{:.3},{},{},{},{},{},{},{},{},{}",
            result.filename,
            result.sample_rate,
            result.duration_secs,
            cell(result.bpm, "", |b| b.to_string()),
            cell(result.tempo, "", |t| format!("{:.4}", t)),
            cell(result.offset, "", |o| format!("{:.6}", o)),
            cell(stream, "", |s| format!("{:.3}", s.mean)),
            cell(stream, "", |s| format!("{:.3}", s.std_dev)),
            cell(stream, "", |s| format!("{:.0}", s.min)),
            cell(stream, "", |s| format!("{:.0}", s.max)),
            result.stream_beats,
            cell(result.error.as_ref(), "", |e| format!("\"{}\"", e.replace('"', "'")))
        );
    }
}

fn print_json(results: &[FileAnalysis]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    println!("{}", json);
    Ok(())
}
