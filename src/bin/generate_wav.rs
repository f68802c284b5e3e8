use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempotrack::simulation::{
    NoiseConfig, apply_noise, click_train, interleave, kick_train, pulse_train,
};
use tempotrack::wav::{WavEncoding, save_wav};

#[derive(Parser, Debug)]
#[command(name = "generate_wav")]
#[command(about = "Generate synthetic beat WAV files for tempo testing")]
struct Args {
    /// TOML noise configuration ([additive], [dropout], [jitter] tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Tempos in BPM: list ("90,120,140") or stepped range ("60-180:20")
    #[arg(short = 'b', long, default_value = "60-180:20")]
    tempos: TempoList,

    /// Beat sound
    #[arg(short, long, value_enum, default_value = "kick")]
    kind: BeatKind,

    /// Files per tempo, each with its own noise seed
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Base seed for reproducibility
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Signal duration in seconds
    #[arg(short, long, default_value_t = 15.0)]
    duration: f32,

    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Time of the first beat in seconds
    #[arg(long, default_value_t = 0.0)]
    offset: f32,

    #[arg(long, value_enum, default_value = "pcm16")]
    encoding: WavEncoding,

    /// Output filename prefix
    #[arg(long, default_value = "beats")]
    prefix: String,

    /// Also write manifest.json describing every file
    #[arg(long)]
    manifest: bool,

    /// AWGN SNR in dB, overriding the config file
    #[arg(long)]
    snr: Option<f32>,

    /// Probability of dropping each beat, overriding the config file
    #[arg(long)]
    dropout: Option<f32>,

    /// Largest beat shift as a fraction of the period, overriding the config file
    #[arg(long)]
    jitter: Option<f32>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum BeatKind {
    Pulse,
    Click,
    Kick,
}

impl BeatKind {
    fn render(self, args: &Args, bpm: f32) -> Vec<f32> {
        match self {
            Self::Pulse => pulse_train(args.duration, args.sample_rate, bpm, args.offset, 0.9),
            Self::Click => click_train(args.duration, args.sample_rate, bpm, args.offset),
            Self::Kick => kick_train(args.duration, args.sample_rate, bpm, args.offset),
        }
    }
}

/// Tempos requested on the command line
#[derive(Debug, Clone, PartialEq)]
struct TempoList(Vec<f32>);

impl FromStr for TempoList {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((range, step)) = s.split_once(':') else {
            return s
                .split(',')
                .map(|t| t.trim().parse::<f32>().context("invalid tempo value"))
                .collect::<Result<Vec<_>>>()
                .map(TempoList);
        };

        let step: f32 = step.trim().parse().context("invalid step value")?;
        if !(step > 0.0) {
            bail!("step must be positive, got {}", step);
        }
        let (start, end) = range
            .split_once('-')
            .context("tempo range must look like 'start-end:step'")?;
        let start: f32 = start.trim().parse().context("invalid start tempo")?;
        let end: f32 = end.trim().parse().context("invalid end tempo")?;

        // Stepping by index keeps float error from dropping the last tempo
        let count = ((end - start) / step + 1e-3).floor().max(-1.0) as i64 + 1;
        Ok(TempoList((0..count).map(|i| start + step * i as f32).collect()))
    }
}

#[derive(Debug, Serialize)]
struct GeneratedFile {
    file: String,
    bpm: f32,
    offset: f32,
    trial: u32,
    seed: u64,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    sample_rate: u32,
    duration: f32,
    noise: &'a NoiseSummary,
    files: Vec<GeneratedFile>,
}

#[derive(Debug, Serialize)]
struct NoiseSummary {
    snr_db: Option<f32>,
    dropout: Option<f32>,
    jitter: Option<f32>,
}

/// Noise from the config file with CLI flags layered on top
fn noise_template(args: &Args) -> Result<NoiseConfig> {
    let mut noise = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<NoiseConfig>(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => NoiseConfig::default(),
    };
    if let Some(snr_db) = args.snr {
        noise = noise.with_awgn(snr_db);
    }
    if let Some(probability) = args.dropout {
        noise = noise.with_dropout(probability);
    }
    if let Some(max_shift) = args.jitter {
        noise = noise.with_jitter(max_shift);
    }
    Ok(noise)
}

fn summarize(noise: &NoiseConfig) -> NoiseSummary {
    NoiseSummary {
        snr_db: noise.additive.as_ref().map(|a| a.snr_db),
        dropout: noise.dropout.as_ref().map(|d| d.probability),
        jitter: noise.jitter.as_ref().map(|j| j.max_shift),
    }
}

fn write_file(
    args: &Args,
    dir: &Path,
    noise: &NoiseConfig,
    bpm: f32,
    trial: u32,
) -> Result<GeneratedFile> {
    let seed = args.seed + u64::from(trial) * 1000 + bpm.round() as u64;
    let period = (60.0 * args.sample_rate as f32 / bpm).round() as usize;
    let beat = apply_noise(
        &args.kind.render(args, bpm),
        &noise.clone().with_seed(seed),
        period,
    );
    // Beat on the left, silence on the right
    let frames = interleave(&beat, &vec![0.0; beat.len()]);

    let file = format!("{}_{:05.1}bpm_t{:02}.wav", args.prefix, bpm, trial);
    save_wav(dir.join(&file), &frames, args.sample_rate, 2, args.encoding)
        .with_context(|| format!("failed to write {}", file))?;

    Ok(GeneratedFile {
        file,
        bpm,
        offset: args.offset,
        trial,
        seed,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.tempos.0.iter().any(|&bpm| !(bpm > 0.0)) {
        bail!("tempos must be positive");
    }

    fs::create_dir_all(&args.output_dir).context("failed to create output directory")?;
    let noise = noise_template(&args)?;

    let jobs: Vec<(f32, u32)> = args
        .tempos
        .0
        .iter()
        .flat_map(|&bpm| (0..args.trials).map(move |trial| (bpm, trial)))
        .collect();

    let mut files = Vec::with_capacity(jobs.len());
    for (done, &(bpm, trial)) in jobs.iter().enumerate() {
        files.push(write_file(&args, &args.output_dir, &noise, bpm, trial)?);
        eprint!("\rGenerating: {}/{}", done + 1, jobs.len());
    }
    eprintln!();

    if args.manifest {
        let summary = summarize(&noise);
        let manifest = Manifest {
            sample_rate: args.sample_rate,
            duration: args.duration,
            noise: &summary,
            files,
        };
        let path = args.output_dir.join("manifest.json");
        let json =
            serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
        fs::write(&path, json).context("failed to write manifest")?;
        eprintln!("Manifest written to: {}", path.display());
    }

    eprintln!(
        "Generated {} files in {}",
        jobs.len(),
        args.output_dir.display()
    );
    Ok(())
}
