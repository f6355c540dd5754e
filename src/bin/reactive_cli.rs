use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use audio_reactive::analysis::EnvelopeFollower;
use audio_reactive::capture::{
    AcquisitionSource, InjectedSource, SteppedTimeSource, SyntheticPattern, SyntheticSignal,
    SyntheticSource, SyntheticSpec, SystemTimeSource,
};
use audio_reactive::config::AppConfig;
use audio_reactive::wav::read_wav;
use audio_reactive::SpectralPipeline;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

/// Poll interval of the live and synthetic loops
const POLL_INTERVAL: Duration = Duration::from_millis(2);
/// Report interval of the live and synthetic loops
const REPORT_INTERVAL: Duration = Duration::from_millis(100);
/// Poll interval of the synthetic follower loop; the signal advances one sample per poll
const FOLLOWER_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Parser, Debug)]
#[command(
    name = "reactive_cli",
    about = "Offline and live harness for the audio-reactive spectral pipeline"
)]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a WAV file through the spectral pipeline and print JSON snapshots
    Analyze {
        #[arg(long)]
        wav: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print every n-th processed frame
        #[arg(long, default_value_t = 1)]
        every: u64,
    },
    /// Run a WAV file through the envelope follower and print JSON levels
    Follow {
        #[arg(long)]
        wav: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print every n-th sample (defaults to one line per 10 ms of audio)
        #[arg(long)]
        every: Option<usize>,
    },
    /// Capture from the default input device
    Live {
        #[arg(long, default_value_t = 10.0)]
        seconds: f32,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Drive the pipeline from a generated waveform
    Synth {
        #[arg(long, value_enum, default_value_t = PatternArg::Sine)]
        pattern: PatternArg,
        #[arg(long, default_value_t = 440.0)]
        frequency: f32,
        #[arg(long, default_value_t = 1024.0)]
        amplitude: f32,
        #[arg(long, default_value_t = 2.0)]
        seconds: f32,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Drive the envelope follower on the wall clock instead of the spectral pipeline
        #[arg(long)]
        follower: bool,
    },
    /// Print the configuration as JSON
    DumpConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    Sine,
    Square,
    Noise,
    Silence,
}

impl From<PatternArg> for SyntheticPattern {
    fn from(value: PatternArg) -> Self {
        match value {
            PatternArg::Sine => SyntheticPattern::Sine,
            PatternArg::Square => SyntheticPattern::Square,
            PatternArg::Noise => SyntheticPattern::WhiteNoise,
            PatternArg::Silence => SyntheticPattern::Silence,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze { wav, config, every } => run_analyze(&wav, config, every),
        Commands::Follow { wav, config, every } => run_follow(&wav, config, every),
        Commands::Live { seconds, config } => run_live(seconds, config),
        Commands::Synth {
            pattern,
            frequency,
            amplitude,
            seconds,
            config,
            follower,
        } => {
            let spec = SyntheticSpec {
                pattern: pattern.into(),
                frequency_hz: frequency,
                amplitude,
                ..SyntheticSpec::default()
            };
            run_synth(spec, seconds, config, follower)
        }
        Commands::DumpConfig { config } => run_dump_config(config),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = path.map(AppConfig::load_from_file).unwrap_or_default();
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn run_analyze(wav: &Path, config: Option<PathBuf>, every: u64) -> Result<ExitCode> {
    let mut config = load_config(config)?;
    let clip = read_wav(wav, config.capture.channel)
        .with_context(|| format!("loading {}", wav.display()))?;
    config.capture.sample_rate = clip.sample_rate;

    let frame_size = config.capture.frame_size;
    let samples = clip.scaled(config.capture.full_scale);
    let (source, handle) = InjectedSource::with_channels(config.capture.channel + 1);
    let mut pipeline = SpectralPipeline::try_initialize(config, Box::new(source))
        .context("initializing pipeline")?;

    let every = every.max(1);
    for chunk in samples.chunks(frame_size) {
        handle.push_samples(chunk);
        if pipeline.update() {
            let snapshot = pipeline.snapshot();
            if snapshot.frame_index % every == 0 {
                println!("{}", serde_json::to_string(&snapshot)?);
            }
        }
    }

    pipeline.stop();
    tracing::info!("analyze finished: {:?}", pipeline.stats());
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct FollowLine {
    sample_index: usize,
    time_secs: f32,
    level: f32,
}

fn run_follow(wav: &Path, config: Option<PathBuf>, every: Option<usize>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let clip = read_wav(wav, config.capture.channel)
        .with_context(|| format!("loading {}", wav.display()))?;
    let samples = clip.scaled(config.capture.full_scale);
    let total = samples.len();
    let every = every
        .unwrap_or((clip.sample_rate / 100).max(1) as usize)
        .max(1);

    let mut cursor = samples.into_iter();
    let mut follower = EnvelopeFollower::new(
        move || cursor.next().unwrap_or(0.0),
        SteppedTimeSource::per_sample(clip.sample_rate),
        config.envelope,
    );

    for sample_index in 0..total {
        let level = follower.update();
        if sample_index % every == 0 {
            let line = FollowLine {
                sample_index,
                time_secs: sample_index as f32 / clip.sample_rate.max(1) as f32,
                level,
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }

    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct LiveLine {
    elapsed_secs: f32,
    frames: u64,
    beat_intensity: f32,
    peak_band: Option<usize>,
    peak_level: f32,
}

/// Poll `pipeline` for `seconds`, printing a summary line every report interval
fn drive(pipeline: &mut SpectralPipeline, seconds: f32) -> Result<()> {
    let started = Instant::now();
    let deadline =
        Duration::try_from_secs_f32(seconds.max(0.0)).context("invalid --seconds value")?;
    let mut last_report = started;

    while started.elapsed() < deadline {
        pipeline.update();

        if last_report.elapsed() >= REPORT_INTERVAL {
            last_report = Instant::now();
            let smoothed = pipeline.smoothed_band_profile();
            let peak = smoothed
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1));
            let line = LiveLine {
                elapsed_secs: started.elapsed().as_secs_f32(),
                frames: pipeline.stats().frames_processed,
                beat_intensity: pipeline.beat_intensity(),
                peak_band: peak.map(|(band, _)| band),
                peak_level: peak.map_or(0.0, |(_, level)| *level),
            };
            println!("{}", serde_json::to_string(&line)?);
        }

        thread::sleep(POLL_INTERVAL);
    }

    pipeline.stop();
    println!("{}", serde_json::to_string(&pipeline.stats())?);
    Ok(())
}

fn start_pipeline(
    config: AppConfig,
    source: Box<dyn AcquisitionSource>,
) -> Result<SpectralPipeline> {
    SpectralPipeline::try_initialize(config, source).context("initializing pipeline")
}

#[cfg(not(target_os = "android"))]
fn run_live(seconds: f32, config: Option<PathBuf>) -> Result<ExitCode> {
    use audio_reactive::capture::CpalSource;

    let config = load_config(config)?;
    let source = CpalSource::new(config.capture.full_scale);
    let mut pipeline = start_pipeline(config, Box::new(source))?;
    drive(&mut pipeline, seconds)?;
    Ok(ExitCode::from(0))
}

#[cfg(target_os = "android")]
fn run_live(_seconds: f32, _config: Option<PathBuf>) -> Result<ExitCode> {
    bail!("live capture is not available on this platform")
}

fn run_synth(
    spec: SyntheticSpec,
    seconds: f32,
    config: Option<PathBuf>,
    follower: bool,
) -> Result<ExitCode> {
    let config = load_config(config)?;
    if !spec.frequency_hz.is_finite() || spec.frequency_hz < 0.0 {
        bail!("frequency must be a non-negative number, got {}", spec.frequency_hz);
    }
    if follower {
        return run_synth_follower(spec, seconds, config);
    }
    let source = SyntheticSource::new(spec);
    let mut pipeline = start_pipeline(config, Box::new(source))?;
    drive(&mut pipeline, seconds)?;
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct FollowerLine {
    elapsed_secs: f32,
    polls: u64,
    level: f32,
}

/// Poll an envelope follower reading a generated waveform in real time
fn run_synth_follower(spec: SyntheticSpec, seconds: f32, config: AppConfig) -> Result<ExitCode> {
    let deadline =
        Duration::try_from_secs_f32(seconds.max(0.0)).context("invalid --seconds value")?;
    let poll_rate = (1.0 / FOLLOWER_POLL_INTERVAL.as_secs_f32()).round() as u32;
    let signal = SyntheticSignal::new(spec, poll_rate);
    let mut follower = EnvelopeFollower::new(signal, SystemTimeSource, config.envelope);

    let started = Instant::now();
    let mut last_report = started;
    let mut polls = 0u64;
    while started.elapsed() < deadline {
        follower.update();
        polls += 1;

        if last_report.elapsed() >= REPORT_INTERVAL {
            last_report = Instant::now();
            let line = FollowerLine {
                elapsed_secs: started.elapsed().as_secs_f32(),
                polls,
                level: follower.level(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }

        thread::sleep(FOLLOWER_POLL_INTERVAL);
    }

    let line = FollowerLine {
        elapsed_secs: started.elapsed().as_secs_f32(),
        polls,
        level: follower.level(),
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(ExitCode::from(0))
}

fn run_dump_config(config: Option<PathBuf>) -> Result<ExitCode> {
    let config = match config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(ExitCode::from(0))
}
