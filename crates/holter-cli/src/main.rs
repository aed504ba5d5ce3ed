mod render;
mod synth;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use holter_lib::{
    config::EcgConfig,
    io::{
        export::{beat_rows, sample_rows, write_rows_csv},
        raw::SampleStream,
    },
    metrics::hrv::RhythmSummary,
    plot::PageRenderer,
    report::{analyze_recording, minute_page, PageSource},
};
use log::info;
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::render::PngPageRenderer;

#[derive(Parser)]
#[command(
    name = "holter",
    version,
    about = "Minute-paged viewer and rhythm analysis for raw single-lead ECG recordings"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Configuration sources shared by every command; flags override the TOML file.
#[derive(Args)]
struct Settings {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Sampling rate override (Hz)
    #[arg(long, global = true)]
    fs: Option<u32>,
    /// Header size override (bytes)
    #[arg(long, global = true)]
    header_bytes: Option<u64>,
    /// Amplitude cap override (raw units)
    #[arg(long, global = true)]
    amp_cap: Option<f64>,
}

impl Settings {
    fn resolve(&self) -> Result<EcgConfig> {
        let mut cfg = match &self.config {
            Some(path) => EcgConfig::load(path)?,
            None => EcgConfig::default(),
        };
        if let Some(fs) = self.fs {
            cfg.stream.fs = fs;
        }
        if let Some(header_bytes) = self.header_bytes {
            cfg.stream.header_bytes = header_bytes;
        }
        if let Some(amp_cap) = self.amp_cap {
            cfg.page.amp_cap = amp_cap;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Source {
    Raw,
    Filtered,
}

impl From<Source> for PageSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Raw => PageSource::Raw,
            Source::Filtered => PageSource::Filtered,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print stream extent: samples, minutes, duration
    Info {
        #[arg(long)]
        input: PathBuf,
    },
    /// Decode one minute, detect beats, print samples + beats as JSON
    Minute {
        #[arg(long)]
        input: PathBuf,
        /// 1-based minute; clamped into the recording
        #[arg(long, default_value_t = 1)]
        min: usize,
    },
    /// Run filter → beat detection → rhythm summary over the whole recording
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Only analyze the first N seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Export one minute as CSV rows (all samples, or detected beats only)
    Export {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        min: usize,
        #[arg(long)]
        beats: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the page geometry of one minute as JSON
    Page {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        min: usize,
        #[arg(long, value_enum, default_value = "filtered")]
        source: Source,
    },
    /// Render one minute page to a PNG via plotters
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        min: usize,
        #[arg(long, value_enum, default_value = "filtered")]
        source: Source,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1250)]
        width: u32,
        /// Skip the per-panel time labels
        #[arg(long)]
        no_labels: bool,
    },
    /// Write a synthetic raw recording (Gaussian R-waves plus uniform noise)
    Synth {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 90)]
        seconds: u64,
        #[arg(long, default_value_t = 60.0)]
        bpm: f64,
        #[arg(long, default_value_t = 1000.0)]
        amplitude: f64,
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
}

/// Samples of one minute plus the beat indices found in it.
#[derive(Serialize)]
struct MinuteResponse {
    fs: u32,
    samples: Vec<i16>,
    beats: Vec<usize>,
    total_minutes: usize,
    current_minute: usize,
    summary: RhythmSummary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    let cfg = cli.settings.resolve()?;
    info!("fs={} Hz, header_bytes={}", cfg.stream.fs, cfg.stream.header_bytes);

    match cli.command {
        Commands::Info { input } => cmd_info(&input, &cfg)?,
        Commands::Minute { input, min } => cmd_minute(&input, min, &cfg)?,
        Commands::Analyze { input, seconds } => cmd_analyze(&input, seconds, &cfg)?,
        Commands::Export {
            input,
            min,
            beats,
            out,
        } => cmd_export(&input, min, beats, out.as_deref(), &cfg)?,
        Commands::Page { input, min, source } => cmd_page(&input, min, source.into(), &cfg)?,
        Commands::Render {
            input,
            min,
            source,
            out,
            width,
            no_labels,
        } => cmd_render(&input, min, source.into(), &out, width, !no_labels, &cfg)?,
        Commands::Synth {
            out,
            seconds,
            bpm,
            amplitude,
            noise,
            seed,
        } => {
            let params = synth::SynthParams {
                fs: cfg.stream.fs,
                seconds,
                bpm,
                amplitude,
                noise,
                seed,
            };
            cmd_synth(&out, &params)?
        }
    }
    Ok(())
}

fn open_stream(input: &Path, cfg: &EcgConfig) -> Result<SampleStream> {
    Ok(SampleStream::open(input, &cfg.stream)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_info(input: &Path, cfg: &EcgConfig) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    print_json(&stream.info())
}

fn cmd_minute(input: &Path, min: usize, cfg: &EcgConfig) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    let minute = stream.clamp_minute(min);
    let page = minute_page(&stream, minute, cfg)?;
    let beats = page.beats.indices();
    print_json(&MinuteResponse {
        fs: page.fs,
        samples: page.samples,
        beats,
        total_minutes: page.total_minutes,
        current_minute: page.current_minute,
        summary: page.summary.rounded(),
    })
}

fn cmd_analyze(input: &Path, seconds: Option<u64>, cfg: &EcgConfig) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    let mut analysis = analyze_recording(&stream, seconds, cfg)?;
    analysis.summary = analysis.summary.rounded();
    print_json(&analysis)
}

fn cmd_export(
    input: &Path,
    min: usize,
    beats_only: bool,
    out: Option<&Path>,
    cfg: &EcgConfig,
) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    let page = minute_page(&stream, stream.clamp_minute(min), cfg)?;
    let window = page.window();
    let rows = if beats_only {
        beat_rows(&window, &page.beats)
    } else {
        sample_rows(&window)
    };
    match out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_rows_csv(BufWriter::new(file), &rows)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_rows_csv(&mut lock, &rows)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn cmd_page(input: &Path, min: usize, source: PageSource, cfg: &EcgConfig) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    let page = minute_page(&stream, stream.clamp_minute(min), cfg)?;
    print_json(&page.layout(source, cfg))
}

fn cmd_render(
    input: &Path,
    min: usize,
    source: PageSource,
    out: &Path,
    width: u32,
    labels: bool,
    cfg: &EcgConfig,
) -> Result<()> {
    let stream = open_stream(input, cfg)?;
    let page = minute_page(&stream, stream.clamp_minute(min), cfg)?;
    let layout = page.layout(source, cfg);
    let mut renderer = PngPageRenderer::new(out, width, labels);
    renderer
        .render(&layout)
        .with_context(|| format!("rendering {}", out.display()))?;
    info!("wrote {}", out.display());
    Ok(())
}

fn cmd_synth(out: &Path, params: &synth::SynthParams) -> Result<()> {
    let recording = synth::generate(params);
    synth::write_raw(out, &recording.samples)?;
    print_json(&recording.summary(out))
}
