//! Command-line host that replays recorded IR eye footage through the tracker.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{ArgGroup, Args, Parser, Subcommand};
use pupiltrack::{
    analyze_frame, FrameAnalysis, FrameSource, ImageSequenceSource, MetricsRecord, RawFormat,
    RawYuvSource, Session, StopReason, TrackerConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

/// Raised by SIGINT/SIGTERM; the tracking loop polls it between frames.
static CANCEL_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "pupiltrack")]
#[command(about = "Pupil position, pupil area and blink detection for IR eye cameras")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tracking session over recorded frames.
    Track(CliTrackArgs),

    /// Run the pipeline once on a single image and print diagnostics.
    Analyze {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Tracker configuration (JSON). Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default tracker configuration as JSON.
    PrintConfig,
}

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["frames", "raw"])))]
struct CliTrackArgs {
    /// Image files replayed in order, one frame each.
    #[arg(long, num_args = 1..)]
    frames: Vec<PathBuf>,

    /// Raw planar YUV420 dump (one frame after another).
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Treat the raw dump as bare 8-bit luma instead of YUV420.
    #[arg(long, requires = "raw")]
    y8: bool,

    /// Tracker configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame width override in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height override in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Path to write one JSON record per frame.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::Analyze { image, config } => run_analyze(&image, config.as_deref()),
        Commands::PrintConfig => run_print_config(),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<TrackerConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            Ok(TrackerConfig::from_json_file(p)?)
        }
        None => Ok(TrackerConfig::default()),
    }
}

// ── print-config ───────────────────────────────────────────────────────

fn run_print_config() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&TrackerConfig::default())?;
    println!("{json}");
    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct AnalyzeReport<'a> {
    image: String,
    width: u32,
    height: u32,
    record: MetricsRecord,
    analysis: &'a FrameAnalysis,
}

fn run_analyze(image_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    tracing::info!("Loading image: {}", image_path.display());

    let img = image::open(image_path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", image_path.display(), e).into()
    })?;
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();

    let mut config = load_config(config_path)?;
    config.resolution = [w, h];
    config.validate()?;

    let analysis = analyze_frame(&gray, &config);
    let report = AnalyzeReport {
        image: image_path.display().to_string(),
        width: w,
        height: h,
        record: MetricsRecord::new(1, analysis.decision),
        analysis: &analysis,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
#[cfg(unix)]
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

#[cfg(unix)]
extern "C" fn signal_handler(_sig: libc::c_int) {
    CANCEL_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

/// Frame size for the session: image sequences take it from the first
/// frame, explicit `--width/--height` win over everything.
fn resolve_resolution(args: &CliTrackArgs, config: &mut TrackerConfig) -> CliResult<()> {
    if args.raw.is_none() {
        if let Some(first) = args.frames.first() {
            let (w, h) = image::image_dimensions(first).map_err(|e| -> CliError {
                format!("Failed to read frame size from {}: {}", first.display(), e).into()
            })?;
            tracing::info!("Frame size {}x{} taken from {}", w, h, first.display());
            config.resolution = [w, h];
        }
    }
    if let Some(w) = args.width {
        config.resolution[0] = w;
    }
    if let Some(h) = args.height {
        config.resolution[1] = h;
    }
    Ok(())
}

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    resolve_resolution(args, &mut config)?;

    let source: Box<dyn FrameSource> = match &args.raw {
        Some(path) => {
            let format = if args.y8 {
                RawFormat::Y8
            } else {
                RawFormat::Yuv420
            };
            tracing::info!("Replaying raw {:?} dump: {}", format, path.display());
            Box::new(RawYuvSource::new(
                path,
                config.width(),
                config.height(),
                format,
            ))
        }
        None => {
            tracing::info!("Replaying {} image frames", args.frames.len());
            Box::new(ImageSequenceSource::new(args.frames.clone()))
        }
    };

    let mut sink = match &args.out {
        Some(path) => Some(BufWriter::new(File::create(path).map_err(|e| -> CliError {
            format!("Failed to create {}: {}", path.display(), e).into()
        })?)),
        None => None,
    };

    install_signal_handlers();
    let mut session = Session::open(source, config)?;
    let summary = track_session(
        &mut session,
        &CANCEL_REQUESTED,
        sink.as_mut(),
        args.max_frames,
    )?;

    if let Some(path) = &args.out {
        tracing::info!("Records written to {}", path.display());
    }
    if summary.reason == StopReason::Cancelled {
        tracing::info!("Interrupted; session closed");
    }
    tracing::info!(
        "Session ended ({:?}): {} frames, {} blinks",
        summary.reason,
        summary.frames,
        summary.blinks
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackSummary {
    reason: StopReason,
    frames: u64,
    blinks: u64,
}

/// Drive an open session to completion, printing every record and
/// appending it to `sink` as one JSON line. The sink is flushed on every
/// exit path that reaches the end of the loop, including cancellation.
fn track_session<S: FrameSource, W: Write>(
    session: &mut Session<S>,
    cancel: &AtomicBool,
    mut sink: Option<&mut W>,
    max_frames: Option<u64>,
) -> CliResult<TrackSummary> {
    let mut blinks = 0u64;
    let mut write_error: Option<std::io::Error> = None;

    let reason = session.run(cancel, |record| {
        println!("{:?}", record.as_tuple());
        if record.blink {
            blinks += 1;
        }
        if let Some(out) = sink.as_mut() {
            if let Err(e) = write_record(out, record) {
                write_error = Some(e);
                return ControlFlow::Break(());
            }
        }
        match max_frames {
            Some(max) if record.frame_index >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    if let Some(e) = write_error {
        return Err(format!("Failed to write records: {e}").into());
    }
    if let Some(out) = sink {
        out.flush()?;
    }
    Ok(TrackSummary {
        reason,
        frames: session.frame_index(),
        blinks,
    })
}

fn write_record(out: &mut impl Write, record: &MetricsRecord) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")
}
