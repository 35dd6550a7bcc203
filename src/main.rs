use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use frame_spy::device::{LiveDevice, MockDevice};
use frame_spy::input::{load_file, save_file};
use frame_spy::{EngineConfig, ExportFormat, Frame, PlaybackEngine, PlayerState};

/// Host tick period for replay
const TICK_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Parser, Debug)]
#[command(name = "frame-spy", version, about = "Capture and replay motion-tracking frames")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a recording's metadata
    Info { file: PathBuf },

    /// Re-encode a recording; the output extension picks the format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Keep one frame in every N+1
        #[arg(long)]
        cull: Option<usize>,
        /// First frame of the exported window
        #[arg(long)]
        from: Option<usize>,
        /// Frame after the last one of the exported window
        #[arg(long)]
        to: Option<usize>,
    },

    /// Capture frames from the mock device into a file
    Record {
        output: PathBuf,
        #[arg(long, default_value_t = 300)]
        frames: usize,
        /// Capture ring size (defaults to the saved setting)
        #[arg(long)]
        max_frames: Option<usize>,
    },

    /// Play a recording back with its original timing
    Replay {
        file: PathBuf,
        #[arg(long)]
        no_loop: bool,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load();

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    match cli.command {
        Command::Info { file } => info_cmd(&file, &config),
        Command::Convert {
            input,
            output,
            cull,
            from,
            to,
        } => convert_cmd(&input, &output, &config, cull, from, to),
        Command::Record {
            output,
            frames,
            max_frames,
        } => {
            let config = EngineConfig {
                max_frames: max_frames.unwrap_or(config.max_frames),
                ..config
            };
            rt.block_on(record_cmd(&output, frames, config))
        }
        Command::Replay {
            file,
            no_loop,
            seconds,
        } => rt.block_on(replay_cmd(&file, config, !no_loop, seconds)),
    }
}

fn info_cmd(file: &Path, config: &EngineConfig) -> Result<()> {
    let recording = load_file(file, config.recording_options())?;
    let meta = recording.metadata();

    println!("File:          {}", file.display());
    println!("Title:         {}", meta.title.as_deref().unwrap_or("-"));
    println!("Generated by:  {}", meta.generated_by);
    println!("Format:        {}", if meta.is_packed() { "packed" } else { "raw" });
    println!("Frames:        {}", recording.len());
    println!("Frame rate:    {:.1} fps", recording.frame_rate());
    if let Some(modified) = &meta.modified {
        println!("Modified:      {}", modified);
    }
    println!(
        "Suggested:     {}",
        recording.suggested_file_name(ExportFormat::Json)
    );
    Ok(())
}

fn convert_cmd(
    input: &Path,
    output: &Path,
    config: &EngineConfig,
    cull: Option<usize>,
    from: Option<usize>,
    to: Option<usize>,
) -> Result<()> {
    let mut recording = load_file(input, config.recording_options())?;

    if let Some(factor) = cull {
        recording.cull_frames(factor);
    }
    let left = from.unwrap_or(0);
    let right = to.unwrap_or(recording.len());
    if left >= right || right > recording.len() {
        bail!(
            "Invalid window {}..{} for {} frames",
            left,
            right,
            recording.len()
        );
    }
    recording.set_crop(left, right);
    recording.set_metadata();
    save_file(&recording, output)?;
    println!(
        "Wrote {} frames to {}",
        recording.cropped_frame_data().len(),
        output.display()
    );
    Ok(())
}

async fn record_cmd(output: &Path, frames: usize, config: EngineConfig) -> Result<()> {
    let mut device = MockDevice::new("mock");
    device.set_auto_generate(true);
    device
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", device.name(), e))?;

    let mut engine = PlaybackEngine::new(config, |_: &Frame| {});
    engine.record()?;

    for _ in 0..frames {
        match device.receive().await {
            Ok(Some(frame)) => engine.push(frame),
            Ok(None) => break,
            Err(e) => {
                warn!("Device error: {}", e);
                break;
            }
        }
        if engine.state() != PlayerState::Recording {
            break;
        }
    }
    if let Err(e) = device.disconnect().await {
        warn!("Failed to disconnect {}: {}", device.name(), e);
    }

    engine.stop();
    if !engine.loaded() {
        bail!("No frames captured");
    }
    save_file(engine.recording(), output)?;
    info!("Captured {} frames", engine.recording().len());
    Ok(())
}

async fn replay_cmd(file: &Path, config: EngineConfig, loop_playback: bool, seconds: f64) -> Result<()> {
    let recording = load_file(file, config.recording_options())?;

    let (tx, rx) = channel::<Frame>();
    let mut engine = PlaybackEngine::new(config, tx);
    engine.set_recording(recording)?;
    engine.play(loop_playback)?;

    let limit = Duration::from_secs_f64(seconds.max(0.0));
    let start = Instant::now();
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let mut delivered = 0usize;

    while engine.state() == PlayerState::Playing && start.elapsed() < limit {
        interval.tick().await;
        engine.tick(start.elapsed());
        for frame in rx.try_iter() {
            delivered += 1;
            println!(
                "{:>8.3}s  frame {:>6}  ts {:>12}  hands {}",
                start.elapsed().as_secs_f64(),
                frame.id().unwrap_or(-1),
                frame.timestamp().unwrap_or_default(),
                frame.hands().len()
            );
        }
    }

    engine.stop();
    info!("Delivered {} frames", delivered);
    Ok(())
}
