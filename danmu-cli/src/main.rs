//! danmu CLI Tool
//!
//! Command-line interface for inspecting, converting, rendering and playing
//! danmu overlay tracks.

mod progress;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use danmu_core::parser::to_json;
use danmu_core::{
    JsonParser, KindTag, OverlayItem, Parser as TrackSource, StyleConfig, StyleSettings, Track,
    TrackParser,
};
use danmu_player::{BlockRasterizer, FrameCompositor, ImageSurfaceProvider, Player, PlayerConfig};
use progress::ProgressTracker;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "danmu")]
#[command(about = "danmu - timed text overlay engine")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a track
    Info {
        /// Track file (.dmk or .json)
        input: PathBuf,
    },

    /// Render frames of a track to PNG files
    Render {
        /// Track file (.dmk or .json)
        input: PathBuf,

        /// Output directory, or output file with --frame
        #[arg(short, long)]
        output: PathBuf,

        /// Frame width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Output frame rate
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Render a single frame by frame number
        #[arg(long)]
        frame: Option<u64>,

        /// Style settings (JSON)
        #[arg(long)]
        style: Option<PathBuf>,
    },

    /// Play a track in real time on an offscreen surface
    Play {
        /// Track file (.dmk or .json)
        input: PathBuf,

        /// How long to play, in seconds
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Start offset in milliseconds
        #[arg(long, default_value = "0")]
        start: u64,

        /// Playback speed
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Surface width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Surface height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Draw the diagnostic overlay
        #[arg(long)]
        debug: bool,

        /// Style settings (JSON)
        #[arg(long)]
        style: Option<PathBuf>,

        /// Save the last frame to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Convert between JSON and binary tracks, by file extension
    Convert {
        /// Input track file
        input: PathBuf,

        /// Output track file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "danmu=debug" } else { "danmu=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Info { input } => show_info(&input)?,

        Commands::Render {
            input,
            output,
            width,
            height,
            fps,
            frame,
            style,
        } => render_track(&input, &output, width, height, fps, frame, style.as_deref())?,

        Commands::Play {
            input,
            seconds,
            start,
            speed,
            width,
            height,
            debug,
            style,
            snapshot,
        } => play_track(PlayOptions {
            input,
            duration: Duration::from_secs(seconds),
            start: Duration::from_millis(start),
            speed,
            width,
            height,
            debug,
            style,
            snapshot,
        })?,

        Commands::Convert { input, output } => convert_track(&input, &output)?,
    }

    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Opens a track source chosen by file extension
fn open_track(path: &Path) -> Result<Box<dyn TrackSource>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    if is_json(path) {
        let parser = JsonParser::from_reader(reader).context("Failed to read JSON track")?;
        Ok(Box::new(parser))
    } else {
        Ok(Box::new(TrackParser::new(reader)))
    }
}

fn read_items(path: &Path) -> Result<Vec<OverlayItem>> {
    open_track(path)?
        .parse()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_style(path: Option<&Path>) -> Result<StyleConfig> {
    let Some(path) = path else {
        return Ok(StyleConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read style settings {}", path.display()))?;
    let settings = StyleSettings::from_json(&json).context("Invalid style settings")?;
    Ok(settings.into_config())
}

fn show_info(input: &Path) -> Result<()> {
    let track = Track::from_items(read_items(input)?);

    println!("\n=== Track Information ===");
    println!("File: {}", input.display());
    println!("Items: {}", track.header.num_items);
    println!(
        "Duration: {} ms ({:.2} seconds)",
        track.header.duration_ms,
        track.header.duration_ms as f64 / 1000.0
    );
    let hidden = track.items.iter().filter(|item| !item.visible).count();
    println!("Hidden items: {}", hidden);

    println!("\n=== Kinds ===");
    for tag in KindTag::ALL {
        let count = track.items.iter().filter(|item| item.tag_kind() == tag).count();
        if count > 0 {
            println!("  {:<14} {}", tag.name(), count);
        }
    }

    println!("\n=== Items (first 10) ===");
    for (i, item) in track.items.iter().take(10).enumerate() {
        println!(
            "  [{}] {} from {}ms to {}ms: {:?}",
            i,
            item.tag_kind().name(),
            item.offset_ms,
            item.offset_ms.saturating_add(item.duration_ms),
            item.text
        );
    }
    if track.items.len() > 10 {
        println!("  ... and {} more items", track.items.len() - 10);
    }

    Ok(())
}

fn render_track(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    fps: f64,
    frame_num: Option<u64>,
    style: Option<&Path>,
) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("Frame rate must be positive, got {fps}");
    }
    let items = read_items(input)?;
    let style = load_style(style)?;
    let mut compositor =
        FrameCompositor::new(items, style, width, height).context("Failed to create compositor")?;
    let frame_ms = |i: u64| (i as f64 * 1000.0 / fps) as u64;

    if let Some(frame_num) = frame_num {
        // Lanes depend on history, so every earlier frame is composed first
        let timestamp_ms = frame_ms(frame_num);
        info!("Rendering frame {} at {}ms", frame_num, timestamp_ms);
        for i in 0..frame_num {
            compositor.render_frame(frame_ms(i));
        }
        compositor
            .save_frame(timestamp_ms, output)
            .context("Failed to save frame")?;
        info!("Saved frame to {}", output.display());
        return Ok(());
    }

    std::fs::create_dir_all(output).context("Failed to create output directory")?;
    let duration_ms = compositor.duration_ms();
    let frame_count = ((duration_ms as f64 * fps / 1000.0).floor() as u64).max(1);
    info!(
        "Rendering {} frames ({}x{} @ {} fps) to {}",
        frame_count,
        width,
        height,
        fps,
        output.display()
    );

    let mut progress = ProgressTracker::new(frame_count, "Rendered");
    for i in 0..frame_count {
        let frame_path = output.join(format!("frame_{:06}.png", i));
        compositor
            .save_frame(frame_ms(i), &frame_path)
            .with_context(|| format!("Failed to save {}", frame_path.display()))?;
        progress.increment_and_report(30);
    }

    info!("Successfully rendered all frames");
    Ok(())
}

struct PlayOptions {
    input: PathBuf,
    duration: Duration,
    start: Duration,
    speed: f64,
    width: u32,
    height: u32,
    debug: bool,
    style: Option<PathBuf>,
    snapshot: Option<PathBuf>,
}

fn play_track(options: PlayOptions) -> Result<()> {
    let style = load_style(options.style.as_deref())?;
    let (provider, sink) = ImageSurfaceProvider::new(options.width, options.height);
    let config = PlayerConfig {
        debug: options.debug,
        ..PlayerConfig::default()
    };
    let player =
        Player::spawn(provider, BlockRasterizer::new(), config).context("Failed to start player")?;

    player.set_config(style);
    let mut source = open_track(&options.input)?;
    let loaded = player.load(&mut source).context("Failed to load track")?;
    if loaded == 0 {
        warn!("Track has no items");
    }
    player.warm_cache(false);
    player
        .set_speed(options.speed)
        .context("Invalid playback speed")?;

    player.start(options.start);
    let started = Instant::now();
    while started.elapsed() < options.duration {
        thread::sleep(Duration::from_secs(1).min(options.duration));
        info!(
            conducted_ms = player.conducted_time().as_millis() as u64,
            showing = player.showing_count(),
            frames = player.frames_rendered(),
            "playing"
        );
    }

    let frames = player.frames_rendered();
    player.destroy();
    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "Played {:.1}s, {} frames ({:.1} fps)",
        elapsed,
        frames,
        frames as f64 / elapsed
    );

    if let Some(path) = options.snapshot {
        let frame = sink.last_frame().context("No frame was rendered")?;
        frame.save(&path).context("Failed to save snapshot")?;
        info!("Saved last frame to {}", path.display());
    }
    Ok(())
}

fn convert_track(input: &Path, output: &Path) -> Result<()> {
    let items = read_items(input)?;
    let count = items.len();

    let file = File::create(output).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);
    if is_json(output) {
        let json = to_json(&items).context("Failed to serialize track")?;
        writer.write_all(json.as_bytes())?;
    } else {
        Track::from_items(items)
            .write(&mut writer)
            .context("Failed to write track")?;
    }
    writer.flush()?;

    info!("Converted {} items to {}", count, output.display());
    Ok(())
}
