use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use reelcraft_core::config::EngineConfig;
use reelcraft_core::types::{Clip, TimeUs, Timeline};
use reelcraft_media::export::load_request;

#[derive(Parser, Debug)]
#[command(name = "reelcraft", version, about = "Inspect timeline snapshots")]
struct Cli {
    /// Engine config JSON; missing keys take defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report overlapping clips and clips on incompatible tracks.
    Validate {
        /// Render request JSON.
        snapshot: PathBuf,
    },
    /// List the clips live at a play-head position.
    Live {
        snapshot: PathBuf,

        /// Play-head position in seconds.
        #[arg(long)]
        at: f64,
    },
    /// Print the effective engine config as JSON.
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("read config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.cmd {
        Command::Validate { snapshot } => cmd_validate(&snapshot, &config),
        Command::Live { snapshot, at } => cmd_live(&snapshot, at, &config),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_timeline(path: &Path, config: &EngineConfig) -> anyhow::Result<Timeline> {
    let request = load_request(path).with_context(|| format!("read snapshot '{}'", path.display()))?;
    let timeline = request.to_timeline(config.extent_margin)?;
    tracing::debug!(
        tracks = timeline.track_count(),
        clips = timeline.clips.len(),
        "snapshot loaded"
    );
    Ok(timeline)
}

fn describe(timeline: &Timeline, clip: &Clip) -> String {
    let track = timeline
        .track(clip.track_id)
        .map(|t| t.name.as_str())
        .unwrap_or("<missing track>");
    format!(
        "{} [{} .. {}) on {} ({})",
        clip.name,
        clip.start,
        clip.end(),
        track,
        clip.id
    )
}

fn cmd_validate(path: &Path, config: &EngineConfig) -> anyhow::Result<()> {
    let timeline = load_timeline(path, config)?;
    let overlaps = timeline.overlapping_pairs();
    let misplaced = timeline.misplaced_clips();

    for (a, b) in &overlaps {
        if let (Some(a), Some(b)) = (timeline.clip(*a), timeline.clip(*b)) {
            println!("overlap: {}  <->  {}", describe(&timeline, a), describe(&timeline, b));
        }
    }
    for id in &misplaced {
        if let Some(clip) = timeline.clip(*id) {
            println!("misplaced {:?}: {}", clip.kind, describe(&timeline, clip));
        }
    }

    let problems = overlaps.len() + misplaced.len();
    if problems > 0 {
        bail!("{problems} problem(s) in '{}'", path.display());
    }
    println!(
        "ok: {} clips on {} tracks, duration {}",
        timeline.clips.len(),
        timeline.track_count(),
        timeline.duration
    );
    Ok(())
}

fn cmd_live(path: &Path, at: f64, config: &EngineConfig) -> anyhow::Result<()> {
    if !at.is_finite() || at < 0.0 {
        bail!("--at must be a non-negative number of seconds");
    }
    let timeline = load_timeline(path, config)?;
    let t = TimeUs::from_seconds(at);
    let live = timeline.live_at(t);

    println!("play-head {t}");
    match live.main {
        Some(clip) => println!(
            "main:    {} @ source {}",
            describe(&timeline, clip),
            clip.source_time_at(t)
        ),
        None => println!("main:    -"),
    }
    for clip in &live.overlays {
        println!("overlay: {}", describe(&timeline, clip));
    }
    for clip in &live.audio {
        println!(
            "audio:   {} @ source {} vol {:.2}",
            describe(&timeline, clip),
            clip.source_time_at(t),
            clip.volume
        );
    }
    Ok(())
}
