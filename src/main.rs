//! PoseCoach - Real-time Posing Coach
//!
//! Guides a subject into a target pose step by step, reading body-landmark
//! frames and speaking through a turn-taking conversational agent.
//!
//! # Usage
//!
//! ```bash
//! # Run against the built-in synthetic subject
//! cargo run --release
//!
//! # Run with live landmark JSONL on stdin
//! landmark_tracker | ./posecoach --stdin
//!
//! # Replay a recorded frame file at double speed
//! ./posecoach --file session.jsonl --speed 2
//! ```
//!
//! # Environment Variables
//!
//! - `POSECOACH_CONFIG`: Path to a TOML config file (default: ./posecoach.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use posecoach::acquisition::{JsonlSource, SyntheticSubject};
use posecoach::channel::ConsoleChannel;
use posecoach::runtime::{LoggingUiSink, SessionRuntime};
use posecoach::store::PoseStore;
use posecoach::{config, CoachConfig, PoseDefinition};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posecoach")]
#[command(about = "PoseCoach real-time posing coach engine")]
#[command(version)]
struct CliArgs {
    /// Read landmark frames from stdin (JSONL, one frame per line)
    /// Use with a tracker: landmark_tracker | ./posecoach --stdin
    #[arg(long)]
    stdin: bool,

    /// Replay landmark frames from a recorded JSONL file
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Replay speed multiplier for --file (2.0 = twice as fast)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Pose to coach, by id (see `list-poses`)
    #[arg(short, long, default_value = "confident-stance")]
    pose: String,

    /// Pose definition file (JSON); falls back to built-ins if absent
    #[arg(long, default_value = "poses.json")]
    poses: PathBuf,

    /// Simulated agent reply latency in milliseconds (console channel)
    #[arg(long, default_value = "1500")]
    reply_delay_ms: u64,

    /// Stop after this many frames (default: run until EOF or Ctrl+C)
    #[arg(long)]
    max_frames: Option<u64>,

    /// Random seed for the synthetic subject's jitter
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// List the poses available in the pose file (or built-ins)
    ListPoses,

    /// Print the active configuration as TOML and exit
    ShowConfig,
}

// ============================================================================
// Pose selection
// ============================================================================

fn load_pose(store: &PoseStore, id: &str) -> Result<PoseDefinition> {
    store.get_with_steps(id).with_context(|| {
        let known: Vec<&str> = store.list().map(|p| p.id.as_str()).collect();
        format!("Unknown pose '{}'. Available: {}", id, known.join(", "))
    })
}

fn list_poses(store: &PoseStore) {
    info!("{} pose(s) available:", store.len());
    for pose in store.list() {
        let steps = match &pose.steps {
            Some(steps) => format!("{} steps", steps.len()),
            None => "steps derived from structure".to_string(),
        };
        info!("  {} — {} ({})", pose.id, pose.display_name(), steps);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load coach configuration
    let coach_config = CoachConfig::load();
    coach_config
        .validate()
        .context("Invalid coach configuration")?;

    // Subcommand dispatch
    if let Some(SubCommand::ShowConfig) = &args.command {
        println!("{}", coach_config.to_toml()?);
        return Ok(());
    }

    config::init(coach_config);

    let store = PoseStore::load_or_builtin(&args.poses)
        .with_context(|| format!("Failed to load pose file {}", args.poses.display()))?;

    if let Some(SubCommand::ListPoses) = &args.command {
        list_poses(&store);
        return Ok(());
    }

    let pose = load_pose(&store, &args.pose)?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  PoseCoach - Real-time Posing Coach");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!("🎯 Target pose: {} ({})", pose.display_name(), pose.id);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let (channel, signal_rx) = ConsoleChannel::new(Duration::from_millis(args.reply_delay_ms));
    let runtime = SessionRuntime::new(
        channel,
        signal_rx,
        Arc::new(LoggingUiSink),
        cancel_token,
        args.max_frames,
    );

    // Dispatch to the session with the appropriate frame source
    if args.stdin {
        info!("📥 Input: stdin (landmark JSONL from tracker)");
        let mut source = JsonlSource::stdin();
        runtime.run(&pose, &mut source).await?;
    } else if let Some(path) = &args.file {
        info!("📥 Input: {} (replay at {}x)", path.display(), args.speed);
        let mut source = JsonlSource::open(path, args.speed).await?;
        runtime.run(&pose, &mut source).await?;
    } else {
        info!("📥 Input: synthetic subject (use --stdin or --file for real frames)");
        // The synthetic subject never reaches EOF; without --max-frames the
        // run ends on Ctrl+C.
        let mut source = SyntheticSubject::new(&pose);
        if let Some(seed) = args.seed {
            source = source.with_seed(seed);
        }
        runtime.run(&pose, &mut source).await?;
    }

    info!("");
    info!("✓ PoseCoach shutdown complete");
    Ok(())
}
