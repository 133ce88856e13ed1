//! Landmark Frame Simulation
//!
//! Generates landmark JSONL for a scripted subject working through a pose,
//! for testing PoseCoach without a camera. The subject settles into frame,
//! then adopts the pose one step at a time, holding everything it already
//! has in place.
//!
//! # Usage
//! ```bash
//! ./posecoach-sim --pose hands-on-hips --seconds 90 > session.jsonl
//! ./posecoach-sim --pose hands-on-hips --seconds 90 | ./posecoach --stdin
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use posecoach::acquisition::SyntheticSubject;
use posecoach::store::PoseStore;
use posecoach::{config, CoachConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posecoach-sim")]
#[command(about = "Landmark frame simulation for PoseCoach testing")]
#[command(version)]
struct Args {
    /// Pose the scripted subject works through, by id
    #[arg(short, long, default_value = "confident-stance")]
    pose: String,

    /// Pose definition file (JSON); falls back to built-ins if absent
    #[arg(long, default_value = "poses.json")]
    poses: PathBuf,

    /// Length of the generated session in seconds
    #[arg(short, long, default_value = "120", value_parser = clap::value_parser!(u64).range(1..=3600))]
    seconds: u64,

    /// Frame spacing in milliseconds (200 = 5 fps)
    #[arg(long, default_value = "200", value_parser = clap::value_parser!(u64).range(20..=2000))]
    interval_ms: u64,

    /// Random seed for coordinate jitter
    #[arg(long, default_value = "0")]
    seed: u64,
}

// ============================================================================
// Wire format
// ============================================================================

/// One output line. Landmarks are positional: array index is the landmark id.
#[derive(Serialize)]
struct FrameLine {
    ts_ms: u64,
    landmarks: Vec<PointLine>,
}

#[derive(Serialize)]
struct PointLine {
    x: f64,
    y: f64,
    z: f64,
    v: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The subject derives steps the same way the coach does, which needs
    // the threshold config in place.
    config::init(CoachConfig::load());

    let store = PoseStore::load_or_builtin(&args.poses)
        .with_context(|| format!("Failed to load pose file {}", args.poses.display()))?;
    let pose = store.get_with_steps(&args.pose).with_context(|| {
        let known: Vec<&str> = store.list().map(|p| p.id.as_str()).collect();
        format!("Unknown pose '{}'. Available: {}", args.pose, known.join(", "))
    })?;

    let mut subject = SyntheticSubject::new(&pose)
        .with_seed(args.seed)
        .with_interval(std::time::Duration::from_millis(args.interval_ms));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let total_ms = args.seconds * 1000;
    loop {
        let (ts_ms, frame) = subject.scripted_frame();
        if ts_ms >= total_ms {
            break;
        }
        let line = FrameLine {
            ts_ms,
            landmarks: frame
                .points
                .iter()
                .map(|p| PointLine {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    v: p.visibility,
                })
                .collect(),
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    eprintln!(
        "Generated {}s of frames for '{}' at {}ms spacing",
        args.seconds,
        pose.display_name(),
        args.interval_ms
    );
    Ok(())
}
