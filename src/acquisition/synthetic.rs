//! Scripted synthetic subject
//!
//! Emits landmark frames of an imaginary person working through a pose.
//! The subject starts in a neutral stance that misses the opening checks,
//! then adopts the pose one step at a time on a fixed schedule, keeping
//! every previously adopted step in place. A small jitter on each
//! coordinate keeps the frames from being suspiciously perfect.

use super::{AcquisitionError, FrameEvent, FrameSource};
use crate::coach::derive_steps;
use crate::types::landmark_ids::{
    FULL_BODY_COUNT, LEFT_ANKLE, LEFT_EAR, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER,
    LEFT_WRIST, NOSE, RIGHT_ANKLE, RIGHT_EAR, RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
    RIGHT_WRIST,
};
use crate::types::{CheckKind, Landmark, LandmarkFrame, PoseDefinition, PoseStep};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Duration};

/// Time the subject spends settling into frame before following any step.
const SETTLE_SECS: u64 = 10;

/// Time the subject holds each newly adopted step before taking the next.
const STEP_HOLD_SECS: u64 = 6;

/// Spacing between emitted frames (5 fps).
const DEFAULT_INTERVAL_MS: u64 = 200;

/// Uniform noise added to every scripted coordinate.
const JITTER: f64 = 0.004;

/// Frame source playing a scripted subject adopting `pose` step by step.
pub struct SyntheticSubject {
    steps: Vec<PoseStep>,
    interval: Duration,
    settle: Duration,
    step_hold: Duration,
    rng: StdRng,
    frames_emitted: u64,
}

impl SyntheticSubject {
    pub fn new(pose: &PoseDefinition) -> Self {
        let steps = match &pose.steps {
            Some(steps) if !steps.is_empty() => steps.clone(),
            _ => derive_steps(pose),
        };
        Self {
            steps,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            settle: Duration::from_secs(SETTLE_SECS),
            step_hold: Duration::from_secs(STEP_HOLD_SECS),
            rng: StdRng::seed_from_u64(0),
            frames_emitted: 0,
        }
    }

    /// Reseed the jitter stream, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Change the frame spacing from the default 200ms.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Produce the next scripted frame with its timestamp, without pacing.
    /// The generator binary uses this directly; the live source paces it.
    pub fn scripted_frame(&mut self) -> (u64, LandmarkFrame) {
        let ts_ms = self.frames_emitted * self.interval.as_millis() as u64;
        self.frames_emitted += 1;
        let stage = self.stage(Duration::from_millis(ts_ms));
        (ts_ms, self.posture(stage))
    }

    /// Steps adopted after `elapsed` of the script: none during the settle
    /// window, then one more per hold period, up to the whole ladder.
    fn stage(&self, elapsed: Duration) -> usize {
        if elapsed < self.settle {
            return 0;
        }
        let held = (elapsed - self.settle).as_secs_f64();
        let adopted = 1 + (held / self.step_hold.as_secs_f64()) as usize;
        adopted.min(self.steps.len())
    }

    fn posture(&mut self, stage: usize) -> LandmarkFrame {
        let mut frame = neutral_frame();
        for step in &self.steps[..stage] {
            apply_check(&mut frame, step);
        }
        for point in &mut frame.points {
            point.x += self.rng.gen_range(-JITTER..=JITTER);
            point.y += self.rng.gen_range(-JITTER..=JITTER);
        }
        frame
    }
}

#[async_trait]
impl FrameSource for SyntheticSubject {
    async fn next_frame(&mut self) -> Result<FrameEvent, AcquisitionError> {
        if self.frames_emitted > 0 {
            sleep(self.interval).await;
        }
        let (_, frame) = self.scripted_frame();
        Ok(FrameEvent::Frame(frame))
    }

    fn source_name(&self) -> &str {
        "synthetic subject"
    }
}

/// The subject before any coaching: well framed and fully visible, but
/// slouching. The right shoulder droops, the chin is tucked, the feet
/// stand close together and the arms hang long past the hips.
fn neutral_frame() -> LandmarkFrame {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.95); FULL_BODY_COUNT];
    let stance: &[(usize, f64, f64)] = &[
        (NOSE, 0.50, 0.38),
        (LEFT_EAR, 0.53, 0.34),
        (RIGHT_EAR, 0.47, 0.34),
        (LEFT_SHOULDER, 0.58, 0.40),
        (RIGHT_SHOULDER, 0.42, 0.47),
        (LEFT_ELBOW, 0.60, 0.55),
        (RIGHT_ELBOW, 0.40, 0.55),
        (LEFT_WRIST, 0.60, 0.70),
        (RIGHT_WRIST, 0.40, 0.70),
        (LEFT_HIP, 0.55, 0.58),
        (RIGHT_HIP, 0.45, 0.58),
        (LEFT_KNEE, 0.54, 0.74),
        (RIGHT_KNEE, 0.46, 0.74),
        (LEFT_ANKLE, 0.53, 0.88),
        (RIGHT_ANKLE, 0.47, 0.88),
    ];
    for &(idx, x, y) in stance {
        points[idx] = Landmark::new(x, y, 0.95);
    }
    LandmarkFrame::new(points)
}

/// Move the subject into the position a step's check looks for. Keyword
/// routing mirrors the verifier's, first match wins. Only the joints the
/// checks read are scripted.
fn apply_check(frame: &mut LandmarkFrame, step: &PoseStep) {
    let desc = step.check.description.to_lowercase();
    match &step.check.kind {
        CheckKind::ShouldersLevel => {
            set(frame, LEFT_SHOULDER, 0.58, 0.40);
            set(frame, RIGHT_SHOULDER, 0.42, 0.40);
        }
        CheckKind::HandsPosition => apply_hands(frame, &desc),
        CheckKind::HeadPosition => apply_head(frame, &desc),
        CheckKind::FeetPosition => apply_feet(frame, &desc),
        CheckKind::Expression | CheckKind::Other(_) => {}
    }
}

fn apply_hands(frame: &mut LandmarkFrame, desc: &str) {
    if desc.contains("waist") || desc.contains("hip") {
        set(frame, LEFT_WRIST, 0.55, 0.58);
        set(frame, RIGHT_WRIST, 0.45, 0.58);
        set(frame, LEFT_ELBOW, 0.64, 0.52);
        set(frame, RIGHT_ELBOW, 0.36, 0.52);
    } else if desc.contains("relax") || desc.contains("down") || desc.contains("side") {
        set(frame, LEFT_WRIST, 0.60, 0.70);
        set(frame, RIGHT_WRIST, 0.40, 0.70);
        set(frame, LEFT_ELBOW, 0.60, 0.55);
        set(frame, RIGHT_ELBOW, 0.40, 0.55);
    } else if desc.contains("elbow") && desc.contains("back") {
        set(frame, LEFT_ELBOW, 0.66, 0.48);
        set(frame, RIGHT_ELBOW, 0.34, 0.48);
    } else if desc.contains("up")
        || desc.contains("hair")
        || desc.contains("above")
        || desc.contains("head")
    {
        set(frame, LEFT_WRIST, 0.60, 0.25);
        set(frame, RIGHT_WRIST, 0.40, 0.25);
        set(frame, LEFT_ELBOW, 0.62, 0.33);
        set(frame, RIGHT_ELBOW, 0.38, 0.33);
    }
}

fn apply_head(frame: &mut LandmarkFrame, desc: &str) {
    if desc.contains("up") || desc.contains("high") || desc.contains("lift") || desc.contains("elevat")
    {
        set(frame, NOSE, 0.50, 0.27);
    } else if desc.contains("tilt") || desc.contains("turn") || desc.contains("angle") {
        set(frame, NOSE, 0.61, 0.38);
    } else if desc.contains("straight") || desc.contains("level") || desc.contains("forward") {
        set(frame, NOSE, 0.50, 0.38);
    }
}

fn apply_feet(frame: &mut LandmarkFrame, desc: &str) {
    if desc.contains("together") || desc.contains("close") {
        set(frame, LEFT_ANKLE, 0.52, 0.88);
        set(frame, RIGHT_ANKLE, 0.48, 0.88);
    } else if desc.contains("apart")
        || desc.contains("wide")
        || desc.contains("shoulder")
        || desc.contains("spread")
    {
        set(frame, LEFT_ANKLE, 0.58, 0.88);
        set(frame, RIGHT_ANKLE, 0.42, 0.88);
        set(frame, LEFT_KNEE, 0.57, 0.74);
        set(frame, RIGHT_KNEE, 0.43, 0.74);
    } else if desc.contains("forward") || desc.contains("stagger") || desc.contains("step") {
        set(frame, LEFT_ANKLE, 0.53, 0.91);
        set(frame, RIGHT_ANKLE, 0.47, 0.85);
    }
}

fn set(frame: &mut LandmarkFrame, idx: usize, x: f64, y: f64) {
    let v = frame.points[idx].visibility;
    frame.points[idx] = Landmark::new(x, y, v);
}
