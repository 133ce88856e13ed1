//! Landmark Verification
//!
//! Pure geometry checks over a 33-point body frame. Every step of a pose
//! names one check; the verifier judges it from normalized landmark
//! coordinates and returns a [`CheckReport`] with a pass / almost / fail
//! verdict plus a diagnostic snapshot of the values it looked at.
//!
//! Verification fails closed: a short frame, an occluded landmark, or an
//! unrecognized check tag is a failure with a named cause, never a pass.
//! Free-form check descriptions are refined into concrete geometry by
//! ordered keyword rules inside each body-region module.

pub mod bands;
mod feet;
mod hands;
mod head;
mod torso;

use crate::types::{landmark_ids, CheckKind, DebugSnapshot, LandmarkFrame, PoseStep};
use tracing::{debug, warn};

/// Timeout assumed for expression steps that do not specify one.
const DEFAULT_AUTO_ADVANCE_SECS: f64 = 8.0;

// ============================================================================
// Verdicts
// ============================================================================

/// Why a check failed. Drives escalation decisions downstream, so causes
/// are typed rather than sniffed out of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailCause {
    /// Frame missing or carrying fewer than the full 33 points.
    InsufficientFrame,
    /// A required landmark is absent or below the visibility floor.
    LowVisibility,
    /// Landmarks are trustworthy but the geometry does not satisfy the check.
    NotSatisfied,
    /// The check cannot be judged from landmarks at all; the watch timeout
    /// resolves it instead.
    AwaitingTimeout,
    /// Unrecognized check tag or description.
    UnknownCheck,
}

/// Outcome of one check evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    /// Inside the tolerance band around the threshold; `hint` is the softer
    /// corrective line shown to the user.
    Almost { hint: String },
    Fail { reason: String, cause: FailCause },
}

/// A verdict plus the diagnostic snapshot of the evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub verdict: Verdict,
    pub debug: DebugSnapshot,
}

impl CheckReport {
    pub(crate) fn pass(mut debug: DebugSnapshot) -> Self {
        debug.passed = true;
        Self {
            verdict: Verdict::Pass,
            debug,
        }
    }

    pub(crate) fn almost(mut debug: DebugSnapshot, hint: impl Into<String>) -> Self {
        debug.almost = true;
        Self {
            verdict: Verdict::Almost { hint: hint.into() },
            debug,
        }
    }

    pub(crate) fn fail(
        mut debug: DebugSnapshot,
        reason: impl Into<String>,
        cause: FailCause,
    ) -> Self {
        let reason = reason.into();
        debug.reason = reason.clone();
        Self {
            verdict: Verdict::Fail { reason, cause },
            debug,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass)
    }

    /// Corrective hint when the verdict landed in the almost band.
    pub fn almost_hint(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Almost { hint } => Some(hint),
            _ => None,
        }
    }

    /// Failure text usable in corrections. Timeout-resolved checks carry no
    /// error: they are expected to "fail" every frame until the timeout.
    pub fn error_text(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Fail { reason, cause } if *cause != FailCause::AwaitingTimeout => {
                Some(reason)
            }
            _ => None,
        }
    }

    pub fn fail_cause(&self) -> Option<FailCause> {
        match &self.verdict {
            Verdict::Fail { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Stateless evaluator of pose-step checks against a landmark frame.
///
/// Thresholds come from `config::get().verifier`; a step may override the
/// shoulders-level threshold through its check spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkVerifier;

impl LandmarkVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Judge one step's check against a frame.
    pub fn evaluate(&self, step: &PoseStep, frame: &LandmarkFrame) -> CheckReport {
        let check = &step.check;

        if !frame.is_full_body() {
            let debug = DebugSnapshot::for_check(check.kind.tag());
            let reason = "No landmarks detected or < 33 points";
            warn!(points = frame.len(), "CHECK FAIL: {reason}");
            return CheckReport::fail(debug, reason, FailCause::InsufficientFrame);
        }

        let desc = check.description.to_lowercase();
        match &check.kind {
            CheckKind::Expression => self.expression_report(step),
            CheckKind::ShouldersLevel => torso::shoulders_level(frame, check.threshold),
            CheckKind::HandsPosition => hands::evaluate(frame, &desc)
                .unwrap_or_else(|| self.unknown_report(check.kind.tag())),
            CheckKind::HeadPosition => head::evaluate(frame, &desc)
                .unwrap_or_else(|| self.unknown_report(check.kind.tag())),
            CheckKind::FeetPosition => feet::evaluate(frame, &desc)
                .unwrap_or_else(|| self.unknown_report(check.kind.tag())),
            CheckKind::Other(tag) => self.unknown_report(tag),
        }
    }

    /// Detect a named common mistake from the frame. Unrecognized detector
    /// tags never fire.
    pub fn detect_mistake(&self, tag: &str, frame: &LandmarkFrame) -> bool {
        if frame.is_empty() {
            return false;
        }

        if tag == "shoulders_hunched" {
            use landmark_ids::{LEFT_EAR, LEFT_SHOULDER, RIGHT_EAR, RIGHT_SHOULDER};
            let (Some(ls), Some(rs)) = (frame.point(LEFT_SHOULDER), frame.point(RIGHT_SHOULDER))
            else {
                return false;
            };
            let (Some(le), Some(re)) = (frame.point(LEFT_EAR), frame.point(RIGHT_EAR)) else {
                return false;
            };
            let ear_y = (le.y + re.y) / 2.0;
            let shoulder_y = (ls.y + rs.y) / 2.0;
            // Shoulders riding high, too close to the ears
            return shoulder_y < ear_y + bands::HUNCHED_SHOULDER_MARGIN;
        }

        false
    }

    fn expression_report(&self, step: &PoseStep) -> CheckReport {
        let auto_advance = step
            .auto_advance_seconds
            .unwrap_or(DEFAULT_AUTO_ADVANCE_SECS);
        let debug = DebugSnapshot::for_check("expression");
        debug!(
            auto_advance_secs = auto_advance,
            "CHECK expression: waiting for timeout"
        );
        CheckReport::fail(
            debug,
            format!("Expression check - uses timeout ({auto_advance}s), not landmarks"),
            FailCause::AwaitingTimeout,
        )
    }

    fn unknown_report(&self, tag: &str) -> CheckReport {
        let debug = DebugSnapshot::for_check(tag);
        warn!(check_type = %tag, "Unknown check type, failing closed");
        CheckReport::fail(
            debug,
            format!("Unknown check type: {tag} - cannot verify"),
            FailCause::UnknownCheck,
        )
    }
}

// ============================================================================
// Shared gates
// ============================================================================

/// Collect visibility problems for the given landmark ids. Empty means all
/// required points are present and confidently visible.
pub(crate) fn visibility_issues(frame: &LandmarkFrame, indices: &[usize]) -> Vec<String> {
    let min_visibility = crate::config::get().verifier.min_visibility;
    let mut issues = Vec::new();
    for &idx in indices {
        match frame.point(idx) {
            None => issues.push(format!("landmark_{idx}_missing")),
            Some(p) if p.visibility < min_visibility => {
                issues.push(format!("landmark_{}_low_vis({:.2})", idx, p.visibility));
            }
            Some(_) => {}
        }
    }
    issues
}

/// Build the failure report for a visibility gate that did not clear.
pub(crate) fn visibility_failure(debug: DebugSnapshot, issues: Vec<String>) -> CheckReport {
    let reason = format!("Landmarks not visible: {issues:?}");
    let check_type = &debug.check_type;
    warn!(check = %check_type, "CHECK FAIL: {reason}");
    CheckReport::fail(debug, reason, FailCause::LowVisibility)
}

/// Labels for the landmarks a check consulted, in id order.
pub(crate) fn labels(indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&idx| landmark_ids::label(idx)).collect()
}

// ============================================================================
// Test fixtures
// ============================================================================
