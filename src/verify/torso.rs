//! Shoulder geometry.

use super::{labels, visibility_failure, visibility_issues, CheckReport, FailCause};
use crate::types::landmark_ids::{LEFT_SHOULDER, RIGHT_SHOULDER};
use crate::types::{DebugSnapshot, LandmarkFrame};
use tracing::debug;

/// Shoulders level: the vertical gap between the shoulder points must stay
/// under the threshold. Steps may override the threshold per pose.
pub(super) fn shoulders_level(frame: &LandmarkFrame, override_threshold: Option<f64>) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let mut snapshot = DebugSnapshot::for_check("shoulders_level");
    snapshot.landmarks_used = labels(&[LEFT_SHOULDER, RIGHT_SHOULDER]);

    let issues = visibility_issues(frame, &[LEFT_SHOULDER, RIGHT_SHOULDER]);
    if !issues.is_empty() {
        return visibility_failure(snapshot, issues);
    }

    let threshold = override_threshold.unwrap_or(cfg.shoulder_level_max_diff);
    let almost_max = threshold * cfg.almost_multiplier;
    let left_y = frame.points[LEFT_SHOULDER].y;
    let right_y = frame.points[RIGHT_SHOULDER].y;
    let diff = (left_y - right_y).abs();

    snapshot
        .value("left_shoulder_y", left_y)
        .value("right_shoulder_y", right_y)
        .value("diff", diff);
    snapshot
        .threshold("max_diff", threshold)
        .threshold("almost_max", almost_max);

    if diff <= threshold {
        snapshot.reason = "Shoulders are level".to_string();
        debug!(left_y, right_y, diff, threshold, "CHECK shoulders_level -> PASS");
        return CheckReport::pass(snapshot);
    }
    if diff <= almost_max {
        snapshot.reason = format!("Almost level (diff={diff:.3}, need <{threshold:.3})");
        debug!(left_y, right_y, diff, threshold, "CHECK shoulders_level -> ALMOST");
        return CheckReport::almost(snapshot, "Shoulders almost level — drop the higher one slightly");
    }

    // Lower y is higher on screen
    let higher = if left_y < right_y { "left" } else { "right" };
    debug!(left_y, right_y, diff, threshold, higher, "CHECK shoulders_level -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Shoulders not level ({higher} is higher by {diff:.3})"),
        FailCause::NotSatisfied,
    )
}
