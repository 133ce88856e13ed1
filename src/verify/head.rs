//! Head geometry.
//!
//! All head checks hinge on the nose point; the chin check additionally
//! compares against the shoulder line when it is visible and falls back to
//! an absolute nose height when it is not.

use super::{bands, labels, visibility_failure, visibility_issues, CheckReport, FailCause};
use crate::types::landmark_ids::{LEFT_SHOULDER, NOSE, RIGHT_SHOULDER};
use crate::types::{DebugSnapshot, LandmarkFrame};
use tracing::debug;

/// Horizontal frame center the nose is measured against.
const FRAME_CENTER_X: f64 = 0.5;

pub(super) fn evaluate(frame: &LandmarkFrame, desc: &str) -> Option<CheckReport> {
    let mut snapshot = DebugSnapshot::for_check("head_position");
    snapshot.landmarks_used = labels(&[NOSE, LEFT_SHOULDER, RIGHT_SHOULDER]);

    let issues = visibility_issues(frame, &[NOSE]);
    if !issues.is_empty() {
        return Some(visibility_failure(snapshot, issues));
    }

    if desc.contains("up") || desc.contains("high") || desc.contains("lift") || desc.contains("elevat")
    {
        return Some(chin_up(frame, snapshot));
    }
    if desc.contains("tilt") || desc.contains("turn") || desc.contains("angle") {
        return Some(tilted(frame, snapshot));
    }
    if desc.contains("straight") || desc.contains("level") || desc.contains("forward") {
        return Some(straight(frame, snapshot));
    }
    None
}

/// Chin lifted: nose raised above the shoulder line by a margin. Falls back
/// to absolute nose height when the shoulders are occluded.
fn chin_up(frame: &LandmarkFrame, mut snapshot: DebugSnapshot) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let nose_y = frame.points[NOSE].y;

    if visibility_issues(frame, &[LEFT_SHOULDER, RIGHT_SHOULDER]).is_empty() {
        let shoulder_mid_y = (frame.points[LEFT_SHOULDER].y + frame.points[RIGHT_SHOULDER].y) / 2.0;
        // Lower y is higher on screen, so positive elevation means the nose
        // sits above the shoulder line
        let elevation = shoulder_mid_y - nose_y;
        let threshold = cfg.chin_up_min_elevation;

        snapshot
            .value("nose_y", nose_y)
            .value("shoulder_mid_y", shoulder_mid_y)
            .value("elevation", elevation);
        snapshot.threshold("min_elevation", threshold);

        if elevation > threshold {
            snapshot.reason = "Chin is elevated".to_string();
            debug!(nose_y, shoulder_mid_y, elevation, threshold, "CHECK chin_up -> PASS");
            return CheckReport::pass(snapshot);
        }
        if elevation > threshold * bands::CHIN_UP_ALMOST_FRACTION {
            snapshot.reason = "Chin almost high enough".to_string();
            debug!(nose_y, shoulder_mid_y, elevation, threshold, "CHECK chin_up -> ALMOST");
            return CheckReport::almost(
                snapshot,
                "Chin — lift it just a tiny bit more, like looking at the top of a doorframe",
            );
        }

        debug!(nose_y, shoulder_mid_y, elevation, threshold, "CHECK chin_up -> FAIL");
        return CheckReport::fail(
            snapshot,
            format!("Chin not elevated enough (elevation={elevation:.3}, need >{threshold})"),
            FailCause::NotSatisfied,
        );
    }

    // Shoulders occluded: absolute nose height
    snapshot.value("nose_y", nose_y);
    snapshot.threshold("max_nose_y", bands::CHIN_FALLBACK_MAX_NOSE_Y);

    if nose_y < bands::CHIN_FALLBACK_MAX_NOSE_Y {
        debug!(nose_y, "CHECK chin_up (fallback) -> PASS");
        return CheckReport::pass(snapshot);
    }
    if nose_y < bands::CHIN_FALLBACK_ALMOST_NOSE_Y {
        debug!(nose_y, "CHECK chin_up (fallback) -> ALMOST");
        return CheckReport::almost(snapshot, "Chin — lift it slightly higher");
    }
    debug!(nose_y, "CHECK chin_up (fallback) -> FAIL");
    CheckReport::fail(snapshot, "Chin not lifted", FailCause::NotSatisfied)
}

/// Head deliberately turned: nose pushed away from frame center.
fn tilted(frame: &LandmarkFrame, mut snapshot: DebugSnapshot) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let nose_x = frame.points[NOSE].x;
    let deviation = (nose_x - FRAME_CENTER_X).abs();
    let threshold = cfg.head_tilt_min_offset;

    snapshot
        .value("nose_x", nose_x)
        .value("center", FRAME_CENTER_X)
        .value("deviation", deviation);
    snapshot.threshold("min_deviation", threshold);

    if deviation > threshold {
        let direction = if nose_x < FRAME_CENTER_X { "left" } else { "right" };
        snapshot.reason = format!("Head tilted {direction}");
        debug!(nose_x, deviation, threshold, direction, "CHECK head_tilt -> PASS");
        return CheckReport::pass(snapshot);
    }
    if deviation > threshold * bands::HEAD_TILT_ALMOST_FRACTION {
        snapshot.reason = "Head almost tilted enough".to_string();
        debug!(nose_x, deviation, threshold, "CHECK head_tilt -> ALMOST");
        return CheckReport::almost(snapshot, "Head — turn it just a bit more to the side");
    }

    debug!(nose_x, deviation, threshold, "CHECK head_tilt -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Head not tilted (deviation={deviation:.3}, need >{threshold})"),
        FailCause::NotSatisfied,
    )
}

/// Head facing forward: nose near frame center.
fn straight(frame: &LandmarkFrame, mut snapshot: DebugSnapshot) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let nose_x = frame.points[NOSE].x;
    let deviation = (nose_x - FRAME_CENTER_X).abs();
    let threshold = cfg.head_straight_max_offset;

    snapshot.value("nose_x", nose_x).value("deviation", deviation);
    snapshot.threshold("max_deviation", threshold);

    if deviation < threshold {
        snapshot.reason = "Head is straight/centered".to_string();
        debug!(nose_x, deviation, threshold, "CHECK head_straight -> PASS");
        return CheckReport::pass(snapshot);
    }
    if deviation < bands::HEAD_STRAIGHT_ALMOST_OFFSET {
        let direction = if nose_x < FRAME_CENTER_X { "left" } else { "right" };
        debug!(nose_x, deviation, threshold, "CHECK head_straight -> ALMOST");
        return CheckReport::almost(
            snapshot,
            format!("Head — center it a bit more, turn slightly {direction}"),
        );
    }

    debug!(nose_x, deviation, threshold, "CHECK head_straight -> FAIL");
    CheckReport::fail(snapshot, "Head not centered", FailCause::NotSatisfied)
}
