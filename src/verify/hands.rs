//! Hand and arm geometry.
//!
//! The free-form description picks the rule, first match wins: on the hip,
//! relaxed at the sides, elbows pushed back, then raised overhead.

use super::{bands, labels, visibility_failure, visibility_issues, CheckReport, FailCause};
use crate::types::landmark_ids::{
    LEFT_ELBOW, LEFT_HIP, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ELBOW, RIGHT_HIP, RIGHT_SHOULDER,
    RIGHT_WRIST,
};
use crate::types::{DebugSnapshot, LandmarkFrame};
use tracing::debug;

pub(super) fn evaluate(frame: &LandmarkFrame, desc: &str) -> Option<CheckReport> {
    if desc.contains("waist") || desc.contains("hip") {
        return Some(on_hip(frame));
    }
    if desc.contains("relax") || desc.contains("down") || desc.contains("side") {
        return Some(relaxed(frame));
    }
    if desc.contains("elbow") && desc.contains("back") {
        return Some(elbows_back(frame));
    }
    if desc.contains("up") || desc.contains("hair") || desc.contains("above") || desc.contains("head")
    {
        return Some(raised(frame));
    }
    None
}

/// At least one wrist resting on its hip: close in both axes.
fn on_hip(frame: &LandmarkFrame) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let required = [LEFT_WRIST, RIGHT_WRIST, LEFT_HIP, RIGHT_HIP];
    let mut snapshot = DebugSnapshot::for_check("hands_position");
    snapshot.landmarks_used = labels(&required);

    let issues = visibility_issues(frame, &required);
    if !issues.is_empty() {
        return visibility_failure(snapshot, issues);
    }

    let l_wrist = frame.points[LEFT_WRIST];
    let r_wrist = frame.points[RIGHT_WRIST];
    let l_hip = frame.points[LEFT_HIP];
    let r_hip = frame.points[RIGHT_HIP];
    let hip_y = (l_hip.y + r_hip.y) / 2.0;

    let l_dist_y = (l_wrist.y - hip_y).abs();
    let l_dist_x = (l_wrist.x - l_hip.x).abs();
    let r_dist_y = (r_wrist.y - hip_y).abs();
    let r_dist_x = (r_wrist.x - r_hip.x).abs();
    let l_dist = (l_dist_y.powi(2) + l_dist_x.powi(2)).sqrt();
    let r_dist = (r_dist_y.powi(2) + r_dist_x.powi(2)).sqrt();

    snapshot
        .value("left_wrist_x", l_wrist.x)
        .value("left_wrist_y", l_wrist.y)
        .value("right_wrist_x", r_wrist.x)
        .value("right_wrist_y", r_wrist.y)
        .value("left_hip_x", l_hip.x)
        .value("left_hip_y", l_hip.y)
        .value("right_hip_x", r_hip.x)
        .value("right_hip_y", r_hip.y)
        .value("hip_y_mid", hip_y)
        .value("left_dist", l_dist)
        .value("right_dist", r_dist);
    snapshot
        .threshold("max_y_diff", cfg.hand_hip_y_tolerance)
        .threshold("max_x_diff", cfg.hand_hip_x_tolerance)
        .threshold("max_dist", cfg.hand_hip_max_distance);

    let l_on_hip = l_dist_y < cfg.hand_hip_y_tolerance && l_dist_x < cfg.hand_hip_x_tolerance;
    let r_on_hip = r_dist_y < cfg.hand_hip_y_tolerance && r_dist_x < cfg.hand_hip_x_tolerance;

    if l_on_hip || r_on_hip {
        let which = if l_on_hip { "Left" } else { "Right" };
        snapshot.reason = format!("{which} hand is on hip");
        debug!(l_dist, r_dist, which, "CHECK hand_on_hip -> PASS");
        return CheckReport::pass(snapshot);
    }

    let almost_y = cfg.hand_hip_y_tolerance * bands::HAND_ON_HIP_ALMOST_MULTIPLIER;
    let almost_x = cfg.hand_hip_x_tolerance * bands::HAND_ON_HIP_ALMOST_MULTIPLIER;
    let l_almost = l_dist_y < almost_y && l_dist_x < almost_x;
    let r_almost = r_dist_y < almost_y && r_dist_x < almost_x;

    if l_almost || r_almost {
        let which = if l_almost { "Left" } else { "Right" };
        snapshot.reason = format!("{which} hand is close to hip");
        debug!(l_dist, r_dist, which, "CHECK hand_on_hip -> ALMOST");
        return CheckReport::almost(
            snapshot,
            format!("{which} hand — move it a bit closer to your hip bone"),
        );
    }

    debug!(l_dist, r_dist, "CHECK hand_on_hip -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Neither hand is on hip (L_dist={l_dist:.3}, R_dist={r_dist:.3})"),
        FailCause::NotSatisfied,
    )
}

/// Both arms hanging: wrists low in the frame.
fn relaxed(frame: &LandmarkFrame) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let required = [LEFT_WRIST, RIGHT_WRIST];
    let mut snapshot = DebugSnapshot::for_check("hands_position");
    snapshot.landmarks_used = labels(&required);

    let issues = visibility_issues(frame, &required);
    if !issues.is_empty() {
        return visibility_failure(snapshot, issues);
    }

    let min_y = cfg.arms_down_min_wrist_y;
    let l_wrist_y = frame.points[LEFT_WRIST].y;
    let r_wrist_y = frame.points[RIGHT_WRIST].y;

    snapshot
        .value("left_wrist_y", l_wrist_y)
        .value("right_wrist_y", r_wrist_y);
    snapshot.threshold("min_y", min_y);

    if l_wrist_y > min_y && r_wrist_y > min_y {
        snapshot.reason = "Both arms are down/relaxed".to_string();
        debug!(l_wrist_y, r_wrist_y, min_y, "CHECK hands_relaxed -> PASS");
        return CheckReport::pass(snapshot);
    }
    let almost_min = min_y - bands::ARMS_DOWN_ALMOST_MARGIN;
    if l_wrist_y > almost_min || r_wrist_y > almost_min {
        snapshot.reason = "Arms almost down".to_string();
        debug!(l_wrist_y, r_wrist_y, min_y, "CHECK hands_relaxed -> ALMOST");
        return CheckReport::almost(snapshot, "Arms — let them drop a bit more, completely relaxed");
    }

    debug!(l_wrist_y, r_wrist_y, min_y, "CHECK hands_relaxed -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Arms not relaxed (L_y={l_wrist_y:.3}, R_y={r_wrist_y:.3}, need >{min_y})"),
        FailCause::NotSatisfied,
    )
}

/// At least one elbow pushed out past the shoulder line.
fn elbows_back(frame: &LandmarkFrame) -> CheckReport {
    let cfg = &crate::config::get().verifier;
    let required = [LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_ELBOW, RIGHT_ELBOW];
    let mut snapshot = DebugSnapshot::for_check("hands_position");
    snapshot.landmarks_used = labels(&required);

    let issues = visibility_issues(frame, &required);
    if !issues.is_empty() {
        return visibility_failure(snapshot, issues);
    }

    let l_shoulder_x = frame.points[LEFT_SHOULDER].x;
    let r_shoulder_x = frame.points[RIGHT_SHOULDER].x;
    let l_elbow_x = frame.points[LEFT_ELBOW].x;
    let r_elbow_x = frame.points[RIGHT_ELBOW].x;
    let l_diff = l_elbow_x - l_shoulder_x;
    let r_diff = r_shoulder_x - r_elbow_x;

    snapshot
        .value("l_shoulder_x", l_shoulder_x)
        .value("l_elbow_x", l_elbow_x)
        .value("l_diff", l_diff)
        .value("r_shoulder_x", r_shoulder_x)
        .value("r_elbow_x", r_elbow_x)
        .value("r_diff", r_diff);
    snapshot.threshold("min_diff", cfg.elbow_back_min_offset);

    if l_diff.abs() > cfg.elbow_back_min_offset || r_diff.abs() > cfg.elbow_back_min_offset {
        debug!(l_diff, r_diff, "CHECK elbow_back -> PASS");
        return CheckReport::pass(snapshot);
    }

    debug!(l_diff, r_diff, "CHECK elbow_back -> FAIL");
    CheckReport::fail(snapshot, "Elbows not back enough", FailCause::NotSatisfied)
}

/// Wrists above the shoulders.
fn raised(frame: &LandmarkFrame) -> CheckReport {
    let required = [LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_WRIST, RIGHT_WRIST];
    let mut snapshot = DebugSnapshot::for_check("hands_position");
    snapshot.landmarks_used = labels(&required);

    let issues = visibility_issues(frame, &required);
    if !issues.is_empty() {
        return visibility_failure(snapshot, issues);
    }

    let l_shoulder_y = frame.points[LEFT_SHOULDER].y;
    let r_shoulder_y = frame.points[RIGHT_SHOULDER].y;
    let l_wrist_y = frame.points[LEFT_WRIST].y;
    let r_wrist_y = frame.points[RIGHT_WRIST].y;
    let shoulder_avg_y = (l_shoulder_y + r_shoulder_y) / 2.0;

    // Lower y is higher on screen
    let l_above = l_wrist_y < l_shoulder_y;
    let r_above = r_wrist_y < r_shoulder_y;

    snapshot
        .value("left_wrist_y", l_wrist_y)
        .value("right_wrist_y", r_wrist_y)
        .value("left_shoulder_y", l_shoulder_y)
        .value("right_shoulder_y", r_shoulder_y)
        .value("shoulder_avg_y", shoulder_avg_y);
    snapshot.threshold("wrist_y_must_be_less_than", shoulder_avg_y);

    if l_above && r_above {
        snapshot.reason = "Both hands are above shoulders".to_string();
        debug!(l_wrist_y, r_wrist_y, shoulder_avg_y, "CHECK hands_up -> PASS");
        return CheckReport::pass(snapshot);
    }
    if l_above || r_above {
        let (which, other, other_cap) = if l_above {
            ("Left", "right", "Right")
        } else {
            ("Right", "left", "Left")
        };
        snapshot.reason = format!("{which} hand is up, {other} needs to go higher");
        debug!(l_wrist_y, r_wrist_y, shoulder_avg_y, which, "CHECK hands_up -> ALMOST");
        return CheckReport::almost(
            snapshot,
            format!("{other_cap} hand - raise it above your shoulder"),
        );
    }

    let close_line = shoulder_avg_y + bands::HANDS_UP_CLOSE_MARGIN;
    if l_wrist_y < close_line || r_wrist_y < close_line {
        snapshot.reason = "Hands almost at shoulder level".to_string();
        debug!(l_wrist_y, r_wrist_y, shoulder_avg_y, "CHECK hands_up -> ALMOST (close)");
        return CheckReport::almost(snapshot, "Hands - raise them a bit higher, above your shoulders");
    }

    debug!(l_wrist_y, r_wrist_y, shoulder_avg_y, "CHECK hands_up -> FAIL");
    CheckReport::fail(
        snapshot,
        format!(
            "Hands not raised (L_y={l_wrist_y:.3}, R_y={r_wrist_y:.3}, need < shoulder_y={shoulder_avg_y:.3})"
        ),
        FailCause::NotSatisfied,
    )
}
