//! Foot and stance geometry.

use super::{bands, labels, visibility_failure, visibility_issues, CheckReport, FailCause};
use crate::types::landmark_ids::{LEFT_ANKLE, RIGHT_ANKLE};
use crate::types::{DebugSnapshot, LandmarkFrame};
use tracing::debug;

pub(super) fn evaluate(frame: &LandmarkFrame, desc: &str) -> Option<CheckReport> {
    let mut snapshot = DebugSnapshot::for_check("feet_position");
    snapshot.landmarks_used = labels(&[LEFT_ANKLE, RIGHT_ANKLE]);

    let issues = visibility_issues(frame, &[LEFT_ANKLE, RIGHT_ANKLE]);
    if !issues.is_empty() {
        return Some(visibility_failure(snapshot, issues));
    }

    let l_ankle = frame.points[LEFT_ANKLE];
    let r_ankle = frame.points[RIGHT_ANKLE];
    let feet_width = (l_ankle.x - r_ankle.x).abs();
    snapshot
        .value("left_ankle_x", l_ankle.x)
        .value("right_ankle_x", r_ankle.x)
        .value("feet_width", feet_width);

    if desc.contains("together") || desc.contains("close") {
        return Some(together(snapshot, feet_width));
    }
    if desc.contains("apart") || desc.contains("wide") || desc.contains("shoulder") || desc.contains("spread")
    {
        return Some(apart(snapshot, feet_width));
    }
    if desc.contains("forward") || desc.contains("stagger") || desc.contains("step") {
        return Some(staggered(snapshot, l_ankle.y, r_ankle.y));
    }
    None
}

fn together(mut snapshot: DebugSnapshot, feet_width: f64) -> CheckReport {
    let threshold = crate::config::get().verifier.feet_together_max_gap;
    snapshot.threshold("max_width", threshold);

    if feet_width < threshold {
        snapshot.reason = "Feet are together".to_string();
        debug!(feet_width, threshold, "CHECK feet_together -> PASS");
        return CheckReport::pass(snapshot);
    }
    if feet_width < threshold * bands::FEET_TOGETHER_ALMOST_MULTIPLIER {
        debug!(feet_width, threshold, "CHECK feet_together -> ALMOST");
        return CheckReport::almost(snapshot, "Feet — bring them a bit closer together");
    }

    debug!(feet_width, threshold, "CHECK feet_together -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Feet too far apart (width={feet_width:.3}, need <{threshold})"),
        FailCause::NotSatisfied,
    )
}

fn apart(mut snapshot: DebugSnapshot, feet_width: f64) -> CheckReport {
    let threshold = crate::config::get().verifier.feet_apart_min_gap;
    snapshot.threshold("min_width", threshold);

    if feet_width > threshold {
        snapshot.reason = "Feet are apart".to_string();
        debug!(feet_width, threshold, "CHECK feet_apart -> PASS");
        return CheckReport::pass(snapshot);
    }
    if feet_width > threshold * bands::FEET_APART_ALMOST_FRACTION {
        debug!(feet_width, threshold, "CHECK feet_apart -> ALMOST");
        return CheckReport::almost(snapshot, "Feet — spread them a bit wider apart");
    }

    debug!(feet_width, threshold, "CHECK feet_apart -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Feet too close (width={feet_width:.3}, need >{threshold})"),
        FailCause::NotSatisfied,
    )
}

/// One foot stepped ahead of the other, read from the ankle height gap.
fn staggered(mut snapshot: DebugSnapshot, l_ankle_y: f64, r_ankle_y: f64) -> CheckReport {
    let threshold = crate::config::get().verifier.stagger_min_y_offset;
    let feet_y_diff = (l_ankle_y - r_ankle_y).abs();
    snapshot.value("feet_y_diff", feet_y_diff);
    snapshot.threshold("min_y_diff", threshold);

    if feet_y_diff > threshold {
        // The forward foot projects lower in the frame
        let front = if l_ankle_y > r_ankle_y { "Left" } else { "Right" };
        snapshot.reason = format!("{front} foot is forward");
        debug!(feet_y_diff, threshold, front, "CHECK feet_staggered -> PASS");
        return CheckReport::pass(snapshot);
    }
    if feet_y_diff > bands::STAGGER_ALMOST_Y_OFFSET {
        debug!(feet_y_diff, threshold, "CHECK feet_staggered -> ALMOST");
        return CheckReport::almost(snapshot, "Feet — step one foot a bit more forward");
    }

    debug!(feet_y_diff, threshold, "CHECK feet_staggered -> FAIL");
    CheckReport::fail(
        snapshot,
        format!("Feet not staggered (y_diff={feet_y_diff:.3}, need >{threshold})"),
        FailCause::NotSatisfied,
    )
}

#[cfg(test)]
mod tests {
    use super::super::testkit::{base_frame, ensure_config, occlude, place};
    use super::super::{FailCause, LandmarkVerifier};
    use crate::types::{CheckKind, CheckSpec, PoseStep};

    fn feet_step(description: &str) -> PoseStep {
        PoseStep::new(
            "Feet",
            CheckSpec::with_description(CheckKind::FeetPosition, description),
        )
    }

    #[test]
    fn close_feet_pass_the_together_check() {
        ensure_config();
        // Base ankle gap is 0.06
        let report = LandmarkVerifier::new().evaluate(&feet_step("feet together"), &base_frame());
        assert!(report.passed());
        assert_eq!(report.debug.reason, "Feet are together");
        assert!((report.debug.values["feet_width"] - 0.06).abs() < 1e-9);
    }

    #[test]
    fn together_bands() {
        ensure_config();
        let mut frame = base_frame();
        place(&mut frame, 27, 0.55, 0.88);
        place(&mut frame, 28, 0.45, 0.88); // width 0.10, between 0.08 and 0.12
        let report = LandmarkVerifier::new().evaluate(&feet_step("bring feet close"), &frame);
        assert_eq!(report.almost_hint(), Some("Feet — bring them a bit closer together"));

        place(&mut frame, 27, 0.60, 0.88);
        place(&mut frame, 28, 0.40, 0.88); // width 0.20
        let report = LandmarkVerifier::new().evaluate(&feet_step("feet together"), &frame);
        assert_eq!(report.fail_cause(), Some(FailCause::NotSatisfied));
        assert!(report.error_text().unwrap().starts_with("Feet too far apart"));
    }

    #[test]
    fn apart_bands() {
        ensure_config();
        let mut frame = base_frame();
        place(&mut frame, 27, 0.58, 0.88);
        place(&mut frame, 28, 0.42, 0.88); // width 0.16 > 0.12
        let report =
            LandmarkVerifier::new().evaluate(&feet_step("feet shoulder-width apart"), &frame);
        assert!(report.passed());
        assert_eq!(report.debug.reason, "Feet are apart");

        place(&mut frame, 27, 0.55, 0.88);
        place(&mut frame, 28, 0.45, 0.88); // width 0.10, above the 0.084 almost floor
        let report = LandmarkVerifier::new().evaluate(&feet_step("spread your feet wide"), &frame);
        assert_eq!(report.almost_hint(), Some("Feet — spread them a bit wider apart"));

        // Base width 0.06 is under the almost floor
        let report = LandmarkVerifier::new().evaluate(&feet_step("feet apart"), &base_frame());
        assert!(report.error_text().unwrap().starts_with("Feet too close"));
    }

    #[test]
    fn staggered_stance_bands() {
        ensure_config();
        let mut frame = base_frame();
        place(&mut frame, 27, 0.53, 0.93); // left ankle 0.05 lower
        let report = LandmarkVerifier::new().evaluate(&feet_step("step one foot forward"), &frame);
        assert!(report.passed());
        assert_eq!(report.debug.reason, "Left foot is forward");

        place(&mut frame, 27, 0.53, 0.90); // diff 0.02, between 0.015 and 0.03
        let report = LandmarkVerifier::new().evaluate(&feet_step("staggered stance"), &frame);
        assert_eq!(report.almost_hint(), Some("Feet — step one foot a bit more forward"));

        let report =
            LandmarkVerifier::new().evaluate(&feet_step("step one foot forward"), &base_frame());
        assert!(report.error_text().unwrap().starts_with("Feet not staggered"));
    }

    #[test]
    fn keyword_order_prefers_together_over_apart() {
        ensure_config();
        // "close" appears alongside "shoulder": the together rule wins
        let report = LandmarkVerifier::new()
            .evaluate(&feet_step("feet close, not shoulder width"), &base_frame());
        assert!(report.passed());
        assert_eq!(report.debug.thresholds["max_width"], 0.08);
    }

    #[test]
    fn occluded_ankle_fails_visibility() {
        ensure_config();
        let mut frame = base_frame();
        occlude(&mut frame, 28);
        let report = LandmarkVerifier::new().evaluate(&feet_step("feet together"), &frame);
        assert_eq!(report.fail_cause(), Some(FailCause::LowVisibility));
        assert!(report.error_text().unwrap().contains("landmark_28_low_vis"));
    }
}
