//! Context module - frame and pose summaries for the conversational channel
//!
//! Renders compact, human-readable context lines out of raw landmark
//! geometry. The conversational side never sees coordinates; it sees the
//! `[POSE DATA]` one-liner describing what the subject is doing right now
//! and the `[TARGET POSE UPDATE]` block describing what they are aiming
//! for. Band edges follow the session protocol and are deliberately coarse:
//! the receiving end needs "left hand raised", not four decimal places.

use crate::types::{landmark_ids, Landmark, LandmarkFrame, PoseDefinition};

/// Angle at `vertex` between the rays toward `a` and `c`, in the frame
/// plane, rounded to whole degrees. Degenerate geometry (coincident points)
/// yields zero rather than an error.
pub fn joint_angle_degrees(a: &Landmark, vertex: &Landmark, c: &Landmark) -> u32 {
    let v1 = (a.x - vertex.x, a.y - vertex.y);
    let v2 = (c.x - vertex.x, c.y - vertex.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 * mag2 == 0.0 {
        return 0;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees().round() as u32
}

/// Render one frame as a `[POSE DATA]` line.
///
/// Sections are independent: any section whose landmarks are missing from
/// the frame is simply omitted, so a partial frame still yields a usable
/// line.
pub fn pose_summary(frame: &LandmarkFrame) -> String {
    use landmark_ids::{
        LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, NOSE,
        RIGHT_ANKLE, RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
    };

    let mut parts: Vec<String> = Vec::new();

    if let Some(nose) = frame.point(NOSE) {
        let head_pos = if 0.4 < nose.x && nose.x < 0.6 {
            "center"
        } else if nose.x < 0.4 {
            "left"
        } else {
            "right"
        };
        let head_tilt = if 0.3 < nose.y && nose.y < 0.5 {
            "level"
        } else if nose.y < 0.3 {
            "high"
        } else {
            "low"
        };
        parts.push(format!("Head: {head_pos}, {head_tilt}"));
    }

    if let (Some(l_sh), Some(r_sh)) = (frame.point(LEFT_SHOULDER), frame.point(RIGHT_SHOULDER)) {
        let diff = (l_sh.y - r_sh.y).abs();
        let level = if diff < 0.03 {
            "level"
        } else if l_sh.y < r_sh.y {
            "left higher"
        } else {
            "right higher"
        };
        let width = (r_sh.x - l_sh.x).abs();
        parts.push(format!("Shoulders: {level}, width={width:.2}"));
    }

    if let (Some(sh), Some(el), Some(wr)) = (
        frame.point(LEFT_SHOULDER),
        frame.point(LEFT_ELBOW),
        frame.point(LEFT_WRIST),
    ) {
        parts.push(format!("Left elbow: {}°", joint_angle_degrees(sh, el, wr)));
    }
    if let (Some(sh), Some(el), Some(wr)) = (
        frame.point(RIGHT_SHOULDER),
        frame.point(RIGHT_ELBOW),
        frame.point(RIGHT_WRIST),
    ) {
        parts.push(format!("Right elbow: {}°", joint_angle_degrees(sh, el, wr)));
    }

    if let (Some(l_wr), Some(r_wr)) = (frame.point(LEFT_WRIST), frame.point(RIGHT_WRIST)) {
        parts.push(format!(
            "Left hand: {}, Right hand: {}",
            hand_height(l_wr.y),
            hand_height(r_wr.y)
        ));
    }

    if let (Some(hip), Some(knee), Some(ankle)) = (
        frame.point(LEFT_HIP),
        frame.point(LEFT_KNEE),
        frame.point(LEFT_ANKLE),
    ) {
        parts.push(format!("Left knee: {}°", joint_angle_degrees(hip, knee, ankle)));
    }
    if let (Some(hip), Some(knee), Some(ankle)) = (
        frame.point(RIGHT_HIP),
        frame.point(RIGHT_KNEE),
        frame.point(RIGHT_ANKLE),
    ) {
        parts.push(format!("Right knee: {}°", joint_angle_degrees(hip, knee, ankle)));
    }

    if let (Some(l_ank), Some(r_ank)) = (frame.point(LEFT_ANKLE), frame.point(RIGHT_ANKLE)) {
        let width = (r_ank.x - l_ank.x).abs();
        let visible = l_ank.visibility > 0.5 && r_ank.visibility > 0.5;
        parts.push(format!("Feet: width={width:.2}, visible={visible}"));
    }

    if let (Some(l_hip), Some(r_hip), Some(l_sh), Some(r_sh)) = (
        frame.point(LEFT_HIP),
        frame.point(RIGHT_HIP),
        frame.point(LEFT_SHOULDER),
        frame.point(RIGHT_SHOULDER),
    ) {
        let hip_center_x = (l_hip.x + r_hip.x) / 2.0;
        let shoulder_center_x = (l_sh.x + r_sh.x) / 2.0;
        let lean = if shoulder_center_x - hip_center_x > 0.05 {
            "leaning right"
        } else if hip_center_x - shoulder_center_x > 0.05 {
            "leaning left"
        } else {
            "neutral"
        };
        parts.push(format!("Torso: {lean}"));
    }

    format!("[POSE DATA] {}", parts.join(" | "))
}

fn hand_height(y: f64) -> &'static str {
    if y < 0.4 {
        "raised"
    } else if y < 0.6 {
        "waist"
    } else {
        "down"
    }
}

/// Render the `[TARGET POSE UPDATE]` block for a newly selected pose:
/// title, camera direction, the per-body-part target description (with
/// conventional defaults where the pose is silent), up to three tips, and
/// the coaching directive.
pub fn target_pose_context(pose: &PoseDefinition) -> String {
    let structure = pose.structure.clone().unwrap_or_default();
    let head = non_empty_or(&structure.head, "Natural position");
    let hands = non_empty_or(&structure.hands, "Relaxed by sides");
    let feet = non_empty_or(&structure.feet, "Shoulder-width apart");

    let tips = if pose.tips.is_empty() {
        "- Stay relaxed and natural".to_string()
    } else {
        pose.tips
            .iter()
            .take(3)
            .map(|tip| format!("- {tip}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "[TARGET POSE UPDATE]\n\
         The user is aiming for the pose: \"{}\"\n\
         \n\
         Camera direction: {}\n\
         \n\
         Target position:\n\
         - Head: {head}\n\
         - Hands/arms: {hands}\n\
         - Legs/feet: {feet}\n\
         \n\
         Tips:\n\
         {tips}\n\
         \n\
         Coach the user toward this pose. When live pose data arrives, compare it \
         against the target and give one short correction at a time, in plain \
         spoken language. If they are already close, encourage them!",
        pose.display_name(),
        pose.description,
    )
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
