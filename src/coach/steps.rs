//! Default step derivation.
//!
//! Poses without an explicit step ladder get one derived from their
//! `structure` descriptions, in fixed body order: feet, shoulders, hands,
//! head. The shoulder-leveling step is always part of a derived ladder; a
//! pose with no structure at all falls back to a single expression step
//! that resolves through the watch timeout.

use crate::types::{CheckKind, CheckSpec, MistakeRule, PoseDefinition, PoseStep};

/// Shoulder-level threshold used by the derived posture step.
const SHOULDER_STEP_THRESHOLD: f64 = 0.04;

/// Timeout after which the derived expression step advances on its own.
const EXPRESSION_AUTO_ADVANCE_SECS: f64 = 8.0;

/// Derive a coaching ladder from a pose's structure descriptions.
///
/// Instructions follow the `[BODY PART] — [direction + action]` shape of
/// hand-written pose data, so derived and explicit ladders read the same to
/// the person being coached.
pub fn derive_steps(pose: &PoseDefinition) -> Vec<PoseStep> {
    let structure = pose.structure.clone().unwrap_or_default();

    if structure.is_empty() {
        return vec![expression_fallback_step()];
    }

    let mut steps = Vec::new();

    if !structure.feet.is_empty() {
        let mut step = PoseStep::new(
            format!("Feet — {}", structure.feet),
            CheckSpec::with_description(CheckKind::FeetPosition, structure.feet.to_lowercase()),
        );
        step.alt_explanations = vec![
            "Feet — look down and check your foot placement".to_string(),
            "Feet — shift your weight until they're in the right position".to_string(),
            "Feet — feel stable and grounded before the next step".to_string(),
        ];
        steps.push(step);
    }

    // Posture step is present in every derived ladder; the structure has no
    // field for it.
    let mut shoulders = PoseStep::new(
        "Shoulders — pull them down away from your ears, then back to open your chest",
        CheckSpec {
            kind: CheckKind::ShouldersLevel,
            description: String::new(),
            threshold: Some(SHOULDER_STEP_THRESHOLD),
        },
    );
    shoulders.alt_explanations = vec![
        "Shoulders — imagine squeezing a pencil between your shoulder blades".to_string(),
        "Shoulders — exhale and let them drop 2 inches down".to_string(),
        "Shoulders — roll them back in a small circle, then hold".to_string(),
    ];
    shoulders.common_mistakes = vec![MistakeRule {
        detect: "shoulders_hunched".to_string(),
        fix: "Shoulders — drop them down, they are creeping up toward your ears".to_string(),
    }];
    steps.push(shoulders);

    if !structure.hands.is_empty() {
        let mut step = PoseStep::new(
            format!("Hands — {}", structure.hands),
            CheckSpec::with_description(CheckKind::HandsPosition, structure.hands.to_lowercase()),
        );
        step.alt_explanations = vec![
            "Arms — move them into position now".to_string(),
            "Wrists — check they're at the right height".to_string(),
            "Hands — place them exactly where described".to_string(),
        ];
        steps.push(step);
    }

    if !structure.head.is_empty() {
        let mut step = PoseStep::new(
            format!("Head — {}", structure.head),
            CheckSpec::with_description(CheckKind::HeadPosition, structure.head.to_lowercase()),
        );
        step.alt_explanations = vec![
            "Chin — adjust it to match the target angle".to_string(),
            "Face — turn it toward the camera as described".to_string(),
            "Eyes — look in the direction specified".to_string(),
        ];
        steps.push(step);
    }

    steps
}

fn expression_fallback_step() -> PoseStep {
    let mut step = PoseStep::new(
        "Face — give a natural, relaxed expression toward the camera",
        CheckSpec::new(CheckKind::Expression),
    );
    step.auto_advance_seconds = Some(EXPRESSION_AUTO_ADVANCE_SECS);
    step.alt_explanations = vec![
        "Mouth — relax your jaw, let your lips part slightly".to_string(),
        "Eyes — soft gaze toward the camera lens".to_string(),
    ];
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PoseStructure;

    fn pose_with_structure(head: &str, hands: &str, feet: &str) -> PoseDefinition {
        let mut pose = PoseDefinition::new("test-pose", "Test Pose");
        pose.structure = Some(PoseStructure {
            head: head.to_string(),
            hands: hands.to_string(),
            feet: feet.to_string(),
        });
        pose
    }

    #[test]
    fn full_structure_derives_four_steps_in_body_order() {
        let pose = pose_with_structure(
            "Chin up, eyes to camera",
            "On your hips",
            "Shoulder-width apart",
        );
        let steps = derive_steps(&pose);
        assert_eq!(steps.len(), 4);

        assert_eq!(steps[0].instruction, "Feet — Shoulder-width apart");
        assert_eq!(steps[0].check.kind, CheckKind::FeetPosition);
        assert_eq!(steps[0].check.description, "shoulder-width apart");

        assert_eq!(steps[1].check.kind, CheckKind::ShouldersLevel);

        assert_eq!(steps[2].instruction, "Hands — On your hips");
        assert_eq!(steps[2].check.kind, CheckKind::HandsPosition);
        assert_eq!(steps[2].check.description, "on your hips");

        assert_eq!(steps[3].instruction, "Head — Chin up, eyes to camera");
        assert_eq!(steps[3].check.kind, CheckKind::HeadPosition);
        assert_eq!(steps[3].check.description, "chin up, eyes to camera");
    }

    #[test]
    fn shoulder_step_is_always_present_with_threshold_and_mistake() {
        let pose = pose_with_structure("Chin up", "", "");
        let steps = derive_steps(&pose);
        assert_eq!(steps.len(), 2);

        let shoulders = &steps[0];
        assert_eq!(shoulders.check.kind, CheckKind::ShouldersLevel);
        assert_eq!(shoulders.check.threshold, Some(0.04));
        assert_eq!(
            shoulders.instruction,
            "Shoulders — pull them down away from your ears, then back to open your chest"
        );
        assert_eq!(shoulders.alt_explanations.len(), 3);
        assert_eq!(shoulders.common_mistakes.len(), 1);
        assert_eq!(shoulders.common_mistakes[0].detect, "shoulders_hunched");

        assert_eq!(steps[1].check.kind, CheckKind::HeadPosition);
    }

    #[test]
    fn empty_structure_falls_back_to_expression_step() {
        let steps = derive_steps(&pose_with_structure("", "", ""));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].check.kind, CheckKind::Expression);
        assert_eq!(steps[0].auto_advance_seconds, Some(8.0));
        assert_eq!(
            steps[0].instruction,
            "Face — give a natural, relaxed expression toward the camera"
        );
        assert_eq!(steps[0].alt_explanations.len(), 2);
    }

    #[test]
    fn absent_structure_also_falls_back() {
        let pose = PoseDefinition::new("bare", "Bare");
        let steps = derive_steps(&pose);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].check.kind, CheckKind::Expression);
    }
}
