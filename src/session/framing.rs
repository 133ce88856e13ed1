//! Framing-quality analysis.
//!
//! Before any coaching starts the subject has to actually be in frame.
//! Each frame is scored against a closed list of framing problems (body
//! cut off, face or feet not visible, too close or too far, off-center)
//! and classified good / minor / major. The session controller relays the
//! issues as spoken guidance and holds the posing phase until the framing
//! stays good.

use crate::types::landmark_ids::{LEFT_ANKLE, NOSE, RIGHT_ANKLE};
use crate::types::LandmarkFrame;
use serde::Serialize;

/// Overall framing classification for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingQuality {
    Good,
    Minor,
    Major,
}

impl FramingQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            FramingQuality::Good => "good",
            FramingQuality::Minor => "minor",
            FramingQuality::Major => "major",
        }
    }
}

impl std::fmt::Display for FramingQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Minor,
    Major,
}

/// One framing problem, phrased as a spoken direction to the subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramingIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Framing verdict for one frame, with the measurements behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramingReport {
    pub quality: FramingQuality,
    pub issues: Vec<FramingIssue>,
    pub visible_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_ratio: Option<f64>,
}

impl FramingReport {
    pub fn is_good(&self) -> bool {
        self.quality == FramingQuality::Good
    }

    /// The issue list collapsed into one spoken line.
    pub fn spoken_line(&self) -> String {
        self.issues
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Scores frames against the `[framing]` bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramingAnalyzer;

impl FramingAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, frame: &LandmarkFrame) -> FramingReport {
        let config = crate::config::get();
        let bounds = &config.framing;
        let min_visibility = config.verifier.min_visibility;

        let visible: Vec<_> = frame
            .points
            .iter()
            .filter(|p| p.visibility >= min_visibility)
            .collect();
        let visible_points = visible.len();

        let (center_x, height_ratio) = if visible.is_empty() {
            (None, None)
        } else {
            let mut min_x = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            for point in &visible {
                min_x = min_x.min(point.x);
                max_x = max_x.max(point.x);
                min_y = min_y.min(point.y);
                max_y = max_y.max(point.y);
            }
            (Some((min_x + max_x) / 2.0), Some(max_y - min_y))
        };

        let mut issues = Vec::new();

        if !frame.is_full_body() || visible_points < bounds.min_visible_points {
            issues.push(major("Step back so your whole body is in frame"));
            return report(issues, visible_points, center_x, height_ratio);
        }

        let landmark_visible = |idx: usize| {
            frame
                .point(idx)
                .map_or(false, |p| p.visibility >= min_visibility)
        };
        let face_visible = landmark_visible(NOSE);
        let feet_visible = landmark_visible(LEFT_ANKLE) || landmark_visible(RIGHT_ANKLE);

        if !face_visible {
            issues.push(major("I can't see your face, look toward the camera"));
        }
        if !feet_visible {
            issues.push(major("Your feet are cut off, step back a little"));
        }

        // Box geometry is only trustworthy with both ends of the body in it.
        if face_visible && feet_visible {
            if let Some(height) = height_ratio {
                if height > bounds.max_height_ratio {
                    issues.push(major("You're too close, take a step back"));
                } else if height < bounds.min_height_ratio {
                    issues.push(minor("You're a bit far away, come a little closer"));
                }
            }
            if let Some(cx) = center_x {
                let offset = cx - 0.5;
                if offset.abs() > bounds.center_tolerance {
                    let direction = if offset > 0.0 { "right" } else { "left" };
                    issues.push(minor(format!(
                        "Move a step to your {direction}, you're off-center"
                    )));
                }
            }
        }

        report(issues, visible_points, center_x, height_ratio)
    }
}

fn major(message: impl Into<String>) -> FramingIssue {
    FramingIssue {
        severity: IssueSeverity::Major,
        message: message.into(),
    }
}

fn minor(message: impl Into<String>) -> FramingIssue {
    FramingIssue {
        severity: IssueSeverity::Minor,
        message: message.into(),
    }
}

fn report(
    issues: Vec<FramingIssue>,
    visible_points: usize,
    center_x: Option<f64>,
    height_ratio: Option<f64>,
) -> FramingReport {
    let quality = if issues.is_empty() {
        FramingQuality::Good
    } else if issues.iter().any(|i| i.severity == IssueSeverity::Major) {
        FramingQuality::Major
    } else {
        FramingQuality::Minor
    };
    FramingReport {
        quality,
        issues,
        visible_points,
        center_x,
        height_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::landmark_ids::{LEFT_ANKLE, LEFT_KNEE, NOSE, RIGHT_ANKLE, RIGHT_KNEE};
    use crate::types::{Landmark, LandmarkFrame};
    use crate::verify::testkit::{base_frame, ensure_config, occlude, place};

    #[test]
    fn well_framed_subject_scores_good() {
        ensure_config();
        let report = FramingAnalyzer::new().analyze(&base_frame());
        assert!(report.is_good());
        assert!(report.issues.is_empty());
        assert_eq!(report.visible_points, 33);
        assert!((report.center_x.unwrap() - 0.5).abs() < 1e-9);
        assert!((report.height_ratio.unwrap() - 0.58).abs() < 1e-9);
    }

    #[test]
    fn partial_body_is_a_major_issue() {
        ensure_config();
        let frame = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5, 0.9); 5]);
        let report = FramingAnalyzer::new().analyze(&frame);
        assert_eq!(report.quality, FramingQuality::Major);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0].message,
            "Step back so your whole body is in frame"
        );
    }

    #[test]
    fn hidden_face_and_feet_are_major_issues() {
        ensure_config();

        let mut no_face = base_frame();
        occlude(&mut no_face, NOSE);
        let report = FramingAnalyzer::new().analyze(&no_face);
        assert_eq!(report.quality, FramingQuality::Major);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains("face"));

        let mut no_feet = base_frame();
        occlude(&mut no_feet, LEFT_ANKLE);
        occlude(&mut no_feet, RIGHT_ANKLE);
        let report = FramingAnalyzer::new().analyze(&no_feet);
        assert_eq!(report.quality, FramingQuality::Major);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains("feet"));
    }

    #[test]
    fn distance_bounds_classify_close_and_far() {
        ensure_config();

        let mut close = base_frame();
        place(&mut close, NOSE, 0.50, 0.02);
        place(&mut close, LEFT_ANKLE, 0.53, 0.97);
        place(&mut close, RIGHT_ANKLE, 0.47, 0.97);
        let report = FramingAnalyzer::new().analyze(&close);
        assert_eq!(report.quality, FramingQuality::Major);
        assert!(report.issues[0].message.contains("too close"));

        let mut far = base_frame();
        place(&mut far, LEFT_KNEE, 0.54, 0.55);
        place(&mut far, RIGHT_KNEE, 0.46, 0.55);
        place(&mut far, LEFT_ANKLE, 0.53, 0.58);
        place(&mut far, RIGHT_ANKLE, 0.47, 0.58);
        let report = FramingAnalyzer::new().analyze(&far);
        assert_eq!(report.quality, FramingQuality::Minor);
        assert!(report.issues[0].message.contains("far away"));
    }

    #[test]
    fn off_center_subject_is_told_which_way_to_move() {
        ensure_config();
        let mut frame = base_frame();
        for idx in 0..frame.len() {
            let (x, y) = (frame.points[idx].x, frame.points[idx].y);
            place(&mut frame, idx, x + 0.25, y);
        }
        let report = FramingAnalyzer::new().analyze(&frame);
        assert_eq!(report.quality, FramingQuality::Minor);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0].message,
            "Move a step to your right, you're off-center"
        );
    }

    #[test]
    fn spoken_line_joins_all_issues() {
        ensure_config();
        let mut frame = base_frame();
        place(&mut frame, NOSE, 0.50, 0.02);
        place(&mut frame, LEFT_ANKLE, 0.53, 0.97);
        place(&mut frame, RIGHT_ANKLE, 0.47, 0.97);
        for idx in 0..frame.len() {
            let (x, y) = (frame.points[idx].x, frame.points[idx].y);
            place(&mut frame, idx, x + 0.22, y);
        }
        let report = FramingAnalyzer::new().analyze(&frame);
        assert_eq!(report.quality, FramingQuality::Major);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(
            report.spoken_line(),
            "You're too close, take a step back; Move a step to your right, you're off-center"
        );
    }
}
