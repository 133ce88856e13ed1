//! Body landmark primitives
//!
//! Landmarks are normalized image coordinates produced by an external
//! pose-estimation model (33 points for a full body). Coordinates are in
//! [0, 1] with the origin at the top-left corner, so a *lower* `y` is
//! *higher* on screen. Every point carries a visibility confidence in [0, 1].

use serde::{Deserialize, Serialize};

// ============== LANDMARK IDENTIFIERS ==============

/// Landmark indices of the 33-point full-body model.
pub mod landmark_ids {
    pub const NOSE: usize = 0;
    pub const LEFT_EAR: usize = 7;
    pub const RIGHT_EAR: usize = 8;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;

    /// Number of points in a complete full-body frame.
    pub const FULL_BODY_COUNT: usize = 33;

    const NAMES: [&str; FULL_BODY_COUNT] = [
        "nose",
        "left_eye_inner",
        "left_eye",
        "left_eye_outer",
        "right_eye_inner",
        "right_eye",
        "right_eye_outer",
        "left_ear",
        "right_ear",
        "mouth_left",
        "mouth_right",
        "left_shoulder",
        "right_shoulder",
        "left_elbow",
        "right_elbow",
        "left_wrist",
        "right_wrist",
        "left_pinky",
        "right_pinky",
        "left_index",
        "right_index",
        "left_thumb",
        "right_thumb",
        "left_hip",
        "right_hip",
        "left_knee",
        "right_knee",
        "left_ankle",
        "right_ankle",
        "left_heel",
        "right_heel",
        "left_foot_index",
        "right_foot_index",
    ];

    /// Human-readable name for a landmark index.
    pub fn name(idx: usize) -> &'static str {
        NAMES.get(idx).copied().unwrap_or("unknown")
    }

    /// `"left_shoulder(11)"` style label used in debug snapshots.
    pub fn label(idx: usize) -> String {
        format!("{}({})", name(idx), idx)
    }
}

// ============== FRAME DATA ==============

/// A single tracked body point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Visibility confidence in [0, 1]; points below the configured minimum
    /// must be treated as absent by every consumer.
    #[serde(default, alias = "v")]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }
}

/// One sampled frame of landmarks. The position in `points` is the landmark
/// id; a full-body frame carries all 33 points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Point by landmark id, if the frame extends that far.
    pub fn point(&self, idx: usize) -> Option<&Landmark> {
        self.points.get(idx)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the frame carries a complete full-body point set.
    pub fn is_full_body(&self) -> bool {
        self.points.len() >= landmark_ids::FULL_BODY_COUNT
    }

    /// Count of points at or above the given visibility.
    pub fn visible_count(&self, min_visibility: f64) -> usize {
        self.points
            .iter()
            .filter(|p| p.visibility >= min_visibility)
            .count()
    }

    /// Point by id, only if its visibility clears the given minimum.
    pub fn visible_point(&self, idx: usize, min_visibility: f64) -> Option<&Landmark> {
        self.point(idx).filter(|p| p.visibility >= min_visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_names_cover_the_full_body() {
        assert_eq!(landmark_ids::name(0), "nose");
        assert_eq!(landmark_ids::name(landmark_ids::LEFT_SHOULDER), "left_shoulder");
        assert_eq!(landmark_ids::name(32), "right_foot_index");
        assert_eq!(landmark_ids::name(99), "unknown");
        assert_eq!(landmark_ids::label(11), "left_shoulder(11)");
    }

    #[test]
    fn visible_point_filters_low_confidence() {
        let frame = LandmarkFrame::new(vec![
            Landmark::new(0.5, 0.2, 0.9),
            Landmark::new(0.4, 0.3, 0.2),
        ]);
        assert!(frame.visible_point(0, 0.5).is_some());
        assert!(frame.visible_point(1, 0.5).is_none());
        assert!(frame.visible_point(7, 0.5).is_none());
        assert_eq!(frame.visible_count(0.5), 1);
    }

    #[test]
    fn landmark_json_accepts_short_visibility_key() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25,"v":0.88}"#).unwrap();
        assert!((lm.visibility - 0.88).abs() < 1e-9);
        assert!((lm.z).abs() < 1e-9);
    }
}
