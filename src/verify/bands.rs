//! Tolerance bands around the pass thresholds.
//!
//! A check that misses its threshold but lands inside the band counts as
//! "almost" and earns a softer hint instead of a failure. Bands are either
//! multipliers applied to the configured threshold or absolute margins in
//! normalized coordinates.

/// Widens both hand-on-hip tolerances for the almost band.
pub const HAND_ON_HIP_ALMOST_MULTIPLIER: f64 = 1.5;

/// Subtracted from the arms-down minimum; a wrist above the result is still "almost".
pub const ARMS_DOWN_ALMOST_MARGIN: f64 = 0.1;

/// Added to the average shoulder height; a wrist above that line is close
/// enough to count as almost-raised.
pub const HANDS_UP_CLOSE_MARGIN: f64 = 0.1;

/// Fraction of the chin-elevation threshold accepted as almost.
pub const CHIN_UP_ALMOST_FRACTION: f64 = 0.5;

/// Fraction of the head-turn threshold accepted as almost.
pub const HEAD_TILT_ALMOST_FRACTION: f64 = 0.6;

/// Absolute nose offset from center still counted as an almost-straight head.
pub const HEAD_STRAIGHT_ALMOST_OFFSET: f64 = 0.10;

/// Nose height thresholds for the chin check when shoulders are occluded.
pub const CHIN_FALLBACK_MAX_NOSE_Y: f64 = 0.35;
pub const CHIN_FALLBACK_ALMOST_NOSE_Y: f64 = 0.40;

/// Widens the feet-together gap for the almost band.
pub const FEET_TOGETHER_ALMOST_MULTIPLIER: f64 = 1.5;

/// Shrinks the feet-apart gap for the almost band.
pub const FEET_APART_ALMOST_FRACTION: f64 = 0.7;

/// Absolute ankle y-offset still counted as an almost-staggered stance.
pub const STAGGER_ALMOST_Y_OFFSET: f64 = 0.015;

/// Shoulders less than this far below the ears read as hunched.
pub const HUNCHED_SHOULDER_MARGIN: f64 = 0.08;
