//! Coach Configuration - session timing and verification thresholds as TOML values
//!
//! Every tunable that drives the verifier, the step machine, and the session
//! controller lives here. Each struct implements `Default` with values matching
//! the built-in constants, so behavior is unchanged when no config file is
//! present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a coaching deployment.
///
/// Load with `CoachConfig::load()` which searches:
/// 1. `$POSECOACH_CONFIG` env var
/// 2. `./posecoach.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Geometric thresholds used by the landmark verifier
    #[serde(default)]
    pub verifier: VerifierThresholds,

    /// Step machine timing and escalation limits
    #[serde(default)]
    pub coach: CoachTiming,

    /// Framing phase tolerances
    #[serde(default)]
    pub framing: FramingConfig,

    /// Session controller cadence
    #[serde(default)]
    pub session: SessionTiming,

    /// Outbound turn gate pacing
    #[serde(default)]
    pub gate: GateConfig,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            verifier: VerifierThresholds::default(),
            coach: CoachTiming::default(),
            framing: FramingConfig::default(),
            session: SessionTiming::default(),
            gate: GateConfig::default(),
        }
    }
}

impl CoachConfig {
    /// Load configuration using the standard search order:
    /// 1. `$POSECOACH_CONFIG` environment variable
    /// 2. `./posecoach.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("POSECOACH_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded coach config from POSECOACH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from POSECOACH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "POSECOACH_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./posecoach.toml
        let local = PathBuf::from("posecoach.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded coach config from ./posecoach.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./posecoach.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No posecoach.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Normalized geometry thresholds must lie in (0, 1)
    /// - Almost-band multipliers must be >= 1.0
    /// - Counters (pass threshold, max attempts) must be > 0
    /// - All intervals and timeouts must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let v = &self.verifier;
        Self::check_normalized(v.min_visibility, "verifier.min_visibility", &mut errors);
        Self::check_normalized(v.shoulder_level_max_diff, "verifier.shoulder_level_max_diff", &mut errors);
        Self::check_normalized(v.hand_hip_y_tolerance, "verifier.hand_hip_y_tolerance", &mut errors);
        Self::check_normalized(v.hand_hip_x_tolerance, "verifier.hand_hip_x_tolerance", &mut errors);
        Self::check_normalized(v.hand_hip_max_distance, "verifier.hand_hip_max_distance", &mut errors);
        Self::check_normalized(v.arms_down_min_wrist_y, "verifier.arms_down_min_wrist_y", &mut errors);
        Self::check_normalized(v.elbow_back_min_offset, "verifier.elbow_back_min_offset", &mut errors);
        Self::check_normalized(v.chin_up_min_elevation, "verifier.chin_up_min_elevation", &mut errors);
        Self::check_normalized(v.head_tilt_min_offset, "verifier.head_tilt_min_offset", &mut errors);
        Self::check_normalized(v.head_straight_max_offset, "verifier.head_straight_max_offset", &mut errors);
        Self::check_normalized(v.feet_together_max_gap, "verifier.feet_together_max_gap", &mut errors);
        Self::check_normalized(v.feet_apart_min_gap, "verifier.feet_apart_min_gap", &mut errors);
        Self::check_normalized(v.stagger_min_y_offset, "verifier.stagger_min_y_offset", &mut errors);
        if !v.almost_multiplier.is_finite() || v.almost_multiplier < 1.0 {
            errors.push(format!(
                "verifier.almost_multiplier ({}) must be >= 1.0",
                v.almost_multiplier
            ));
        }

        let c = &self.coach;
        if c.pass_threshold == 0 {
            errors.push("coach.pass_threshold must be > 0".to_string());
        }
        if c.max_attempts == 0 {
            errors.push("coach.max_attempts must be > 0".to_string());
        }
        Self::check_positive(c.watch_timeout_secs, "coach.watch_timeout_secs", &mut errors);
        Self::check_positive(c.check_interval_secs, "coach.check_interval_secs", &mut errors);
        Self::check_positive(
            c.almost_feedback_interval_secs,
            "coach.almost_feedback_interval_secs",
            &mut errors,
        );
        Self::check_positive(
            c.regression_cooldown_secs,
            "coach.regression_cooldown_secs",
            &mut errors,
        );

        let f = &self.framing;
        Self::check_positive(f.issue_relay_interval_secs, "framing.issue_relay_interval_secs", &mut errors);
        Self::check_positive(f.good_hold_secs, "framing.good_hold_secs", &mut errors);
        Self::check_positive(f.min_dwell_secs, "framing.min_dwell_secs", &mut errors);
        Self::check_normalized(f.center_tolerance, "framing.center_tolerance", &mut errors);
        Self::check_normalized(f.min_height_ratio, "framing.min_height_ratio", &mut errors);
        Self::check_normalized(f.max_height_ratio, "framing.max_height_ratio", &mut errors);
        if f.max_height_ratio <= f.min_height_ratio {
            errors.push(format!(
                "framing.max_height_ratio ({:.2}) must be > min_height_ratio ({:.2})",
                f.max_height_ratio, f.min_height_ratio
            ));
        }
        if f.min_visible_points == 0 || f.min_visible_points > 33 {
            errors.push(format!(
                "framing.min_visible_points ({}) must be in 1..=33",
                f.min_visible_points
            ));
        }

        let s = &self.session;
        Self::check_positive(s.posing_min_dwell_secs, "session.posing_min_dwell_secs", &mut errors);
        Self::check_positive(
            s.regression_check_interval_secs,
            "session.regression_check_interval_secs",
            &mut errors,
        );
        Self::check_positive(s.shutter_countdown_secs, "session.shutter_countdown_secs", &mut errors);
        Self::check_positive(s.pose_data_interval_secs, "session.pose_data_interval_secs", &mut errors);

        Self::check_positive(self.gate.min_gap_secs, "gate.min_gap_secs", &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_normalized(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass — catch them explicitly
        if !value.is_finite() {
            errors.push(format!("{name}: must be finite (got {value})"));
            return;
        }
        if value <= 0.0 || value >= 1.0 {
            errors.push(format!(
                "{name} ({value}) must lie strictly between 0 and 1 (normalized image coordinates)"
            ));
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} ({value}) must be a positive number of seconds"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Verifier Thresholds
// ============================================================================

/// Geometric tolerances for landmark checks.
///
/// All values are in normalized image coordinates (0.0 - 1.0) unless noted.
/// Image y grows downward, so "higher on screen" means a smaller y.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierThresholds {
    /// Minimum landmark visibility score to trust a point
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f64,

    /// Max allowed |left_y - right_y| between shoulders for "level"
    #[serde(default = "default_shoulder_level_max_diff")]
    pub shoulder_level_max_diff: f64,

    /// Max allowed |wrist_y - hip_y| for a hand resting on the hip
    #[serde(default = "default_hand_hip_y_tolerance")]
    pub hand_hip_y_tolerance: f64,

    /// Max allowed |wrist_x - hip_x| for a hand resting on the hip
    #[serde(default = "default_hand_hip_x_tolerance")]
    pub hand_hip_x_tolerance: f64,

    /// Euclidean wrist-to-hip distance attached to hand-on-hip diagnostics
    #[serde(default = "default_hand_hip_max_distance")]
    pub hand_hip_max_distance: f64,

    /// Min wrist y (i.e. how far down the frame) for relaxed arms
    #[serde(default = "default_arms_down_min_wrist_y")]
    pub arms_down_min_wrist_y: f64,

    /// Min horizontal elbow-to-shoulder offset for elbows pushed back
    #[serde(default = "default_elbow_back_min_offset")]
    pub elbow_back_min_offset: f64,

    /// Min (shoulder_mid_y - nose_y) elevation for a lifted chin
    #[serde(default = "default_chin_up_min_elevation")]
    pub chin_up_min_elevation: f64,

    /// Min nose x-offset from frame center for a deliberate head turn
    #[serde(default = "default_head_tilt_min_offset")]
    pub head_tilt_min_offset: f64,

    /// Max nose x-offset from frame center for a straight head
    #[serde(default = "default_head_straight_max_offset")]
    pub head_straight_max_offset: f64,

    /// Max ankle x-gap for feet together
    #[serde(default = "default_feet_together_max_gap")]
    pub feet_together_max_gap: f64,

    /// Min ankle x-gap for feet shoulder-width apart
    #[serde(default = "default_feet_apart_min_gap")]
    pub feet_apart_min_gap: f64,

    /// Min ankle y-offset for a staggered stance
    #[serde(default = "default_stagger_min_y_offset")]
    pub stagger_min_y_offset: f64,

    /// Multiplier widening a failed threshold into the "almost" band
    #[serde(default = "default_almost_multiplier")]
    pub almost_multiplier: f64,
}

fn default_min_visibility() -> f64 { 0.5 }
fn default_shoulder_level_max_diff() -> f64 { 0.04 }
fn default_hand_hip_y_tolerance() -> f64 { 0.10 }
fn default_hand_hip_x_tolerance() -> f64 { 0.15 }
fn default_hand_hip_max_distance() -> f64 { 0.12 }
fn default_arms_down_min_wrist_y() -> f64 { 0.55 }
fn default_elbow_back_min_offset() -> f64 { 0.04 }
fn default_chin_up_min_elevation() -> f64 { 0.03 }
fn default_head_tilt_min_offset() -> f64 { 0.08 }
fn default_head_straight_max_offset() -> f64 { 0.06 }
fn default_feet_together_max_gap() -> f64 { 0.08 }
fn default_feet_apart_min_gap() -> f64 { 0.12 }
fn default_stagger_min_y_offset() -> f64 { 0.03 }
fn default_almost_multiplier() -> f64 { 1.3 }

impl Default for VerifierThresholds {
    fn default() -> Self {
        Self {
            min_visibility: default_min_visibility(),
            shoulder_level_max_diff: default_shoulder_level_max_diff(),
            hand_hip_y_tolerance: default_hand_hip_y_tolerance(),
            hand_hip_x_tolerance: default_hand_hip_x_tolerance(),
            hand_hip_max_distance: default_hand_hip_max_distance(),
            arms_down_min_wrist_y: default_arms_down_min_wrist_y(),
            elbow_back_min_offset: default_elbow_back_min_offset(),
            chin_up_min_elevation: default_chin_up_min_elevation(),
            head_tilt_min_offset: default_head_tilt_min_offset(),
            head_straight_max_offset: default_head_straight_max_offset(),
            feet_together_max_gap: default_feet_together_max_gap(),
            feet_apart_min_gap: default_feet_apart_min_gap(),
            stagger_min_y_offset: default_stagger_min_y_offset(),
            almost_multiplier: default_almost_multiplier(),
        }
    }
}

// ============================================================================
// Coach Timing
// ============================================================================

/// Step machine timing and escalation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachTiming {
    /// Consecutive passing frames required to confirm a step
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u32,

    /// Seconds of watching before a step attempt times out
    #[serde(default = "default_watch_timeout_secs")]
    pub watch_timeout_secs: f64,

    /// Attempts on one step before the coach force-advances
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum seconds between landmark evaluations while watching
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: f64,

    /// Minimum seconds between "almost there" encouragements
    #[serde(default = "default_almost_feedback_interval_secs")]
    pub almost_feedback_interval_secs: f64,

    /// Seconds after confirming a step during which regression alerts are suppressed
    #[serde(default = "default_regression_cooldown_secs")]
    pub regression_cooldown_secs: f64,
}

fn default_pass_threshold() -> u32 { 3 }
fn default_watch_timeout_secs() -> f64 { 8.0 }
fn default_max_attempts() -> u32 { 5 }
fn default_check_interval_secs() -> f64 { 1.0 }
fn default_almost_feedback_interval_secs() -> f64 { 3.0 }
fn default_regression_cooldown_secs() -> f64 { 8.0 }

impl Default for CoachTiming {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            watch_timeout_secs: default_watch_timeout_secs(),
            max_attempts: default_max_attempts(),
            check_interval_secs: default_check_interval_secs(),
            almost_feedback_interval_secs: default_almost_feedback_interval_secs(),
            regression_cooldown_secs: default_regression_cooldown_secs(),
        }
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Tolerances for judging whether the subject is framed well enough to coach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Minimum seconds between repeated framing guidance messages
    #[serde(default = "default_issue_relay_interval_secs")]
    pub issue_relay_interval_secs: f64,

    /// Seconds the framing must stay issue-free before advancing to posing
    #[serde(default = "default_good_hold_secs")]
    pub good_hold_secs: f64,

    /// Minimum seconds spent in framing regardless of quality
    #[serde(default = "default_framing_min_dwell_secs")]
    pub min_dwell_secs: f64,

    /// Max horizontal offset of the body midline from frame center
    #[serde(default = "default_center_tolerance")]
    pub center_tolerance: f64,

    /// Minimum nose-to-ankle span as a fraction of frame height
    #[serde(default = "default_min_height_ratio")]
    pub min_height_ratio: f64,

    /// Maximum nose-to-ankle span as a fraction of frame height
    #[serde(default = "default_max_height_ratio")]
    pub max_height_ratio: f64,

    /// Minimum count of confidently-visible landmarks
    #[serde(default = "default_min_visible_points")]
    pub min_visible_points: usize,
}

fn default_issue_relay_interval_secs() -> f64 { 5.0 }
fn default_good_hold_secs() -> f64 { 2.0 }
fn default_framing_min_dwell_secs() -> f64 { 8.0 }
fn default_center_tolerance() -> f64 { 0.18 }
fn default_min_height_ratio() -> f64 { 0.45 }
fn default_max_height_ratio() -> f64 { 0.92 }
fn default_min_visible_points() -> usize { 20 }

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            issue_relay_interval_secs: default_issue_relay_interval_secs(),
            good_hold_secs: default_good_hold_secs(),
            min_dwell_secs: default_framing_min_dwell_secs(),
            center_tolerance: default_center_tolerance(),
            min_height_ratio: default_min_height_ratio(),
            max_height_ratio: default_max_height_ratio(),
            min_visible_points: default_min_visible_points(),
        }
    }
}

// ============================================================================
// Session Timing
// ============================================================================

/// Cadence for the phase controller's periodic work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTiming {
    /// Minimum seconds in the posing phase before the shutter may fire
    #[serde(default = "default_posing_min_dwell_secs")]
    pub posing_min_dwell_secs: f64,

    /// Seconds between regression checks on completed steps
    #[serde(default = "default_regression_check_interval_secs")]
    pub regression_check_interval_secs: f64,

    /// Length of the shutter countdown
    #[serde(default = "default_shutter_countdown_secs")]
    pub shutter_countdown_secs: f64,

    /// Seconds between pose geometry summaries pushed to the conversation
    #[serde(default = "default_pose_data_interval_secs")]
    pub pose_data_interval_secs: f64,
}

fn default_posing_min_dwell_secs() -> f64 { 15.0 }
fn default_regression_check_interval_secs() -> f64 { 2.0 }
fn default_shutter_countdown_secs() -> f64 { 3.0 }
fn default_pose_data_interval_secs() -> f64 { 5.0 }

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            posing_min_dwell_secs: default_posing_min_dwell_secs(),
            regression_check_interval_secs: default_regression_check_interval_secs(),
            shutter_countdown_secs: default_shutter_countdown_secs(),
            pose_data_interval_secs: default_pose_data_interval_secs(),
        }
    }
}

// ============================================================================
// Turn Gate
// ============================================================================

/// Pacing for turn-taking on the conversational channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum seconds between turn-ending dispatches
    #[serde(default = "default_min_gap_secs")]
    pub min_gap_secs: f64,
}

fn default_min_gap_secs() -> f64 { 3.0 }

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_gap_secs: default_min_gap_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = CoachConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: CoachConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.verifier.shoulder_level_max_diff, 0.04);
        assert_eq!(config.verifier.almost_multiplier, 1.3);
        assert_eq!(config.coach.pass_threshold, 3);
        assert_eq!(config.coach.watch_timeout_secs, 8.0);
        assert_eq!(config.framing.min_visible_points, 20);
        assert_eq!(config.gate.min_gap_secs, 3.0);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[coach]
pass_threshold = 2
watch_timeout_secs = 12.0

[verifier]
feet_apart_min_gap = 0.2
"#;
        let config: CoachConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        // Overridden values
        assert_eq!(config.coach.pass_threshold, 2);
        assert_eq!(config.coach.watch_timeout_secs, 12.0);
        assert_eq!(config.verifier.feet_apart_min_gap, 0.2);
        // Non-overridden values retain defaults
        assert_eq!(config.coach.max_attempts, 5);
        assert_eq!(config.verifier.hand_hip_max_distance, 0.12);
    }

    #[test]
    fn test_validation_catches_zero_pass_threshold() {
        let mut config = CoachConfig::default();
        config.coach.pass_threshold = 0;
        let result = config.validate();
        assert!(result.is_err(), "Zero pass threshold should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("pass_threshold")));
        }
    }

    #[test]
    fn test_validation_catches_out_of_range_threshold() {
        let mut config = CoachConfig::default();
        config.verifier.hand_hip_y_tolerance = 1.5;
        assert!(config.validate().is_err(), "Thresholds above 1.0 should fail");

        let mut config = CoachConfig::default();
        config.verifier.min_visibility = f64::NAN;
        assert!(config.validate().is_err(), "NaN thresholds should fail");
    }

    #[test]
    fn test_validation_catches_inverted_height_ratios() {
        let mut config = CoachConfig::default();
        config.framing.min_height_ratio = 0.9;
        config.framing.max_height_ratio = 0.5;
        let result = config.validate();
        assert!(result.is_err(), "Inverted height band should fail validation");
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = CoachConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: CoachConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(
            original.verifier.shoulder_level_max_diff,
            roundtripped.verifier.shoulder_level_max_diff
        );
        assert_eq!(original.coach.max_attempts, roundtripped.coach.max_attempts);
        assert_eq!(original.session.posing_min_dwell_secs, roundtripped.session.posing_min_dwell_secs);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("posecoach.toml");
        std::fs::write(&path, "[coach]\nmax_attempts = 0\n").expect("write config");
        let result = CoachConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_from_file_reads_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("posecoach.toml");
        std::fs::write(&path, "[session]\nshutter_countdown_secs = 5.0\n").expect("write config");
        let config = CoachConfig::load_from_file(&path).expect("valid config should load");
        assert_eq!(config.session.shutter_countdown_secs, 5.0);
        assert_eq!(config.session.pose_data_interval_secs, 5.0);
    }
}
