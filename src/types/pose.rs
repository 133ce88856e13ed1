//! Pose definitions and step checks
//!
//! A pose is an ordered ladder of instruction steps; each step carries the
//! check that verifies it from landmarks, alternative phrasings for repeated
//! failures, and known mistakes with specific fixes. The serde layout is
//! wire-compatible with the stored pose JSON (`landmark_check` / `type`
//! field names, `name` accepted as an alias for the title).

use serde::{Deserialize, Serialize};
use std::fmt;

// ============== CHECK TAXONOMY ==============

/// Closed set of verification check kinds. Anything unrecognized is kept as
/// `Other` with its original tag so verification can fail closed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckKind {
    ShouldersLevel,
    HandsPosition,
    HeadPosition,
    FeetPosition,
    Expression,
    Other(String),
}

impl CheckKind {
    /// Wire tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            Self::ShouldersLevel => "shoulders_level",
            Self::HandsPosition => "hands_position",
            Self::HeadPosition => "head_position",
            Self::FeetPosition => "feet_position",
            Self::Expression => "expression",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for CheckKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "shoulders_level" => Self::ShouldersLevel,
            "hands_position" => Self::HandsPosition,
            "head_position" => Self::HeadPosition,
            "feet_position" => Self::FeetPosition,
            "expression" => Self::Expression,
            _ => Self::Other(tag),
        }
    }
}

impl From<CheckKind> for String {
    fn from(kind: CheckKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// What a step verifies: a check kind, a free-form descriptor refined by the
/// verifier's keyword rules, and an optional per-step threshold override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    #[serde(rename = "type")]
    pub kind: CheckKind,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl CheckSpec {
    pub fn new(kind: CheckKind) -> Self {
        Self {
            kind,
            description: String::new(),
            threshold: None,
        }
    }

    pub fn with_description(kind: CheckKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            threshold: None,
        }
    }
}

// ============== STEPS ==============

/// A known mistake and its specific fix. `detect` names a detector tag;
/// unrecognized tags are accepted in data and simply never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeRule {
    pub detect: String,
    #[serde(default)]
    pub fix: String,
}

/// One instruction unit of a pose. Immutable once a coaching session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStep {
    pub instruction: String,
    #[serde(rename = "landmark_check")]
    pub check: CheckSpec,
    #[serde(default)]
    pub alt_explanations: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<MistakeRule>,
    /// Only meaningful for checks that cannot be verified from landmarks
    /// (expression); the step then resolves via the watch timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_advance_seconds: Option<f64>,
}

impl PoseStep {
    pub fn new(instruction: impl Into<String>, check: CheckSpec) -> Self {
        Self {
            instruction: instruction.into(),
            check,
            alt_explanations: Vec::new(),
            common_mistakes: Vec::new(),
            auto_advance_seconds: None,
        }
    }
}

// ============== POSE DEFINITIONS ==============

/// Free-text description of the target position per body group, used to
/// derive default steps when a pose has no explicit step ladder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStructure {
    #[serde(default)]
    pub head: String,
    #[serde(default)]
    pub hands: String,
    #[serde(default)]
    pub feet: String,
}

impl PoseStructure {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.hands.is_empty() && self.feet.is_empty()
    }
}

/// A stored pose: metadata plus either an explicit step ladder or a
/// structure to derive one from. An explicit *empty* ladder means the pose
/// completes immediately on start; an absent ladder is derived from
/// `structure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDefinition {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<PoseStructure>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<PoseStep>>,
}

impl PoseDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            structure: None,
            tips: Vec::new(),
            steps: None,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Whether an explicit step ladder is present (possibly empty).
    pub fn has_explicit_steps(&self) -> bool {
        self.steps.is_some()
    }
}
