//! Coach states, advisory actions, and observability snapshots
//!
//! Wire values match the original session protocol: states serialize as
//! `idle / instruction / watching / confirmed / complete`, actions carry
//! `action / message / state_update / debug_info` fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============== COACH STATE ==============

/// Lifecycle of one coaching session. `Idle` exists only before a pose is
/// started; `Complete` is terminal (a new pose start creates a fresh
/// session rather than reviving the old one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoachState {
    #[default]
    Idle,
    /// Announcing the current step's instruction.
    #[serde(rename = "instruction")]
    GiveInstruction,
    /// Observing the user's pose against the current step.
    Watching,
    /// Current step verified; advancing on the next tick.
    Confirmed,
    /// All steps done.
    Complete,
}

impl CoachState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::GiveInstruction => "instruction",
            Self::Watching => "watching",
            Self::Confirmed => "confirmed",
            Self::Complete => "complete",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::GiveInstruction => "Give Instruction",
            Self::Watching => "Watching",
            Self::Confirmed => "Confirmed",
            Self::Complete => "Complete",
        }
    }

    pub const fn short_code(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::GiveInstruction => "INST",
            Self::Watching => "WTCH",
            Self::Confirmed => "CONF",
            Self::Complete => "DONE",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for CoachState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============== ADVISORY ACTIONS ==============

/// Kind of externally-consumable action a tick can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Announce the current step.
    Instruction,
    /// Timeout escalation: correction or alternative phrasing.
    Retry,
    /// Within the tolerance band; softer corrective hint.
    Almost,
    /// Step confirmed after the required consecutive passes.
    Confirmed,
    /// A previously confirmed step no longer holds.
    Regression,
    /// Entire pose done.
    Complete,
}

impl ActionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Instruction => "instruction",
            Self::Retry => "retry",
            Self::Almost => "almost",
            Self::Confirmed => "confirmed",
            Self::Regression => "regression",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============== SNAPSHOTS ==============

/// Immutable record of one verification attempt. Produced on every check
/// for UI/observability; never drives control flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub check_type: String,
    pub landmarks_used: Vec<String>,
    pub values: BTreeMap<String, f64>,
    pub thresholds: BTreeMap<String, f64>,
    pub passed: bool,
    pub almost: bool,
    pub reason: String,
}

impl DebugSnapshot {
    pub fn for_check(check_type: impl Into<String>) -> Self {
        Self {
            check_type: check_type.into(),
            ..Self::default()
        }
    }

    pub fn value(&mut self, name: &str, v: f64) -> &mut Self {
        self.values.insert(name.to_string(), v);
        self
    }

    pub fn threshold(&mut self, name: &str, v: f64) -> &mut Self {
        self.thresholds.insert(name.to_string(), v);
        self
    }
}

/// Session state published to the UI channel on every action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub active: bool,
    #[serde(default)]
    pub pose_name: String,
    /// 1-based index of the current step.
    pub current_step: usize,
    pub total_steps: usize,
    pub state: CoachState,
    /// 1-based attempt number on the current step.
    pub attempt: u32,
    #[serde(default)]
    pub instruction: String,
    pub completed_steps: Vec<usize>,
}

impl StateSnapshot {
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// One advisory action emitted by the coach machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachAction {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    pub message: String,
    #[serde(rename = "state_update")]
    pub state: StateSnapshot,
    #[serde(rename = "debug_info", skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSnapshot>,
    /// Attempt number, present on retry actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Index of the regressed step, present on regression warnings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
}

impl CoachAction {
    pub fn new(kind: ActionKind, message: impl Into<String>, state: StateSnapshot) -> Self {
        Self {
            kind,
            message: message.into(),
            state,
            debug: None,
            attempt: None,
            step_index: None,
        }
    }

    pub fn with_debug(mut self, debug: Option<DebugSnapshot>) -> Self {
        self.debug = debug;
        self
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, ActionKind::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coach_state_wire_values_match_protocol() {
        assert_eq!(
            serde_json::to_string(&CoachState::GiveInstruction).unwrap(),
            r#""instruction""#
        );
        assert_eq!(serde_json::to_string(&CoachState::Watching).unwrap(), r#""watching""#);
        let state: CoachState = serde_json::from_str(r#""complete""#).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn action_serializes_original_field_names() {
        let action = CoachAction::new(
            ActionKind::Instruction,
            "[COACH - STEP 1/3] Feet — spread them apart",
            StateSnapshot {
                active: true,
                current_step: 1,
                total_steps: 3,
                state: CoachState::Watching,
                attempt: 1,
                ..StateSnapshot::default()
            },
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "instruction");
        assert_eq!(json["state_update"]["current_step"], 1);
        assert!(json.get("debug_info").is_none());
    }

    #[test]
    fn debug_snapshot_collects_values_deterministically() {
        let mut debug = DebugSnapshot::for_check("shoulders_level");
        debug.value("left_shoulder_y", 0.31).value("diff", 0.01);
        debug.threshold("max_diff", 0.04);
        assert_eq!(debug.values.len(), 2);
        assert_eq!(debug.thresholds["max_diff"], 0.04);
        assert!(!debug.passed);
    }
}
