//! Shared data model: landmarks, poses, checks, actions, snapshots.

pub mod action;
pub mod landmark;
pub mod pose;

pub use action::{ActionKind, CoachAction, CoachState, DebugSnapshot, StateSnapshot};
pub use landmark::{landmark_ids, Landmark, LandmarkFrame};
pub use pose::{CheckKind, CheckSpec, MistakeRule, PoseDefinition, PoseStep, PoseStructure};
