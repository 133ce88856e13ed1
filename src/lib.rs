//! PoseCoach: Real-time Posing Coach Engine
//!
//! Step-by-step pose coaching over live body-landmark frames.
//!
//! ## Architecture
//!
//! - **Verifier**: Pure landmark geometry checks with pass/almost/fail bands
//! - **Coach**: Per-step state machine — debounce, escalation, regression watch
//! - **Session**: Framing → posing → shutter lifecycle with dwell timers
//! - **Gate**: Serializes prompts into the conversational agent's turn rhythm

pub mod acquisition;
pub mod channel;
pub mod coach;
pub mod config;
pub mod context;
pub mod gate;
pub mod runtime;
pub mod session;
pub mod store;
pub mod types;
pub mod verify;

// Re-export configuration
pub use config::CoachConfig;

// Re-export commonly used types
pub use types::{
    ActionKind, CheckKind, CheckSpec, CoachAction, CoachState, DebugSnapshot, Landmark,
    LandmarkFrame, PoseDefinition, PoseStep, StateSnapshot,
};

// Re-export the core decision components
pub use coach::{FeedbackKind, PoseCoach};
pub use session::{SessionPhase, SessionPhaseController};
pub use verify::{CheckReport, LandmarkVerifier, Verdict};

// Re-export storage
pub use store::{PoseStore, StoreError};

// Re-export the runtime surface
pub use runtime::{SessionRuntime, SessionStats};
