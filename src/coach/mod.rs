//! Step-by-Step Pose Coaching
//!
//! The coach owns the conversational core of a posing session:
//!
//! - [`machine`] drives one pose as a state machine over landmark frames,
//!   emitting advisory actions (instructions, retries, confirmations,
//!   regression warnings, completion).
//! - [`feedback`] gates how warm those actions are allowed to be, so praise
//!   is scarce until it is earned.
//! - [`steps`] derives a default step ladder for poses that only describe
//!   their target structure.
//!
//! The machine is synchronous and clock-free: callers pass `Instant`s in,
//! which keeps every timing rule (check debounce, watch timeout, almost and
//! regression rate limits) deterministic under test.

mod feedback;
mod machine;
mod steps;

pub use feedback::FeedbackKind;
pub use machine::PoseCoach;
pub use steps::derive_steps;
