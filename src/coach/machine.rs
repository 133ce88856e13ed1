//! Pose Coaching State Machine
//!
//! Walks a person through one pose, step by step:
//!
//! - `GiveInstruction`: announce the current step, then watch.
//! - `Watching`: evaluate the step's landmark check at most once per check
//!   interval; consecutive passes confirm the step, near-misses produce
//!   rate-limited "almost" hints, and a watch timeout escalates through
//!   corrections, alternative phrasings, and finally a forced advance.
//! - `Confirmed`: a transient state; the next tick advances to the next
//!   step or completes the pose.
//! - `Complete`: terminal. Starting a new pose builds a fresh session.
//!
//! Confirmed steps are re-verified on demand (`check_regression`) so the
//! coach notices when an earlier step falls apart while the user works on a
//! later one. All timing comes in through `Instant` arguments; the machine
//! never reads the clock itself.

use crate::coach::feedback::{self, FeedbackKind};
use crate::coach::steps;
use crate::types::{
    ActionKind, CheckKind, CoachAction, CoachState, DebugSnapshot, LandmarkFrame, PoseDefinition,
    PoseStep, StateSnapshot,
};
use crate::verify::{FailCause, LandmarkVerifier};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// Per-step progress
// ============================================================================

/// Mutable counters for the step currently being coached. Reset whenever the
/// machine moves to a new step.
#[derive(Debug, Clone, Default)]
struct StepProgress {
    /// Passing evaluations in a row; any failure zeroes it.
    consecutive_passes: u32,
    /// Watch timeouts burned on this step so far.
    attempts: u32,
    /// Rotation cursor into the step's alternative phrasings.
    alt_explanation_index: usize,
    /// Last evaluation time, for the check-interval debounce. `None` until
    /// the first tick so a fresh step is evaluated immediately.
    last_check: Option<Instant>,
    /// Last "almost" hint time, for its own rate limit.
    last_almost: Option<Instant>,
    /// When the current watch window opened.
    watch_start: Option<Instant>,
}

// ============================================================================
// Session
// ============================================================================

/// One run through one pose. Dropped and rebuilt when a new pose starts.
#[derive(Debug, Clone)]
struct CoachSession {
    steps: Vec<PoseStep>,
    current_step_index: usize,
    state: CoachState,
    progress: StepProgress,
    /// Indices of confirmed steps, in confirmation order. Force-advanced
    /// steps are never added.
    completed_steps: Vec<usize>,
    pose_name: String,
    last_debug: Option<DebugSnapshot>,
    last_regression: Option<Instant>,
    corrections_given: u32,
    corrections_followed: u32,
    /// Whether the most recent evaluation passed; drives the feedback tier.
    last_check_passed: bool,
}

impl CoachSession {
    fn new(pose_name: String, steps: Vec<PoseStep>) -> Self {
        Self {
            steps,
            current_step_index: 0,
            state: CoachState::GiveInstruction,
            progress: StepProgress::default(),
            completed_steps: Vec::new(),
            pose_name,
            last_debug: None,
            last_regression: None,
            corrections_given: 0,
            corrections_followed: 0,
            last_check_passed: false,
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            active: true,
            pose_name: self.pose_name.clone(),
            current_step: self.current_step_index + 1,
            total_steps: self.steps.len(),
            state: self.state,
            attempt: self.progress.attempts + 1,
            instruction: self
                .steps
                .get(self.current_step_index)
                .map(|step| step.instruction.clone())
                .unwrap_or_default(),
            completed_steps: self.completed_steps.clone(),
        }
    }

    fn allowed_feedback(&self) -> FeedbackKind {
        let watching_failed = self.state == CoachState::Watching && !self.last_check_passed;
        let remaining = self.steps.len().saturating_sub(self.current_step_index);
        feedback::classify(watching_failed, self.corrections_followed, remaining)
    }

    fn prompt_modifier(&self) -> &'static str {
        self.allowed_feedback().prompt_modifier()
    }

    /// Announce the current step. Running past the end completes the pose.
    fn give_current_instruction(&mut self) -> CoachAction {
        if self.current_step_index >= self.steps.len() {
            return self.complete_pose();
        }
        let step_number = self.current_step_index + 1;
        let total = self.steps.len();
        let message = format!(
            "[COACH - STEP {}/{}] {}",
            step_number, total, self.steps[self.current_step_index].instruction
        );
        info!(step = step_number, total, "Giving step instruction");
        CoachAction::new(ActionKind::Instruction, message, self.snapshot())
            .with_debug(self.last_debug.clone())
    }

    /// The current step held long enough. Record it and acknowledge at the
    /// tier the feedback policy allows.
    fn confirm_step(&mut self) -> CoachAction {
        self.state = CoachState::Confirmed;
        self.completed_steps.push(self.current_step_index);
        let step_number = self.current_step_index + 1;
        info!(step = step_number, total = self.steps.len(), "Step CONFIRMED");

        let feedback = self.allowed_feedback();
        let message = if feedback == FeedbackKind::EarnedPraise {
            format!("[COACH - STEP COMPLETE] Perfect! Step {step_number} done. Hold it!")
        } else {
            format!(
                "[COACH - STEP COMPLETE] OK, step {step_number} done. Next.{}",
                feedback.prompt_modifier()
            )
        };
        CoachAction::new(ActionKind::Confirmed, message, self.snapshot())
            .with_debug(self.last_debug.clone())
    }

    fn advance_to_next_step(&mut self) -> CoachAction {
        self.current_step_index += 1;
        self.progress = StepProgress::default();
        if self.current_step_index >= self.steps.len() {
            return self.complete_pose();
        }
        self.state = CoachState::GiveInstruction;
        self.give_current_instruction()
    }

    fn complete_pose(&mut self) -> CoachAction {
        self.state = CoachState::Complete;
        info!(pose = %self.pose_name, steps = self.steps.len(), "Pose COMPLETE");
        CoachAction::new(
            ActionKind::Complete,
            "[COACH - POSE COMPLETE] Amazing! You've nailed the entire pose! Hold it for the photo!",
            self.snapshot(),
        )
        .with_debug(self.last_debug.clone())
    }

    /// The watch window expired without enough passes. Either auto-advance
    /// (expression steps), force-advance (attempt budget spent), or revert
    /// to `GiveInstruction` with an escalating retry message.
    fn handle_timeout(
        &mut self,
        verifier: LandmarkVerifier,
        frame: &LandmarkFrame,
        now: Instant,
    ) -> CoachAction {
        let timing = &crate::config::get().coach;
        self.progress.attempts += 1;
        let step_number = self.current_step_index + 1;
        info!(
            step = step_number,
            attempt = self.progress.attempts,
            "Watch timeout"
        );

        let (auto_advances, is_expression) = {
            let step = &self.steps[self.current_step_index];
            (
                step.auto_advance_seconds.is_some(),
                step.check.kind == CheckKind::Expression,
            )
        };
        if auto_advances && is_expression {
            debug!(step = step_number, "Expression step auto-advancing");
            return self.advance_to_next_step();
        }

        if self.progress.attempts >= timing.max_attempts {
            warn!(
                step = step_number,
                attempts = self.progress.attempts,
                "Max attempts reached, moving on"
            );
            return self.advance_to_next_step();
        }

        self.state = CoachState::GiveInstruction;
        self.progress.watch_start = Some(now);
        self.progress.consecutive_passes = 0;
        self.corrections_given += 1;

        // Tier is computed after the revert, so the watching-failed
        // restriction no longer applies to the retry message itself.
        let modifier = self.prompt_modifier();
        let attempts = self.progress.attempts;
        let message = if attempts <= 2 {
            let correction = self.correction_for(verifier, frame);
            format!("[COACH - TRY AGAIN] {correction}{modifier}")
        } else {
            let alt = self.next_alt_explanation();
            format!("[COACH - LET ME EXPLAIN DIFFERENTLY] {alt}{modifier}")
        };

        let mut action = CoachAction::new(ActionKind::Retry, message, self.snapshot())
            .with_debug(self.last_debug.clone());
        action.attempt = Some(attempts);
        action
    }

    /// Most specific correction available for the current step: a matched
    /// common mistake beats the verifier's failure reason, which beats a
    /// generic retry line.
    fn correction_for(&self, verifier: LandmarkVerifier, frame: &LandmarkFrame) -> String {
        let step = &self.steps[self.current_step_index];
        let report = verifier.evaluate(step, frame);

        for mistake in &step.common_mistakes {
            if verifier.detect_mistake(&mistake.detect, frame) {
                debug!(detect = %mistake.detect, "Known mistake detected");
                if mistake.fix.is_empty() {
                    return "Adjust your position".to_string();
                }
                return mistake.fix.clone();
            }
        }

        if let Some(error) = report.error_text() {
            return format!("Try again: {error}");
        }
        "Let's try that again. Focus on the movement.".to_string()
    }

    /// Next alternative phrasing, rotating through the list. A step without
    /// alternatives repeats its instruction.
    fn next_alt_explanation(&mut self) -> String {
        let step = &self.steps[self.current_step_index];
        if step.alt_explanations.is_empty() {
            return step.instruction.clone();
        }
        let alt = step.alt_explanations
            [self.progress.alt_explanation_index % step.alt_explanations.len()]
        .clone();
        self.progress.alt_explanation_index += 1;
        alt
    }
}

// ============================================================================
// Coach
// ============================================================================

/// Step-by-step pose coach. Owns at most one session at a time; callers
/// drive it with landmark frames and explicit timestamps.
#[derive(Debug)]
pub struct PoseCoach {
    verifier: LandmarkVerifier,
    session: Option<CoachSession>,
}

impl PoseCoach {
    pub fn new() -> Self {
        Self {
            verifier: LandmarkVerifier::new(),
            session: None,
        }
    }

    /// Start coaching a pose, replacing any previous session.
    ///
    /// Uses the pose's explicit step ladder when present, otherwise derives
    /// one from its structure. Returns the first instruction action, or the
    /// completion action for an explicitly empty ladder.
    pub fn start_pose(&mut self, pose: &PoseDefinition) -> CoachAction {
        let resolved = match &pose.steps {
            Some(explicit) => explicit.clone(),
            None => steps::derive_steps(pose),
        };
        info!(
            pose = %pose.display_name(),
            steps = resolved.len(),
            "Coaching session started"
        );
        let mut session = CoachSession::new(pose.display_name().to_string(), resolved);
        let action = session.give_current_instruction();
        self.session = Some(session);
        action
    }

    /// Advance the machine with one landmark frame.
    ///
    /// Returns `None` when there is nothing to say: no session, terminal
    /// state, the check-interval debounce, or an unremarkable evaluation.
    pub fn tick(&mut self, frame: &LandmarkFrame, now: Instant) -> Option<CoachAction> {
        let timing = &crate::config::get().coach;
        let check_interval = Duration::from_secs_f64(timing.check_interval_secs);
        let watch_timeout = Duration::from_secs_f64(timing.watch_timeout_secs);
        let almost_interval = Duration::from_secs_f64(timing.almost_feedback_interval_secs);
        let pass_threshold = timing.pass_threshold;

        let verifier = self.verifier;
        let session = self.session.as_mut()?;
        if matches!(session.state, CoachState::Idle | CoachState::Complete) {
            return None;
        }

        if let Some(last) = session.progress.last_check {
            if now.duration_since(last) < check_interval {
                return None;
            }
        }
        session.progress.last_check = Some(now);

        if session.current_step_index >= session.steps.len() {
            return Some(session.complete_pose());
        }

        match session.state {
            CoachState::GiveInstruction => {
                session.state = CoachState::Watching;
                session.progress.watch_start = Some(now);
                session.progress.consecutive_passes = 0;
                Some(session.give_current_instruction())
            }
            CoachState::Watching => {
                let report =
                    verifier.evaluate(&session.steps[session.current_step_index], frame);
                session.last_debug = Some(report.debug.clone());
                session.last_check_passed = report.passed();

                if report.passed() {
                    session.progress.consecutive_passes += 1;
                    debug!(
                        step = session.current_step_index + 1,
                        passes = session.progress.consecutive_passes,
                        needed = pass_threshold,
                        "Watch check PASS"
                    );
                    if session.progress.consecutive_passes >= pass_threshold {
                        if session.progress.attempts > 0 {
                            session.corrections_followed += 1;
                            debug!(
                                followed = session.corrections_followed,
                                "Correction followed after retry"
                            );
                        }
                        return Some(session.confirm_step());
                    }
                } else {
                    if session.progress.consecutive_passes > 0 {
                        debug!(
                            step = session.current_step_index + 1,
                            "Pass streak broken"
                        );
                    }
                    session.progress.consecutive_passes = 0;

                    if let Some(hint) = report.almost_hint() {
                        let due = session
                            .progress
                            .last_almost
                            .map_or(true, |last| now.duration_since(last) >= almost_interval);
                        if due {
                            session.progress.last_almost = Some(now);
                            let message =
                                format!("[COACH - ALMOST] {hint}{}", session.prompt_modifier());
                            let action =
                                CoachAction::new(ActionKind::Almost, message, session.snapshot())
                                    .with_debug(Some(report.debug));
                            return Some(action);
                        }
                    }
                }

                let watch_elapsed = session
                    .progress
                    .watch_start
                    .map_or(Duration::ZERO, |start| now.duration_since(start));
                if watch_elapsed >= watch_timeout {
                    return Some(session.handle_timeout(verifier, frame, now));
                }
                None
            }
            CoachState::Confirmed => Some(session.advance_to_next_step()),
            CoachState::Idle | CoachState::Complete => None,
        }
    }

    /// Re-verify previously confirmed steps and warn about the first one
    /// that no longer holds. Rate-limited by the regression cooldown;
    /// checks that cannot be judged from landmarks are skipped.
    pub fn check_regression(&mut self, frame: &LandmarkFrame, now: Instant) -> Option<CoachAction> {
        let cooldown =
            Duration::from_secs_f64(crate::config::get().coach.regression_cooldown_secs);
        let verifier = self.verifier;
        let session = self.session.as_mut()?;
        if session.completed_steps.is_empty() {
            return None;
        }
        if let Some(last) = session.last_regression {
            if now.duration_since(last) < cooldown {
                return None;
            }
        }

        for step_idx in session.completed_steps.clone() {
            let Some(step) = session.steps.get(step_idx) else {
                continue;
            };
            let report = verifier.evaluate(step, frame);
            if report.fail_cause() == Some(FailCause::UnknownCheck) {
                continue;
            }
            if !report.passed() && report.almost_hint().is_none() {
                session.last_regression = Some(now);
                warn!(step = step_idx + 1, "Regression on a confirmed step");
                let message = format!(
                    "[COACH - REGRESSION] You've moved out of position! Hold your {}",
                    step.instruction
                );
                let mut action =
                    CoachAction::new(ActionKind::Regression, message, session.snapshot());
                action.step_index = Some(step_idx);
                return Some(action);
            }
        }
        None
    }

    pub fn state(&self) -> CoachState {
        self.session
            .as_ref()
            .map_or(CoachState::Idle, |session| session.state)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Live session view for UI consumers; inactive defaults when no pose
    /// has been started.
    pub fn state_snapshot(&self) -> StateSnapshot {
        self.session
            .as_ref()
            .map_or_else(StateSnapshot::inactive, CoachSession::snapshot)
    }

    /// Feedback tier currently allowed by the session.
    pub fn allowed_feedback(&self) -> FeedbackKind {
        self.session
            .as_ref()
            .map_or(FeedbackKind::CorrectionOnly, CoachSession::allowed_feedback)
    }

    /// Retry messages issued across the session.
    pub fn corrections_given(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |session| session.corrections_given)
    }

    /// Corrections that were followed by a confirmed step.
    pub fn corrections_followed(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |session| session.corrections_followed)
    }
}

impl Default for PoseCoach {
    fn default() -> Self {
        Self::new()
    }
}
