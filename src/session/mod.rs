//! Session Phase Controller
//!
//! Owns the lifecycle of one photo session: get the subject framed, coach
//! them through the target pose, count down and capture, then hold the
//! pose for more shots. Phases cycle `Framing → Posing → Shutter → Posing`
//! with no terminal phase; the caller ends the session by dropping the
//! controller.
//!
//! The controller is synchronous and time-explicit: the runtime feeds it
//! landmark frames with a timestamp and forwards the returned
//! [`PhaseEvent`]s to the turn gate and the UI sink. All dwell, hold and
//! relay cadences come from the `[framing]` and `[session]` config tables.

use crate::coach::PoseCoach;
use crate::types::{CoachState, DebugSnapshot, LandmarkFrame, PoseDefinition, StateSnapshot};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

mod framing;
pub use framing::{FramingAnalyzer, FramingIssue, FramingQuality, FramingReport, IssueSeverity};

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Framing,
    Posing,
    Shutter,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Framing => "framing",
            SessionPhase::Posing => "posing",
            SessionPhase::Shutter => "shutter",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observational telemetry for UI consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    State(StateSnapshot),
    Check(DebugSnapshot),
    Framing(FramingReport),
    Capture { shot: u32 },
}

/// Sink for UI telemetry. Purely observational; implementations must not
/// block the frame loop.
pub trait UiSink: Send + Sync {
    fn publish(&self, event: UiEvent);
}

/// What one frame made the session do.
#[derive(Debug, Clone)]
pub enum PhaseEvent {
    /// Prompt text for the conversational channel.
    Say { text: String, ends_turn: bool },
    /// Telemetry for the UI sink.
    Ui(UiEvent),
    /// Trigger the camera.
    Capture { shot: u32 },
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
}

// ============================================================================
// Controller
// ============================================================================

/// Drives the framing / posing / shutter lifecycle for one session.
pub struct SessionPhaseController {
    coach: PoseCoach,
    framing: FramingAnalyzer,
    target: Option<PoseDefinition>,
    phase: SessionPhase,
    phase_entered: Option<Instant>,
    good_since: Option<Instant>,
    last_issue_relay: Option<Instant>,
    last_regression_check: Option<Instant>,
    last_pose_data: Option<Instant>,
    shots: u32,
}

impl SessionPhaseController {
    pub fn new() -> Self {
        Self {
            coach: PoseCoach::new(),
            framing: FramingAnalyzer::new(),
            target: None,
            phase: SessionPhase::Framing,
            phase_entered: None,
            good_since: None,
            last_issue_relay: None,
            last_regression_check: None,
            last_pose_data: None,
            shots: 0,
        }
    }

    /// Replace the target pose. Any active coaching session is dropped;
    /// the next posing frame starts the new pose from step one. Emits the
    /// `[TARGET POSE UPDATE]` context for the agent to introduce the pose.
    pub fn set_target_pose(&mut self, pose: &PoseDefinition) -> Vec<PhaseEvent> {
        info!(pose = %pose.display_name(), "Target pose set");
        self.target = Some(pose.clone());
        self.coach = PoseCoach::new();
        vec![PhaseEvent::Say {
            text: crate::context::target_pose_context(pose),
            ends_turn: true,
        }]
    }

    /// Advance the session with one landmark frame.
    pub fn on_frame(&mut self, frame: &LandmarkFrame, now: Instant) -> Vec<PhaseEvent> {
        if self.phase_entered.is_none() {
            self.phase_entered = Some(now);
        }
        match self.phase {
            SessionPhase::Framing => self.framing_frame(frame, now),
            SessionPhase::Posing => self.posing_frame(frame, now),
            SessionPhase::Shutter => self.shutter_frame(now),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Captures taken so far.
    pub fn shots(&self) -> u32 {
        self.shots
    }

    pub fn coach(&self) -> &PoseCoach {
        &self.coach
    }

    // ------------------------------------------------------------------
    // Phase handlers
    // ------------------------------------------------------------------

    fn framing_frame(&mut self, frame: &LandmarkFrame, now: Instant) -> Vec<PhaseEvent> {
        let bounds = &crate::config::get().framing;
        let report = self.framing.analyze(frame);
        let mut events = vec![PhaseEvent::Ui(UiEvent::Framing(report.clone()))];

        if report.is_good() {
            if self.good_since.is_none() {
                debug!("Framing quality good, holding");
                self.good_since = Some(now);
            }
        } else {
            self.good_since = None;
            let relay_due = due(self.last_issue_relay, secs(bounds.issue_relay_interval_secs), now);
            if relay_due {
                self.last_issue_relay = Some(now);
                events.push(PhaseEvent::Say {
                    text: format!("[COACH - FRAMING] {}", report.spoken_line()),
                    ends_turn: true,
                });
            }
        }

        let good_held = self
            .good_since
            .map_or(false, |since| now.duration_since(since) >= secs(bounds.good_hold_secs));
        if good_held && self.phase_elapsed(now) >= secs(bounds.min_dwell_secs) {
            events.push(self.enter_phase(SessionPhase::Posing, now));
        }
        events
    }

    fn posing_frame(&mut self, frame: &LandmarkFrame, now: Instant) -> Vec<PhaseEvent> {
        let timing = &crate::config::get().session;
        let mut events = Vec::new();

        if !self.coach.is_active() {
            let Some(pose) = self.target.clone() else {
                trace!("Posing phase has no target pose");
                return events;
            };
            let start = self.coach.start_pose(&pose);
            events.push(PhaseEvent::Ui(UiEvent::State(start.state.clone())));
            // A zero-step pose completes at start and must be announced;
            // otherwise the first tick below re-issues the instruction.
            if start.is_terminal() {
                events.push(PhaseEvent::Say {
                    text: start.message,
                    ends_turn: true,
                });
            }
        }

        if let Some(action) = self.coach.tick(frame, now) {
            events.push(PhaseEvent::Ui(UiEvent::State(action.state.clone())));
            if let Some(snapshot) = action.debug.clone() {
                events.push(PhaseEvent::Ui(UiEvent::Check(snapshot)));
            }
            events.push(PhaseEvent::Say {
                text: action.message,
                ends_turn: true,
            });
        }

        if due(self.last_regression_check, secs(timing.regression_check_interval_secs), now) {
            self.last_regression_check = Some(now);
            if let Some(warning) = self.coach.check_regression(frame, now) {
                events.push(PhaseEvent::Ui(UiEvent::State(warning.state.clone())));
                events.push(PhaseEvent::Say {
                    text: warning.message,
                    ends_turn: true,
                });
            }
        }

        if !frame.is_empty() && due(self.last_pose_data, secs(timing.pose_data_interval_secs), now)
        {
            self.last_pose_data = Some(now);
            events.push(PhaseEvent::Say {
                text: crate::context::pose_summary(frame),
                ends_turn: false,
            });
        }

        if self.coach.state() == CoachState::Complete
            && self.phase_elapsed(now) >= secs(timing.posing_min_dwell_secs)
        {
            events.push(PhaseEvent::Say {
                text: "[COACH - CAPTURE] Hold it right there! Taking the photo in 3, 2, 1..."
                    .to_string(),
                ends_turn: true,
            });
            events.push(self.enter_phase(SessionPhase::Shutter, now));
        }

        events
    }

    fn shutter_frame(&mut self, now: Instant) -> Vec<PhaseEvent> {
        let countdown = secs(crate::config::get().session.shutter_countdown_secs);
        if self.phase_elapsed(now) < countdown {
            return Vec::new();
        }

        self.shots += 1;
        let shot = self.shots;
        info!(shot, "Capture");

        let mut events = vec![
            PhaseEvent::Capture { shot },
            PhaseEvent::Ui(UiEvent::Capture { shot }),
            PhaseEvent::Say {
                text: format!(
                    "[COACH - CAPTURE] Got it! That's shot {shot}. Hold the pose, let's take another."
                ),
                ends_turn: true,
            },
        ];
        // The coach session stays complete, so after the next posing dwell
        // the same pose yields another capture.
        events.push(self.enter_phase(SessionPhase::Posing, now));
        events
    }

    fn enter_phase(&mut self, to: SessionPhase, now: Instant) -> PhaseEvent {
        let from = self.phase;
        info!(%from, %to, "Session phase transition");
        self.phase = to;
        self.phase_entered = Some(now);
        self.good_since = None;
        PhaseEvent::PhaseChanged { from, to }
    }

    fn phase_elapsed(&self, now: Instant) -> Duration {
        self.phase_entered
            .map_or(Duration::ZERO, |at| now.duration_since(at))
    }
}

impl Default for SessionPhaseController {
    fn default() -> Self {
        Self::new()
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

fn due(stamp: Option<Instant>, interval: Duration, now: Instant) -> bool {
    stamp.map_or(true, |last| now.duration_since(last) >= interval)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::landmark_ids::{NOSE, RIGHT_SHOULDER};
    use crate::types::{CheckKind, CheckSpec, PoseStep};
    use crate::verify::testkit::{base_frame, ensure_config, occlude, place};

    fn at(t0: Instant, secs: f64) -> Instant {
        t0 + Duration::from_secs_f64(secs)
    }

    fn shoulders_pose() -> PoseDefinition {
        let mut pose = PoseDefinition::new("level-up", "Level Up");
        let mut check = CheckSpec::new(CheckKind::ShouldersLevel);
        check.threshold = Some(0.04);
        pose.steps = Some(vec![PoseStep::new("Shoulders — level them", check)]);
        pose
    }

    fn uneven_frame() -> LandmarkFrame {
        let mut frame = base_frame();
        place(&mut frame, RIGHT_SHOULDER, 0.42, 0.48);
        frame
    }

    fn says(events: &[PhaseEvent]) -> Vec<(String, bool)> {
        events
            .iter()
            .filter_map(|e| match e {
                PhaseEvent::Say { text, ends_turn } => Some((text.clone(), *ends_turn)),
                _ => None,
            })
            .collect()
    }

    fn phase_changes(events: &[PhaseEvent]) -> Vec<(SessionPhase, SessionPhase)> {
        events
            .iter()
            .filter_map(|e| match e {
                PhaseEvent::PhaseChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Good frames at 1s cadence: framing holds for 8s, the single-step
    /// pose confirms and completes, the 15s posing dwell defers the
    /// shutter, and the first capture lands at t=26.
    fn run_to_first_capture(
        controller: &mut SessionPhaseController,
        t0: Instant,
    ) -> Vec<(u32, Vec<PhaseEvent>)> {
        let frame = base_frame();
        (0..=26)
            .map(|i| (i, controller.on_frame(&frame, at(t0, f64::from(i)))))
            .collect()
    }

    #[test]
    fn framing_transitions_after_good_hold_and_dwell() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        controller.set_target_pose(&shoulders_pose());
        let t0 = Instant::now();
        let frame = base_frame();

        for i in 0..16 {
            let events = controller.on_frame(&frame, at(t0, f64::from(i) * 0.5));
            assert!(phase_changes(&events).is_empty(), "early transition at {i}");
        }
        let events = controller.on_frame(&frame, at(t0, 8.0));
        assert_eq!(
            phase_changes(&events),
            vec![(SessionPhase::Framing, SessionPhase::Posing)]
        );
        assert_eq!(controller.phase(), SessionPhase::Posing);

        // First posing frame issues the step instruction.
        let events = controller.on_frame(&frame, at(t0, 8.5));
        assert!(says(&events)
            .iter()
            .any(|(text, ends)| text == "[COACH - STEP 1/1] Shoulders — level them" && *ends));
    }

    #[test]
    fn framing_issues_relay_at_most_every_five_seconds() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        let t0 = Instant::now();
        let mut frame = base_frame();
        occlude(&mut frame, NOSE);

        let mut spoken = Vec::new();
        for i in 0..=11 {
            let events = controller.on_frame(&frame, at(t0, f64::from(i)));
            assert!(phase_changes(&events).is_empty());
            spoken.extend(says(&events).into_iter().map(|(text, ends)| {
                assert!(ends);
                (i, text)
            }));
        }

        let times: Vec<u32> = spoken.iter().map(|(i, _)| *i).collect();
        assert_eq!(times, vec![0, 5, 10]);
        assert!(spoken
            .iter()
            .all(|(_, text)| text
                == "[COACH - FRAMING] I can't see your face, look toward the camera"));
    }

    #[test]
    fn good_streak_must_be_continuous() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        let t0 = Instant::now();
        let good = base_frame();
        let mut bad = base_frame();
        occlude(&mut bad, NOSE);

        for i in 0..14 {
            controller.on_frame(&good, at(t0, f64::from(i) * 0.5));
        }
        // A single bad frame at 7.0s resets the hold timer.
        controller.on_frame(&bad, at(t0, 7.0));

        for step in [7.5, 8.0, 8.5, 9.0] {
            let events = controller.on_frame(&good, at(t0, step));
            assert!(phase_changes(&events).is_empty(), "transition at {step}");
        }
        let events = controller.on_frame(&good, at(t0, 9.5));
        assert_eq!(
            phase_changes(&events),
            vec![(SessionPhase::Framing, SessionPhase::Posing)]
        );
    }

    #[test]
    fn posing_relays_coaching_and_pose_data() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        controller.set_target_pose(&shoulders_pose());
        let t0 = Instant::now();
        let frame = base_frame();
        for i in 0..=8 {
            controller.on_frame(&frame, at(t0, f64::from(i)));
        }

        let events = controller.on_frame(&frame, at(t0, 9.0));
        let said = says(&events);
        let turn_lines: Vec<_> = said.iter().filter(|(_, ends)| *ends).collect();
        let context_lines: Vec<_> = said.iter().filter(|(_, ends)| !*ends).collect();
        assert_eq!(turn_lines.len(), 1);
        assert_eq!(turn_lines[0].0, "[COACH - STEP 1/1] Shoulders — level them");
        assert_eq!(context_lines.len(), 1);
        assert!(context_lines[0].0.starts_with("[POSE DATA] "));
        assert!(events
            .iter()
            .any(|e| matches!(e, PhaseEvent::Ui(UiEvent::State(_)))));

        // Pose data repeats on its 5s cadence, not every frame.
        let mut data_times = Vec::new();
        for i in 10..=20 {
            let events = controller.on_frame(&frame, at(t0, f64::from(i)));
            if says(&events).iter().any(|(_, ends)| !*ends) {
                data_times.push(i);
            }
        }
        assert_eq!(data_times, vec![14, 19]);
    }

    #[test]
    fn completion_waits_out_the_posing_dwell() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        controller.set_target_pose(&shoulders_pose());
        let t0 = Instant::now();

        let timeline = run_to_first_capture(&mut controller, t0);
        let all_says: Vec<(u32, String, bool)> = timeline
            .iter()
            .flat_map(|(i, events)| {
                says(events)
                    .into_iter()
                    .map(move |(text, ends)| (*i, text, ends))
            })
            .collect();

        let confirm_at = all_says
            .iter()
            .find(|(_, text, _)| text.contains("[COACH - STEP COMPLETE]"))
            .map(|(i, _, _)| *i);
        assert_eq!(confirm_at, Some(12));
        let complete_at = all_says
            .iter()
            .find(|(_, text, _)| text.contains("[COACH - POSE COMPLETE]"))
            .map(|(i, _, _)| *i);
        assert_eq!(complete_at, Some(13));

        // The pose is complete at 13s but the countdown holds until the
        // 15s posing dwell elapses (posing started at t=8).
        let countdown_at = all_says
            .iter()
            .find(|(_, text, _)| text.contains("Taking the photo"))
            .map(|(i, _, _)| *i);
        assert_eq!(countdown_at, Some(23));

        let shutter_change = timeline
            .iter()
            .find(|(_, events)| {
                phase_changes(events).contains(&(SessionPhase::Posing, SessionPhase::Shutter))
            })
            .map(|(i, _)| *i);
        assert_eq!(shutter_change, Some(23));

        // Capture fires after the 3s countdown.
        let capture_at = timeline
            .iter()
            .find(|(_, events)| {
                events
                    .iter()
                    .any(|e| matches!(e, PhaseEvent::Capture { shot: 1 }))
            })
            .map(|(i, _)| *i);
        assert_eq!(capture_at, Some(26));
        assert_eq!(controller.shots(), 1);
        assert_eq!(controller.phase(), SessionPhase::Posing);
    }

    #[test]
    fn capture_loops_back_without_resetting_the_coach() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        controller.set_target_pose(&shoulders_pose());
        let t0 = Instant::now();
        run_to_first_capture(&mut controller, t0);

        assert!(controller.coach().is_active());
        assert_eq!(controller.coach().state(), CoachState::Complete);

        let good = base_frame();
        let bad = uneven_frame();

        // Regression checks run on their own 2s cadence: the stamp lands
        // at 27, so a bad frame at 28 is not checked yet.
        controller.on_frame(&good, at(t0, 27.0));
        let events = controller.on_frame(&bad, at(t0, 28.0));
        assert!(says(&events).is_empty());

        let events = controller.on_frame(&bad, at(t0, 29.0));
        let says_29 = says(&events);
        assert_eq!(says_29.len(), 1);
        assert_eq!(
            says_29[0].0,
            "[COACH - REGRESSION] You've moved out of position! Hold your Shoulders — level them"
        );

        // Back in position, the completed pose earns a second shot after
        // the fresh posing dwell (posing re-entered at 26).
        let mut capture_at = None;
        for i in 30..=45 {
            let events = controller.on_frame(&good, at(t0, f64::from(i)));
            if events
                .iter()
                .any(|e| matches!(e, PhaseEvent::Capture { shot: 2 }))
            {
                capture_at = Some(i);
            }
        }
        assert_eq!(capture_at, Some(44));
        assert_eq!(controller.shots(), 2);
    }

    #[test]
    fn set_target_pose_announces_and_restarts() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        let events = controller.set_target_pose(&shoulders_pose());
        let says_initial = says(&events);
        assert_eq!(says_initial.len(), 1);
        assert!(says_initial[0].0.starts_with("[TARGET POSE UPDATE]\n"));
        assert!(says_initial[0].0.contains("Level Up"));
        assert!(says_initial[0].1);

        let t0 = Instant::now();
        let frame = base_frame();
        for i in 0..=9 {
            controller.on_frame(&frame, at(t0, f64::from(i)));
        }
        assert!(controller.coach().is_active());

        let mut replacement = PoseDefinition::new("arms-down", "Arms Down");
        replacement.steps = Some(vec![PoseStep::new(
            "Arms — let them hang by your sides",
            CheckSpec::with_description(CheckKind::HandsPosition, "relaxed down by sides"),
        )]);
        controller.set_target_pose(&replacement);
        assert!(!controller.coach().is_active());

        // Next posing frame starts the new pose from its first step.
        let events = controller.on_frame(&frame, at(t0, 10.0));
        assert!(says(&events)
            .iter()
            .any(|(text, _)| text == "[COACH - STEP 1/1] Arms — let them hang by your sides"));
    }

    #[test]
    fn posing_without_a_target_stays_silent() {
        ensure_config();
        let mut controller = SessionPhaseController::new();
        let t0 = Instant::now();
        let frame = base_frame();
        for i in 0..=8 {
            controller.on_frame(&frame, at(t0, f64::from(i)));
        }
        assert_eq!(controller.phase(), SessionPhase::Posing);

        let events = controller.on_frame(&frame, at(t0, 9.0));
        assert!(events.is_empty());
        assert!(!controller.coach().is_active());
    }
}
