//! Session runtime
//!
//! Wires the pieces into one running posing session: frames come in from a
//! [`FrameSource`], the phase controller turns them into events, prompts go
//! out through the turn gate to the conversational channel, and UI events go
//! to a [`UiSink`]. One call to [`SessionRuntime::run`] is one session.

use crate::acquisition::{AcquisitionError, FrameEvent, FrameSource};
use crate::channel::{ChannelSignal, ConversationalChannel};
use crate::gate::{GateError, TurnGate, TurnGateHandle};
use crate::session::{PhaseEvent, SessionPhaseController, UiEvent, UiSink};
use crate::types::PoseDefinition;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can end a session early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Frame acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Turn gate failed: {0}")]
    Gate(#[from] GateError),

    #[error("Turn gate task ended unexpectedly: {0}")]
    GateTask(#[from] tokio::task::JoinError),
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub prompts_sent: u64,
    pub context_updates: u64,
    pub shots_taken: u32,
    pub corrections_given: u32,
    pub corrections_followed: u32,
}

/// UI sink that writes every event to the structured log as JSON.
pub struct LoggingUiSink;

impl UiSink for LoggingUiSink {
    fn publish(&self, event: UiEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => debug!(event = %json, "UI event"),
            Err(e) => warn!(error = %e, "Failed to encode UI event"),
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Owns everything a running session needs besides the frame source.
///
/// Built with [`new()`](SessionRuntime::new), consumed by
/// [`run()`](SessionRuntime::run).
pub struct SessionRuntime {
    controller: SessionPhaseController,
    channel: Arc<dyn ConversationalChannel>,
    signal_rx: mpsc::UnboundedReceiver<ChannelSignal>,
    sink: Arc<dyn UiSink>,
    cancel: CancellationToken,
    max_frames: Option<u64>,
}

impl SessionRuntime {
    pub fn new(
        channel: Arc<dyn ConversationalChannel>,
        signal_rx: mpsc::UnboundedReceiver<ChannelSignal>,
        sink: Arc<dyn UiSink>,
        cancel: CancellationToken,
        max_frames: Option<u64>,
    ) -> Self {
        Self {
            controller: SessionPhaseController::new(),
            channel,
            signal_rx,
            sink,
            cancel,
            max_frames,
        }
    }

    /// Run one session coaching `pose` from `source` until the source is
    /// exhausted, the frame limit is hit, or cancellation.
    pub async fn run<S: FrameSource>(
        mut self,
        pose: &PoseDefinition,
        source: &mut S,
    ) -> Result<SessionStats, SessionError> {
        let mut stats = SessionStats::default();

        info!("🎬 Starting posing session: {}", pose.display_name());
        info!("📥 Frames from {}", source.source_name());

        let gate_cancel = self.cancel.child_token();
        let (gate, handle) = TurnGate::new(Arc::clone(&self.channel));
        let gate_task = tokio::spawn(gate.run(gate_cancel.clone()));

        let mut gate_lost = false;
        let mut failure: Option<SessionError> = None;

        let opening = self.controller.set_target_pose(pose);
        if relay_events(opening, &handle, &self.sink, &mut stats).is_err() {
            gate_lost = true;
        }

        while !gate_lost && failure.is_none() {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[Session] Shutdown signal received");
                    break;
                }
                signal = self.signal_rx.recv() => {
                    match signal {
                        Some(ChannelSignal::TurnComplete) => {
                            if handle.turn_complete().is_err() {
                                gate_lost = true;
                            }
                        }
                        None => {
                            debug!("[Session] Signal channel closed");
                            gate_lost = true;
                        }
                    }
                }
                result = source.next_frame() => {
                    match result {
                        Ok(FrameEvent::Frame(frame)) => {
                            stats.frames_processed += 1;
                            let events =
                                self.controller.on_frame(&frame, Instant::now().into_std());
                            if relay_events(events, &handle, &self.sink, &mut stats).is_err() {
                                gate_lost = true;
                            }
                            if self
                                .max_frames
                                .map_or(false, |limit| stats.frames_processed >= limit)
                            {
                                info!(
                                    frames = stats.frames_processed,
                                    "[Session] Frame limit reached"
                                );
                                break;
                            }
                        }
                        Ok(FrameEvent::Eof) => {
                            info!(
                                frames = stats.frames_processed,
                                "[Session] Frame source exhausted"
                            );
                            break;
                        }
                        Err(e) => {
                            failure = Some(e.into());
                        }
                    }
                }
            }
        }

        gate_cancel.cancel();
        let gate_result = gate_task.await;

        if let Some(e) = failure {
            return Err(e);
        }
        match gate_result {
            Err(join_err) => return Err(join_err.into()),
            Ok(Err(gate_err)) => return Err(gate_err.into()),
            Ok(Ok(())) if gate_lost => return Err(GateError::Closed.into()),
            Ok(Ok(())) => {}
        }

        stats.shots_taken = self.controller.shots();
        stats.corrections_given = self.controller.coach().corrections_given();
        stats.corrections_followed = self.controller.coach().corrections_followed();
        log_stats(&stats);
        Ok(stats)
    }
}

/// Push one batch of controller events out to the gate and UI sink.
/// `Err` means the gate is gone and the session should wind down.
fn relay_events(
    events: Vec<PhaseEvent>,
    handle: &TurnGateHandle,
    sink: &Arc<dyn UiSink>,
    stats: &mut SessionStats,
) -> Result<(), GateError> {
    for event in events {
        match event {
            PhaseEvent::Say { text, ends_turn } => {
                handle.send(text, ends_turn)?;
                if ends_turn {
                    stats.prompts_sent += 1;
                } else {
                    stats.context_updates += 1;
                }
            }
            PhaseEvent::Ui(ui_event) => sink.publish(ui_event),
            PhaseEvent::Capture { shot } => {
                stats.shots_taken = shot;
            }
            // The controller logs transitions itself.
            PhaseEvent::PhaseChanged { .. } => {}
        }
    }
    Ok(())
}

fn log_stats(stats: &SessionStats) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📷 SESSION STATISTICS");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Frames Processed:     {}", stats.frames_processed);
    info!("   Prompts Sent:         {}", stats.prompts_sent);
    info!("   Context Updates:      {}", stats.context_updates);
    info!("   Shots Taken:          {}", stats.shots_taken);
    info!("   Corrections Given:    {}", stats.corrections_given);
    info!("   Corrections Followed: {}", stats.corrections_followed);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
