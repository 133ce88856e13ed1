//! Outbound Turn Gate
//!
//! Serializes coach prompts into the conversational agent's turn-taking
//! rhythm. The agent can only voice one line at a time, and firing prompts
//! at it mid-speech loses them, so the gate enforces two rules for
//! turn-ending prompts:
//!
//! - at most one open speaking turn at a time (the next prompt waits until
//!   the agent reports its turn complete)
//! - a minimum pacing gap between consecutive turn dispatches, so the coach
//!   never machine-guns instructions at the subject
//!
//! Silent context updates (`ends_turn = false`) bypass both rules and slot
//! straight into whatever turn is open.
//!
//! The gate runs as a single actor owning the queue; sessions talk to it
//! through a cloneable [`TurnGateHandle`].

use crate::channel::{ChannelError, ConversationalChannel};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Turn gate errors
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Turn gate is not running")]
    Closed,

    #[error("Prompt delivery failed: {0}")]
    Delivery(#[from] ChannelError),
}

// ============================================================================
// Commands and Handle
// ============================================================================

#[derive(Debug)]
enum GateCommand {
    Send { text: String, ends_turn: bool },
    TurnComplete,
}

/// Handle to submit prompts to the gate
#[derive(Clone)]
pub struct TurnGateHandle {
    tx: mpsc::UnboundedSender<GateCommand>,
}

impl TurnGateHandle {
    /// Queue prompt text for delivery. Turn-ending prompts are paced;
    /// silent updates go straight through.
    pub fn send(&self, text: impl Into<String>, ends_turn: bool) -> Result<(), GateError> {
        self.tx
            .send(GateCommand::Send {
                text: text.into(),
                ends_turn,
            })
            .map_err(|_| GateError::Closed)
    }

    /// Report that the agent finished voicing its current turn.
    pub fn turn_complete(&self) -> Result<(), GateError> {
        self.tx
            .send(GateCommand::TurnComplete)
            .map_err(|_| GateError::Closed)
    }
}

// ============================================================================
// Gate Actor
// ============================================================================

struct PendingPrompt {
    text: String,
    enqueued_at: Instant,
}

/// Turn gate actor. Built with [`new()`](TurnGate::new), consumed by
/// [`run()`](TurnGate::run).
pub struct TurnGate {
    channel: Arc<dyn ConversationalChannel>,
    rx: mpsc::UnboundedReceiver<GateCommand>,
    queue: VecDeque<PendingPrompt>,
    turn_open: bool,
    last_turn_dispatch: Option<Instant>,
    min_gap: Duration,
    dispatched: u64,
}

impl TurnGate {
    /// Create the gate and its handle. Pacing comes from `[gate]` config.
    pub fn new(channel: Arc<dyn ConversationalChannel>) -> (Self, TurnGateHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let min_gap = Duration::from_secs_f64(crate::config::get().gate.min_gap_secs);

        let gate = Self {
            channel,
            rx,
            queue: VecDeque::new(),
            turn_open: false,
            last_turn_dispatch: None,
            min_gap,
            dispatched: 0,
        };

        (gate, TurnGateHandle { tx })
    }

    /// Run the gate loop until cancellation or the last handle drops.
    /// A delivery failure stops the loop with an error: the session cannot
    /// continue coaching through a dead channel.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), GateError> {
        info!(
            channel = self.channel.name(),
            min_gap_secs = self.min_gap.as_secs_f64(),
            "Turn gate starting"
        );

        loop {
            let deadline = self.flush_deadline();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(held = self.queue.len(), "Turn gate shutdown signal received");
                    return Ok(());
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await?,
                        None => {
                            info!("Turn gate handle dropped, shutting down");
                            return Ok(());
                        }
                    }
                }
                () = wait_until(deadline) => {
                    self.flush_if_ready().await?;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: GateCommand) -> Result<(), GateError> {
        match cmd {
            GateCommand::Send { text, ends_turn } => {
                if !ends_turn {
                    self.channel.deliver(&text, false).await?;
                    return Ok(());
                }
                if self.can_dispatch() {
                    self.dispatch(text).await
                } else {
                    debug!(
                        held = self.queue.len() + 1,
                        turn_open = self.turn_open,
                        "Prompt held for open turn or pacing gap"
                    );
                    self.queue.push_back(PendingPrompt {
                        text,
                        enqueued_at: Instant::now(),
                    });
                    Ok(())
                }
            }
            GateCommand::TurnComplete => {
                self.turn_open = false;
                debug!(held = self.queue.len(), "Agent turn complete");
                self.flush_if_ready().await
            }
        }
    }

    fn gap_satisfied(&self) -> bool {
        self.last_turn_dispatch
            .map_or(true, |last| last.elapsed() >= self.min_gap)
    }

    fn can_dispatch(&self) -> bool {
        !self.turn_open && self.gap_satisfied()
    }

    /// When the head of the queue becomes dispatchable by time alone.
    fn flush_deadline(&self) -> Option<Instant> {
        if self.turn_open || self.queue.is_empty() {
            return None;
        }
        Some(
            self.last_turn_dispatch
                .map_or_else(Instant::now, |last| last + self.min_gap),
        )
    }

    async fn flush_if_ready(&mut self) -> Result<(), GateError> {
        if !self.can_dispatch() {
            return Ok(());
        }
        if let Some(pending) = self.queue.pop_front() {
            debug!(
                waited_ms = pending.enqueued_at.elapsed().as_millis(),
                held = self.queue.len(),
                "Flushing held prompt"
            );
            self.dispatch(pending.text).await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, text: String) -> Result<(), GateError> {
        self.dispatched += 1;
        self.turn_open = true;
        self.last_turn_dispatch = Some(Instant::now());
        debug!(
            prompt_id = self.dispatched,
            chars = text.len(),
            "Dispatching turn prompt"
        );
        self.channel.deliver(&text, true).await?;
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::testkit::ensure_config;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Delivery {
        text: String,
        ends_turn: bool,
        at: Instant,
    }

    #[derive(Default)]
    struct RecordingChannel {
        log: Mutex<Vec<Delivery>>,
    }

    impl RecordingChannel {
        fn deliveries(&self) -> Vec<(String, bool, Instant)> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .map(|d| (d.text.clone(), d.ends_turn, d.at))
                .collect()
        }
    }

    #[async_trait]
    impl ConversationalChannel for RecordingChannel {
        async fn deliver(&self, text: &str, ends_turn: bool) -> Result<(), ChannelError> {
            self.log.lock().unwrap().push(Delivery {
                text: text.to_string(),
                ends_turn,
                at: Instant::now(),
            });
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl ConversationalChannel for FailingChannel {
        async fn deliver(&self, _text: &str, _ends_turn: bool) -> Result<(), ChannelError> {
            Err(ChannelError::Delivery("injected failure".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn spawn_gate(
        channel: Arc<RecordingChannel>,
    ) -> (
        TurnGateHandle,
        CancellationToken,
        tokio::task::JoinHandle<Result<(), GateError>>,
    ) {
        ensure_config();
        let (gate, handle) = TurnGate::new(channel);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(gate.run(cancel.clone()));
        (handle, cancel, task)
    }

    /// Let the actor drain its mailbox under paused time.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_prompt_dispatches_immediately() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, _cancel, _task) = spawn_gate(channel.clone());
        let start = Instant::now();

        handle.send("[COACH - STEP 1/4] Feet apart", true).unwrap();
        settle().await;

        let deliveries = channel.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "[COACH - STEP 1/4] Feet apart");
        assert!(deliveries[0].1);
        assert_eq!(deliveries[0].2 - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn context_updates_bypass_the_gate() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, _cancel, _task) = spawn_gate(channel.clone());

        handle.send("turn line", true).unwrap();
        handle.send("[POSE DATA] Head: center", false).unwrap();
        settle().await;

        // The context update goes out even though the turn is still open.
        let deliveries = channel.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1].0, "[POSE DATA] Head: center");
        assert!(!deliveries[1].1);
    }

    #[tokio::test(start_paused = true)]
    async fn held_prompts_flush_in_fifo_order() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, _cancel, _task) = spawn_gate(channel.clone());
        let start = Instant::now();

        handle.send("first", true).unwrap();
        handle.send("second", true).unwrap();
        handle.send("third", true).unwrap();
        settle().await;
        assert_eq!(channel.deliveries().len(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        handle.turn_complete().unwrap();
        settle().await;
        assert_eq!(channel.deliveries().len(), 2);

        tokio::time::sleep(Duration::from_secs(4)).await;
        handle.turn_complete().unwrap();
        settle().await;

        let deliveries = channel.deliveries();
        let texts: Vec<&str> = deliveries.iter().map(|d| d.0.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert!(deliveries.iter().all(|d| d.1));
        assert_eq!(deliveries[1].2 - start, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_gap_separates_back_to_back_turns() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, _cancel, _task) = spawn_gate(channel.clone());
        let start = Instant::now();

        handle.send("first", true).unwrap();
        settle().await;
        // Agent replies almost instantly; the next prompt arrives one
        // second in, with the pacing gap still unsatisfied.
        handle.turn_complete().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.send("second", true).unwrap();
        settle().await;
        assert_eq!(channel.deliveries().len(), 1);

        // The deferred flush fires on its own once the gap elapses.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let deliveries = channel.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1].2 - start, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn turn_complete_waits_out_the_remaining_gap() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, _cancel, _task) = spawn_gate(channel.clone());
        let start = Instant::now();

        handle.send("first", true).unwrap();
        handle.send("second", true).unwrap();
        settle().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.turn_complete().unwrap();
        settle().await;
        // Turn closed at 1s but the 3s gap still applies.
        assert_eq!(channel.deliveries().len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let deliveries = channel.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1].2 - start, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_held_prompts() {
        let channel = Arc::new(RecordingChannel::default());
        let (handle, cancel, task) = spawn_gate(channel.clone());

        handle.send("delivered", true).unwrap();
        handle.send("held", true).unwrap();
        settle().await;

        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(task.await.unwrap().is_ok());
        assert_eq!(channel.deliveries().len(), 1);
        assert!(matches!(handle.send("late", true), Err(GateError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_stops_the_gate() {
        ensure_config();
        let (gate, handle) = TurnGate::new(Arc::new(FailingChannel));
        let task = tokio::spawn(gate.run(CancellationToken::new()));

        handle.send("doomed", true).unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(GateError::Delivery(_))));
    }
}
