//! Conversational Channel
//!
//! The coach speaks through a conversational agent that holds a spoken
//! dialogue with the subject. This module defines the delivery seam:
//! a [`ConversationalChannel`] accepts prompt text, and every delivery is
//! tagged with whether it ends the agent's speaking turn (a coach line the
//! agent voices) or slots silently into the open turn (context such as
//! live pose data).
//!
//! The default [`ConsoleChannel`] prints prompts and simulates the agent's
//! reply latency, which is enough for replay and synthetic runs.

use async_trait::async_trait;
use thiserror::Error;

mod console;
pub use console::ConsoleChannel;

/// Channel delivery errors
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel closed: {0}")]
    Closed(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Signals flowing back from the channel to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSignal {
    /// The agent finished speaking its current turn.
    TurnComplete,
}

/// Unified trait for prompt delivery backends
#[async_trait]
pub trait ConversationalChannel: Send + Sync {
    /// Deliver prompt text to the agent. `ends_turn` marks deliveries the
    /// agent should voice (opening a speaking turn) as opposed to silent
    /// context updates.
    async fn deliver(&self, text: &str, ends_turn: bool) -> Result<(), ChannelError>;

    /// Get the channel name for logging
    fn name(&self) -> &'static str;
}
