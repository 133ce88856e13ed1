//! Console channel: prints prompts and simulates agent reply latency.

use super::{ChannelError, ChannelSignal, ConversationalChannel};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Prompt sink that writes to stdout. Turn-ending deliveries schedule a
/// [`ChannelSignal::TurnComplete`] after a fixed reply delay, standing in
/// for the time a live agent spends voicing its line.
pub struct ConsoleChannel {
    signal_tx: mpsc::UnboundedSender<ChannelSignal>,
    reply_delay: Duration,
}

impl ConsoleChannel {
    /// Create the channel and the signal stream the session listens on.
    pub fn new(reply_delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<ChannelSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let channel = Arc::new(Self {
            signal_tx,
            reply_delay,
        });
        (channel, signal_rx)
    }
}

#[async_trait]
impl ConversationalChannel for ConsoleChannel {
    async fn deliver(&self, text: &str, ends_turn: bool) -> Result<(), ChannelError> {
        println!("{text}");
        debug!(chars = text.len(), ends_turn, "Prompt delivered to console");

        if ends_turn {
            let tx = self.signal_tx.clone();
            let delay = self.reply_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Session may already be gone; a dropped receiver is fine.
                let _ = tx.send(ChannelSignal::TurnComplete);
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
