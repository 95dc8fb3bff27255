//! The CLI's own channel adapter: reads lines from stdin as inbound
//! messages on channel `"cli"`, and prints whatever the Agent Loop
//! publishes back to that channel. One of potentially many channel
//! adapters the gateway could have (WhatsApp, iMessage, Telegram, a
//! scheduler) — this is the only one this workspace implements, the
//! rest being out-of-scope external gateways.

use std::sync::Arc;

use kafclaw_bus::{InboundBus, OutboundBus};
use kafclaw_core::InboundMessage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::theme::Theme;

/// Channel name this adapter publishes under and subscribes to.
pub(crate) const CHANNEL: &str = "cli";

/// Read stdin lines and publish them as inbound messages until EOF or
/// cancellation. `sender_id`/`chat_id` are both fixed to the local
/// operator identity — a CLI session has exactly one user and one chat.
pub(crate) async fn run_stdin_reader(inbound: Arc<InboundBus>, sender_id: String, chat_id: String, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match next {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let msg = InboundMessage::new(CHANNEL, &sender_id, &chat_id, trimmed, None);
                if let Err(e) = inbound.publish(msg) {
                    eprintln!("{}", Theme::error(&format!("failed to publish message: {e}")));
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}", Theme::error(&format!("stdin read error: {e}")));
                break;
            }
        }
    }
}

/// Subscribe to the `"cli"` channel's outbound messages and print each
/// reply as it arrives, until cancellation or the bus is dropped.
pub(crate) async fn run_stdout_printer(outbound: Arc<OutboundBus>, cancel: CancellationToken) {
    let mut receiver = outbound.subscribe(CHANNEL);
    while let Some(msg) = receiver.recv_cancellable(&cancel).await {
        println!("{}\n{}", Theme::dimmed("kafclaw:"), msg.content);
    }
}
