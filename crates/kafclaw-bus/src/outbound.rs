//! Outbound side of the bus: per-channel broadcast fan-out.
//!
//! Multiple subscribers on the same channel all receive every message;
//! ordering within a channel is FIFO with respect to publish. No
//! backpressure is applied — a slow subscriber drops the oldest
//! un-consumed message (broadcast channel lag), matching spec §4.1.

use std::sync::Arc;

use dashmap::DashMap;
use kafclaw_core::OutboundMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default per-channel broadcast capacity.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Outbound half of the bus.
pub struct OutboundBus {
    channels: DashMap<String, broadcast::Sender<Arc<OutboundMessage>>>,
    capacity: usize,
}

impl OutboundBus {
    /// Create a new outbound bus with the default per-channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Create a new outbound bus with a specific per-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Arc<OutboundMessage>> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish an outbound message to its channel's subscribers.
    ///
    /// Returns the number of subscribers that received it (0 is not an
    /// error — it just means nobody is currently subscribed).
    pub fn publish(&self, msg: OutboundMessage) -> usize {
        let sender = self.sender_for(&msg.channel);
        match sender.send(Arc::new(msg)) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    /// Subscribe to a channel's outbound messages.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> OutboundReceiver {
        OutboundReceiver {
            receiver: self.sender_for(channel).subscribe(),
        }
    }
}

impl Default for OutboundBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber handle for one channel's outbound messages.
pub struct OutboundReceiver {
    receiver: broadcast::Receiver<Arc<OutboundMessage>>,
}

impl OutboundReceiver {
    /// Receive the next message, skipping past any lag (dropped backlog)
    /// transparently and logging a warning, matching the "slow
    /// subscribers drop the oldest message" contract.
    pub async fn recv(&mut self) -> Option<Arc<OutboundMessage>> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "outbound subscriber lagged, dropping backlog");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Run until the next message arrives or `cancel` fires.
    pub async fn recv_cancellable(&mut self, cancel: &CancellationToken) -> Option<Arc<OutboundMessage>> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            msg = self.recv() => msg,
        }
    }
}
