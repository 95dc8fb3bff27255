//! Inbound side of the bus: single consumer, bounded queue, non-blocking
//! publish.

use kafclaw_core::InboundMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{BusError, BusResult};

/// Default bounded capacity for the inbound queue.
pub const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Inbound half of the bus.
///
/// Exactly one [`InboundBus::consume`] caller should exist per process —
/// the Agent Loop — guaranteeing total order. `publish` never blocks: when
/// the bounded queue is full it returns [`BusError::InboundOverflow`] so
/// the caller can record the drop in the audit chain rather than stalling
/// upstream channel adapters.
pub struct InboundBus {
    sender: mpsc::Sender<InboundMessage>,
    receiver: tokio::sync::Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    capacity: usize,
}

impl InboundBus {
    /// Create a new inbound bus with the default bounded capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOUND_CAPACITY)
    }

    /// Create a new inbound bus with a specific bounded capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(Some(receiver)),
            capacity,
        }
    }

    /// Publish an inbound message. Non-blocking; returns an overflow error
    /// if the bounded queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InboundOverflow`] if the queue is full, or
    /// [`BusError::Closed`] if the consumer side has been dropped.
    pub fn publish(&self, msg: InboundMessage) -> BusResult<()> {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(capacity = self.capacity, "inbound bus overflow");
                Err(BusError::InboundOverflow {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BusError::Closed),
        }
    }

    /// Take ownership of the single consumer handle.
    ///
    /// Panics (in debug assertions) if called more than once — the bus
    /// contract is exactly one consumer per process; callers should treat
    /// a second call as a programming error, not a recoverable one.
    pub async fn take_consumer(&self) -> Option<InboundConsumer> {
        let mut guard = self.receiver.lock().await;
        guard.take().map(|receiver| InboundConsumer { receiver })
    }
}

impl Default for InboundBus {
    fn default() -> Self {
        Self::new()
    }
}

/// The single consumer handle for the inbound bus.
pub struct InboundConsumer {
    receiver: mpsc::Receiver<InboundMessage>,
}

impl InboundConsumer {
    /// Consume the next inbound message, or `None` if cancelled or the
    /// bus was closed.
    pub async fn consume(&mut self, cancel: &CancellationToken) -> Option<InboundMessage> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            msg = self.receiver.recv() => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_consume_round_trips() {
        let bus = InboundBus::with_capacity(4);
        let msg = InboundMessage::new("cli", "u1", "c1", "hi", None);
        bus.publish(msg.clone()).unwrap();

        let mut consumer = bus.take_consumer().await.unwrap();
        let cancel = CancellationToken::new();
        let received = consumer.consume(&cancel).await.unwrap();
        assert_eq!(received.idempotency_key, msg.idempotency_key);
    }

    #[tokio::test]
    async fn overflow_when_queue_full() {
        let bus = InboundBus::with_capacity(1);
        bus.publish(InboundMessage::new("cli", "u1", "c1", "a", None))
            .unwrap();
        let err = bus
            .publish(InboundMessage::new("cli", "u1", "c1", "b", None))
            .unwrap_err();
        assert!(matches!(err, BusError::InboundOverflow { capacity: 1 }));
    }

    #[tokio::test]
    async fn cancellation_stops_consume() {
        let bus = InboundBus::with_capacity(4);
        let mut consumer = bus.take_consumer().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(consumer.consume(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn only_one_consumer_can_be_taken() {
        let bus = InboundBus::with_capacity(4);
        assert!(bus.take_consumer().await.is_some());
        assert!(bus.take_consumer().await.is_none());
    }
}
