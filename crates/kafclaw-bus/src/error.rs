//! Bus error types.

/// Errors from bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bounded inbound queue is full; the caller should report this to
    /// the audit chain and drop the message (spec §4.1).
    #[error("inbound queue overflow (capacity {capacity})")]
    InboundOverflow {
        /// Configured capacity of the inbound queue.
        capacity: usize,
    },

    /// The bus was shut down.
    #[error("bus closed")]
    Closed,
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;
