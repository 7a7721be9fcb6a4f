use thiserror::Error;

/// Errors that can occur when talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker connection is down.
    ///
    /// Transient by contract: callers retry or reconnect rather than
    /// treating this as fatal.
    #[error("Broker connection lost")]
    ConnectionLost,

    /// The queue does not exist on the broker.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The delivery tag does not correspond to an in-flight message,
    /// typically because the connection dropped since the delivery.
    #[error("Unknown delivery tag: {0}")]
    UnknownDelivery(u64),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
