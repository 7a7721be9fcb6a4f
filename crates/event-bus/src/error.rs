//! Error types for publishing, subscribing, and handling events.

use broker::BrokerError;
use events::EnvelopeError;
use thiserror::Error;

/// Errors returned by [`EventBus::publish`](crate::EventBus::publish).
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event could not be serialized into an envelope.
    #[error("Event serialization failed: {0}")]
    Serialization(#[from] EnvelopeError),

    /// The broker stayed unreachable through the bounded publish retry.
    #[error("Broker unavailable after {attempts} publish attempts: {source}")]
    BrokerUnavailable {
        attempts: u32,
        #[source]
        source: BrokerError,
    },
}

/// Errors returned by subscribe and unsubscribe operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Queue setup or teardown failed on the broker.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Failure reported by a handler for a single delivery.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload does not have the shape the handler expects for its
    /// event type. Retrying cannot fix this, so the message is
    /// dead-lettered without further attempts.
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] EnvelopeError),

    /// The handler failed transiently; the delivery will be retried.
    #[error("Handler failed: {0}")]
    Failed(String),
}

impl HandlerError {
    /// Creates a transient failure from any displayable message.
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// Returns true if retrying the delivery might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Failed(_))
    }
}
