//! The handler trait invoked for delivered events.

use async_trait::async_trait;
use events::EventEnvelope;

use crate::error::HandlerError;

/// A unit of subscriber logic bound to one or more event types.
///
/// Delivery is at-least-once: after a redelivery the same envelope (same
/// `event_id`) may be seen again, so handlers with side effects should
/// deduplicate on the event ID.
#[async_trait]
pub trait IntegrationEventHandler: Send + Sync {
    /// Name identifying this handler within an event type. Registration
    /// is idempotent per (event type, name) pair, and the name appears in
    /// dead-letter records when the handler fails terminally.
    fn name(&self) -> &'static str;

    /// Processes one delivered event.
    ///
    /// Returning [`HandlerError::Failed`] requeues the handler for the
    /// next retry attempt; returning [`HandlerError::Malformed`] sends
    /// the message straight to the dead-letter queue.
    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError>;
}
