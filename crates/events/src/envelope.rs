//! The self-describing wire envelope for integration events.

use chrono::{DateTime, Utc};
use common::EventId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::IntegrationEvent;

/// Errors that can occur when building or decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope carries a different event type than the one requested.
    #[error("Expected event type '{expected}' but envelope carries '{found}'")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An immutable envelope wrapping one integration event for transit.
///
/// The envelope is what actually crosses the broker: a fresh `EventId`
/// (consumers deduplicate on it), the UTC creation timestamp, the event
/// type tag used for routing, and the payload as JSON. Consumers decode
/// the payload based solely on the type tag; unknown payload fields are
/// ignored so producers can add optional fields without breaking old
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event, generated at construction.
    pub event_id: EventId,

    /// The type tag of the event (e.g., "ProductCreated").
    pub event_type: String,

    /// When the event was created.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wraps an event in a new envelope with a fresh ID and the current time.
    pub fn new<E: IntegrationEvent>(event: &E) -> Result<Self, EnvelopeError> {
        Ok(Self {
            event_id: EventId::new(),
            event_type: E::EVENT_TYPE.to_string(),
            occurred_at: Utc::now(),
            payload: serde_json::to_value(event)?,
        })
    }

    /// Decodes the payload as the given event type.
    ///
    /// Fails with `TypeMismatch` if the envelope's type tag does not match
    /// `E::EVENT_TYPE`, so a handler can never silently misinterpret a
    /// payload routed to the wrong place.
    pub fn decode<E: IntegrationEvent>(&self) -> Result<E, EnvelopeError> {
        if self.event_type != E::EVENT_TYPE {
            return Err(EnvelopeError::TypeMismatch {
                expected: E::EVENT_TYPE,
                found: self.event_type.clone(),
            });
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Serializes the envelope to its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes an envelope from its wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
