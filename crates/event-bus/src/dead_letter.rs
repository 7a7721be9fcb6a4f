//! Dead-letter records for messages that could not be processed.

use chrono::{DateTime, Utc};
use common::EventId;
use events::EventEnvelope;
use serde::{Deserialize, Serialize};

/// One handler's terminal failure on a dead-lettered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerFailure {
    /// Name of the handler that never succeeded.
    pub handler: String,

    /// Rendered error from its final attempt.
    pub error: String,
}

/// Record written to the dead-letter queue when a message exhausts its
/// delivery attempts or cannot be decoded. The original payload is kept
/// so the message can be inspected and replayed manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Queue the message was consumed from.
    pub source_queue: String,

    /// Event type tag, when the envelope could be decoded.
    pub event_type: Option<String>,

    /// Event ID, when the envelope could be decoded.
    pub event_id: Option<EventId>,

    /// Why the message was dead-lettered.
    pub reason: String,

    /// Delivery attempts consumed before giving up.
    pub attempts: u32,

    /// Handlers that never succeeded, with their final errors.
    pub failed_handlers: Vec<HandlerFailure>,

    /// The original message payload, lossily decoded as UTF-8.
    pub payload: String,

    /// When the message was dead-lettered.
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetter {
    /// Record for a message whose payload never decoded as an envelope.
    pub fn malformed(source_queue: &str, payload: &[u8], reason: String) -> Self {
        Self {
            source_queue: source_queue.to_string(),
            event_type: None,
            event_id: None,
            reason,
            attempts: 1,
            failed_handlers: Vec::new(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            dead_lettered_at: Utc::now(),
        }
    }

    /// Record for a decoded message whose handlers never all succeeded.
    pub fn exhausted(
        source_queue: &str,
        envelope: &EventEnvelope,
        payload: &[u8],
        attempts: u32,
        failed_handlers: Vec<HandlerFailure>,
    ) -> Self {
        Self {
            source_queue: source_queue.to_string(),
            event_type: Some(envelope.event_type.clone()),
            event_id: Some(envelope.event_id),
            reason: format!(
                "{} handler(s) still failing after {} delivery attempts",
                failed_handlers.len(),
                attempts
            ),
            attempts,
            failed_handlers,
            payload: String::from_utf8_lossy(payload).into_owned(),
            dead_lettered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::IntegrationEvent;

    #[derive(Debug, Serialize, Deserialize)]
    struct PingSent {
        value: u32,
    }

    impl IntegrationEvent for PingSent {
        const EVENT_TYPE: &'static str = "PingSent";
    }

    #[test]
    fn malformed_record_has_no_envelope_fields() {
        let record = DeadLetter::malformed("svc.PingSent", b"not json", "bad payload".into());

        assert_eq!(record.source_queue, "svc.PingSent");
        assert_eq!(record.event_type, None);
        assert_eq!(record.event_id, None);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.payload, "not json");
    }

    #[test]
    fn exhausted_record_carries_envelope_identity_and_failures() {
        let envelope = EventEnvelope::new(&PingSent { value: 7 }).unwrap();
        let payload = envelope.to_bytes().unwrap();
        let failures = vec![HandlerFailure {
            handler: "audit".into(),
            error: "Handler failed: db down".into(),
        }];

        let record = DeadLetter::exhausted("svc.PingSent", &envelope, &payload, 5, failures);

        assert_eq!(record.event_type.as_deref(), Some("PingSent"));
        assert_eq!(record.event_id, Some(envelope.event_id));
        assert_eq!(record.attempts, 5);
        assert_eq!(record.failed_handlers.len(), 1);
        assert!(record.reason.contains("5 delivery attempts"));
    }

    #[test]
    fn record_survives_serialization() {
        let record = DeadLetter::malformed("svc.PingSent", &[0xff, 0xfe], "garbage".into());

        let json = serde_json::to_vec(&record).unwrap();
        let decoded: DeadLetter = serde_json::from_slice(&json).unwrap();

        assert_eq!(decoded.source_queue, record.source_queue);
        assert_eq!(decoded.reason, "garbage");
    }
}
