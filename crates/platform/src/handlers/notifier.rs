//! User-facing notifications derived from order and payment events.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use common::EventId;
use event_bus::{HandlerError, IntegrationEventHandler};
use events::accounts::UserRegistered;
use events::orders::{OrderPlaced, PaymentFailed};
use events::{EventEnvelope, IntegrationEvent};

/// Renders a notification per account and order event, deduplicating on
/// the event ID so a redelivered message never notifies twice.
#[derive(Default)]
pub struct Notifier {
    seen: Mutex<HashSet<EventId>>,
    messages: Mutex<Vec<String>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types this notifier needs a subscription for.
    pub fn event_types() -> [&'static str; 3] {
        [
            UserRegistered::EVENT_TYPE,
            OrderPlaced::EVENT_TYPE,
            PaymentFailed::EVENT_TYPE,
        ]
    }

    /// Notifications sent so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn send(&self, message: String) {
        tracing::info!(notification = %message, "notification sent");
        metrics::counter!("notifications_sent_total").increment(1);
        self.messages.lock().unwrap().push(message);
    }
}

#[async_trait]
impl IntegrationEventHandler for Notifier {
    fn name(&self) -> &'static str {
        "order-notifier"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        if !self.seen.lock().unwrap().insert(event.event_id) {
            metrics::counter!("notifications_duplicates_skipped_total").increment(1);
            return Ok(());
        }

        match event.event_type.as_str() {
            UserRegistered::EVENT_TYPE => {
                let user: UserRegistered = event.decode()?;
                self.send(format!("Welcome aboard, {}!", user.username));
            }
            OrderPlaced::EVENT_TYPE => {
                let order: OrderPlaced = event.decode()?;
                self.send(format!(
                    "Order {} placed: {} line(s), total {}",
                    order.order_id,
                    order.lines.len(),
                    order.total
                ));
            }
            PaymentFailed::EVENT_TYPE => {
                let payment: PaymentFailed = event.decode()?;
                self.send(format!(
                    "Payment of {} for order {} failed: {}",
                    payment.amount, payment.order_id, payment.reason
                ));
            }
            _ => {}
        }
        Ok(())
    }
}
