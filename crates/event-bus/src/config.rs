//! Event bus configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// How the handlers for one message are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Handlers run one after another in registration order.
    #[default]
    Sequential,

    /// Handlers run concurrently; acknowledgment waits for all of them.
    Concurrent,
}

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Name of this service. Prefixes the queues the bus binds, so two
    /// services subscribing to the same event type each get their own
    /// copy of every message.
    pub service_name: String,

    /// Bounded number of attempts for a single publish call.
    pub publish_attempts: u32,

    /// Fixed delay between publish attempts.
    pub publish_retry_delay: Duration,

    /// Total delivery attempts per message before it is dead-lettered.
    pub max_delivery_attempts: u32,

    /// Backoff between delivery attempts.
    pub retry: RetryPolicy,

    /// Backoff between reconnect attempts after a lost broker connection.
    pub reconnect: RetryPolicy,

    /// How handlers are invoked for each message.
    pub dispatch: DispatchMode,

    /// Suffix appended to a queue name to form its dead-letter queue.
    pub dead_letter_suffix: String,
}

impl BusConfig {
    /// Creates a configuration with defaults for the given service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            publish_attempts: 3,
            publish_retry_delay: Duration::from_millis(50),
            max_delivery_attempts: 5,
            retry: RetryPolicy::default(),
            reconnect: RetryPolicy::default(),
            dispatch: DispatchMode::default(),
            dead_letter_suffix: "dlq".to_string(),
        }
    }

    pub fn with_publish_attempts(mut self, attempts: u32) -> Self {
        self.publish_attempts = attempts.max(1);
        self
    }

    pub fn with_publish_retry_delay(mut self, delay: Duration) -> Self {
        self.publish_retry_delay = delay;
        self
    }

    pub fn with_max_delivery_attempts(mut self, attempts: u32) -> Self {
        self.max_delivery_attempts = attempts.max(1);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_reconnect(mut self, policy: RetryPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    pub fn with_dead_letter_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.dead_letter_suffix = suffix.into();
        self
    }

    /// Returns the queue this service binds for an event type.
    pub fn queue_name(&self, event_type: &str) -> String {
        format!("{}.{}", self.service_name, event_type)
    }

    /// Returns the dead-letter queue for a source queue.
    pub fn dead_letter_queue(&self, queue: &str) -> String {
        format!("{}.{}", queue, self.dead_letter_suffix)
    }
}
