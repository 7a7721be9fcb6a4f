//! Background delivery workers, one per subscribed event type.

use std::sync::Arc;
use std::time::Instant;

use broker::{Broker, BrokerConsumer, BrokerError, Delivery};
use events::EventEnvelope;
use futures_util::future::join_all;
use tokio::sync::watch;

use crate::config::{BusConfig, DispatchMode};
use crate::dead_letter::{DeadLetter, HandlerFailure};
use crate::error::HandlerError;
use crate::handler::IntegrationEventHandler;
use crate::registry::HandlerRegistry;

/// Consumes one subscription queue and dispatches each message to every
/// handler registered for its event type.
///
/// A message is acknowledged only after all handlers succeeded or the
/// retry budget is exhausted; in the latter case a [`DeadLetter`] record
/// is written first, so the message is never silently dropped. A lost
/// broker connection puts the worker into a reconnect loop with backoff
/// instead of killing it.
pub(crate) struct DeliveryWorker {
    broker: Arc<dyn Broker>,
    registry: Arc<HandlerRegistry>,
    config: BusConfig,
    queue: String,
    event_type: String,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryWorker {
    pub(crate) fn new(
        broker: Arc<dyn Broker>,
        registry: Arc<HandlerRegistry>,
        config: BusConfig,
        event_type: String,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let queue = config.queue_name(&event_type);
        Self {
            broker,
            registry,
            config,
            queue,
            event_type,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or the queue is deleted. A
    /// dispatch already in flight when shutdown arrives is finished
    /// first, so no acknowledged work is cut short.
    pub(crate) async fn run(mut self, mut consumer: Box<dyn BrokerConsumer>) {
        tracing::debug!(queue = %self.queue, "delivery worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                delivery = consumer.next_delivery() => {
                    match delivery {
                        Ok(Some(delivery)) => {
                            self.process(&mut consumer, delivery).await;
                        }
                        Ok(None) => {
                            tracing::debug!(queue = %self.queue, "queue deleted, worker stopping");
                            break;
                        }
                        Err(err) => {
                            tracing::warn!(queue = %self.queue, error = %err, "broker connection lost");
                            match self.reconnect().await {
                                Some(new_consumer) => consumer = new_consumer,
                                None => break,
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!(queue = %self.queue, "delivery worker stopped");
    }

    /// Handles one delivered message end to end: decode, dispatch with
    /// retries, then ack or dead-letter.
    async fn process(&self, consumer: &mut Box<dyn BrokerConsumer>, delivery: Delivery) {
        let envelope = match EventEnvelope::from_bytes(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                // Undecodable payloads are poison; retrying cannot help.
                tracing::error!(queue = %self.queue, error = %err, "undecodable payload, dead-lettering");
                let record = DeadLetter::malformed(&self.queue, &delivery.payload, err.to_string());
                self.dead_letter(consumer, delivery.delivery_tag, record).await;
                return;
            }
        };

        let handlers = self.registry.handlers_for(&envelope.event_type);
        if handlers.is_empty() {
            // The last handler was removed while this message was in
            // flight; queue teardown follows shortly.
            self.ack(consumer, delivery.delivery_tag).await;
            return;
        }

        match self.deliver(&envelope, handlers).await {
            Ok(attempts) => {
                metrics::counter!("bus_events_delivered_total").increment(1);
                tracing::debug!(
                    queue = %self.queue,
                    event_id = %envelope.event_id,
                    attempts,
                    "event delivered"
                );
                self.ack(consumer, delivery.delivery_tag).await;
            }
            Err((attempts, failed_handlers)) => {
                tracing::error!(
                    queue = %self.queue,
                    event_id = %envelope.event_id,
                    attempts,
                    failed = failed_handlers.len(),
                    "delivery attempts exhausted, dead-lettering"
                );
                let record = DeadLetter::exhausted(
                    &self.queue,
                    &envelope,
                    &delivery.payload,
                    attempts,
                    failed_handlers,
                );
                self.dead_letter(consumer, delivery.delivery_tag, record).await;
            }
        }
    }

    /// Invokes every handler, retrying the failed ones with backoff until
    /// all succeed or the attempt budget is spent. Handlers that already
    /// succeeded are not invoked again.
    ///
    /// Returns the attempts used on success, or the attempts together
    /// with the handlers that never succeeded.
    async fn deliver(
        &self,
        envelope: &EventEnvelope,
        handlers: Vec<Arc<dyn IntegrationEventHandler>>,
    ) -> Result<u32, (u32, Vec<HandlerFailure>)> {
        let started = Instant::now();
        let mut backoff = self.config.retry.backoff();
        let mut pending = handlers;
        let mut failures: Vec<HandlerFailure> = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcomes = self.dispatch(envelope, &pending).await;

            let mut retry_next = Vec::new();
            let mut retry_errors = Vec::new();
            for (handler, outcome) in pending.iter().zip(outcomes) {
                let Err(err) = outcome else { continue };
                metrics::counter!("bus_handler_failures_total").increment(1);
                tracing::warn!(
                    handler = handler.name(),
                    event_id = %envelope.event_id,
                    attempt,
                    error = %err,
                    "handler failed"
                );
                let failure = HandlerFailure {
                    handler: handler.name().to_string(),
                    error: err.to_string(),
                };
                if err.is_retryable() {
                    retry_next.push(Arc::clone(handler));
                    retry_errors.push(failure);
                } else {
                    failures.push(failure);
                }
            }

            if retry_next.is_empty() {
                break;
            }
            if attempt >= self.config.max_delivery_attempts {
                failures.append(&mut retry_errors);
                break;
            }
            pending = retry_next;
            tokio::time::sleep(backoff.next_delay()).await;
        }

        metrics::histogram!("bus_dispatch_duration_seconds").record(started.elapsed().as_secs_f64());

        if failures.is_empty() {
            Ok(attempt)
        } else {
            Err((attempt, failures))
        }
    }

    /// Runs one round of handler invocations in the configured mode.
    async fn dispatch(
        &self,
        envelope: &EventEnvelope,
        handlers: &[Arc<dyn IntegrationEventHandler>],
    ) -> Vec<Result<(), HandlerError>> {
        match self.config.dispatch {
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(handlers.len());
                for handler in handlers {
                    outcomes.push(handler.handle(envelope).await);
                }
                outcomes
            }
            DispatchMode::Concurrent => {
                join_all(handlers.iter().map(|handler| handler.handle(envelope))).await
            }
        }
    }

    async fn ack(&self, consumer: &mut Box<dyn BrokerConsumer>, delivery_tag: u64) {
        if let Err(err) = consumer.ack(delivery_tag).await {
            tracing::warn!(queue = %self.queue, error = %err, "ack failed, message may be redelivered");
        }
    }

    /// Writes the record to the dead-letter queue, then acks the source
    /// message. If the dead-letter write fails the message is left
    /// unacked so the broker redelivers it once the connection recovers.
    async fn dead_letter(
        &self,
        consumer: &mut Box<dyn BrokerConsumer>,
        delivery_tag: u64,
        record: DeadLetter,
    ) {
        let dlq = self.config.dead_letter_queue(&self.queue);
        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(queue = %self.queue, error = %err, "could not serialize dead-letter record");
                return;
            }
        };
        if let Err(err) = self.broker.enqueue(&dlq, payload).await {
            tracing::warn!(
                queue = %self.queue,
                error = %err,
                "dead-letter enqueue failed, leaving message unacked"
            );
            return;
        }
        metrics::counter!("bus_events_dead_lettered_total").increment(1);
        self.ack(consumer, delivery_tag).await;
    }

    /// Re-binds the queue and attaches a fresh consumer after a lost
    /// connection. Returns None when the worker should stop instead:
    /// shutdown was signalled, or the queue is gone for good.
    async fn reconnect(&mut self) -> Option<Box<dyn BrokerConsumer>> {
        let mut backoff = self.config.reconnect.backoff();

        loop {
            if *self.shutdown.borrow() {
                return None;
            }

            let delay = backoff.next_delay();
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return None;
                    }
                }
                () = tokio::time::sleep(delay) => {}
            }

            if let Err(err) = self.broker.bind_queue(&self.queue, &self.event_type).await {
                tracing::debug!(queue = %self.queue, error = %err, "reconnect attempt failed");
                continue;
            }
            match self.broker.consume(&self.queue).await {
                Ok(consumer) => {
                    metrics::counter!("bus_broker_reconnects_total").increment(1);
                    tracing::info!(
                        queue = %self.queue,
                        attempts = backoff.attempt(),
                        "reconnected to broker"
                    );
                    return Some(consumer);
                }
                Err(BrokerError::QueueNotFound(_)) => return None,
                Err(err) => {
                    tracing::debug!(queue = %self.queue, error = %err, "reconnect attempt failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use broker::InMemoryBroker;
    use events::{EnvelopeError, IntegrationEvent};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct PingSent {
        value: u32,
    }

    impl IntegrationEvent for PingSent {
        const EVENT_TYPE: &'static str = "PingSent";
    }

    /// Fails the first `failures_before_success` invocations, then
    /// succeeds. `u32::MAX` means it never succeeds.
    struct FlakyHandler {
        name: &'static str,
        failures_before_success: u32,
        invocations: AtomicU32,
    }

    impl FlakyHandler {
        fn new(name: &'static str, failures_before_success: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                failures_before_success,
                invocations: AtomicU32::new(0),
            })
        }

        fn invocations(&self) -> u32 {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IntegrationEventHandler for FlakyHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<(), HandlerError> {
            let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures_before_success {
                Err(HandlerError::failed("not yet"))
            } else {
                Ok(())
            }
        }
    }

    struct PoisonHandler {
        invocations: AtomicU32,
    }

    #[async_trait]
    impl IntegrationEventHandler for PoisonHandler {
        fn name(&self) -> &'static str {
            "poison"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<(), HandlerError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::Malformed(EnvelopeError::TypeMismatch {
                expected: "PingSent",
                found: "something else".to_string(),
            }))
        }
    }

    fn test_worker(config: BusConfig) -> DeliveryWorker {
        let broker = InMemoryBroker::new();
        let (_tx, rx) = watch::channel(false);
        DeliveryWorker::new(
            Arc::new(broker),
            Arc::new(HandlerRegistry::new()),
            config,
            "PingSent".to_string(),
            rx,
        )
    }

    fn fast_config(max_attempts: u32) -> BusConfig {
        BusConfig::new("svc")
            .with_max_delivery_attempts(max_attempts)
            .with_retry(RetryPolicy::fixed(Duration::from_millis(1)))
    }

    fn envelope() -> EventEnvelope {
        EventEnvelope::new(&PingSent { value: 1 }).unwrap()
    }

    #[tokio::test]
    async fn deliver_retries_until_success() {
        let worker = test_worker(fast_config(5));
        let handler = FlakyHandler::new("flaky", 2);

        let result = worker.deliver(&envelope(), vec![handler.clone()]).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(handler.invocations(), 3);
    }

    #[tokio::test]
    async fn deliver_gives_up_after_budget() {
        let worker = test_worker(fast_config(3));
        let handler = FlakyHandler::new("hopeless", u32::MAX);

        let (attempts, failed) = worker
            .deliver(&envelope(), vec![handler.clone()])
            .await
            .unwrap_err();

        assert_eq!(attempts, 3);
        assert_eq!(handler.invocations(), 3);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].handler, "hopeless");
    }

    #[tokio::test]
    async fn malformed_error_skips_retries() {
        let worker = test_worker(fast_config(5));
        let handler = Arc::new(PoisonHandler {
            invocations: AtomicU32::new(0),
        });

        let (attempts, failed) = worker
            .deliver(&envelope(), vec![handler.clone()])
            .await
            .unwrap_err();

        assert_eq!(attempts, 1);
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(failed[0].handler, "poison");
    }

    #[tokio::test]
    async fn succeeded_handlers_are_not_reinvoked() {
        let worker = test_worker(fast_config(5));
        let steady = FlakyHandler::new("steady", 0);
        let flaky = FlakyHandler::new("flaky", 1);

        let result = worker
            .deliver(&envelope(), vec![steady.clone(), flaky.clone()])
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(steady.invocations(), 1);
        assert_eq!(flaky.invocations(), 2);
    }

    #[tokio::test]
    async fn concurrent_mode_invokes_all_handlers() {
        let config = fast_config(5).with_dispatch(DispatchMode::Concurrent);
        let worker = test_worker(config);
        let first = FlakyHandler::new("first", 0);
        let second = FlakyHandler::new("second", 0);

        let result = worker
            .deliver(&envelope(), vec![first.clone(), second.clone()])
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(first.invocations(), 1);
        assert_eq!(second.invocations(), 1);
    }

    #[tokio::test]
    async fn one_failing_handler_does_not_suppress_others() {
        let worker = test_worker(fast_config(2));
        let steady = FlakyHandler::new("steady", 0);
        let hopeless = FlakyHandler::new("hopeless", u32::MAX);

        let (attempts, failed) = worker
            .deliver(&envelope(), vec![steady.clone(), hopeless.clone()])
            .await
            .unwrap_err();

        assert_eq!(attempts, 2);
        assert_eq!(steady.invocations(), 1);
        assert_eq!(hopeless.invocations(), 2);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].handler, "hopeless");
    }
}
