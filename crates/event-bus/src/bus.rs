//! The integration event bus.

use std::collections::HashMap;
use std::sync::Arc;

use broker::{Broker, BrokerConsumer};
use common::EventId;
use events::{EventEnvelope, IntegrationEvent};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::BusConfig;
use crate::error::{PublishError, SubscriptionError};
use crate::handler::IntegrationEventHandler;
use crate::registry::HandlerRegistry;
use crate::worker::DeliveryWorker;

struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Publish/subscribe client for integration events over a message broker.
///
/// One instance is shared process-wide behind an [`Arc`]. Handlers live
/// in an explicitly constructed [`HandlerRegistry`] passed in at build
/// time; the bus adds the broker plumbing around it: one durable queue
/// and one background delivery worker per subscribed event type, named
/// `<service>.<event type>` so every subscribing service receives its
/// own copy of each event.
pub struct EventBus {
    broker: Arc<dyn Broker>,
    registry: Arc<HandlerRegistry>,
    config: BusConfig,
    workers: Mutex<HashMap<String, WorkerHandle>>,
}

impl EventBus {
    /// Creates a bus over the given broker and handler registry.
    pub fn new(broker: Arc<dyn Broker>, registry: Arc<HandlerRegistry>, config: BusConfig) -> Self {
        Self {
            broker,
            registry,
            config,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the handler registry backing this bus.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Publishes an event to all current subscribers of its type.
    ///
    /// Success means the event is durably queued for every matching
    /// subscription, not that any consumer has processed it. An event
    /// type nobody subscribes to is accepted and dropped. Transient
    /// broker failures are retried a bounded number of times before
    /// [`PublishError::BrokerUnavailable`] is returned.
    #[tracing::instrument(skip(self, event), fields(event_type = E::EVENT_TYPE))]
    pub async fn publish<E: IntegrationEvent>(&self, event: &E) -> Result<EventId, PublishError> {
        let envelope = EventEnvelope::new(event)?;
        let payload = envelope.to_bytes()?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.broker.publish(&envelope.event_type, payload.clone()).await {
                Ok(()) => {
                    metrics::counter!("bus_events_published_total").increment(1);
                    tracing::debug!(event_id = %envelope.event_id, "event published");
                    return Ok(envelope.event_id);
                }
                Err(err) if attempts < self.config.publish_attempts => {
                    tracing::debug!(error = %err, attempts, "publish attempt failed, retrying");
                    tokio::time::sleep(self.config.publish_retry_delay).await;
                }
                Err(err) => {
                    metrics::counter!("bus_publish_failures_total").increment(1);
                    return Err(PublishError::BrokerUnavailable {
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }

    /// Registers a handler for an event type.
    ///
    /// The first handler for a type binds the service queue and spawns
    /// its delivery worker; later handlers join the existing
    /// subscription. Subscribing the same (event type, handler name)
    /// pair again is a no-op.
    #[tracing::instrument(skip(self, handler))]
    pub async fn subscribe(
        &self,
        event_type: &str,
        handler: Arc<dyn IntegrationEventHandler>,
    ) -> Result<(), SubscriptionError> {
        let mut workers = self.workers.lock().await;

        let handler_name = handler.name();
        if !self.registry.register(event_type, handler) {
            tracing::debug!(handler = handler_name, "handler already subscribed");
            return Ok(());
        }

        if workers.contains_key(event_type) {
            tracing::debug!(handler = handler_name, "handler joined existing subscription");
            return Ok(());
        }

        let queue = self.config.queue_name(event_type);
        let consumer = match self.setup_queue(&queue, event_type).await {
            Ok(consumer) => consumer,
            Err(err) => {
                // Roll back so a failed subscribe leaves no half-wired
                // handler behind.
                self.registry.deregister(event_type, handler_name);
                return Err(err);
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = DeliveryWorker::new(
            Arc::clone(&self.broker),
            Arc::clone(&self.registry),
            self.config.clone(),
            event_type.to_string(),
            shutdown_rx,
        );
        let join = tokio::spawn(worker.run(consumer));
        workers.insert(
            event_type.to_string(),
            WorkerHandle {
                shutdown: shutdown_tx,
                join,
            },
        );

        tracing::info!(handler = handler_name, queue = %queue, "subscription established");
        Ok(())
    }

    /// Registers a handler for `E`, deriving the event type from its tag.
    pub async fn subscribe_to<E: IntegrationEvent>(
        &self,
        handler: Arc<dyn IntegrationEventHandler>,
    ) -> Result<(), SubscriptionError> {
        self.subscribe(E::EVENT_TYPE, handler).await
    }

    /// Removes a handler binding.
    ///
    /// Removing the last handler for a type stops its delivery worker
    /// (letting a dispatch already in flight finish first) and deletes
    /// the service queue, so the subscription stops pulling messages.
    /// Unknown bindings are a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn unsubscribe(
        &self,
        event_type: &str,
        handler_name: &str,
    ) -> Result<(), SubscriptionError> {
        let mut workers = self.workers.lock().await;

        match self.registry.deregister(event_type, handler_name) {
            None => Ok(()),
            Some(remaining) if remaining > 0 => Ok(()),
            Some(_) => {
                if let Some(handle) = workers.remove(event_type) {
                    let _ = handle.shutdown.send(true);
                    if let Err(err) = handle.join.await {
                        tracing::warn!(error = %err, "delivery worker panicked");
                    }
                }
                let queue = self.config.queue_name(event_type);
                self.broker.delete_queue(&queue).await?;
                tracing::info!(queue = %queue, "subscription torn down");
                Ok(())
            }
        }
    }

    /// Stops every delivery worker gracefully, letting dispatches in
    /// flight finish. Queues and registrations stay intact, so a
    /// restarted process resumes consuming where this one stopped.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;
        for (event_type, handle) in workers.drain() {
            let _ = handle.shutdown.send(true);
            if let Err(err) = handle.join.await {
                tracing::warn!(event_type = %event_type, error = %err, "delivery worker panicked during shutdown");
            }
        }
        tracing::info!("event bus stopped");
    }

    /// Number of running delivery workers, one per subscribed event type.
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    async fn setup_queue(
        &self,
        queue: &str,
        event_type: &str,
    ) -> Result<Box<dyn BrokerConsumer>, SubscriptionError> {
        self.broker.bind_queue(queue, event_type).await?;
        Ok(self.broker.consume(queue).await?)
    }
}
