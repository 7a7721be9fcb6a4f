use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{Broker, BrokerConsumer, BrokerError, Delivery, Result};

#[derive(Debug, Clone)]
struct QueuedMessage {
    routing_key: String,
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Messages ready for delivery, front first.
    messages: VecDeque<QueuedMessage>,

    /// Delivered but not yet settled, keyed by delivery tag.
    in_flight: HashMap<u64, QueuedMessage>,
}

#[derive(Debug)]
struct BrokerState {
    connected: bool,
    queues: HashMap<String, QueueState>,
    bindings: HashMap<String, HashSet<String>>,
    next_delivery_tag: u64,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            connected: true,
            queues: HashMap::new(),
            bindings: HashMap::new(),
            next_delivery_tag: 1,
        }
    }
}

/// In-memory broker for testing and single-process deployments.
///
/// Implements the same interface as a networked broker client: a topic
/// exchange routing published messages into bound queues, unacked message
/// tracking, and redelivery. `disconnect`/`reconnect` simulate a transient
/// connection failure: while disconnected every operation fails with
/// `ConnectionLost`, and unacked messages return to the front of their
/// queue flagged as redelivered, exactly as a broker would requeue them
/// when a client connection dies.
#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            version: Arc::new(version),
        }
    }
}

impl InMemoryBroker {
    /// Creates a new connected in-memory broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing the broker connection.
    ///
    /// Unacked messages return to the front of their queues, flagged as
    /// redelivered, preserving delivery order. Waiting consumers observe
    /// `ConnectionLost`.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        for queue in state.queues.values_mut() {
            let mut tags: Vec<u64> = queue.in_flight.keys().copied().collect();
            tags.sort_unstable();
            for tag in tags.into_iter().rev() {
                if let Some(mut message) = queue.in_flight.remove(&tag) {
                    message.redelivered = true;
                    queue.messages.push_front(message);
                }
            }
        }
        drop(state);
        self.notify();
    }

    /// Restores the broker connection. Queues, bindings, and messages
    /// survive the outage.
    pub fn reconnect(&self) {
        self.state.lock().unwrap().connected = true;
        self.notify();
    }

    /// Returns true if the connection is up.
    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Returns the number of messages ready for delivery on a queue.
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    /// Returns the number of delivered-but-unsettled messages on a queue.
    pub fn in_flight_count(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    /// Returns a snapshot of the ready payloads on a queue, front first.
    pub fn queue_payloads(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.messages.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns true if the queue exists.
    pub fn has_queue(&self, queue: &str) -> bool {
        self.state.lock().unwrap().queues.contains_key(queue)
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }

        let bound: Vec<String> = state
            .bindings
            .get(routing_key)
            .map(|queues| queues.iter().cloned().collect())
            .unwrap_or_default();

        // No binding: the exchange drops the message.
        if bound.is_empty() {
            return Ok(());
        }

        for name in &bound {
            if let Some(queue) = state.queues.get_mut(name) {
                queue.messages.push_back(QueuedMessage {
                    routing_key: routing_key.to_string(),
                    payload: payload.clone(),
                    redelivered: false,
                });
            }
        }
        drop(state);
        self.notify();
        Ok(())
    }

    async fn enqueue(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .messages
            .push_back(QueuedMessage {
                routing_key: queue.to_string(),
                payload,
                redelivered: false,
            });
        drop(state);
        self.notify();
        Ok(())
    }

    async fn bind_queue(&self, queue: &str, routing_key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        state.queues.entry(queue.to_string()).or_default();
        state
            .bindings
            .entry(routing_key.to_string())
            .or_default()
            .insert(queue.to_string());
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        state.queues.remove(queue);
        for bound in state.bindings.values_mut() {
            bound.remove(queue);
        }
        state.bindings.retain(|_, queues| !queues.is_empty());
        drop(state);
        self.notify();
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn BrokerConsumer>> {
        let state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        if !state.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound(queue.to_string()));
        }
        drop(state);

        Ok(Box::new(InMemoryConsumer {
            queue: queue.to_string(),
            state: Arc::clone(&self.state),
            version: Arc::clone(&self.version),
            version_rx: self.version.subscribe(),
        }))
    }
}

struct InMemoryConsumer {
    queue: String,
    state: Arc<Mutex<BrokerState>>,
    version: Arc<watch::Sender<u64>>,
    version_rx: watch::Receiver<u64>,
}

impl InMemoryConsumer {
    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[async_trait]
impl BrokerConsumer for InMemoryConsumer {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if !state.connected {
                    return Err(BrokerError::ConnectionLost);
                }
                let tag = state.next_delivery_tag;
                let Some(queue) = state.queues.get_mut(&self.queue) else {
                    // Queue deleted: end of stream.
                    return Ok(None);
                };
                if let Some(message) = queue.messages.pop_front() {
                    let delivery = Delivery {
                        delivery_tag: tag,
                        routing_key: message.routing_key.clone(),
                        payload: message.payload.clone(),
                        redelivered: message.redelivered,
                    };
                    queue.in_flight.insert(tag, message);
                    state.next_delivery_tag += 1;
                    return Ok(Some(delivery));
                }
            }

            // Queue empty: wait for any state change, then re-check.
            // The version counter is bumped on every publish, requeue,
            // delete, and connection transition, so a wakeup is never
            // missed between the check above and this await.
            if self.version_rx.changed().await.is_err() {
                return Err(BrokerError::ConnectionLost);
            }
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        let Some(queue) = state.queues.get_mut(&self.queue) else {
            return Err(BrokerError::QueueNotFound(self.queue.clone()));
        };
        if queue.in_flight.remove(&delivery_tag).is_none() {
            return Err(BrokerError::UnknownDelivery(delivery_tag));
        }
        Ok(())
    }

    async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(BrokerError::ConnectionLost);
        }
        let Some(queue) = state.queues.get_mut(&self.queue) else {
            return Err(BrokerError::QueueNotFound(self.queue.clone()));
        };
        let Some(mut message) = queue.in_flight.remove(&delivery_tag) else {
            return Err(BrokerError::UnknownDelivery(delivery_tag));
        };
        if requeue {
            message.redelivered = true;
            queue.messages.push_front(message);
            drop(state);
            self.notify();
        }
        Ok(())
    }
}
