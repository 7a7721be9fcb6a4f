use async_trait::async_trait;

use crate::Result;

/// One message handed to a consumer, pending acknowledgment.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Tag identifying this delivery for ack/nack.
    pub delivery_tag: u64,

    /// The routing key the message was published under.
    pub routing_key: String,

    /// The raw message payload.
    pub payload: Vec<u8>,

    /// True if this message was delivered before and returned to the
    /// queue (nack with requeue, or a connection drop while unacked).
    pub redelivered: bool,
}

/// Client interface to a message broker with a topic exchange and
/// durable named queues.
///
/// All implementations must be thread-safe (Send + Sync); one broker
/// instance is shared by every publisher and consumer in the process.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publishes a message to the exchange under a routing key.
    ///
    /// The message is copied into every queue currently bound to that
    /// key. If no queue is bound, the exchange drops the message.
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()>;

    /// Places a message directly onto a named queue, bypassing the
    /// exchange. Declares the queue if it does not exist.
    ///
    /// Used for dead-letter destinations, which have no routing key.
    async fn enqueue(&self, queue: &str, payload: Vec<u8>) -> Result<()>;

    /// Declares a durable queue and binds it to a routing key.
    ///
    /// Idempotent: re-declaring an existing queue or re-adding an
    /// existing binding has no effect.
    async fn bind_queue(&self, queue: &str, routing_key: &str) -> Result<()>;

    /// Deletes a queue, dropping its pending and unacked messages and
    /// removing its bindings. Deleting a missing queue is a no-op.
    ///
    /// Consumers attached to the queue observe end-of-stream.
    async fn delete_queue(&self, queue: &str) -> Result<()>;

    /// Attaches a consumer to an existing queue.
    async fn consume(&self, queue: &str) -> Result<Box<dyn BrokerConsumer>>;
}

/// A pull-based consumer attached to one queue.
///
/// Messages taken via `next_delivery` stay unacked (invisible to other
/// consumers, survive on the broker) until `ack` or `nack` settles them.
#[async_trait]
pub trait BrokerConsumer: Send {
    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` when the queue has been deleted, and
    /// `Err(ConnectionLost)` when the connection drops while waiting.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>>;

    /// Acknowledges a delivery, removing the message permanently.
    async fn ack(&mut self, delivery_tag: u64) -> Result<()>;

    /// Rejects a delivery. With `requeue` the message returns to the
    /// front of the queue flagged as redelivered; without, it is dropped.
    async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<()>;
}
