//! Message broker abstraction for the integration event platform.
//!
//! This crate provides:
//! - `Broker` trait: the client seam to a topic exchange with durable queues
//! - `BrokerConsumer` trait: a pull-based consumer attached to one queue
//! - `InMemoryBroker`: the in-process implementation, with connection
//!   drop/restore simulation for testing reconnect behavior
//!
//! The broker deals only in raw bytes and routing keys; it knows nothing
//! about event envelopes or handlers.

pub mod client;
pub mod error;
pub mod memory;

pub use client::{Broker, BrokerConsumer, Delivery};
pub use error::{BrokerError, Result};
pub use memory::InMemoryBroker;
