//! Publish/subscribe bus for cross-service integration events.
//!
//! Services publish [`events::IntegrationEvent`]s through an [`EventBus`]
//! and receive them by registering [`IntegrationEventHandler`]s in a
//! [`HandlerRegistry`]. Each subscribed event type gets one durable broker
//! queue and one background delivery worker that dispatches messages to
//! every registered handler, retries transient failures with exponential
//! backoff, and moves messages that exhaust their retry budget to a
//! dead-letter queue.

pub mod bus;
pub mod config;
pub mod dead_letter;
pub mod error;
pub mod handler;
pub mod registry;
pub mod retry;

mod worker;

pub use bus::EventBus;
pub use config::{BusConfig, DispatchMode};
pub use dead_letter::{DeadLetter, HandlerFailure};
pub use error::{HandlerError, PublishError, SubscriptionError};
pub use handler::IntegrationEventHandler;
pub use registry::HandlerRegistry;
pub use retry::{Backoff, RetryPolicy};
