//! Integration event contract shared by every service on the platform.
//!
//! This crate provides:
//! - `IntegrationEvent` trait tagging each event type with its routing name
//! - `EventEnvelope`, the self-describing wire form (id, type tag, timestamp, payload)
//! - the closed catalog of concrete events services publish and subscribe to
//!
//! Producers and consumers depend only on this crate; they never exchange
//! Rust types directly, only envelopes keyed by the event type tag.

pub mod accounts;
pub mod catalog;
pub mod envelope;
pub mod event;
pub mod money;
pub mod orders;

pub use common::EventId;
pub use envelope::{EnvelopeError, EventEnvelope};
pub use event::IntegrationEvent;
pub use money::Money;
