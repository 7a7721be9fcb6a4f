//! Shared types used across the integration event platform.

pub mod types;

pub use types::EventId;
