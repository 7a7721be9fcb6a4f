//! The integration event trait.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A fact that has already happened in one service, published for other
/// services to react to.
///
/// Every concrete event carries a type tag used as the broker routing key.
/// Producers and consumers agree on the tag string, never on the Rust type,
/// so the two code bases can evolve independently.
pub trait IntegrationEvent: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The routing tag carried in the envelope (e.g., "ProductCreated").
    const EVENT_TYPE: &'static str;

    /// Returns the event type tag.
    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }
}
