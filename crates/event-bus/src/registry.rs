//! In-process dispatch table from event type tags to handlers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::handler::IntegrationEventHandler;

/// Maps event type tags to the handlers that receive them, in
/// registration order.
///
/// The registry is constructed explicitly and shared between the bus and
/// its delivery workers. Lookups return a snapshot of the handler list,
/// so registration changes made while a dispatch is in flight apply from
/// the next message onward.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn IntegrationEventHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an event type.
    ///
    /// Returns true if the handler was newly added. A handler with the
    /// same name already registered for this type makes the call a no-op
    /// returning false.
    pub fn register(&self, event_type: &str, handler: Arc<dyn IntegrationEventHandler>) -> bool {
        let mut handlers = self.handlers.write().unwrap();
        let entry = handlers.entry(event_type.to_string()).or_default();
        if entry.iter().any(|h| h.name() == handler.name()) {
            return false;
        }
        entry.push(handler);
        true
    }

    /// Removes a handler binding by name.
    ///
    /// Returns the number of handlers remaining for the event type, or
    /// None if no such binding existed. An event type with no handlers
    /// left is dropped from the table.
    pub fn deregister(&self, event_type: &str, handler_name: &str) -> Option<usize> {
        let mut handlers = self.handlers.write().unwrap();
        let entry = handlers.get_mut(event_type)?;
        let before = entry.len();
        entry.retain(|h| h.name() != handler_name);
        if entry.len() == before {
            return None;
        }
        let remaining = entry.len();
        if remaining == 0 {
            handlers.remove(event_type);
        }
        Some(remaining)
    }

    /// Returns a snapshot of the handlers for an event type, in
    /// registration order.
    pub fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn IntegrationEventHandler>> {
        self.handlers
            .read()
            .unwrap()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns true if at least one handler is registered for the type.
    pub fn has_handlers(&self, event_type: &str) -> bool {
        self.handlers.read().unwrap().contains_key(event_type)
    }

    /// Returns the event types that currently have handlers.
    pub fn event_types(&self) -> Vec<String> {
        self.handlers.read().unwrap().keys().cloned().collect()
    }

    /// Returns the total number of (event type, handler) bindings.
    pub fn binding_count(&self) -> usize {
        self.handlers.read().unwrap().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use async_trait::async_trait;
    use events::EventEnvelope;

    struct NamedHandler {
        name: &'static str,
    }

    #[async_trait]
    impl IntegrationEventHandler for NamedHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn handler(name: &'static str) -> Arc<dyn IntegrationEventHandler> {
        Arc::new(NamedHandler { name })
    }

    #[test]
    fn register_adds_handler() {
        let registry = HandlerRegistry::new();

        assert!(registry.register("OrderPlaced", handler("audit")));
        assert!(registry.has_handlers("OrderPlaced"));
        assert_eq!(registry.binding_count(), 1);
    }

    #[test]
    fn register_same_name_twice_is_noop() {
        let registry = HandlerRegistry::new();

        assert!(registry.register("OrderPlaced", handler("audit")));
        assert!(!registry.register("OrderPlaced", handler("audit")));
        assert_eq!(registry.handlers_for("OrderPlaced").len(), 1);
    }

    #[test]
    fn handlers_keep_registration_order() {
        let registry = HandlerRegistry::new();
        registry.register("OrderPlaced", handler("first"));
        registry.register("OrderPlaced", handler("second"));
        registry.register("OrderPlaced", handler("third"));

        let names: Vec<&str> = registry
            .handlers_for("OrderPlaced")
            .iter()
            .map(|h| h.name())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn deregister_reports_remaining() {
        let registry = HandlerRegistry::new();
        registry.register("OrderPlaced", handler("first"));
        registry.register("OrderPlaced", handler("second"));

        assert_eq!(registry.deregister("OrderPlaced", "first"), Some(1));
        assert_eq!(registry.deregister("OrderPlaced", "second"), Some(0));
        assert!(!registry.has_handlers("OrderPlaced"));
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_unknown_binding_returns_none() {
        let registry = HandlerRegistry::new();
        registry.register("OrderPlaced", handler("audit"));

        assert_eq!(registry.deregister("OrderPlaced", "missing"), None);
        assert_eq!(registry.deregister("ProductCreated", "audit"), None);
        assert_eq!(registry.binding_count(), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_registration() {
        let registry = HandlerRegistry::new();
        registry.register("OrderPlaced", handler("first"));

        let snapshot = registry.handlers_for("OrderPlaced");
        registry.register("OrderPlaced", handler("second"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.handlers_for("OrderPlaced").len(), 2);
    }

    #[test]
    fn event_types_lists_active_subscriptions() {
        let registry = HandlerRegistry::new();
        registry.register("OrderPlaced", handler("audit"));
        registry.register("ProductCreated", handler("audit"));

        let mut types = registry.event_types();
        types.sort();
        assert_eq!(types, ["OrderPlaced", "ProductCreated"]);
    }
}
