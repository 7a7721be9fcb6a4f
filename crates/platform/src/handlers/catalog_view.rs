//! Denormalized product catalog maintained from integration events.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_bus::{HandlerError, IntegrationEventHandler};
use events::catalog::{InventoryUpdated, ProductCreated, ProductDeleted, ProductUpdated};
use events::{EventEnvelope, IntegrationEvent, Money};
use serde::Serialize;
use uuid::Uuid;

/// One product as currently known to the read model.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub price: Money,
    pub quantity: i64,
    pub is_digital: bool,
    pub requires_shipping: bool,
    pub last_updated: DateTime<Utc>,
}

/// Product view fed by catalog and inventory events.
///
/// One handler instance is registered for all four event types; the
/// envelope's type tag selects the apply function. Applying the same
/// event twice is harmless (last write wins per product), which keeps
/// the view correct under at-least-once delivery.
#[derive(Default)]
pub struct CatalogView {
    entries: RwLock<HashMap<Uuid, CatalogEntry>>,
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types this view needs a subscription for.
    pub fn event_types() -> [&'static str; 4] {
        [
            ProductCreated::EVENT_TYPE,
            ProductUpdated::EVENT_TYPE,
            ProductDeleted::EVENT_TYPE,
            InventoryUpdated::EVENT_TYPE,
        ]
    }

    /// Returns one product by ID.
    pub fn get(&self, product_id: Uuid) -> Option<CatalogEntry> {
        self.entries.read().unwrap().get(&product_id).cloned()
    }

    /// Returns all products, sorted by name for stable listings.
    pub fn list(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> =
            self.entries.read().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    fn apply_created(&self, event: ProductCreated) {
        let entry = CatalogEntry {
            product_id: event.product_id,
            name: event.name,
            sku: event.sku,
            brand: event.brand,
            price: event.price,
            quantity: 0,
            is_digital: event.is_digital,
            requires_shipping: event.requires_shipping,
            last_updated: event.created_at,
        };
        self.entries.write().unwrap().insert(event.product_id, entry);
    }

    fn apply_updated(&self, event: ProductUpdated) {
        if let Some(entry) = self.entries.write().unwrap().get_mut(&event.product_id) {
            entry.name = event.name;
            entry.price = event.price;
            entry.last_updated = event.updated_at;
        }
    }

    fn apply_deleted(&self, event: ProductDeleted) {
        self.entries.write().unwrap().remove(&event.product_id);
    }

    fn apply_inventory(&self, event: InventoryUpdated) {
        if let Some(entry) = self.entries.write().unwrap().get_mut(&event.product_id) {
            entry.quantity = event.quantity;
            entry.last_updated = event.updated_at;
        }
    }
}

#[async_trait]
impl IntegrationEventHandler for CatalogView {
    fn name(&self) -> &'static str {
        "catalog-view"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        match event.event_type.as_str() {
            ProductCreated::EVENT_TYPE => self.apply_created(event.decode()?),
            ProductUpdated::EVENT_TYPE => self.apply_updated(event.decode()?),
            ProductDeleted::EVENT_TYPE => self.apply_deleted(event.decode()?),
            InventoryUpdated::EVENT_TYPE => self.apply_inventory(event.decode()?),
            // Not a catalog event; nothing to apply.
            _ => return Ok(()),
        }
        metrics::counter!("catalog_view_events_applied_total").increment(1);
        Ok(())
    }
}
