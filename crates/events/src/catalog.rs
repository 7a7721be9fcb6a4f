//! Catalog service events: products, categories, brands, inventory, reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::IntegrationEvent;
use crate::money::Money;

/// A product was added to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    /// The unique product ID.
    pub product_id: Uuid,

    /// Human-readable product name.
    pub name: String,

    /// Stock keeping unit.
    pub sku: String,

    /// Brand name at creation time.
    pub brand: String,

    /// Category the product belongs to.
    pub category_id: Uuid,

    /// Listed price.
    pub price: Money,

    /// Whether the product is delivered digitally.
    pub is_digital: bool,

    /// Whether the product requires physical shipping.
    pub requires_shipping: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl ProductCreated {
    /// Creates a ProductCreated event stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: Uuid,
        name: impl Into<String>,
        sku: impl Into<String>,
        brand: impl Into<String>,
        category_id: Uuid,
        price: Money,
        is_digital: bool,
        requires_shipping: bool,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            sku: sku.into(),
            brand: brand.into(),
            category_id,
            price,
            is_digital,
            requires_shipping,
            created_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for ProductCreated {
    const EVENT_TYPE: &'static str = "ProductCreated";
}

/// A product's listing details changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdated {
    /// The product that changed.
    pub product_id: Uuid,

    /// Current product name.
    pub name: String,

    /// Current listed price.
    pub price: Money,

    /// When the change happened.
    pub updated_at: DateTime<Utc>,
}

impl ProductUpdated {
    /// Creates a ProductUpdated event stamped with the current time.
    pub fn new(product_id: Uuid, name: impl Into<String>, price: Money) -> Self {
        Self {
            product_id,
            name: name.into(),
            price,
            updated_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for ProductUpdated {
    const EVENT_TYPE: &'static str = "ProductUpdated";
}

/// A product was removed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDeleted {
    /// The product that was removed.
    pub product_id: Uuid,

    /// When the removal happened.
    pub deleted_at: DateTime<Utc>,
}

impl ProductDeleted {
    /// Creates a ProductDeleted event stamped with the current time.
    pub fn new(product_id: Uuid) -> Self {
        Self {
            product_id,
            deleted_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for ProductDeleted {
    const EVENT_TYPE: &'static str = "ProductDeleted";
}

/// On-hand stock for a product changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUpdated {
    /// The product whose stock changed.
    pub product_id: Uuid,

    /// New on-hand quantity.
    pub quantity: i64,

    /// When the stock level was recorded.
    pub updated_at: DateTime<Utc>,
}

impl InventoryUpdated {
    /// Creates an InventoryUpdated event stamped with the current time.
    pub fn new(product_id: Uuid, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            updated_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for InventoryUpdated {
    const EVENT_TYPE: &'static str = "InventoryUpdated";
}

/// A customer review was added to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAdded {
    /// The unique review ID.
    pub review_id: Uuid,

    /// The reviewed product.
    pub product_id: Uuid,

    /// The reviewing user.
    pub user_id: Uuid,

    /// Star rating, 1 through 5.
    pub rating: u8,

    /// Optional free-form comment.
    pub comment: Option<String>,

    /// When the review was added.
    pub added_at: DateTime<Utc>,
}

impl ReviewAdded {
    /// Creates a ReviewAdded event stamped with the current time.
    pub fn new(product_id: Uuid, user_id: Uuid, rating: u8, comment: Option<String>) -> Self {
        Self {
            review_id: Uuid::new_v4(),
            product_id,
            user_id,
            rating,
            comment,
            added_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for ReviewAdded {
    const EVENT_TYPE: &'static str = "ReviewAdded";
}

/// A category was added to the catalog tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCreated {
    /// The unique category ID.
    pub category_id: Uuid,

    /// Category display name.
    pub name: String,

    /// Parent category, if not a root category.
    pub parent_id: Option<Uuid>,

    /// When the category was created.
    pub created_at: DateTime<Utc>,
}

impl CategoryCreated {
    /// Creates a CategoryCreated event stamped with the current time.
    pub fn new(category_id: Uuid, name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self {
            category_id,
            name: name.into(),
            parent_id,
            created_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for CategoryCreated {
    const EVENT_TYPE: &'static str = "CategoryCreated";
}

/// A category was renamed or re-parented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdated {
    /// The category that changed.
    pub category_id: Uuid,

    /// Current display name.
    pub name: String,

    /// When the change happened.
    pub updated_at: DateTime<Utc>,
}

impl CategoryUpdated {
    /// Creates a CategoryUpdated event stamped with the current time.
    pub fn new(category_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            category_id,
            name: name.into(),
            updated_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for CategoryUpdated {
    const EVENT_TYPE: &'static str = "CategoryUpdated";
}

/// A brand was added to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandCreated {
    /// The unique brand ID.
    pub brand_id: Uuid,

    /// Brand display name.
    pub name: String,

    /// When the brand was created.
    pub created_at: DateTime<Utc>,
}

impl BrandCreated {
    /// Creates a BrandCreated event stamped with the current time.
    pub fn new(brand_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            brand_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for BrandCreated {
    const EVENT_TYPE: &'static str = "BrandCreated";
}

/// A brand was renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandUpdated {
    /// The brand that changed.
    pub brand_id: Uuid,

    /// Current display name.
    pub name: String,

    /// When the change happened.
    pub updated_at: DateTime<Utc>,
}

impl BrandUpdated {
    /// Creates a BrandUpdated event stamped with the current time.
    pub fn new(brand_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            brand_id,
            name: name.into(),
            updated_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for BrandUpdated {
    const EVENT_TYPE: &'static str = "BrandUpdated";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EventEnvelope;

    fn widget() -> ProductCreated {
        ProductCreated::new(
            Uuid::new_v4(),
            "Widget",
            "W-1",
            "Acme",
            Uuid::new_v4(),
            Money::from_cents(999),
            false,
            true,
        )
    }

    #[test]
    fn product_created_type_tag() {
        let event = widget();
        assert_eq!(event.event_type(), "ProductCreated");
    }

    #[test]
    fn product_created_envelope_roundtrip() {
        let event = widget();
        let envelope = EventEnvelope::new(&event).unwrap();

        assert_eq!(envelope.event_type, "ProductCreated");
        let decoded: ProductCreated = envelope.decode().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn inventory_updated_serialization() {
        let event = InventoryUpdated::new(Uuid::new_v4(), 42);
        let json = serde_json::to_string(&event).unwrap();
        let decoded: InventoryUpdated = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.product_id, event.product_id);
        assert_eq!(decoded.quantity, 42);
    }

    #[test]
    fn review_added_preserves_optional_comment() {
        let with_comment = ReviewAdded::new(Uuid::new_v4(), Uuid::new_v4(), 5, Some("Great".into()));
        let without = ReviewAdded::new(Uuid::new_v4(), Uuid::new_v4(), 2, None);

        let json = serde_json::to_string(&with_comment).unwrap();
        let decoded: ReviewAdded = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.comment.as_deref(), Some("Great"));

        let json = serde_json::to_string(&without).unwrap();
        let decoded: ReviewAdded = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.comment, None);
    }

    #[test]
    fn category_created_root_has_no_parent() {
        let root = CategoryCreated::new(Uuid::new_v4(), "Electronics", None);
        let child = CategoryCreated::new(Uuid::new_v4(), "Laptops", Some(root.category_id));

        assert_eq!(root.parent_id, None);
        assert_eq!(child.parent_id, Some(root.category_id));
    }
}
