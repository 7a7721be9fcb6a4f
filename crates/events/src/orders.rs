//! Order and payment service events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::IntegrationEvent;
use crate::money::Money;

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The ordered product.
    pub product_id: Uuid,

    /// Product name at order time.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at order time.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: Uuid,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

/// A customer placed an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The unique order ID.
    pub order_id: Uuid,

    /// The ordering user.
    pub user_id: Uuid,

    /// The ordered lines.
    pub lines: Vec<OrderLine>,

    /// Order total across all lines.
    pub total: Money,

    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

impl OrderPlaced {
    /// Creates an OrderPlaced event, computing the total from the lines.
    pub fn new(order_id: Uuid, user_id: Uuid, lines: Vec<OrderLine>) -> Self {
        let mut total = Money::zero();
        for line in &lines {
            total += line.total_price();
        }
        Self {
            order_id,
            user_id,
            lines,
            total,
            placed_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for OrderPlaced {
    const EVENT_TYPE: &'static str = "OrderPlaced";
}

/// An order moved to a new lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    /// The order that changed.
    pub order_id: Uuid,

    /// Status before the change.
    pub old_status: OrderStatus,

    /// Status after the change.
    pub new_status: OrderStatus,

    /// When the change happened.
    pub changed_at: DateTime<Utc>,
}

impl OrderStatusChanged {
    /// Creates an OrderStatusChanged event stamped with the current time.
    pub fn new(order_id: Uuid, old_status: OrderStatus, new_status: OrderStatus) -> Self {
        Self {
            order_id,
            old_status,
            new_status,
            changed_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for OrderStatusChanged {
    const EVENT_TYPE: &'static str = "OrderStatusChanged";
}

/// A payment for an order was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSucceeded {
    /// The unique payment ID.
    pub payment_id: Uuid,

    /// The paid order.
    pub order_id: Uuid,

    /// Captured amount.
    pub amount: Money,

    /// When the payment was captured.
    pub processed_at: DateTime<Utc>,
}

impl PaymentSucceeded {
    /// Creates a PaymentSucceeded event stamped with the current time.
    pub fn new(order_id: Uuid, amount: Money) -> Self {
        Self {
            payment_id: Uuid::new_v4(),
            order_id,
            amount,
            processed_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for PaymentSucceeded {
    const EVENT_TYPE: &'static str = "PaymentSucceeded";
}

/// A payment attempt for an order was declined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailed {
    /// The unique payment attempt ID.
    pub payment_id: Uuid,

    /// The order the payment was for.
    pub order_id: Uuid,

    /// Attempted amount.
    pub amount: Money,

    /// Why the payment was declined.
    pub reason: String,

    /// When the attempt failed.
    pub failed_at: DateTime<Utc>,
}

impl PaymentFailed {
    /// Creates a PaymentFailed event stamped with the current time.
    pub fn new(order_id: Uuid, amount: Money, reason: impl Into<String>) -> Self {
        Self {
            payment_id: Uuid::new_v4(),
            order_id,
            amount,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for PaymentFailed {
    const EVENT_TYPE: &'static str = "PaymentFailed";
}
