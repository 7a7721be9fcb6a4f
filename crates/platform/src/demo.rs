//! Demo producer emitting a rotating script of platform events.

use std::sync::Arc;
use std::time::Duration;

use event_bus::EventBus;
use events::accounts::UserRegistered;
use events::catalog::{InventoryUpdated, ProductCreated, ProductUpdated};
use events::orders::{OrderLine, OrderPlaced, PaymentFailed};
use events::{IntegrationEvent, Money};
use uuid::Uuid;

const PRODUCTS: [(&str, &str, &str, i64); 4] = [
    ("Mechanical Keyboard", "KB-87", "KeyWorks", 12900),
    ("Trail Running Shoes", "SH-42", "Strider", 8950),
    ("Espresso Grinder", "GR-11", "Crema", 24900),
    ("Noise-Cancelling Headphones", "HP-70", "Hushline", 19900),
];

/// Publishes a small scripted scenario every `interval`: a product is
/// created and stocked, then ordered; every third round a new user signs
/// up first, every second product gets a price cut, and every fourth
/// order's payment is declined. Publish errors are logged and the loop
/// moves on, so a broker outage never kills the producer.
pub async fn run(bus: Arc<EventBus>, interval: Duration) {
    let category_id = Uuid::new_v4();
    let mut ticker = tokio::time::interval(interval);
    let mut round: u64 = 0;

    loop {
        ticker.tick().await;

        let user_id = Uuid::new_v4();
        if round % 3 == 0 {
            publish_logged(
                &bus,
                &UserRegistered::new(
                    user_id,
                    format!("user{round}@example.com"),
                    format!("user{round}"),
                ),
            )
            .await;
        }

        let (name, sku, brand, price_cents) = PRODUCTS[(round as usize) % PRODUCTS.len()];
        let price = Money::from_cents(price_cents);
        let product_id = Uuid::new_v4();

        publish_logged(
            &bus,
            &ProductCreated::new(product_id, name, sku, brand, category_id, price, false, true),
        )
        .await;
        publish_logged(&bus, &InventoryUpdated::new(product_id, 25)).await;

        if round % 2 == 0 {
            let discounted = Money::from_cents(price_cents - price_cents / 10);
            publish_logged(&bus, &ProductUpdated::new(product_id, name, discounted)).await;
        }

        let quantity = 1 + (round % 3) as u32;
        let order = OrderPlaced::new(
            Uuid::new_v4(),
            user_id,
            vec![OrderLine::new(product_id, name, quantity, price)],
        );
        let order_id = order.order_id;
        let total = order.total;
        publish_logged(&bus, &order).await;

        if round % 4 == 3 {
            publish_logged(&bus, &PaymentFailed::new(order_id, total, "Card declined")).await;
        }

        round += 1;
    }
}

async fn publish_logged<E: IntegrationEvent>(bus: &EventBus, event: &E) {
    if let Err(err) = bus.publish(event).await {
        tracing::warn!(error = %err, event_type = E::EVENT_TYPE, "demo publish failed");
    }
}
