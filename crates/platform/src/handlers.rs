//! Event handlers backing the platform's read models and notifications.

pub mod catalog_view;
pub mod notifier;
