//! User service events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::IntegrationEvent;

/// A new user account was registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRegistered {
    /// The unique user ID.
    pub user_id: Uuid,

    /// Registration email address.
    pub email: String,

    /// Chosen display name.
    pub username: String,

    /// When the account was registered.
    pub registered_at: DateTime<Utc>,
}

impl UserRegistered {
    /// Creates a UserRegistered event stamped with the current time.
    pub fn new(user_id: Uuid, email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            username: username.into(),
            registered_at: Utc::now(),
        }
    }
}

impl IntegrationEvent for UserRegistered {
    const EVENT_TYPE: &'static str = "UserRegistered";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_registered_serialization() {
        let event = UserRegistered::new(Uuid::new_v4(), "ada@example.com", "ada");
        let json = serde_json::to_string(&event).unwrap();
        let decoded: UserRegistered = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, event);
        assert_eq!(decoded.event_type(), "UserRegistered");
    }
}
