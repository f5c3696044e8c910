// Customer session: who the checkout calls are made for

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::CustomerSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no customer configured")]
    MissingCustomer,
}

/// Supplies the active customer to the API client and the orchestrator.
///
/// Implementations may be backed by an authenticated session; the value
/// returned must stay stable for the duration of one checkout attempt.
pub trait SessionProvider: Send + Sync {
    fn customer(&self) -> Customer;
}

/// Session holding a fixed customer, typically read from configuration.
#[derive(Debug, Clone)]
pub struct StaticSession {
    customer: Customer,
}

impl StaticSession {
    pub fn new(customer: Customer) -> Self {
        Self { customer }
    }

    pub fn from_settings(cfg: &CustomerSettings) -> Result<Self, SessionError> {
        if cfg.id.trim().is_empty() {
            return Err(SessionError::MissingCustomer);
        }
        Ok(Self::new(Customer {
            id: cfg.id.clone(),
            name: cfg.name.clone(),
        }))
    }
}

impl SessionProvider for StaticSession {
    fn customer(&self) -> Customer {
        self.customer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_requires_id() {
        let cfg = CustomerSettings {
            id: "  ".to_string(),
            name: "Nobody".to_string(),
        };
        assert!(matches!(
            StaticSession::from_settings(&cfg),
            Err(SessionError::MissingCustomer)
        ));

        let cfg = CustomerSettings {
            id: "cus_abc".to_string(),
            name: "Acme".to_string(),
        };
        let session = StaticSession::from_settings(&cfg).unwrap();
        assert_eq!(session.customer().id, "cus_abc");
        assert_eq!(session.customer().name, "Acme");
    }
}
