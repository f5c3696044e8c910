// Backend API module

pub mod errors;
pub mod rest;
pub mod types;

use async_trait::async_trait;

use self::errors::ApiError;
use self::types::{Acknowledgement, CreatedSubscription, Plan, Subscription};

pub use self::rest::BackendRestClient;

/// Operations the checkout flow needs from the backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Subscriptions of `customer_id` whose status is `active`, in backend order.
    async fn list_active_subscriptions(&self, customer_id: &str) -> Result<Vec<Subscription>, ApiError>;

    async fn list_plans(&self) -> Result<Vec<Plan>, ApiError>;

    /// Starts an incomplete subscription and returns the client secret of its first payment.
    async fn create_subscription(&self, price_id: &str, customer_id: &str) -> Result<CreatedSubscription, ApiError>;

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        subscription_id: &str,
        customer_id: &str,
    ) -> Result<Acknowledgement, ApiError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<Acknowledgement, ApiError>;

    /// Never fails: any error is logged and reported as `None`.
    async fn fetch_publishable_key(&self, payment_method_kind: &str) -> Option<String>;
}
