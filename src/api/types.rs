// Backend DTOs and the domain records mapped from them
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub price_id: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    Active,
    Other,
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub product_name: String,
    pub status: SubscriptionStatus,
}

/// Result of `POST /create-subscription`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSubscription {
    pub subscription_id: Option<String>,
    pub client_secret: String,
}

/// Implementation-defined acknowledgement body returned by mutating endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement(pub serde_json::Value);

// Wire shapes. Fields are optional so a missing one maps to MalformedResponse
// instead of an opaque decode failure.

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    pub data: Option<Vec<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPlan {
    pub id: Option<String>,
    pub product: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPlanRef {
    pub product: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSubscription {
    pub id: Option<String>,
    pub status: Option<String>,
    pub plan: Option<RawPlanRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCreatedSubscription {
    pub subscription_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPublishableKey {
    pub publishable_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateSubscriptionRequest<'a> {
    pub price_id: &'a str,
    pub customer: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModifySubscriptionRequest<'a> {
    pub payment_method_id: &'a str,
    pub subscription_id: &'a str,
    pub customer_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CancelSubscriptionRequest<'a> {
    pub subscription_id: &'a str,
}

// The product is only usable when the backend expanded it into an object.
fn product_name(product: Option<serde_json::Value>, owner: &str) -> Result<String, ApiError> {
    let product = product.ok_or_else(|| ApiError::MalformedResponse(format!("{owner}: missing product")))?;
    let product: ProductRef = serde_json::from_value(product)
        .map_err(|_| ApiError::MalformedResponse(format!("{owner}: product not expanded")))?;
    product
        .name
        .ok_or_else(|| ApiError::MalformedResponse(format!("{owner}: missing product.name")))
}

impl TryFrom<RawPlan> for Plan {
    type Error = ApiError;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        let price_id = raw
            .id
            .ok_or_else(|| ApiError::MalformedResponse("plan: missing id".to_string()))?;
        let product_name = product_name(raw.product, &price_id)?;
        Ok(Plan { price_id, product_name })
    }
}

impl RawSubscription {
    pub(crate) fn status(&self) -> SubscriptionStatus {
        self.status
            .as_deref()
            .map(SubscriptionStatus::from)
            .unwrap_or(SubscriptionStatus::Other)
    }
}

impl TryFrom<RawSubscription> for Subscription {
    type Error = ApiError;

    fn try_from(raw: RawSubscription) -> Result<Self, Self::Error> {
        let status = raw.status();
        let id = raw
            .id
            .ok_or_else(|| ApiError::MalformedResponse("subscription: missing id".to_string()))?;
        let plan = raw
            .plan
            .ok_or_else(|| ApiError::MalformedResponse(format!("{id}: missing plan")))?;
        let product_name = product_name(plan.product, &id)?;
        Ok(Subscription {
            id,
            product_name,
            status,
        })
    }
}

impl TryFrom<RawCreatedSubscription> for CreatedSubscription {
    type Error = ApiError;

    fn try_from(raw: RawCreatedSubscription) -> Result<Self, Self::Error> {
        let client_secret = raw
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::MalformedResponse("create-subscription: missing clientSecret".to_string()))?;
        Ok(CreatedSubscription {
            subscription_id: raw.subscription_id,
            client_secret,
        })
    }
}
