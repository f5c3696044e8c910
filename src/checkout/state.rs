// Checkout states, modes and the per-attempt intent

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::errors::ApiError;

/// Parameters a payment screen is entered with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParams {
    pub price_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Product name of an existing subscription, for display
    pub name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route names both a price and a subscription")]
    Ambiguous,
    #[error("route names neither a price nor a subscription")]
    MissingTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutMode {
    NewSubscription { price_id: String },
    ModifyPaymentMethod { subscription_id: String },
}

impl TryFrom<&RouteParams> for CheckoutMode {
    type Error = RouteError;

    fn try_from(route: &RouteParams) -> Result<Self, Self::Error> {
        let price_id = route.price_id.as_deref().filter(|s| !s.is_empty());
        let subscription_id = route.subscription_id.as_deref().filter(|s| !s.is_empty());
        match (price_id, subscription_id) {
            (Some(_), Some(_)) => Err(RouteError::Ambiguous),
            (Some(price_id), None) => Ok(CheckoutMode::NewSubscription {
                price_id: price_id.to_string(),
            }),
            (None, Some(subscription_id)) => Ok(CheckoutMode::ModifyPaymentMethod {
                subscription_id: subscription_id.to_string(),
            }),
            (None, None) => Err(RouteError::MissingTarget),
        }
    }
}

impl CheckoutMode {
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            CheckoutMode::ModifyPaymentMethod { subscription_id } => Some(subscription_id),
            CheckoutMode::NewSubscription { .. } => None,
        }
    }
}

/// One in-flight attempt. Dropped when the attempt ends, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutIntent {
    pub mode: CheckoutMode,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SheetUnavailable { code: String, message: String },
    /// A backend call that starts or side-steps the payment failed
    Request(ApiError),
    UserError { code: String, message: String },
    AttachFailed(ApiError),
    HostedCheckout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Initializing,
    Ready,
    Presenting,
    Confirming,
    AttachingMethod,
    Succeeded,
    Failed(FailureReason),
}

impl CheckoutState {
    /// States during which the payment action stays disabled
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::Initializing
                | CheckoutState::Presenting
                | CheckoutState::Confirming
                | CheckoutState::AttachingMethod
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Initializing => "initializing",
            CheckoutState::Ready => "ready",
            CheckoutState::Presenting => "presenting",
            CheckoutState::Confirming => "confirming",
            CheckoutState::AttachingMethod => "attaching_method",
            CheckoutState::Succeeded => "succeeded",
            CheckoutState::Failed(_) => "failed",
        }
    }
}
