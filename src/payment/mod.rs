// Payment method resolution: wallet sheet and hosted checkout page

pub mod completion;
pub mod hosted;
pub mod wallet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::WalletSettings;

/// What a successful sheet interaction produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    /// Reusable method token, not tied to a charge
    PaymentMethod(String),
    /// Payment intent confirmed by the sheet
    ConfirmedIntent(String),
}

impl PaymentReference {
    pub fn id(&self) -> &str {
        match self {
            PaymentReference::PaymentMethod(id) | PaymentReference::ConfirmedIntent(id) => id,
        }
    }
}

/// Terminal result of one sheet presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success(PaymentReference),
    /// Declined or invalid; code and message come from the processor and are shown as-is
    UserError { code: String, message: String },
    Cancelled,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("wallet sheet unavailable: {code}: {message}")]
    SheetUnavailable { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddressConfig {
    pub format: String,
    pub is_phone_number_required: bool,
    pub is_required: bool,
}

/// Merchant parameters handed to the wallet on initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantConfig {
    pub test_env: bool,
    pub merchant_name: String,
    pub country_code: String,
    pub billing_address: BillingAddressConfig,
    pub existing_payment_method_required: bool,
    pub is_email_required: bool,
}

impl From<&WalletSettings> for MerchantConfig {
    fn from(cfg: &WalletSettings) -> Self {
        Self {
            test_env: cfg.test_env,
            merchant_name: cfg.merchant_name.clone(),
            country_code: cfg.country_code.clone(),
            billing_address: BillingAddressConfig {
                format: cfg.billing_address.format.clone(),
                is_phone_number_required: cfg.billing_address.phone_number_required,
                is_required: cfg.billing_address.required,
            },
            existing_payment_method_required: cfg.existing_payment_method_required,
            is_email_required: cfg.email_required,
        }
    }
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self::from(&WalletSettings::default())
    }
}

/// Amount displayed on the sheet when only a reusable method is collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedMethodRequest {
    pub amount: i64,
    pub currency: String,
}

impl From<&WalletSettings> for DetachedMethodRequest {
    fn from(cfg: &WalletSettings) -> Self {
        Self {
            amount: cfg.detached_method_amount,
            currency: cfg.detached_method_currency.clone(),
        }
    }
}

impl Default for DetachedMethodRequest {
    fn default() -> Self {
        Self::from(&WalletSettings::default())
    }
}

/// Platform wallet sheet (Google Pay).
///
/// `initialize` must succeed once per screen mount before the other two
/// operations are used. Both presentation calls suspend until the user
/// finishes with the native sheet.
#[async_trait]
pub trait WalletSheet: Send + Sync {
    async fn initialize(&self, merchant: &MerchantConfig) -> Result<(), PaymentError>;

    /// Confirm the payment intent identified by `client_secret`.
    async fn present_for_payment(&self, client_secret: &str) -> PaymentOutcome;

    /// Collect a reusable method token without confirming any charge.
    async fn create_detached_method(&self, amount: i64, currency: &str) -> PaymentOutcome;
}
