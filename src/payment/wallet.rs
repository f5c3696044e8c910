use async_trait::async_trait;
use tracing::warn;

use super::{MerchantConfig, PaymentError, PaymentOutcome, WalletSheet};

const UNAVAILABLE_CODE: &str = "Failed";

/// Wallet for hosts without a configured platform wallet.
///
/// Initialization always fails, so the orchestrator never reaches `Ready`
/// through it; card payments go through the hosted page instead.
#[derive(Debug, Clone, Default)]
pub struct UnavailableWallet;

#[async_trait]
impl WalletSheet for UnavailableWallet {
    async fn initialize(&self, merchant: &MerchantConfig) -> Result<(), PaymentError> {
        warn!(target: "checkout", merchant = %merchant.merchant_name, "no wallet available on this host");
        Err(PaymentError::SheetUnavailable {
            code: UNAVAILABLE_CODE.to_string(),
            message: "Google Pay is not available on this device".to_string(),
        })
    }

    async fn present_for_payment(&self, _client_secret: &str) -> PaymentOutcome {
        unavailable_outcome()
    }

    async fn create_detached_method(&self, _amount: i64, _currency: &str) -> PaymentOutcome {
        unavailable_outcome()
    }
}

fn unavailable_outcome() -> PaymentOutcome {
    PaymentOutcome::UserError {
        code: UNAVAILABLE_CODE.to_string(),
        message: "Google Pay has not been initialized".to_string(),
    }
}
