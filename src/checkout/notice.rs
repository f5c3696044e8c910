use super::state::{CheckoutState, FailureReason};

/// What acknowledging a notice does to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledge {
    Stay,
    NavigateBack,
}

/// Blocking user-visible alert with a single acknowledgement action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub on_acknowledge: Acknowledge,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            on_acknowledge: Acknowledge::Stay,
        }
    }

    pub fn then_navigate_back(mut self) -> Self {
        self.on_acknowledge = Acknowledge::NavigateBack;
        self
    }

    pub fn failure(reason: &FailureReason) -> Self {
        match reason {
            // processor text is shown untouched
            FailureReason::SheetUnavailable { code, message } | FailureReason::UserError { code, message } => {
                Notice::new(code.clone(), message.clone())
            }
            FailureReason::Request(e) => Notice::new("Error", e.user_message()),
            FailureReason::AttachFailed(e) => Notice::new("Payment method not updated", e.user_message()),
            FailureReason::HostedCheckout(message) => Notice::new("Checkout not completed", message.clone()),
        }
    }

    pub fn payment_confirmed() -> Self {
        Notice::new("Success", "The payment was confirmed successfully.")
    }

    pub fn payment_method_updated(payment_method_id: &str) -> Self {
        Notice::new(
            "Success",
            format!("The payment method was updated successfully. paymentMethodId: {payment_method_id}"),
        )
    }

    pub fn subscription_cancelled() -> Self {
        Notice::new("Subscription cancelled", "Your subscription has been cancelled.").then_navigate_back()
    }

    pub fn publishable_key_unavailable() -> Self {
        Notice::new("Error", "Unable to fetch publishable key. Is your server running?")
    }
}

/// Presentation-layer hook into an orchestrator.
pub trait CheckoutObserver: Send + Sync {
    fn state_changed(&self, _state: &CheckoutState) {}

    fn notice(&self, _notice: &Notice) {}
}
