// Checkout orchestration: sequences wallet, hosted page and backend calls for one payment screen

pub mod notice;
pub mod state;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::BackendApi;
use crate::payment::completion::HostedCompletion;
use crate::payment::hosted::{BrowserSurface, HostedCheckout};
use crate::payment::{DetachedMethodRequest, MerchantConfig, PaymentError, PaymentOutcome, WalletSheet};
use crate::session::{Customer, SessionProvider};

use self::notice::{CheckoutObserver, Notice};
use self::state::{CheckoutIntent, CheckoutMode, CheckoutState, FailureReason};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("another checkout action is in progress")]
    Busy,
    #[error("checkout is not ready (state: {0})")]
    NotReady(&'static str),
    #[error("operation requires an existing subscription")]
    WrongMode,
    #[error(transparent)]
    SheetUnavailable(#[from] PaymentError),
}

/// How one user-initiated action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(FailureReason),
    Cancelled,
}

// Clears the busy flag on every exit path of an action.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// Puts the entry state back and drops the intent when an attempt's future is
// dropped before it settles. Declared after the busy guard so it runs first.
struct AttemptGuard<'a> {
    checkout: &'a CheckoutOrchestrator,
    resume: CheckoutState,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(checkout: &'a CheckoutOrchestrator, resume: CheckoutState) -> Self {
        Self {
            checkout,
            resume,
            armed: true,
        }
    }

    fn finish(mut self) {
        self.armed = false;
        self.checkout.end_intent();
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(target: "checkout", resume = self.resume.name(), "checkout attempt abandoned");
        self.checkout.end_intent();
        self.checkout.set_state(self.resume.clone());
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives one payment screen.
///
/// The orchestrator is created with the screen's mode and lives as long as
/// the screen. Actions are serialized by a busy guard: a second action
/// started while one is running fails with [`CheckoutError::Busy`].
///
/// After `Succeeded` the wallet must be initialized again before another
/// wallet payment, matching a fresh screen mount.
///
/// Dropping an action's future part way (screen unmount, caller timeout,
/// aborted task) puts back the state the action started from.
pub struct CheckoutOrchestrator {
    api: Arc<dyn BackendApi>,
    wallet: Arc<dyn WalletSheet>,
    session: Arc<dyn SessionProvider>,
    mode: CheckoutMode,
    merchant: MerchantConfig,
    detached: DetachedMethodRequest,
    state: Mutex<CheckoutState>,
    intent: Mutex<Option<CheckoutIntent>>,
    busy: AtomicBool,
    observers: Mutex<Vec<Arc<dyn CheckoutObserver>>>,
}

impl CheckoutOrchestrator {
    pub fn new(
        mode: CheckoutMode,
        api: Arc<dyn BackendApi>,
        wallet: Arc<dyn WalletSheet>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            api,
            wallet,
            session,
            mode,
            merchant: MerchantConfig::default(),
            detached: DetachedMethodRequest::default(),
            state: Mutex::new(CheckoutState::Idle),
            intent: Mutex::new(None),
            busy: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_merchant(mut self, merchant: MerchantConfig) -> Self {
        self.merchant = merchant;
        self
    }

    pub fn with_detached_method(mut self, detached: DetachedMethodRequest) -> Self {
        self.detached = detached;
        self
    }

    pub fn subscribe(&self, observer: Arc<dyn CheckoutObserver>) {
        lock(&self.observers).push(observer);
    }

    pub fn mode(&self) -> &CheckoutMode {
        &self.mode
    }

    pub fn state(&self) -> CheckoutState {
        lock(&self.state).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The attempt currently in flight, if any
    pub fn current_intent(&self) -> Option<CheckoutIntent> {
        lock(&self.intent).clone()
    }

    pub fn customer(&self) -> Customer {
        self.session.customer()
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, CheckoutError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CheckoutError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn observers(&self) -> Vec<Arc<dyn CheckoutObserver>> {
        lock(&self.observers).clone()
    }

    fn set_state(&self, next: CheckoutState) {
        let previous = std::mem::replace(&mut *lock(&self.state), next.clone());
        debug!(target: "checkout", from = previous.name(), to = next.name(), "state change");
        for observer in self.observers() {
            observer.state_changed(&next);
        }
    }

    fn notify(&self, notice: Notice) {
        for observer in self.observers() {
            observer.notice(&notice);
        }
    }

    fn begin_intent(&self) {
        *lock(&self.intent) = Some(CheckoutIntent {
            mode: self.mode.clone(),
            client_secret: None,
        });
    }

    fn record_client_secret(&self, client_secret: &str) {
        if let Some(intent) = lock(&self.intent).as_mut() {
            intent.client_secret = Some(client_secret.to_string());
        }
    }

    fn end_intent(&self) {
        lock(&self.intent).take();
    }

    // Report a failure once, then settle in `resume`.
    fn fail(&self, reason: FailureReason, resume: CheckoutState) -> AttemptOutcome {
        warn!(target: "checkout", reason = ?reason, "checkout attempt failed");
        self.set_state(CheckoutState::Failed(reason.clone()));
        self.notify(Notice::failure(&reason));
        self.set_state(resume);
        AttemptOutcome::Failed(reason)
    }

    fn succeed(&self, notice: Notice) -> AttemptOutcome {
        self.set_state(CheckoutState::Succeeded);
        self.notify(notice);
        AttemptOutcome::Succeeded
    }

    /// Prepare the wallet sheet. Runs once per screen mount; from `Ready` it is a no-op.
    pub async fn initialize(&self) -> Result<(), CheckoutError> {
        let _busy = self.acquire()?;
        let previous = self.state();
        match &previous {
            CheckoutState::Idle | CheckoutState::Succeeded => {}
            CheckoutState::Ready => return Ok(()),
            other => return Err(CheckoutError::NotReady(other.name())),
        }

        let attempt = AttemptGuard::new(self, previous);
        self.set_state(CheckoutState::Initializing);
        let result = self.wallet.initialize(&self.merchant).await;
        attempt.finish();
        match result {
            Ok(()) => {
                info!(target: "checkout", mode = ?self.mode, "wallet initialized");
                self.set_state(CheckoutState::Ready);
                Ok(())
            }
            Err(e) => {
                let PaymentError::SheetUnavailable { code, message } = &e;
                self.fail(
                    FailureReason::SheetUnavailable {
                        code: code.clone(),
                        message: message.clone(),
                    },
                    CheckoutState::Idle,
                );
                Err(e.into())
            }
        }
    }

    /// Run the wallet flow for this screen's mode. Requires `Ready`.
    pub async fn start(&self) -> Result<AttemptOutcome, CheckoutError> {
        let _busy = self.acquire()?;
        let current = self.state();
        if current != CheckoutState::Ready {
            return Err(CheckoutError::NotReady(current.name()));
        }

        let customer = self.session.customer();
        let attempt = AttemptGuard::new(self, CheckoutState::Ready);
        self.begin_intent();
        let outcome = match &self.mode {
            CheckoutMode::NewSubscription { price_id } => self.pay_new_subscription(price_id, &customer).await,
            CheckoutMode::ModifyPaymentMethod { subscription_id } => {
                self.change_payment_method(subscription_id, &customer).await
            }
        };
        attempt.finish();
        Ok(outcome)
    }

    async fn pay_new_subscription(&self, price_id: &str, customer: &Customer) -> AttemptOutcome {
        self.set_state(CheckoutState::Presenting);
        let created = match self.api.create_subscription(price_id, &customer.id).await {
            Ok(created) => created,
            Err(e) => return self.fail(FailureReason::Request(e), CheckoutState::Ready),
        };
        self.record_client_secret(&created.client_secret);

        match self.wallet.present_for_payment(&created.client_secret).await {
            PaymentOutcome::Success(reference) => {
                self.set_state(CheckoutState::Confirming);
                info!(
                    target: "checkout",
                    price_id = %price_id,
                    subscription_id = ?created.subscription_id,
                    reference = %reference.id(),
                    "subscription payment confirmed"
                );
                self.succeed(Notice::payment_confirmed())
            }
            PaymentOutcome::UserError { code, message } => {
                self.set_state(CheckoutState::Confirming);
                self.fail(FailureReason::UserError { code, message }, CheckoutState::Ready)
            }
            PaymentOutcome::Cancelled => self.cancelled(CheckoutState::Ready),
        }
    }

    async fn change_payment_method(&self, subscription_id: &str, customer: &Customer) -> AttemptOutcome {
        self.set_state(CheckoutState::Presenting);
        let outcome = self
            .wallet
            .create_detached_method(self.detached.amount, &self.detached.currency)
            .await;

        let reference = match outcome {
            PaymentOutcome::Success(reference) => reference,
            PaymentOutcome::UserError { code, message } => {
                return self.fail(FailureReason::UserError { code, message }, CheckoutState::Ready)
            }
            PaymentOutcome::Cancelled => return self.cancelled(CheckoutState::Ready),
        };

        self.set_state(CheckoutState::AttachingMethod);
        match self
            .api
            .attach_payment_method(reference.id(), subscription_id, &customer.id)
            .await
        {
            Ok(_) => {
                info!(
                    target: "checkout",
                    subscription_id = %subscription_id,
                    payment_method_id = %reference.id(),
                    "payment method attached"
                );
                self.succeed(Notice::payment_method_updated(reference.id()))
            }
            Err(e) => self.fail(FailureReason::AttachFailed(e), CheckoutState::Ready),
        }
    }

    fn cancelled(&self, resume: CheckoutState) -> AttemptOutcome {
        info!(target: "checkout", "user dismissed the payment surface");
        self.set_state(resume);
        AttemptOutcome::Cancelled
    }

    /// Card path: open the hosted checkout page and wait for its explicit completion.
    ///
    /// Does not need the wallet, so it is allowed from `Idle` as well as `Ready`.
    pub async fn hosted_checkout(
        &self,
        checkout: &HostedCheckout,
        surface: &dyn BrowserSurface,
    ) -> Result<AttemptOutcome, CheckoutError> {
        let _busy = self.acquire()?;
        let previous = self.state();
        if !matches!(previous, CheckoutState::Idle | CheckoutState::Ready) {
            return Err(CheckoutError::NotReady(previous.name()));
        }

        let customer = self.session.customer();
        let attempt = AttemptGuard::new(self, previous.clone());
        self.begin_intent();
        self.set_state(CheckoutState::Presenting);
        let outcome = match checkout.run(&self.mode, &customer.id, surface).await {
            Ok(HostedCompletion::Completed { session_id }) => {
                info!(target: "checkout", session_id = ?session_id, "hosted checkout completed");
                let notice = match &self.mode {
                    CheckoutMode::NewSubscription { .. } => Notice::payment_confirmed(),
                    CheckoutMode::ModifyPaymentMethod { .. } => {
                        Notice::new("Success", "The payment method was updated successfully.")
                    }
                };
                self.succeed(notice)
            }
            Ok(HostedCompletion::Cancelled) => self.cancelled(previous),
            Err(e) => self.fail(FailureReason::HostedCheckout(e.to_string()), previous),
        };
        attempt.finish();
        Ok(outcome)
    }

    /// Cancel the subscription this screen concerns.
    ///
    /// Not part of the payment state machine: the state is left as it was.
    /// On success the notice asks the screen to navigate back so the list refetches.
    pub async fn cancel_subscription(&self) -> Result<AttemptOutcome, CheckoutError> {
        let subscription_id = self.mode.subscription_id().ok_or(CheckoutError::WrongMode)?;
        let _busy = self.acquire()?;
        let current = self.state();
        if !matches!(current, CheckoutState::Idle | CheckoutState::Ready) {
            return Err(CheckoutError::NotReady(current.name()));
        }

        match self.api.cancel_subscription(subscription_id).await {
            Ok(_) => {
                info!(target: "checkout", subscription_id = %subscription_id, "subscription cancelled");
                self.notify(Notice::subscription_cancelled());
                Ok(AttemptOutcome::Succeeded)
            }
            Err(e) => {
                let reason = FailureReason::Request(e);
                warn!(target: "checkout", subscription_id = %subscription_id, reason = ?reason, "cancel failed");
                self.notify(Notice::failure(&reason));
                Ok(AttemptOutcome::Failed(reason))
            }
        }
    }

    /// Fetch the processor publishable key; alerts once when it is unavailable.
    pub async fn load_publishable_key(&self, payment_method_kind: &str) -> Option<String> {
        let key = self.api.fetch_publishable_key(payment_method_kind).await;
        if key.is_none() {
            self.notify(Notice::publishable_key_unavailable());
        }
        key
    }
}
