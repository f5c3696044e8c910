use super::*;
use crate::api::errors::ApiError;
use crate::api::types::{Acknowledgement, CreatedSubscription, Plan, Subscription};
use crate::payment::completion::CompletionRegistry;
use crate::payment::hosted::{HostedAttempt, HostedError};
use crate::payment::PaymentReference;
use crate::session::StaticSession;
use async_trait::async_trait;
use reqwest::Url;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct StubApi {
    create_calls: AtomicUsize,
    attach_calls: Mutex<Vec<(String, String, String)>>,
    cancel_calls: AtomicUsize,
    fail_create: bool,
    fail_attach: bool,
    fail_cancel: bool,
    publishable_key: Option<String>,
}

fn backend_error() -> ApiError {
    ApiError::Network {
        status: Some(400),
        message: "No such customer: 'cus_test'".to_string(),
    }
}

#[async_trait]
impl BackendApi for StubApi {
    async fn list_active_subscriptions(&self, _customer_id: &str) -> Result<Vec<Subscription>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_subscription(&self, _price_id: &str, _customer_id: &str) -> Result<CreatedSubscription, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(backend_error());
        }
        Ok(CreatedSubscription {
            subscription_id: Some("sub_new".to_string()),
            client_secret: "pi_123_secret_abc".to_string(),
        })
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        subscription_id: &str,
        customer_id: &str,
    ) -> Result<Acknowledgement, ApiError> {
        lock(&self.attach_calls).push((
            payment_method_id.to_string(),
            subscription_id.to_string(),
            customer_id.to_string(),
        ));
        if self.fail_attach {
            return Err(backend_error());
        }
        Ok(Acknowledgement(serde_json::json!({"id": subscription_id})))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<Acknowledgement, ApiError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel {
            return Err(backend_error());
        }
        Ok(Acknowledgement(serde_json::json!({"detail": "Subscription Cancelled", "id": subscription_id})))
    }

    async fn fetch_publishable_key(&self, _payment_method_kind: &str) -> Option<String> {
        self.publishable_key.clone()
    }
}

struct StubWallet {
    init_error: Option<PaymentError>,
    present_outcome: Mutex<Vec<PaymentOutcome>>,
    detached_outcome: Mutex<Vec<PaymentOutcome>>,
    init_calls: AtomicUsize,
    present_calls: Mutex<Vec<String>>,
    detached_calls: Mutex<Vec<(i64, String)>>,
    // when set, presentation waits until notified
    gate: Option<Arc<Notify>>,
}

impl StubWallet {
    fn ready() -> Self {
        Self {
            init_error: None,
            present_outcome: Mutex::new(Vec::new()),
            detached_outcome: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            present_calls: Mutex::new(Vec::new()),
            detached_calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn unavailable() -> Self {
        Self {
            init_error: Some(PaymentError::SheetUnavailable {
                code: "Failed".to_string(),
                message: "Google Pay is not available".to_string(),
            }),
            ..Self::ready()
        }
    }

    // Outcomes are consumed in order; an empty queue means Cancelled.
    fn presenting(self, outcomes: Vec<PaymentOutcome>) -> Self {
        *lock(&self.present_outcome) = outcomes;
        self
    }

    fn detaching(self, outcomes: Vec<PaymentOutcome>) -> Self {
        *lock(&self.detached_outcome) = outcomes;
        self
    }

    fn next(queue: &Mutex<Vec<PaymentOutcome>>) -> PaymentOutcome {
        let mut queue = lock(queue);
        if queue.is_empty() {
            PaymentOutcome::Cancelled
        } else {
            queue.remove(0)
        }
    }
}

#[async_trait]
impl WalletSheet for StubWallet {
    async fn initialize(&self, _merchant: &MerchantConfig) -> Result<(), PaymentError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn present_for_payment(&self, client_secret: &str) -> PaymentOutcome {
        lock(&self.present_calls).push(client_secret.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Self::next(&self.present_outcome)
    }

    async fn create_detached_method(&self, amount: i64, currency: &str) -> PaymentOutcome {
        lock(&self.detached_calls).push((amount, currency.to_string()));
        Self::next(&self.detached_outcome)
    }
}

#[derive(Default)]
struct RecordingObserver {
    states: Mutex<Vec<CheckoutState>>,
    notices: Mutex<Vec<Notice>>,
}

impl CheckoutObserver for RecordingObserver {
    fn state_changed(&self, state: &CheckoutState) {
        lock(&self.states).push(state.clone());
    }

    fn notice(&self, notice: &Notice) {
        lock(&self.notices).push(notice.clone());
    }
}

impl RecordingObserver {
    fn states(&self) -> Vec<CheckoutState> {
        lock(&self.states).clone()
    }

    fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

fn session() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::new(Customer {
        id: "cus_test".to_string(),
        name: "Test Customer".to_string(),
    }))
}

fn new_subscription() -> CheckoutMode {
    CheckoutMode::NewSubscription {
        price_id: "price_pro".to_string(),
    }
}

fn modify_method() -> CheckoutMode {
    CheckoutMode::ModifyPaymentMethod {
        subscription_id: "sub_live".to_string(),
    }
}

struct Harness {
    api: Arc<StubApi>,
    wallet: Arc<StubWallet>,
    observer: Arc<RecordingObserver>,
    checkout: CheckoutOrchestrator,
}

fn harness(mode: CheckoutMode, api: StubApi, wallet: StubWallet) -> Harness {
    let api = Arc::new(api);
    let wallet = Arc::new(wallet);
    let observer = Arc::new(RecordingObserver::default());
    let checkout = CheckoutOrchestrator::new(mode, api.clone(), wallet.clone(), session());
    checkout.subscribe(observer.clone());
    Harness {
        api,
        wallet,
        observer,
        checkout,
    }
}

fn intent_success() -> PaymentOutcome {
    PaymentOutcome::Success(PaymentReference::ConfirmedIntent("pi_123".to_string()))
}

#[tokio::test]
async fn test_failed_initialization_never_presents() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::unavailable());

    let err = h.checkout.initialize().await.unwrap_err();
    assert!(matches!(err, CheckoutError::SheetUnavailable(_)));
    assert_eq!(h.checkout.state(), CheckoutState::Idle);

    let err = h.checkout.start().await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotReady("idle")));
    assert!(lock(&h.wallet.present_calls).is_empty());
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);

    let notices = h.observer.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Failed");
    assert_eq!(notices[0].message, "Google Pay is not available");
    assert!(matches!(
        h.observer.states().as_slice(),
        [
            CheckoutState::Initializing,
            CheckoutState::Failed(FailureReason::SheetUnavailable { .. }),
            CheckoutState::Idle
        ]
    ));
}

#[tokio::test]
async fn test_new_subscription_succeeds() {
    let h = harness(
        new_subscription(),
        StubApi::default(),
        StubWallet::ready().presenting(vec![intent_success()]),
    );

    h.checkout.initialize().await.unwrap();
    assert_eq!(h.checkout.state(), CheckoutState::Ready);

    let outcome = h.checkout.start().await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.checkout.state(), CheckoutState::Succeeded);
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
    assert!(lock(&h.api.attach_calls).is_empty());
    assert_eq!(*lock(&h.wallet.present_calls), vec!["pi_123_secret_abc".to_string()]);
    assert!(h.checkout.current_intent().is_none());
    assert!(!h.checkout.is_busy());

    assert_eq!(
        h.observer.states(),
        vec![
            CheckoutState::Initializing,
            CheckoutState::Ready,
            CheckoutState::Presenting,
            CheckoutState::Confirming,
            CheckoutState::Succeeded,
        ]
    );
    assert_eq!(h.observer.notices(), vec![Notice::payment_confirmed()]);
}

#[tokio::test]
async fn test_succeeded_requires_reinitialization() {
    let h = harness(
        new_subscription(),
        StubApi::default(),
        StubWallet::ready().presenting(vec![intent_success(), intent_success()]),
    );
    h.checkout.initialize().await.unwrap();
    h.checkout.start().await.unwrap();

    assert!(matches!(h.checkout.start().await, Err(CheckoutError::NotReady("succeeded"))));

    h.checkout.initialize().await.unwrap();
    assert_eq!(h.wallet.init_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.checkout.start().await.unwrap(), AttemptOutcome::Succeeded);
}

#[tokio::test]
async fn test_modify_payment_method_attaches_token() {
    let h = harness(
        modify_method(),
        StubApi::default(),
        StubWallet::ready().detaching(vec![PaymentOutcome::Success(PaymentReference::PaymentMethod(
            "pm_card_visa".to_string(),
        ))]),
    );

    h.checkout.initialize().await.unwrap();
    let outcome = h.checkout.start().await.unwrap();

    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.checkout.state(), CheckoutState::Succeeded);
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
    assert!(lock(&h.wallet.present_calls).is_empty());
    assert_eq!(*lock(&h.wallet.detached_calls), vec![(50, "BRL".to_string())]);
    assert_eq!(
        *lock(&h.api.attach_calls),
        vec![(
            "pm_card_visa".to_string(),
            "sub_live".to_string(),
            "cus_test".to_string()
        )]
    );
    assert!(h.observer.states().contains(&CheckoutState::AttachingMethod));
}

#[tokio::test]
async fn test_attach_failure_returns_to_ready() {
    let api = StubApi {
        fail_attach: true,
        ..StubApi::default()
    };
    let h = harness(
        modify_method(),
        api,
        StubWallet::ready().detaching(vec![PaymentOutcome::Success(PaymentReference::PaymentMethod(
            "pm_1".to_string(),
        ))]),
    );
    h.checkout.initialize().await.unwrap();

    let outcome = h.checkout.start().await.unwrap();
    assert!(matches!(outcome, AttemptOutcome::Failed(FailureReason::AttachFailed(_))));
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
    assert_eq!(lock(&h.api.attach_calls).len(), 1);

    let notices = h.observer.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "No such customer: 'cus_test'");
}

#[tokio::test]
async fn test_cancelled_sheet_returns_to_ready_without_reinit() {
    let h = harness(
        new_subscription(),
        StubApi::default(),
        StubWallet::ready().presenting(vec![PaymentOutcome::Cancelled, intent_success()]),
    );
    h.checkout.initialize().await.unwrap();

    let outcome = h.checkout.start().await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Cancelled);
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
    assert!(!h.checkout.is_busy());
    assert!(h.observer.notices().is_empty());

    let outcome = h.checkout.start().await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.wallet.init_calls.load(Ordering::SeqCst), 1);
    // each attempt fetched its own client secret
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_user_error_is_reported_verbatim() {
    let h = harness(
        new_subscription(),
        StubApi::default(),
        StubWallet::ready().presenting(vec![PaymentOutcome::UserError {
            code: "Failed".to_string(),
            message: "Your card was declined.".to_string(),
        }]),
    );
    h.checkout.initialize().await.unwrap();

    let outcome = h.checkout.start().await.unwrap();
    assert_eq!(
        outcome,
        AttemptOutcome::Failed(FailureReason::UserError {
            code: "Failed".to_string(),
            message: "Your card was declined.".to_string(),
        })
    );
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
    assert_eq!(
        h.observer.notices(),
        vec![Notice::new("Failed", "Your card was declined.")]
    );
}

#[tokio::test]
async fn test_create_subscription_failure_skips_sheet() {
    let api = StubApi {
        fail_create: true,
        ..StubApi::default()
    };
    let h = harness(new_subscription(), api, StubWallet::ready());
    h.checkout.initialize().await.unwrap();

    let outcome = h.checkout.start().await.unwrap();
    assert!(matches!(outcome, AttemptOutcome::Failed(FailureReason::Request(_))));
    assert!(lock(&h.wallet.present_calls).is_empty());
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
}

#[tokio::test]
async fn test_second_action_while_presenting_is_busy() {
    let gate = Arc::new(Notify::new());
    let wallet = StubWallet {
        gate: Some(gate.clone()),
        ..StubWallet::ready().presenting(vec![intent_success()])
    };
    let api = Arc::new(StubApi::default());
    let checkout = Arc::new(CheckoutOrchestrator::new(
        new_subscription(),
        api.clone(),
        Arc::new(wallet),
        session(),
    ));
    checkout.initialize().await.unwrap();

    let running = {
        let checkout = Arc::clone(&checkout);
        tokio::spawn(async move { checkout.start().await })
    };
    while checkout.state() != CheckoutState::Presenting || checkout.current_intent().and_then(|i| i.client_secret).is_none() {
        tokio::task::yield_now().await;
    }

    assert!(checkout.is_busy());
    assert!(matches!(checkout.start().await, Err(CheckoutError::Busy)));
    assert!(matches!(checkout.initialize().await, Err(CheckoutError::Busy)));

    gate.notify_one();
    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert!(!checkout.is_busy());
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_subscription_navigates_back() {
    let h = harness(modify_method(), StubApi::default(), StubWallet::ready());
    h.checkout.initialize().await.unwrap();

    let outcome = h.checkout.cancel_subscription().await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.api.cancel_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
    assert_eq!(h.observer.notices(), vec![Notice::subscription_cancelled()]);
}

#[tokio::test]
async fn test_cancel_subscription_failure_and_wrong_mode() {
    let api = StubApi {
        fail_cancel: true,
        ..StubApi::default()
    };
    let h = harness(modify_method(), api, StubWallet::ready());
    let outcome = h.checkout.cancel_subscription().await.unwrap();
    assert!(matches!(outcome, AttemptOutcome::Failed(FailureReason::Request(_))));
    assert_eq!(h.observer.notices()[0].on_acknowledge, notice::Acknowledge::Stay);

    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    assert!(matches!(h.checkout.cancel_subscription().await, Err(CheckoutError::WrongMode)));
    assert_eq!(h.api.cancel_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_publishable_key_alerts_once() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    assert_eq!(h.checkout.load_publishable_key("card").await, None);
    assert_eq!(h.observer.notices(), vec![Notice::publishable_key_unavailable()]);

    let api = StubApi {
        publishable_key: Some("pk_test_1".to_string()),
        ..StubApi::default()
    };
    let h = harness(new_subscription(), api, StubWallet::ready());
    assert_eq!(h.checkout.load_publishable_key("card").await.as_deref(), Some("pk_test_1"));
    assert!(h.observer.notices().is_empty());
}

#[tokio::test]
async fn test_publishable_key_transport_failure_alerts_once() {
    let api = crate::api::BackendRestClient::new(reqwest::Client::new(), "http://127.0.0.1:1").unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let checkout = CheckoutOrchestrator::new(new_subscription(), Arc::new(api), Arc::new(StubWallet::ready()), session());
    checkout.subscribe(observer.clone());

    assert_eq!(checkout.load_publishable_key("card").await, None);
    assert_eq!(observer.notices().len(), 1);
}

struct CompletingSurface {
    registry: Arc<CompletionRegistry>,
    completion: HostedCompletion,
    opened: Mutex<Vec<Url>>,
}

#[async_trait]
impl BrowserSurface for CompletingSurface {
    async fn open(&self, attempt: &HostedAttempt) -> Result<(), HostedError> {
        lock(&self.opened).push(attempt.url.clone());
        self.registry
            .publish(&attempt.id, self.completion.clone(), None)
            .await
            .map_err(|e| HostedError::Surface(e.to_string()))?;
        Ok(())
    }
}

fn hosted(timeout: Duration) -> HostedCheckout {
    HostedCheckout::new(
        Url::parse("http://localhost:5000").unwrap(),
        "http://127.0.0.1:5055",
        Arc::new(CompletionRegistry::new()),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn test_hosted_checkout_without_wallet() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::unavailable());
    let checkout = hosted(Duration::from_secs(5));
    let surface = CompletingSurface {
        registry: checkout.registry(),
        completion: HostedCompletion::Completed {
            session_id: Some("cs_1".to_string()),
        },
        opened: Mutex::new(Vec::new()),
    };

    let outcome = h.checkout.hosted_checkout(&checkout, &surface).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.checkout.state(), CheckoutState::Succeeded);
    assert_eq!(h.wallet.init_calls.load(Ordering::SeqCst), 0);
    // the backend creates the subscription itself on this path
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);

    let opened = lock(&surface.opened);
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].path(), "/create-checkout-session");
    assert!(opened[0].query_pairs().any(|(k, v)| k == "customer" && v == "cus_test"));
}

#[tokio::test]
async fn test_hosted_checkout_cancel_restores_previous_state() {
    let h = harness(modify_method(), StubApi::default(), StubWallet::ready());
    h.checkout.initialize().await.unwrap();
    let checkout = hosted(Duration::from_secs(5));
    let surface = CompletingSurface {
        registry: checkout.registry(),
        completion: HostedCompletion::Cancelled,
        opened: Mutex::new(Vec::new()),
    };

    let outcome = h.checkout.hosted_checkout(&checkout, &surface).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Cancelled);
    assert_eq!(h.checkout.state(), CheckoutState::Ready);
    assert!(h.observer.notices().is_empty());
}

struct SilentSurface;

#[async_trait]
impl BrowserSurface for SilentSurface {
    async fn open(&self, _attempt: &HostedAttempt) -> Result<(), HostedError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_hosted_checkout_timeout_fails_once() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    let checkout = hosted(Duration::from_millis(30));

    let outcome = h.checkout.hosted_checkout(&checkout, &SilentSurface).await.unwrap();
    assert!(matches!(outcome, AttemptOutcome::Failed(FailureReason::HostedCheckout(_))));
    assert_eq!(h.checkout.state(), CheckoutState::Idle);
    assert_eq!(h.observer.notices().len(), 1);
    assert_eq!(h.observer.notices()[0].title, "Checkout not completed");
}

#[tokio::test]
async fn test_aborted_attempt_restores_ready() {
    let gate = Arc::new(Notify::new());
    let wallet = StubWallet {
        gate: Some(gate.clone()),
        ..StubWallet::ready().presenting(vec![intent_success()])
    };
    let api = Arc::new(StubApi::default());
    let checkout = Arc::new(CheckoutOrchestrator::new(
        new_subscription(),
        api.clone(),
        Arc::new(wallet),
        session(),
    ));
    checkout.initialize().await.unwrap();

    let running = {
        let checkout = Arc::clone(&checkout);
        tokio::spawn(async move { checkout.start().await })
    };
    while checkout.current_intent().and_then(|i| i.client_secret).is_none() {
        tokio::task::yield_now().await;
    }
    assert_eq!(checkout.state(), CheckoutState::Presenting);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    assert_eq!(checkout.state(), CheckoutState::Ready);
    assert!(checkout.current_intent().is_none());
    assert!(!checkout.is_busy());

    // the next attempt runs without re-initializing
    gate.notify_one();
    assert_eq!(checkout.start().await.unwrap(), AttemptOutcome::Succeeded);
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timed_out_hosted_wait_restores_previous_state() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    let checkout = hosted(Duration::from_secs(60));

    // caller-side timeout drops the attempt future mid-wait
    let dropped = tokio::time::timeout(
        Duration::from_millis(30),
        h.checkout.hosted_checkout(&checkout, &SilentSurface),
    )
    .await;
    assert!(dropped.is_err());

    assert_eq!(h.checkout.state(), CheckoutState::Idle);
    assert!(h.checkout.current_intent().is_none());
    assert!(!h.checkout.is_busy());
    assert!(h.observer.notices().is_empty());
}

// Reports the page the browser lands on, as an embedded browser would.
struct NavigatingSurface {
    checkout: Arc<HostedCheckout>,
    landed_on: &'static str,
}

#[async_trait]
impl BrowserSurface for NavigatingSurface {
    async fn open(&self, attempt: &HostedAttempt) -> Result<(), HostedError> {
        assert!(self.checkout.observe_navigation(&attempt.id, self.landed_on).await);
        Ok(())
    }
}

#[tokio::test]
async fn test_hosted_checkout_completes_on_backend_success_page() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    let checkout = Arc::new(hosted(Duration::from_secs(5)).with_processor_cancel_url("https://example.com/cancel"));
    let surface = NavigatingSurface {
        checkout: checkout.clone(),
        landed_on: "http://0.0.0.0:5000/success?session_id=cs_test_a1",
    };

    let outcome = h.checkout.hosted_checkout(&checkout, &surface).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
    assert_eq!(h.checkout.state(), CheckoutState::Succeeded);

    let h = harness(modify_method(), StubApi::default(), StubWallet::ready());
    let surface = NavigatingSurface {
        checkout: checkout.clone(),
        landed_on: "http://localhost:5000/success-modify-checkout-session?session_id=cs_test_b2",
    };
    let outcome = h.checkout.hosted_checkout(&checkout, &surface).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Succeeded);
}

#[tokio::test]
async fn test_hosted_checkout_cancelled_on_processor_cancel_page() {
    let h = harness(new_subscription(), StubApi::default(), StubWallet::ready());
    let checkout = Arc::new(hosted(Duration::from_secs(5)).with_processor_cancel_url("https://example.com/cancel"));
    let surface = NavigatingSurface {
        checkout: checkout.clone(),
        landed_on: "https://example.com/cancel",
    };

    let outcome = h.checkout.hosted_checkout(&checkout, &surface).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Cancelled);
    assert_eq!(h.checkout.state(), CheckoutState::Idle);
}
