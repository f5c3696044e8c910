// Hosted checkout page: URL construction, navigation classification and completion waiting

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::checkout::state::CheckoutMode;
use crate::payment::completion::{CompletionRegistry, HostedCompletion};
use crate::settings::HostedSettings;

pub(crate) const COMPLETE_PATH: &str = "/checkout/complete";
pub(crate) const CANCEL_PATH: &str = "/checkout/cancel";
// Pages the backend's checkout sessions redirect to once the processor is done
const BACKEND_SUCCESS_PATHS: [&str; 2] = ["/success", "/success-modify-checkout-session"];

#[derive(Debug, Error)]
pub enum HostedError {
    #[error("browser surface failed: {0}")]
    Surface(String),
    #[error("no completion received within {0:?}")]
    Timeout(Duration),
    #[error("completion channel closed")]
    Closed,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// A hosted attempt handed to the browser surface
#[derive(Debug, Clone)]
pub struct HostedAttempt {
    pub id: String,
    pub url: Url,
}

/// Embedded browser (or external browser) that displays the hosted page
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    async fn open(&self, attempt: &HostedAttempt) -> Result<(), HostedError>;
}

pub struct HostedCheckout {
    base_url: Url,
    callback_base: Url,
    processor_cancel_url: Option<Url>,
    registry: Arc<CompletionRegistry>,
    timeout: Duration,
}

impl HostedCheckout {
    pub fn new(
        base_url: Url,
        callback_base: &str,
        registry: Arc<CompletionRegistry>,
        timeout: Duration,
    ) -> Result<Self, HostedError> {
        let callback_base = Url::parse(callback_base).map_err(|e| HostedError::InvalidUrl(format!("{callback_base}: {e}")))?;
        Ok(Self {
            base_url,
            callback_base,
            processor_cancel_url: None,
            registry,
            timeout,
        })
    }

    pub fn from_settings(base_url: Url, cfg: &HostedSettings, registry: Arc<CompletionRegistry>) -> Result<Self, HostedError> {
        let checkout = Self::new(base_url, &cfg.callback_base(), registry, cfg.completion_timeout)?;
        Ok(checkout.with_processor_cancel_url(&cfg.processor_cancel_url))
    }

    pub fn with_processor_cancel_url(mut self, url: &str) -> Self {
        self.processor_cancel_url = Url::parse(url).ok();
        self
    }

    pub fn registry(&self) -> Arc<CompletionRegistry> {
        Arc::clone(&self.registry)
    }

    fn join(base: &Url, path: &[&str]) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path);
        }
        url
    }

    fn callback_url(&self, path: &str, attempt_id: &str) -> Url {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let mut url = Self::join(&self.callback_base, &segments);
        url.query_pairs_mut().append_pair("attempt", attempt_id);
        url
    }

    /// Checkout page URL for `mode`, carrying return and cancel redirects for `attempt_id`
    pub fn checkout_url(&self, mode: &CheckoutMode, customer_id: &str, attempt_id: &str) -> Url {
        let mut url = match mode {
            CheckoutMode::NewSubscription { price_id } => {
                let mut url = Self::join(&self.base_url, &["create-checkout-session"]);
                url.query_pairs_mut()
                    .append_pair("price_id", price_id)
                    .append_pair("customer", customer_id);
                url
            }
            CheckoutMode::ModifyPaymentMethod { subscription_id } => {
                let mut url = Self::join(&self.base_url, &["modify-checkout-session"]);
                url.query_pairs_mut()
                    .append_pair("subscription_id", subscription_id)
                    .append_pair("customer", customer_id);
                url
            }
        };
        let return_url = self.callback_url(COMPLETE_PATH, attempt_id);
        let cancel_url = self.callback_url(CANCEL_PATH, attempt_id);
        url.query_pairs_mut()
            .append_pair("return_url", return_url.as_str())
            .append_pair("cancel_url", cancel_url.as_str());
        url
    }

    /// Map a URL the browser navigated to onto a completion, if it ends the checkout
    pub fn classify_navigation(&self, url: &str) -> Option<HostedCompletion> {
        let url = Url::parse(url).ok()?;
        let session_id = || {
            url.query_pairs()
                .find(|(k, _)| k == "session_id")
                .map(|(_, v)| v.into_owned())
        };

        if let Some(cancel) = &self.processor_cancel_url {
            if same_page(&url, cancel) {
                return Some(HostedCompletion::Cancelled);
            }
        }
        if same_origin(&url, &self.callback_base) {
            let path = url.path().trim_end_matches('/');
            if path.ends_with(COMPLETE_PATH) {
                return Some(HostedCompletion::Completed { session_id: session_id() });
            }
            if path.ends_with(CANCEL_PATH) {
                return Some(HostedCompletion::Cancelled);
            }
        }
        let path = url.path().trim_end_matches('/');
        if BACKEND_SUCCESS_PATHS.iter().any(|p| path.ends_with(p)) && session_id().is_some() {
            return Some(HostedCompletion::Completed { session_id: session_id() });
        }
        None
    }

    /// Feed one browser navigation; publishes when it ends the attempt. Returns whether it did.
    pub async fn observe_navigation(&self, attempt_id: &str, url: &str) -> bool {
        let Some(completion) = self.classify_navigation(url) else {
            return false;
        };
        let event_id = match &completion {
            HostedCompletion::Completed { session_id } => session_id.clone(),
            HostedCompletion::Cancelled => None,
        };
        self.registry
            .publish(attempt_id, completion, event_id.as_deref())
            .await
            .is_ok()
    }

    /// Open the hosted page for `mode` and wait for its completion
    #[instrument(skip(self, surface))]
    pub async fn run(
        &self,
        mode: &CheckoutMode,
        customer_id: &str,
        surface: &dyn BrowserSurface,
    ) -> Result<HostedCompletion, HostedError> {
        let attempt_id = uuid::Uuid::new_v4().to_string();
        let mut rx = self.registry.register_waiter(&attempt_id).await;
        let attempt = HostedAttempt {
            url: self.checkout_url(mode, customer_id, &attempt_id),
            id: attempt_id,
        };
        info!(target: "hosted", attempt_id = %attempt.id, url = %attempt.url, "opening hosted checkout");

        let result = match surface.open(&attempt).await {
            Ok(()) => match tokio::time::timeout(self.timeout, rx.recv()).await {
                Ok(Ok(update)) => Ok(update.completion),
                Ok(Err(_)) => Err(HostedError::Closed),
                Err(_) => Err(HostedError::Timeout(self.timeout)),
            },
            Err(e) => Err(e),
        };
        self.registry.remove_waiter(&attempt.id).await;

        match &result {
            Ok(completion) => info!(target: "hosted", attempt_id = %attempt.id, completion = ?completion, "hosted checkout finished"),
            Err(e) => warn!(target: "hosted", attempt_id = %attempt.id, error = %e, "hosted checkout did not complete"),
        }
        result
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

fn same_page(a: &Url, b: &Url) -> bool {
    same_origin(a, b) && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}
