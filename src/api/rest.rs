// Backend REST client
// One request per operation: no retries, failures go straight back to the caller.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::api::errors::ApiError;
use crate::api::types::{
    Acknowledgement, CancelSubscriptionRequest, CreateSubscriptionRequest, CreatedSubscription,
    ListEnvelope, ModifySubscriptionRequest, Plan, RawCreatedSubscription, RawPlan,
    RawPublishableKey, RawSubscription, Subscription, SubscriptionStatus,
};
use crate::api::BackendApi;
use crate::settings::ApiSettings;

#[derive(Clone)]
pub struct BackendRestClient {
    pub(crate) http: Client,
    pub(crate) base_url: Url,
}

impl BackendRestClient {
    pub fn new(http: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Config(format!("base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("base url {base_url} cannot carry paths")));
        }
        Ok(Self { http, base_url })
    }

    // Build reqwest client with rustls and the configured total timeout.
    pub fn from_settings(cfg: &ApiSettings) -> Result<Self, ApiError> {
        let timeout = Duration::from_millis(if cfg.request_timeout_ms > 0 { cfg.request_timeout_ms } else { 15_000 });
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Self::new(http, &cfg.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn map_error(status: StatusCode, body: &str) -> ApiError {
        ApiError::from_status(status.as_u16(), body)
    }

    async fn send_json<T: DeserializeOwned>(&self, desc: &str, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(|e| {
            warn!(target: "api", desc = %desc, error = %e, "backend unreachable");
            ApiError::transport(e)
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(ApiError::transport)?;
        if status.is_success() {
            debug!(target: "api", desc = %desc, status = status.as_u16(), "backend response");
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::MalformedResponse(format!("{desc}: {e}")))
        } else {
            warn!(target: "api", desc = %desc, status = status.as_u16(), "backend returned error status");
            Err(Self::map_error(status, &text))
        }
    }

    async fn send_ack(&self, desc: &str, req: RequestBuilder) -> Result<Acknowledgement, ApiError> {
        let resp = req.send().await.map_err(ApiError::transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(ApiError::transport)?;
        if !status.is_success() {
            warn!(target: "api", desc = %desc, status = status.as_u16(), "backend returned error status");
            return Err(Self::map_error(status, &text));
        }
        // The ack shape is up to the backend; keep whatever came back.
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok(Acknowledgement(body))
    }
}

#[async_trait]
impl BackendApi for BackendRestClient {
    // GET /customer/{id}/subscriptions
    #[instrument(skip(self), fields(method = "GET", path = "/customer/{id}/subscriptions"))]
    async fn list_active_subscriptions(&self, customer_id: &str) -> Result<Vec<Subscription>, ApiError> {
        info!(target: "api", method = "GET", customer_id = %customer_id, "list subscriptions");
        let req = self.http.get(self.endpoint(&["customer", customer_id, "subscriptions"]));
        let envelope: ListEnvelope<RawSubscription> = self.send_json("list_subscriptions", req).await?;
        let data = envelope
            .data
            .ok_or_else(|| ApiError::MalformedResponse("list_subscriptions: missing data".to_string()))?;

        // Filter first: non-active entries are not required to carry an expanded plan.
        data.into_iter()
            .filter(|raw| raw.status() == SubscriptionStatus::Active)
            .map(Subscription::try_from)
            .collect()
    }

    // GET /plans
    #[instrument(skip(self), fields(method = "GET", path = "/plans"))]
    async fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        info!(target: "api", method = "GET", "list plans");
        let req = self.http.get(self.endpoint(&["plans"]));
        let envelope: ListEnvelope<RawPlan> = self.send_json("list_plans", req).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::MalformedResponse("list_plans: missing data".to_string()))?
            .into_iter()
            .map(Plan::try_from)
            .collect()
    }

    // POST /create-subscription
    #[instrument(skip(self), fields(method = "POST", path = "/create-subscription"))]
    async fn create_subscription(&self, price_id: &str, customer_id: &str) -> Result<CreatedSubscription, ApiError> {
        info!(target: "api", method = "POST", price_id = %price_id, customer_id = %customer_id, "create subscription");
        let body = CreateSubscriptionRequest {
            price_id,
            customer: customer_id,
        };
        let req = self.http.post(self.endpoint(&["create-subscription"])).json(&body);
        let raw: RawCreatedSubscription = self.send_json("create_subscription", req).await?;
        CreatedSubscription::try_from(raw)
    }

    // POST /subscription-modify
    #[instrument(skip(self), fields(method = "POST", path = "/subscription-modify"))]
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        subscription_id: &str,
        customer_id: &str,
    ) -> Result<Acknowledgement, ApiError> {
        info!(
            target: "api",
            method = "POST",
            subscription_id = %subscription_id,
            customer_id = %customer_id,
            "attach payment method"
        );
        let body = ModifySubscriptionRequest {
            payment_method_id,
            subscription_id,
            customer_id,
        };
        let req = self.http.post(self.endpoint(&["subscription-modify"])).json(&body);
        self.send_ack("attach_payment_method", req).await
    }

    // POST /cancel-subscription
    #[instrument(skip(self), fields(method = "POST", path = "/cancel-subscription"))]
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<Acknowledgement, ApiError> {
        info!(target: "api", method = "POST", subscription_id = %subscription_id, "cancel subscription");
        let body = CancelSubscriptionRequest { subscription_id };
        let req = self.http.post(self.endpoint(&["cancel-subscription"])).json(&body);
        self.send_ack("cancel_subscription", req).await
    }

    // GET /stripe-key?paymentMethod=
    // Soft-fail: callers get None and decide how to tell the user.
    #[instrument(skip(self), fields(method = "GET", path = "/stripe-key"))]
    async fn fetch_publishable_key(&self, payment_method_kind: &str) -> Option<String> {
        let req = self
            .http
            .get(self.endpoint(&["stripe-key"]))
            .query(&[("paymentMethod", payment_method_kind)]);
        match self.send_json::<RawPublishableKey>("fetch_publishable_key", req).await {
            Ok(RawPublishableKey {
                publishable_key: Some(key),
            }) if !key.is_empty() => Some(key),
            Ok(_) => {
                warn!(target: "api", "publishable key missing from response");
                None
            }
            Err(e) => {
                warn!(target: "api", error = %e, "unable to fetch publishable key; is the server running?");
                None
            }
        }
    }
}
