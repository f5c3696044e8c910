use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CustomerSettings {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BillingAddressSettings {
    pub format: String,
    pub phone_number_required: bool,
    pub required: bool,
}

impl Default for BillingAddressSettings {
    fn default() -> Self {
        Self {
            format: "FULL".to_string(),
            phone_number_required: true,
            required: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WalletSettings {
    pub test_env: bool,
    pub merchant_name: String,
    pub country_code: String,
    #[serde(default)]
    pub billing_address: BillingAddressSettings,
    pub existing_payment_method_required: bool,
    pub email_required: bool,
    /// Amount (minor units) shown on the sheet when only a reusable method is created
    #[serde(default = "default_detached_amount")]
    pub detached_method_amount: i64,
    #[serde(default = "default_detached_currency")]
    pub detached_method_currency: String,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            test_env: true,
            merchant_name: "Test".to_string(),
            country_code: "US".to_string(),
            billing_address: BillingAddressSettings::default(),
            existing_payment_method_required: false,
            email_required: true,
            detached_method_amount: default_detached_amount(),
            detached_method_currency: default_detached_currency(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HostedSettings {
    pub callback_port: u16,
    /// Externally reachable base of the callback server, used in return/cancel URLs
    #[serde(default)]
    pub callback_base_url: String,
    #[serde(default = "default_hosted_timeout", with = "humantime_serde")]
    pub completion_timeout: Duration,
    /// Cancel page the backend hands to the processor; reaching it means the user backed out
    #[serde(default = "default_cancel_url")]
    pub processor_cancel_url: String,
}

impl Default for HostedSettings {
    fn default() -> Self {
        Self {
            callback_port: 5055,
            callback_base_url: String::new(),
            completion_timeout: default_hosted_timeout(),
            processor_cancel_url: default_cancel_url(),
        }
    }
}

impl HostedSettings {
    pub fn callback_base(&self) -> String {
        if self.callback_base_url.is_empty() {
            format!("http://127.0.0.1:{}", self.callback_port)
        } else {
            self.callback_base_url.trim_end_matches('/').to_string()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub customer: CustomerSettings,
    #[serde(default)]
    pub wallet: WalletSettings,
    #[serde(default)]
    pub hosted: HostedSettings,
}

impl Config {
    /// Load from config.toml (if present) and environment variables.
    /// Environment variables override file values.
    /// Supported env keys: API_URL, API_TIMEOUT_MS, CUSTOMER_ID, CUSTOMER_NAME,
    /// WALLET_TEST_ENV, WALLET_MERCHANT_NAME, WALLET_COUNTRY_CODE,
    /// DETACHED_METHOD_AMOUNT, DETACHED_METHOD_CURRENCY, CALLBACK_PORT,
    /// CALLBACK_BASE_URL, HOSTED_CHECKOUT_TIMEOUT, HOSTED_CANCEL_URL
    pub fn load() -> Self {
        Self::load_from(std::path::Path::new("config.toml"), |key| std::env::var(key).ok())
    }

    pub fn from_env() -> Self {
        Self::load()
    }

    pub(crate) fn load_from<F>(path: &std::path::Path, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base: Config = Default::default();
        let mut fig = Figment::from(Serialized::defaults(base));
        if path.exists() {
            fig = fig.merge(Toml::file(path));
        }
        let mut cfg: Config = fig.extract().unwrap_or_default();
        cfg.apply_env(env);
        cfg
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("API_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = env("API_TIMEOUT_MS") {
            self.api.request_timeout_ms = v.parse().unwrap_or(self.api.request_timeout_ms);
        }
        if let Some(v) = env("CUSTOMER_ID") {
            self.customer.id = v;
        }
        if let Some(v) = env("CUSTOMER_NAME") {
            self.customer.name = v;
        }
        if let Some(v) = env("WALLET_TEST_ENV") {
            self.wallet.test_env = parse_bool(&v);
        }
        if let Some(v) = env("WALLET_MERCHANT_NAME") {
            self.wallet.merchant_name = v;
        }
        if let Some(v) = env("WALLET_COUNTRY_CODE") {
            self.wallet.country_code = v;
        }
        if let Some(v) = env("DETACHED_METHOD_AMOUNT") {
            self.wallet.detached_method_amount = v.parse().unwrap_or(self.wallet.detached_method_amount);
        }
        if let Some(v) = env("DETACHED_METHOD_CURRENCY") {
            self.wallet.detached_method_currency = v;
        }
        if let Some(v) = env("CALLBACK_PORT") {
            self.hosted.callback_port = v.parse().unwrap_or(self.hosted.callback_port);
        }
        if let Some(v) = env("CALLBACK_BASE_URL") {
            self.hosted.callback_base_url = v;
        }
        if let Some(v) = env("HOSTED_CHECKOUT_TIMEOUT") {
            self.hosted.completion_timeout = parse_duration_env(&v, self.hosted.completion_timeout);
        }
        if let Some(v) = env("HOSTED_CANCEL_URL") {
            self.hosted.processor_cancel_url = v;
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_duration_env(value: &str, current: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or(current)
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_detached_amount() -> i64 {
    50
}

fn default_detached_currency() -> String {
    "BRL".to_string()
}

fn default_hosted_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_cancel_url() -> String {
    "https://example.com/cancel".to_string()
}
