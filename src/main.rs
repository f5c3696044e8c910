use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::sync::Arc;
use subscription_checkout::api::{BackendApi, BackendRestClient};
use subscription_checkout::callback_server;
use subscription_checkout::checkout::notice::{Acknowledge, CheckoutObserver, Notice};
use subscription_checkout::checkout::state::{CheckoutMode, CheckoutState, RouteParams};
use subscription_checkout::checkout::{AttemptOutcome, CheckoutOrchestrator};
use subscription_checkout::payment::completion::CompletionRegistry;
use subscription_checkout::payment::hosted::{BrowserSurface, HostedAttempt, HostedCheckout, HostedError};
use subscription_checkout::payment::wallet::UnavailableWallet;
use subscription_checkout::payment::{DetachedMethodRequest, MerchantConfig};
use subscription_checkout::session::{SessionProvider, StaticSession};
use subscription_checkout::settings::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "subscription-checkout",
    version,
    about = "Browse plans and pay for subscriptions through the checkout backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plans that can be subscribed to
    Plans,
    /// List the customer's active subscriptions
    Subscriptions,
    /// Fetch the publishable key for a payment method kind
    Key {
        #[arg(default_value = "card")]
        kind: String,
    },
    /// Cancel an existing subscription
    Cancel { subscription_id: String },
    /// Pay for a new plan, or replace the payment method of a subscription
    Checkout {
        #[arg(long, conflicts_with = "subscription", required_unless_present = "subscription")]
        price: Option<String>,
        #[arg(long)]
        subscription: Option<String>,
        /// Product name shown for an existing subscription
        #[arg(long)]
        name: Option<String>,
    },
}

/// Prints the hosted page address and reads back the address the browser lands on.
///
/// A backend that honours `return_url` completes through the callback server
/// instead; whichever arrives first ends the attempt.
struct TerminalBrowser {
    hosted: Arc<HostedCheckout>,
}

#[async_trait]
impl BrowserSurface for TerminalBrowser {
    async fn open(&self, attempt: &HostedAttempt) -> Result<(), HostedError> {
        println!("Open this page to complete the checkout:\n  {}", attempt.url);
        println!("When the browser leaves the checkout page, paste its address here.");

        let runtime = tokio::runtime::Handle::current();
        let hosted = Arc::clone(&self.hosted);
        let attempt_id = attempt.id.clone();
        // Plain thread: a pending stdin read must not hold up runtime shutdown.
        std::thread::Builder::new()
            .name("checkout-navigation".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let url = line.trim();
                    if url.is_empty() {
                        continue;
                    }
                    if runtime.block_on(hosted.observe_navigation(&attempt_id, url)) {
                        break;
                    }
                    println!("That address does not end the checkout; paste the page the browser landed on.");
                }
            })
            .map_err(|e| HostedError::Surface(e.to_string()))?;
        Ok(())
    }
}

struct TerminalObserver;

impl CheckoutObserver for TerminalObserver {
    fn state_changed(&self, state: &CheckoutState) {
        if state.is_in_flight() {
            println!("state: {} (waiting)", state.name());
        } else {
            println!("state: {}", state.name());
        }
    }

    fn notice(&self, notice: &Notice) {
        println!("[{}] {}", notice.title, notice.message);
        if notice.on_acknowledge == Acknowledge::NavigateBack {
            println!("Run `subscriptions` to see the refreshed list.");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration from config.toml and the environment
    let cfg = Config::from_env();

    let session = match StaticSession::from_settings(&cfg.customer) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            tracing::error!("{e}; set CUSTOMER_ID. Exiting");
            return Ok(());
        }
    };
    let api = Arc::new(BackendRestClient::from_settings(&cfg.api)?);
    tracing::info!(base_url = %api.base_url(), customer = %session.customer().id, "Backend client ready");

    match cli.command {
        Commands::Plans => {
            for plan in api.list_plans().await.map_err(|e| anyhow::anyhow!(e.user_message()))? {
                println!("{}  {}", plan.price_id, plan.product_name);
            }
        }
        Commands::Subscriptions => {
            let subscriptions = api
                .list_active_subscriptions(&session.customer().id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if subscriptions.is_empty() {
                println!("No active subscriptions");
            }
            for subscription in subscriptions {
                println!("{}  {}", subscription.id, subscription.product_name);
            }
        }
        Commands::Key { kind } => match api.fetch_publishable_key(&kind).await {
            Some(key) => println!("{key}"),
            None => TerminalObserver.notice(&Notice::publishable_key_unavailable()),
        },
        Commands::Cancel { subscription_id } => {
            let mode = CheckoutMode::ModifyPaymentMethod { subscription_id };
            let checkout = orchestrator(&cfg, mode, api, session);
            settle("cancel", checkout.cancel_subscription().await?)?;
        }
        Commands::Checkout {
            price,
            subscription,
            name,
        } => {
            let route = RouteParams {
                price_id: price,
                subscription_id: subscription,
                name,
            };
            let mode = CheckoutMode::try_from(&route)?;
            if let Some(name) = &route.name {
                println!("Updating the payment method of {name}");
            }
            run_checkout(&cfg, mode, api, session).await?;
        }
    }

    Ok(())
}

fn orchestrator(
    cfg: &Config,
    mode: CheckoutMode,
    api: Arc<BackendRestClient>,
    session: Arc<StaticSession>,
) -> CheckoutOrchestrator {
    let checkout = CheckoutOrchestrator::new(mode, api, Arc::new(UnavailableWallet), session)
        .with_merchant(MerchantConfig::from(&cfg.wallet))
        .with_detached_method(DetachedMethodRequest::from(&cfg.wallet));
    checkout.subscribe(Arc::new(TerminalObserver));
    checkout
}

async fn run_checkout(
    cfg: &Config,
    mode: CheckoutMode,
    api: Arc<BackendRestClient>,
    session: Arc<StaticSession>,
) -> Result<()> {
    let base_url = api.base_url().clone();
    let checkout = orchestrator(cfg, mode, api, session);

    let registry = Arc::new(CompletionRegistry::new());
    let listener = callback_server::bind_callback_listener(cfg.hosted.callback_port).await?;
    let server_registry = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = callback_server::serve_callback_server(listener, server_registry).await {
            tracing::error!("Callback server failed: {}", e);
        }
    });

    let hosted = Arc::new(HostedCheckout::from_settings(base_url, &cfg.hosted, registry)?);
    let browser = TerminalBrowser {
        hosted: Arc::clone(&hosted),
    };
    let outcome = checkout.hosted_checkout(&hosted, &browser).await?;

    settle("checkout", outcome)
}

// Non-zero exit for anything but success or a user cancel.
fn settle(action: &str, outcome: AttemptOutcome) -> Result<()> {
    match outcome {
        AttemptOutcome::Succeeded => Ok(()),
        AttemptOutcome::Cancelled => {
            println!("{action} cancelled");
            Ok(())
        }
        AttemptOutcome::Failed(reason) => bail!("{action} failed: {reason:?}"),
    }
}
