// HTTP callback server the hosted checkout page redirects back to

use crate::payment::completion::{CompletionError, CompletionRegistry, HostedCompletion};
use crate::payment::hosted::{CANCEL_PATH, COMPLETE_PATH};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct CallbackState {
    pub registry: Arc<CompletionRegistry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub attempt: Option<String>,
    pub session_id: Option<String>,
}

pub fn router(registry: Arc<CompletionRegistry>) -> Router {
    Router::new()
        .route(COMPLETE_PATH, get(handle_complete))
        .route(CANCEL_PATH, get(handle_cancel))
        .route("/health", get(health_check))
        .with_state(CallbackState { registry })
}

/// Bind the loopback listener up front so a taken port fails before any checkout starts.
pub async fn bind_callback_listener(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding checkout callback server on {addr}"))?;
    info!(target: "hosted", "Checkout callback server listening on {}", addr);
    Ok(listener)
}

pub async fn serve_callback_server(listener: TcpListener, registry: Arc<CompletionRegistry>) -> anyhow::Result<()> {
    axum::serve(listener, router(registry)).await?;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn handle_complete(State(state): State<CallbackState>, Query(query): Query<CallbackQuery>) -> impl IntoResponse {
    let completion = HostedCompletion::Completed {
        session_id: query.session_id.clone(),
    };
    deliver(&state, query, completion, "Checkout complete. You can close this window.").await
}

async fn handle_cancel(State(state): State<CallbackState>, Query(query): Query<CallbackQuery>) -> impl IntoResponse {
    deliver(&state, query, HostedCompletion::Cancelled, "Checkout cancelled. You can close this window.").await
}

async fn deliver(
    state: &CallbackState,
    query: CallbackQuery,
    completion: HostedCompletion,
    page: &str,
) -> (StatusCode, String) {
    let Some(attempt_id) = query.attempt.filter(|a| !a.is_empty()) else {
        warn!(target: "hosted", "callback without attempt id");
        return (StatusCode::BAD_REQUEST, "missing attempt".to_string());
    };

    match state
        .registry
        .publish(&attempt_id, completion, query.session_id.as_deref())
        .await
    {
        Ok(receivers) => {
            info!(target: "hosted", attempt_id = %attempt_id, receivers, "Checkout callback processed");
            (StatusCode::OK, page.to_string())
        }
        Err(e @ CompletionError::UnknownAttempt(_)) => {
            error!(target: "hosted", "Checkout callback rejected: {}", e);
            (StatusCode::NOT_FOUND, e.to_string())
        }
    }
}
