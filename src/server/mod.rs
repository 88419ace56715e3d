//! HTTP server setup and shared application state.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use log::{error, info};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::database::TranslationStore;
use crate::errors::RelayError;
use crate::relay::StreamingRelay;

pub mod handlers;

/// Shared application state for the HTTP server.
pub struct AppState {
    relay: StreamingRelay,
    store: Arc<dyn TranslationStore>,
    default_user_id: String,
}

impl AppState {
    pub fn new(relay: StreamingRelay, store: Arc<dyn TranslationStore>, default_user_id: impl Into<String>) -> Self {
        Self {
            relay,
            store,
            default_user_id: default_user_id.into(),
        }
    }

    pub fn relay(&self) -> &StreamingRelay {
        &self.relay
    }

    pub fn store(&self) -> Arc<dyn TranslationStore> {
        self.store.clone()
    }

    pub fn default_user_id(&self) -> &str {
        &self.default_user_id
    }
}

/// Build the HTTP router for the service.
pub fn build_router(state: Arc<AppState>, allow_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/healthz", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/translate", post(handlers::translate))
        .route("/api/translations", post(handlers::create_translation))
        .route(
            "/api/translations/:transaction_id/feedback",
            put(handlers::update_feedback),
        )
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response));

    if allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Turn a panic escaping a handler into a 500 with the panic message.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Request handler panicked: {}", message);
    RelayError::Internal(message).into_response()
}

/// Serve the router on `listener` until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, state: Arc<AppState>, allow_any_origin: bool) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!("Translation relay listening on http://{}", addr);

    axum::serve(listener, build_router(state, allow_any_origin))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
