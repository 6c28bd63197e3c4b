//! HTTP surface of the gateway.
//!
//! Every route lives under `/api`. Mutating routes are gated by the session
//! token middleware; path and config inputs are validated in the handlers
//! before the [`RepositoryGateway`] is called.

pub mod guard;
pub mod handlers;
pub mod response;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::git::gateway::{RepositoryGateway, DEFAULT_HISTORY_LIMIT};
use crate::security::{PathValidator, SessionGuard};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn RepositoryGateway>,
    pub guard: Arc<SessionGuard>,
    pub paths: Arc<PathValidator>,
    pub history_limit: usize,
}

impl AppState {
    pub fn new(gateway: Arc<dyn RepositoryGateway>, guard: SessionGuard) -> Self {
        let paths = PathValidator::new(gateway.root());
        Self {
            gateway,
            guard: Arc::new(guard),
            paths: Arc::new(paths),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/csrf-token", get(handlers::csrf_token))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/branches", get(handlers::list_branches).post(handlers::create_branch))
        .route("/branches/checkout", post(handlers::checkout_branch))
        .route("/branches/{name}", delete(handlers::delete_branch))
        .route("/commits", get(handlers::commit_history))
        .route("/commits/{hash}", get(handlers::commit_details))
        .route("/diff", get(handlers::diff))
        .route("/stage", post(handlers::stage))
        .route("/unstage", post(handlers::unstage))
        .route("/commit", post(handlers::commit))
        .route("/discard", post(handlers::discard))
        .route("/remotes", get(handlers::remotes))
        .route("/fetch", post(handlers::fetch))
        .route("/pull", post(handlers::pull))
        .route("/push", post(handlers::push))
        .route("/config", get(handlers::get_config).post(handlers::set_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_session_token,
        ))
        .route_layer(middleware::from_fn(guard::require_loopback_host));

    Router::new().nest("/api", api).with_state(state)
}

/// Bind the loopback listener; the server never listens on other interfaces
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
