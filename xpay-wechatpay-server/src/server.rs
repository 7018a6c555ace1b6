//! Router assembly, listener and graceful shutdown.

use crate::api;
use crate::state::AppState;
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use xpay_wechatpay::gateway::Gateway;

/// Build the application router: `/health` plus the API under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::router())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    gateway: &'static str,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        gateway: state.gateway.name(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Serve `router` on `addr` until SIGINT or SIGTERM.
///
/// In-flight requests (notifications in particular) are allowed to finish.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A handler that cannot be installed is logged and ignored, so the other
/// signal still stops the server.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
