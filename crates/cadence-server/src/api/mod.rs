//! Review API
//!
//! JSON endpoints over the due queue and review service. Owner identity
//! comes from the `x-owner-id` header set by the upstream auth layer.

pub mod error;
pub mod handlers;
pub mod owner;
pub mod state;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{delete, get, post};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

pub use error::ApiError;
pub use owner::{Owner, OWNER_HEADER};
pub use state::AppState;

/// Build the axum router with all API routes
pub fn build_router(state: AppState, port: u16) -> Router {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(OWNER_HEADER),
        ]);

    let no_store = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Router::new()
        // Review loop
        .route("/api/cards/due", get(handlers::due_cards))
        .route("/api/review", post(handlers::submit_review))
        // Cards
        .route("/api/cards", post(handlers::create_card))
        .route("/api/cards/{id}", delete(handlers::delete_card))
        .route("/api/cards/{id}/preview", get(handlers::preview_review))
        .route("/api/cards/{id}/reviews", get(handlers::review_history))
        // Read-only views
        .route("/api/mastery", get(handlers::list_mastery))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .concurrency_limit(50)
                .layer(cors)
                .layer(no_store),
        )
        .with_state(state)
}

/// Serve the API until Ctrl+C or SIGTERM
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), std::io::Error> {
    let app = build_router(state, port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Cadence API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cadence API shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// ============================================================================
// TESTS
// ============================================================================
