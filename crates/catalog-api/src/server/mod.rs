//! HTTP server for the read API.

mod handlers;
pub mod middleware;
pub mod params;

use crate::catalog::Catalog;
use crate::rate_limiter::RequestRateLimiter;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use shared::config::PaginationConfig;
use std::future::Future;
use std::sync::Arc;

pub use handlers::{ApiError, CompareResponse};

/// Application state shared across handlers.
pub struct AppState<C: Catalog> {
    pub catalog: C,
    pub limiter: Arc<RequestRateLimiter>,
    pub pagination: PaginationConfig,
}

impl<C: Catalog> AppState<C> {
    pub fn new(catalog: C, limiter: RequestRateLimiter, pagination: PaginationConfig) -> Self {
        Self {
            catalog,
            limiter: Arc::new(limiter),
            pagination,
        }
    }
}

/// Creates the API router.
///
/// Everything under `/api` passes the rate limiter; `/health` does not.
pub fn create_router<C: Catalog + 'static>(state: Arc<AppState<C>>) -> Router {
    let api = Router::new()
        .route("/browse", get(handlers::browse::<C>))
        .route("/characters", get(handlers::characters::<C>))
        .route("/staff", get(handlers::staff::<C>))
        .route("/studios", get(handlers::studios::<C>))
        .route("/airing", get(handlers::airing::<C>))
        .route("/search", get(handlers::search::<C>))
        .route("/compare", get(handlers::compare::<C>))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.limiter),
            middleware::rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .with_state(state)
}

/// Starts the HTTP server and serves until `shutdown` resolves.
pub async fn start_server<C, F>(addr: &str, state: Arc<AppState<C>>, shutdown: F) -> Result<()>
where
    C: Catalog + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
