//! API module
//!
//! HTTP transport: endpoints, shared state and middleware.

pub mod middleware;
pub mod routes;
pub mod state;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use routes::create_router;
pub use state::{AppState, PagingConfig};

/// Build the full application: `/api` routes behind request logging,
/// plus an unauthenticated health check.
pub fn build_app(state: AppState) -> Router {
    let api_routes =
        create_router().layer(axum_middleware::from_fn(middleware::logging_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
