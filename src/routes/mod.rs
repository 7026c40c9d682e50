//! Route modules for the DDAS server

pub mod dashboard;
pub mod downloads;
pub mod health;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    // The browser extension calls cross-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/downloads", downloads::router())
        .nest("/api/dashboard", dashboard::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
