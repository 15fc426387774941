// Public API for integration tests and the server binary

pub mod api;
pub mod broadcast;
pub mod config;
pub mod consensus;
pub mod game;
pub mod hub;
pub mod protocol;
pub mod state;
pub mod types;
pub mod ws;

use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Full application router with shared middleware
pub fn app(state: Arc<state::AppState>) -> axum::Router {
    api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
