//! Route modules for the PDF Splitter server

pub mod artifacts;
pub mod health;
pub mod split;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(split::router(state.config().server.max_upload_bytes))
        .merge(artifacts::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
