pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::vision::VisionClient;
use crate::state::AppState;

/// Builds the full application router, used by `main` and the integration
/// tests.
pub fn create_app() -> axum::Router {
    let state = AppState::new(VisionClient::from_env());

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
