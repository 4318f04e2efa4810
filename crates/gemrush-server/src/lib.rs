pub mod config;
pub mod health;
pub mod room;
pub mod session;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/healthz", axum::routing::get(health::health_check))
        .route("/monitor", axum::routing::get(health::monitor))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
