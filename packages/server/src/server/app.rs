//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wa_bridge::{BridgeOptions, BridgeService};

use crate::config::Config;
use crate::domains::pairing::{PairingCoordinator, PairingSettings};
use crate::domains::session::SessionStore;
use crate::kernel::{BridgeClientFactory, ServerDeps};
use crate::server::routes::{health_handler, pair_handler, session_handler};
use crate::server::static_files::serve_assets;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<PairingCoordinator>,
    pub sessions: SessionStore,
}

/// Wire the production dependencies from configuration
pub fn build_deps(config: &Config) -> ServerDeps {
    let bridge = Arc::new(BridgeService::new(BridgeOptions {
        base_url: config.bridge_url.clone(),
        api_key: config.bridge_api_key.clone(),
    }));

    ServerDeps::new(
        Arc::new(BridgeClientFactory::new(bridge)),
        SessionStore::new(config.session_dir.clone()),
        PairingSettings {
            timeout: config.pairing_timeout,
            linger: config.pairing_linger,
            require_session_dir: config.require_session_dir,
        },
    )
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps) -> Router {
    let app_state = AppState {
        coordinator: Arc::new(PairingCoordinator::new(&deps)),
        sessions: deps.sessions.clone(),
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/pair", post(pair_handler))
        .route("/session", get(session_handler))
        // Health check
        .route("/health", get(health_handler))
        // Pairing page and its assets
        .fallback(get(serve_assets))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
