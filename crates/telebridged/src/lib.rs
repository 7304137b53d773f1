//! telebridged - telematics gateway daemon
//!
//! Runs one session per configured vehicle against the telematics backend,
//! publishes normalized facts on an in-process retained bus and exposes
//! that bus over HTTP.
//!
//! # Usage
//!
//! ```ignore
//! use telebridged::{create_router, AppState, RetainedBus};
//!
//! let bus = Arc::new(RetainedBus::new());
//! let state = AppState::new(bus, "saic/user@example.com").with_vehicles(handles);
//! let router = create_router(state);
//! ```

pub mod auth;
pub mod bus;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod state;

pub use bus::{BusMessage, RetainedBus};
pub use config::{ConfigError, GatewayConfig};
pub use error::ApiError;
pub use gateway::{build_sessions, watch, SessionExit};
pub use state::AppState;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_bearer, BusToken};

/// Create the bus API router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/vehicles", get(handlers::list_vehicles))
        .route("/vehicles/{vin}/messages", post(handlers::post_message))
        .route("/topics", get(handlers::list_topics))
        .route("/topics/{*topic}", get(handlers::get_topic))
        .route("/commands/{*topic}", post(handlers::send_command))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Require a bearer token on everything except `/health`
pub fn with_auth(router: Router, token: Option<String>) -> Router {
    match token {
        Some(token) => router.layer(middleware::from_fn_with_state(
            BusToken::new(token),
            require_bearer,
        )),
        None => router,
    }
}
