//! HTTP routing for the session server
//!
//! - `/` and `/ws` - WebSocket upgrade into the session (plain GET on `/`
//!   returns a banner)
//! - `/health` - Health check and status endpoints
//! - `/session` - Read-only session status

pub mod health;
pub mod session;

pub use health::{health_router, HealthState};
pub use session::session_router;

use std::net::SocketAddr;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::websocket::{self, SessionCoordinator};

/// Banner returned to plain HTTP requests on `/`
pub const BANNER: &str = "Watch With Friends WebSocket server";

/// Build the application router around a session coordinator
pub fn build_router(coordinator: SessionCoordinator, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ws", get(websocket::ws_handler))
        .nest("/health", health_router(HealthState::new(coordinator.clone())))
        .nest("/session", session_router(coordinator.clone()))
        .layer(Extension(coordinator))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

/// Upgrade when the request asks for it, otherwise answer with the banner
async fn root(
    ws: Option<WebSocketUpgrade>,
    Extension(coordinator): Extension<SessionCoordinator>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    match ws {
        Some(ws) => websocket::upgrade(ws, coordinator, connect_info, &headers),
        None => BANNER.into_response(),
    }
}

/// Build the CORS layer based on configuration.
///
/// In production mode:
/// - If `CORS_ORIGINS` is set, only those origins are allowed
/// - If `CORS_ORIGINS` is not set, CORS requests are rejected
///
/// In development mode without `CORS_ORIGINS`, permissive CORS is used.
fn build_cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<_> = origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!("Invalid CORS origin '{}', skipping", origin);
                        None
                    })
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::error!("No valid CORS origins configured, CORS requests will be rejected");
                CorsLayer::new()
            } else {
                tracing::info!(
                    "CORS configured with {} allowed origin(s): {:?}",
                    allowed_origins.len(),
                    origins
                );
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
                    .max_age(std::time::Duration::from_secs(3600))
            }
        }
        _ if config.is_production() => {
            tracing::warn!(
                "CORS_ORIGINS not configured in production mode. \
                 CORS requests will be rejected."
            );
            CorsLayer::new()
        }
        _ => {
            tracing::debug!("Using permissive CORS in development mode");
            CorsLayer::permissive()
        }
    }
}
