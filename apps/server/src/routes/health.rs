//! Health check HTTP route handlers
//!
//! - `GET /health` - Simple liveness check (returns 200 OK)
//! - `GET /health/live` - Liveness probe with build version
//! - `GET /health/ready` - Readiness probe with session occupancy

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::websocket::SessionCoordinator;

/// Shared state for health check handlers
#[derive(Clone)]
pub struct HealthState {
    pub coordinator: SessionCoordinator,
}

impl HealthState {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self { coordinator }
    }
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(simple_health))
        .route("/live", get(liveness_probe))
        .route("/ready", get(readiness_probe))
        .with_state(state)
}

/// Simple health check for load balancers
async fn simple_health() -> &'static str {
    "OK"
}

/// Liveness probe
///
/// Returns 200 while the process can serve requests.
async fn liveness_probe() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe
///
/// The server has no external dependencies, so it is ready whenever it is
/// live. The body reports how many participants are connected.
async fn readiness_probe(State(state): State<HealthState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "participants": state.coordinator.participant_count(),
        "host": state.coordinator.host(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_simple_health() {
        let response = simple_health().await;
        assert_eq!(response, "OK");
    }

    #[tokio::test]
    async fn test_liveness_probe() {
        let response = liveness_probe().await;
        let json = response.into_response();
        assert_eq!(json.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_reports_empty_session() {
        let state = HealthState::new(SessionCoordinator::new());
        let response = readiness_probe(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
