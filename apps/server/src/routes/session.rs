//! Read-only session status routes
//!
//! - `GET /session` - Roster in join order plus the current host
//! - `GET /session/participants/:id` - One participant, 404 if absent

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::websocket::session::ParticipantSnapshot;
use crate::websocket::{messages::ParticipantId, SessionCoordinator, SessionSnapshot};

/// Create the session status router
pub fn session_router(coordinator: SessionCoordinator) -> Router {
    Router::new()
        .route("/", get(get_session))
        .route("/participants/:id", get(get_participant))
        .with_state(coordinator)
}

async fn get_session(State(coordinator): State<SessionCoordinator>) -> Json<SessionSnapshot> {
    Json(coordinator.snapshot())
}

async fn get_participant(
    State(coordinator): State<SessionCoordinator>,
    Path(id): Path<String>,
) -> ApiResult<Json<ParticipantSnapshot>> {
    let participant_id: ParticipantId = id
        .parse()
        .map_err(|e: uuid::Error| ApiError::invalid_path_param("id", e.to_string()))?;

    coordinator
        .participant(participant_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("participant", id))
}
