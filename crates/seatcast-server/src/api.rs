//! Notify API used by business logic, plus client enumeration.
//!
//! Every handler is a thin adapter onto [`DispatchContext`](crate::DispatchContext):
//! delivery happens asynchronously, so the notify routes answer `202
//! Accepted` as soon as the event is handed to the active strategy.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use seatcast_core::CourseUpdate;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::server::AppState;

/// Body of `GET /clients`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsResponse {
    /// Identity tags of connected clients.
    pub user_ids: Vec<String>,
}

/// POST /notify/course-update
pub async fn notify_course_update(
    State(state): State<AppState>,
    Json(update): Json<CourseUpdate>,
) -> StatusCode {
    debug!(
        course_id = %update.updated_course.id,
        old_spots = update.old_spots,
        new_spots = update.new_spots,
        "course update received"
    );
    state.dispatch.notify_course_update(&update);
    StatusCode::ACCEPTED
}

/// POST /notify/events/{event_name}
pub async fn notify_event(
    State(state): State<AppState>,
    Path(event_name): Path<String>,
    Json(data): Json<Value>,
) -> StatusCode {
    state.dispatch.distribute_message(&event_name, &data);
    StatusCode::ACCEPTED
}

/// GET /clients
pub async fn list_clients(State(state): State<AppState>) -> Json<ClientsResponse> {
    Json(ClientsResponse {
        user_ids: state.dispatch.active_user_ids(),
    })
}
