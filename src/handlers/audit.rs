//! Read access to the in-memory audit buffer.

use axum::Json;
use axum::extract::State;

use crate::error::{AppError, AppResult};
use crate::models::AuditEventsResponse;
use crate::state::AppState;

/// Return the buffered audit events, oldest first.
///
/// Credentials in the events are already masked. Responds with 404 when the
/// buffer is disabled (`AUDIT_BUFFER_SIZE=0`).
pub async fn recent_events(State(state): State<AppState>) -> AppResult<Json<AuditEventsResponse>> {
    let buffer = state
        .recent_events
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Audit event buffer is disabled".to_string()))?;

    let events = buffer.events();
    Ok(Json(AuditEventsResponse {
        count: events.len(),
        events,
    }))
}
