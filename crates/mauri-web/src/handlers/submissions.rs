//! `submissions.*` procedures.

use axum::extract::State;
use axum::Json;
use mauri_common::Submission;

use super::{Ack, ApiJson, ApiPath};
use crate::auth::AdminCaller;
use crate::error::ApiError;
use crate::intake::{self, ClientMeta, ObservationPayload};
use crate::state::SharedState;

/// GET /api/submissions, newest first.
pub async fn list(
    State(state): State<SharedState>,
    _admin: AdminCaller,
) -> Result<Json<Vec<Submission>>, ApiError> {
    Ok(Json(state.db.submissions().list().await?))
}

/// GET /api/submissions/{id}
pub async fn get_by_id(
    State(state): State<SharedState>,
    _admin: AdminCaller,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Submission>, ApiError> {
    state
        .db
        .submissions()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Submission"))
}

/// POST /api/submissions
pub async fn create(
    State(state): State<SharedState>,
    client: ClientMeta,
    ApiJson(payload): ApiJson<ObservationPayload>,
) -> Result<Json<Ack>, ApiError> {
    let stored = intake::accept(
        &state.db,
        state.photos.as_ref(),
        &state.config.submissions,
        payload,
        client,
    )
    .await?;
    Ok(Json(Ack::created(stored.id)))
}

/// DELETE /api/submissions/{id}. Deleting a missing row still succeeds.
pub async fn delete(
    State(state): State<SharedState>,
    AdminCaller(admin): AdminCaller,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Ack>, ApiError> {
    let affected = state.db.submissions().delete(id).await?;
    tracing::info!(id, affected, by = %admin.open_id, "submission deleted");
    Ok(Json(Ack::affected(affected)))
}
