use crate::auth::models::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::content::load_authorized;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use lentolux_core::models::{weekly_schedule, PublishState, ScheduleEntry};
use lentolux_core::AppError;
use lentolux_worker::PublishJob;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishAccepted {
    pub message: String,
    pub content_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishStatusResponse {
    pub content_id: Uuid,
    pub is_uploaded: bool,
    pub publish_state: PublishState,
    /// Platform name to its latest outcome
    #[schema(value_type = Object)]
    pub upload_status: JsonValue,
}

fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin privileges required".to_string()))
    }
}

#[utoipa::path(
    post,
    path = "/social/upload/{id}",
    tag = "social",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 202, description = "Publish scheduled", body = PublishAccepted),
        (status = 400, description = "Content already uploaded or no platforms configured", body = ErrorResponse),
        (status = 403, description = "Admin privileges required", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse),
        (status = 409, description = "Publish already in progress or queue full", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.user_id, content_id = %id, operation = "schedule_publish"))]
pub async fn schedule_publish(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_admin(&auth)?;

    let content = load_authorized(&state, &auth, id).await?;
    if content.is_uploaded {
        return Err(AppError::BadRequest("Content already uploaded".to_string()).into());
    }
    if state.social.publisher.platform_names().is_empty() {
        return Err(AppError::BadRequest("No social platforms configured".to_string()).into());
    }

    if state.db.contents.claim_for_publish(id).await?.is_none() {
        return Err(AppError::Conflict("publish already in progress".to_string()).into());
    }

    if let Err(e) = state.social.queue.submit(PublishJob::new(id, auth.user_id)) {
        if let Err(release_err) = state.db.contents.release_claim(id).await {
            tracing::error!(error = %release_err, "Failed to release publish claim");
        }
        return Err(AppError::Conflict(e.to_string()).into());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishAccepted {
            message: "Social upload scheduled".to_string(),
            content_id: id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/social/status/{id}",
    tag = "social",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Per-platform upload status", body = PublishStatusResponse),
        (status = 403, description = "Not your content", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn publish_status(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PublishStatusResponse>, HttpAppError> {
    let content = load_authorized(&state, &auth, id).await?;
    Ok(Json(PublishStatusResponse {
        content_id: content.id,
        is_uploaded: content.is_uploaded,
        publish_state: content.publish_state,
        upload_status: content.upload_status,
    }))
}

#[utoipa::path(
    get,
    path = "/social/schedule",
    tag = "social",
    responses(
        (status = 200, description = "Weekly publishing schedule", body = Vec<ScheduleEntry>),
        (status = 403, description = "Admin privileges required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_schedule(auth: AuthUser) -> Result<Json<Vec<ScheduleEntry>>, HttpAppError> {
    require_admin(&auth)?;
    Ok(Json(weekly_schedule()))
}
