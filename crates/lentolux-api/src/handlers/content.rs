use crate::auth::models::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadRequest;
use crate::state::AppState;
use crate::utils::upload::extract_upload_form;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use lentolux_core::models::{Content, ContentListQuery};
use lentolux_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
}

/// Admins may act on any content, everyone else only on their own
pub fn authorize_content_access(user: &AuthUser, content: &Content) -> Result<(), AppError> {
    if user.can_access(content) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this content".to_string(),
        ))
    }
}

/// Fetch a row the caller may act on: 404 when missing, 403 when not theirs
pub(crate) async fn load_authorized(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> Result<Content, AppError> {
    let content = state
        .db
        .contents
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Content not found".to_string()))?;
    authorize_content_access(user, &content)?;
    Ok(content)
}

#[utoipa::path(
    post,
    path = "/content/upload",
    tag = "content",
    request_body(content_type = "multipart/form-data", description = "Fields: content_type, title, description, file"),
    responses(
        (status = 201, description = "Content uploaded, watermarked and archived", body = Content),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 422, description = "Media could not be processed", body = ErrorResponse),
        (status = 502, description = "Archive store failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %auth.user_id, operation = "upload_content"))]
pub async fn upload_content(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = extract_upload_form(multipart, state.media.max_upload_size).await?;

    let content = state
        .media
        .pipeline
        .upload(UploadRequest {
            user_id: auth.user_id,
            content_type: form.content_type,
            title: form.title,
            description: form.description,
            original_filename: form.original_filename,
            declared_mime: form.declared_mime,
            data: form.file_data,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(content)))
}

#[utoipa::path(
    get,
    path = "/content/list",
    tag = "content",
    params(
        ("content_type" = Option<String>, Query, description = "Filter by content type"),
        ("limit" = Option<i64>, Query, description = "Optional page size (max 200); all rows when omitted"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Own content, or all content for admins", body = Vec<Content>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.user_id))]
pub async fn list_content(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContentListQuery>,
) -> Result<Json<Vec<Content>>, HttpAppError> {
    let owner = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };

    let contents = state
        .db
        .contents
        .list(owner, query.content_type, query.limit, query.offset)
        .await?;

    Ok(Json(contents))
}

#[utoipa::path(
    get,
    path = "/content/{id}",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content", body = Content),
        (status = 403, description = "Not your content", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_content(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Content>, HttpAppError> {
    Ok(Json(load_authorized(&state, &auth, id).await?))
}

#[utoipa::path(
    delete,
    path = "/content/{id}",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 204, description = "Content, local file and archived entry deleted"),
        (status = 403, description = "Not your content", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.user_id, content_id = %id, operation = "delete_content"))]
pub async fn delete_content(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, HttpAppError> {
    let content = load_authorized(&state, &auth, id).await?;
    state.media.pipeline.delete(&content).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/content/{id}/download",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Download URL of the archived artifact", body = DownloadResponse),
        (status = 403, description = "Not your content", body = ErrorResponse),
        (status = 404, description = "Content or archived entry not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_content(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DownloadResponse>, HttpAppError> {
    let content = load_authorized(&state, &auth, id).await?;
    let url = state.media.pipeline.download_url(&content).await?;
    Ok(Json(DownloadResponse { url }))
}
