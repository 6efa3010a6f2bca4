use crate::auth::models::{AuthUser, LoginRequest, SignupRequest, TokenResponse};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lentolux_core::models::{NewUser, User, UserRole};
use lentolux_core::AppError;
use std::sync::Arc;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input or email/username already taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let email = request.email.trim().to_lowercase();
    let username = request.username.trim().to_string();

    if state.db.users.exists(&email, &username).await? {
        return Err(AppError::BadRequest("Email or username already registered".to_string()).into());
    }

    let user = state
        .db
        .users
        .create(NewUser {
            email,
            username,
            hashed_password: hash_password(&request.password)?,
            role: UserRole::User,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    let user = state
        .db
        .users
        .get_by_email(request.email.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&request.password, &user.hashed_password)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("User account is inactive".to_string()).into());
    }

    let token = state.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse::bearer(
        token,
        state.jwt.expires_in_seconds(),
    )))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated user", body = User),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<User>, HttpAppError> {
    let user = state
        .db
        .users
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
