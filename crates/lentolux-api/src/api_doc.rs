//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::models::{LoginRequest, SignupRequest, TokenResponse};
use crate::error;
use crate::handlers;
use lentolux_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lento&Lux Content API",
        version = "0.1.0",
        description = "Upload, watermark and archive content for the Lento&Lux social channels, then publish it to the configured platforms in the background."
    ),
    paths(
        // Auth
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::me,
        // Content
        handlers::content::upload_content,
        handlers::content::list_content,
        handlers::content::get_content,
        handlers::content::delete_content,
        handlers::content::download_content,
        // Social
        handlers::social::schedule_publish,
        handlers::social::publish_status,
        handlers::social::upload_schedule,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        SignupRequest,
        LoginRequest,
        TokenResponse,
        models::User,
        models::UserRole,
        models::Content,
        models::ContentType,
        models::MediaKind,
        models::PublishState,
        models::PlatformStatus,
        models::PlatformOutcome,
        models::ScheduleEntry,
        handlers::content::DownloadResponse,
        handlers::social::PublishAccepted,
        handlers::social::PublishStatusResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Signup, login and the current user"),
        (name = "content", description = "Upload pipeline and content management"),
        (name = "social", description = "Background social publishing"),
        (name = "health", description = "Health check"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
