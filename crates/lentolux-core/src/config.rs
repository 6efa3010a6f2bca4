//! Configuration module
//!
//! Built once at startup from the environment and passed by reference into
//! every constructor. Nothing reads the environment after [`Config::from_env`].

use std::env;
use std::str::FromStr;

use crate::archive_types::ArchiveBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const VIDEO_WATERMARK_TIMEOUT_SECS: u64 = 600;
const ARCHIVE_TIMEOUT_SECS: u64 = 30;
const ARCHIVE_MAX_ATTEMPTS: u32 = 3;
const SOCIAL_TIMEOUT_SECS: u64 = 30;
const SOCIAL_MAX_ATTEMPTS: u32 = 3;
const PUBLISH_MAX_WORKERS: usize = 4;
const PUBLISH_TIMEOUT_SECS: u64 = 300;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_BRANCH: &str = "main";

/// Base configuration for the HTTP server and database
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    pub log_format: String,
}

/// One social platform endpoint the publisher pushes content to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocialPlatformConfig {
    pub name: String,
    pub endpoint: String,
}

/// Bootstrap admin account created at startup when missing
#[derive(Clone, Debug)]
pub struct AdminBootstrapConfig {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Content pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub base: BaseConfig,
    // Media processing
    pub upload_dir: String,
    pub max_upload_size_bytes: usize,
    pub font_path: Option<String>,
    pub ffmpeg_path: String,
    pub video_watermark_timeout_secs: u64,
    pub keep_original_uploads: bool,
    // Archive store
    pub archive_backend: ArchiveBackend,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: String,
    pub github_api_url: String,
    pub local_archive_path: Option<String>,
    pub local_archive_base_url: Option<String>,
    pub archive_timeout_secs: u64,
    pub archive_max_attempts: u32,
    // Social publishing
    pub social_platforms: Vec<SocialPlatformConfig>,
    pub social_platform_token: Option<String>,
    pub social_timeout_secs: u64,
    pub social_max_attempts: u32,
    pub publish_max_workers: usize,
    pub publish_timeout_secs: u64,
    // Bootstrap admin
    pub admin: Option<AdminBootstrapConfig>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn inner(&self) -> &PipelineConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        PipelineConfig::from_env().map(|c| Config(Box::new(c)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.inner().base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn upload_dir(&self) -> &str {
        &self.inner().upload_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn font_path(&self) -> Option<&str> {
        self.inner().font_path.as_deref()
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ffmpeg_path
    }

    pub fn video_watermark_timeout_secs(&self) -> u64 {
        self.inner().video_watermark_timeout_secs
    }

    pub fn keep_original_uploads(&self) -> bool {
        self.inner().keep_original_uploads
    }

    pub fn archive_backend(&self) -> ArchiveBackend {
        self.inner().archive_backend
    }

    pub fn github_token(&self) -> Option<&str> {
        self.inner().github_token.as_deref()
    }

    pub fn github_repo(&self) -> Option<&str> {
        self.inner().github_repo.as_deref()
    }

    pub fn github_branch(&self) -> &str {
        &self.inner().github_branch
    }

    pub fn github_api_url(&self) -> &str {
        &self.inner().github_api_url
    }

    pub fn local_archive_path(&self) -> Option<&str> {
        self.inner().local_archive_path.as_deref()
    }

    pub fn local_archive_base_url(&self) -> Option<&str> {
        self.inner().local_archive_base_url.as_deref()
    }

    pub fn archive_timeout_secs(&self) -> u64 {
        self.inner().archive_timeout_secs
    }

    pub fn archive_max_attempts(&self) -> u32 {
        self.inner().archive_max_attempts
    }

    pub fn social_platforms(&self) -> &[SocialPlatformConfig] {
        &self.inner().social_platforms
    }

    pub fn social_platform_token(&self) -> Option<&str> {
        self.inner().social_platform_token.as_deref()
    }

    pub fn social_timeout_secs(&self) -> u64 {
        self.inner().social_timeout_secs
    }

    pub fn social_max_attempts(&self) -> u32 {
        self.inner().social_max_attempts
    }

    pub fn publish_max_workers(&self) -> usize {
        self.inner().publish_max_workers
    }

    pub fn publish_timeout_secs(&self) -> u64 {
        self.inner().publish_timeout_secs
    }

    pub fn admin(&self) -> Option<&AdminBootstrapConfig> {
        self.inner().admin.as_ref()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| s.to_lowercase().parse().unwrap_or(default))
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Parses `SOCIAL_PLATFORMS` entries of the form `name=url,name=url`.
pub fn parse_social_platforms(raw: &str) -> Result<Vec<SocialPlatformConfig>, anyhow::Error> {
    let mut platforms: Vec<SocialPlatformConfig> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, endpoint) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("SOCIAL_PLATFORMS entry '{}' must be name=url", entry))?;
        let name = name.trim().to_lowercase();
        let endpoint = endpoint.trim().to_string();
        if name.is_empty() || endpoint.is_empty() {
            return Err(anyhow::anyhow!(
                "SOCIAL_PLATFORMS entry '{}' must be name=url",
                entry
            ));
        }
        if platforms.iter().any(|p| p.name == name) {
            return Err(anyhow::anyhow!("SOCIAL_PLATFORMS lists '{}' twice", name));
        }
        platforms.push(SocialPlatformConfig { name, endpoint });
    }
    Ok(platforms)
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";

        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env_or("JWT_EXPIRY_HOURS", JWT_EXPIRY_HOURS),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
        };

        let archive_backend = match env_non_empty("ARCHIVE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => ArchiveBackend::Github,
        };

        let social_platforms =
            parse_social_platforms(&env::var("SOCIAL_PLATFORMS").unwrap_or_default())?;

        let admin = match (
            env_non_empty("ADMIN_EMAIL"),
            env_non_empty("ADMIN_USERNAME"),
            env_non_empty("ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(username), Some(password)) => Some(AdminBootstrapConfig {
                email,
                username,
                password,
            }),
            _ => None,
        };

        let config = PipelineConfig {
            base,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            max_upload_size_bytes: env_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB) * 1024 * 1024,
            font_path: env_non_empty("FONT_PATH"),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            video_watermark_timeout_secs: env_or(
                "VIDEO_WATERMARK_TIMEOUT_SECS",
                VIDEO_WATERMARK_TIMEOUT_SECS,
            ),
            keep_original_uploads: env_bool("KEEP_ORIGINAL_UPLOADS", false),
            archive_backend,
            github_token: env_non_empty("GITHUB_TOKEN"),
            github_repo: env_non_empty("GITHUB_REPO"),
            github_branch: env::var("GITHUB_BRANCH")
                .unwrap_or_else(|_| DEFAULT_GITHUB_BRANCH.to_string()),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            local_archive_path: env_non_empty("LOCAL_ARCHIVE_PATH"),
            local_archive_base_url: env_non_empty("LOCAL_ARCHIVE_BASE_URL"),
            archive_timeout_secs: env_or("ARCHIVE_TIMEOUT_SECS", ARCHIVE_TIMEOUT_SECS),
            archive_max_attempts: env_or("ARCHIVE_MAX_ATTEMPTS", ARCHIVE_MAX_ATTEMPTS),
            social_platforms,
            social_platform_token: env_non_empty("SOCIAL_PLATFORM_TOKEN"),
            social_timeout_secs: env_or("SOCIAL_TIMEOUT_SECS", SOCIAL_TIMEOUT_SECS),
            social_max_attempts: env_or("SOCIAL_MAX_ATTEMPTS", SOCIAL_MAX_ATTEMPTS),
            publish_max_workers: env_or("PUBLISH_MAX_WORKERS", PUBLISH_MAX_WORKERS),
            publish_timeout_secs: env_or("PUBLISH_TIMEOUT_SECS", PUBLISH_TIMEOUT_SECS),
            admin,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.base.database_url.starts_with("postgresql://")
            && !self.base.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.upload_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_DIR must not be empty"));
        }

        if self.archive_max_attempts == 0 || self.social_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "ARCHIVE_MAX_ATTEMPTS and SOCIAL_MAX_ATTEMPTS must be at least 1"
            ));
        }

        if self.publish_max_workers == 0 {
            return Err(anyhow::anyhow!("PUBLISH_MAX_WORKERS must be at least 1"));
        }

        match self.archive_backend {
            ArchiveBackend::Github => {
                if self.github_token.is_none() {
                    return Err(anyhow::anyhow!(
                        "GITHUB_TOKEN must be set when using the github archive backend"
                    ));
                }
                match self.github_repo.as_deref() {
                    Some(repo) if is_owner_slash_name(repo) => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "GITHUB_REPO must be set as owner/name when using the github archive backend"
                        ));
                    }
                }
            }
            ArchiveBackend::Local => {
                if self.local_archive_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_ARCHIVE_PATH must be set when using the local archive backend"
                    ));
                }
                if self.local_archive_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_ARCHIVE_BASE_URL must be set when using the local archive backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

fn is_owner_slash_name(repo: &str) -> bool {
    matches!(
        repo.split_once('/'),
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
    )
}
