use lentolux_core::{
    models::{NewUser, User},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, username, hashed_password, role, is_active, created_at, updated_at";

/// Maps a unique-constraint name from the users table to a client message.
fn duplicate_user_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("username") => "Username already taken",
        _ => "Email already registered",
    }
}

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Email and username collisions surface as `BadRequest`.
    #[tracing::instrument(skip(self, new_user), fields(db.table = "users", db.operation = "insert", user.email = %new_user.email))]
    pub async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            INSERT INTO users (id, email, username, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.hashed_password)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
                Ok(user)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::BadRequest(duplicate_user_message(db_err.constraint()).to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Whether either the email or the username is already in use
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn exists(&self, email: &str, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1) OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert the user unless the email or username is already taken.
    /// Returns `None` when nothing was inserted.
    #[tracing::instrument(skip(self, new_user), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create_if_absent(&self, new_user: NewUser) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            INSERT INTO users (id, email, username, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.hashed_password)
        .bind(new_user.role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
