use lentolux_core::{
    models::{Content, ContentType, NewContent, PublishState},
    AppError,
};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const CONTENT_COLUMNS: &str = "id, user_id, content_type, media_type, title, description, \
    file_path, github_path, is_uploaded, upload_status, publish_state, version, created_at, updated_at";

const MAX_LIST_LIMIT: i64 = 200;

/// Clamp client-supplied pagination. Without a limit every row is returned.
fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (Option<i64>, i64) {
    let limit = limit.map(|l| l.clamp(1, MAX_LIST_LIMIT));
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Publish state a row settles in once a publish run has been recorded
pub fn settled_publish_state(any_success: bool) -> PublishState {
    if any_success {
        PublishState::Done
    } else {
        PublishState::Idle
    }
}

/// Repository for content rows
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, new_content), fields(db.table = "contents", db.operation = "insert", user_id = %new_content.user_id))]
    pub async fn create(&self, new_content: NewContent) -> Result<Content, AppError> {
        let content = sqlx::query_as::<Postgres, Content>(&format!(
            r#"
            INSERT INTO contents (id, user_id, content_type, media_type, title, description, file_path, github_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_content.user_id)
        .bind(new_content.content_type)
        .bind(new_content.media_type)
        .bind(&new_content.title)
        .bind(&new_content.description)
        .bind(&new_content.file_path)
        .bind(&new_content.github_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(content)
    }

    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        let content = sqlx::query_as::<Postgres, Content>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }

    /// List content newest first. `owner = None` lists every user's content.
    ///
    /// `limit` is optional; a NULL limit in Postgres means no limit.
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "select"))]
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        content_type: Option<ContentType>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Content>, AppError> {
        let (limit, offset) = page_bounds(limit, offset);

        let contents = sqlx::query_as::<Postgres, Content>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS} FROM contents
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::content_category IS NULL OR content_type = $2)
            ORDER BY created_at DESC, id
            LIMIT $3::bigint OFFSET $4
            "#
        ))
        .bind(owner)
        .bind(content_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(contents)
    }

    /// Delete a row. Returns false when it did not exist.
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim a row for social publishing.
    ///
    /// Succeeds only from `idle` on a row that is not uploaded yet, so two
    /// concurrent dispatches can never both win.
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "update", db.record_id = %id))]
    pub async fn claim_for_publish(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        let content = sqlx::query_as::<Postgres, Content>(&format!(
            r#"
            UPDATE contents
            SET publish_state = 'queued', version = version + 1, updated_at = NOW()
            WHERE id = $1 AND publish_state = 'idle' AND is_uploaded = FALSE
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }

    /// Move a claimed row to `publishing`
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "update", db.record_id = %id))]
    pub async fn mark_publishing(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET publish_state = 'publishing', version = version + 1, updated_at = NOW()
            WHERE id = $1 AND publish_state = 'queued'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Return a claimed row to `idle` without recording any outcome
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "update", db.record_id = %id))]
    pub async fn release_claim(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE contents
            SET publish_state = 'idle', version = version + 1, updated_at = NOW()
            WHERE id = $1 AND publish_state IN ('queued', 'publishing')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Return every claimed row to `idle`. Run at startup, before the queue
    /// takes jobs, so claims orphaned by a previous process can be retried.
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "update"))]
    pub async fn release_stale_claims(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET publish_state = 'idle', version = version + 1, updated_at = NOW()
            WHERE publish_state IN ('queued', 'publishing')
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Merge per-platform statuses into `upload_status`, guarded by the row version.
    ///
    /// Returns `None` when the version moved underneath the caller; the caller
    /// reloads and retries.
    #[tracing::instrument(skip(self, statuses), fields(db.table = "contents", db.operation = "update", db.record_id = %id))]
    pub async fn record_publish_result(
        &self,
        id: Uuid,
        expected_version: i32,
        statuses: &JsonValue,
        any_success: bool,
    ) -> Result<Option<Content>, AppError> {
        let content = sqlx::query_as::<Postgres, Content>(&format!(
            r#"
            UPDATE contents
            SET upload_status = upload_status || $3::jsonb,
                is_uploaded = is_uploaded OR $4,
                publish_state = $5,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected_version)
        .bind(statuses)
        .bind(any_success)
        .bind(settled_publish_state(any_success))
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (None, 0));
        assert_eq!(page_bounds(Some(0), Some(-5)), (Some(1), 0));
        assert_eq!(page_bounds(Some(10_000), Some(20)), (Some(MAX_LIST_LIMIT), 20));
    }

    #[test]
    fn test_settled_publish_state() {
        assert_eq!(settled_publish_state(true), PublishState::Done);
        assert_eq!(settled_publish_state(false), PublishState::Idle);
    }
}
