use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{
    File, FileRow, FileSortBy, FileStatus, NewFile, OwnedFilesQuery, StatusSummary, UserSummary,
};

/// File registry: metadata, owner relation and whitelist
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert the file, its whitelist and (for owned files) a zeroed statistics row atomically
    ///
    /// A share token collision yields `Conflict`.
    async fn create(&self, new_file: &NewFile) -> Result<File>;

    async fn get_by_id(&self, id: Uuid) -> Result<File>;

    async fn get_by_share_token(&self, share_token: &str) -> Result<File>;

    /// One page of an owner's files plus the total matching the filter
    async fn get_by_owner(
        &self,
        owner_id: Uuid,
        query: &OwnedFilesQuery,
        now: DateTime<Utc>,
    ) -> Result<(Vec<File>, i64)>;

    async fn status_summary(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<StatusSummary>;

    /// Remove the metadata row; related rows cascade
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Files whose window closed before `now`
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<File>>;
}

const SELECT_FILE: &str = r#"
    SELECT f.id, f.share_token, f.file_name, f.storage_path, f.file_size, f.mime_type,
           f.owner_id, f.is_public, f.password_hash, f.available_from, f.available_to,
           f.created_at, u.username AS owner_username, u.email AS owner_email
    FROM files f
    LEFT JOIN users u ON u.id = f.owner_id
"#;

/// SQL predicate for a status, `$1` bound to the reference time
fn status_predicate(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "f.available_from IS NOT NULL AND f.available_from > $1",
        FileStatus::Expired => "f.available_to IS NOT NULL AND f.available_to < $1",
        FileStatus::Active => {
            "(f.available_from IS NULL OR f.available_from <= $1) \
             AND (f.available_to IS NULL OR f.available_to >= $1)"
        }
    }
}

fn order_clause(query: &OwnedFilesQuery) -> String {
    let direction = query.order.as_sql();
    match query.sort_by {
        FileSortBy::CreatedAt => format!("f.created_at {}, f.file_name ASC", direction),
        FileSortBy::FileName => format!("LOWER(f.file_name) {}, f.created_at DESC", direction),
    }
}

/// Mirror a token identity into `users` so foreign keys resolve
pub async fn upsert_user(tx: &mut Transaction<'_, Postgres>, user: &UserSummary) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET
            username = EXCLUDED.username,
            email = EXCLUDED.email,
            updated_at = NOW()
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert user {}: {:?}", user.id, e);
        AppError::Database(e)
    })?;

    Ok(())
}

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_shared_with(&self, file_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        if file_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT file_id, email FROM shared_with WHERE file_id = ANY($1) ORDER BY email",
        )
        .bind(file_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load whitelists: {:?}", e);
            AppError::Database(e)
        })?;

        let mut by_file: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (file_id, email) in rows {
            by_file.entry(file_id).or_default().push(email);
        }
        Ok(by_file)
    }

    async fn hydrate(&self, rows: Vec<FileRow>) -> Result<Vec<File>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut shared = self.load_shared_with(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let emails = shared.remove(&row.id).unwrap_or_default();
                File::from_row(row, emails)
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<FileRow>) -> Result<File> {
        let row = row.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
        let mut shared = self.load_shared_with(&[row.id]).await?;
        let emails = shared.remove(&row.id).unwrap_or_default();
        Ok(File::from_row(row, emails))
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, new_file: &NewFile) -> Result<File> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        if let Some(owner) = &new_file.owner {
            upsert_user(&mut tx, owner).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO files (
                id, share_token, file_name, storage_path, file_size, mime_type,
                owner_id, is_public, password_hash, available_from, available_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(new_file.id)
        .bind(&new_file.share_token)
        .bind(&new_file.file_name)
        .bind(&new_file.storage_path)
        .bind(new_file.file_size)
        .bind(&new_file.mime_type)
        .bind(new_file.owner.as_ref().map(|o| o.id))
        .bind(new_file.is_public)
        .bind(&new_file.password_hash)
        .bind(new_file.available_from)
        .bind(new_file.available_to)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Share token already in use".to_string())
            }
            e => {
                tracing::error!("Failed to insert file: {:?}", e);
                AppError::Database(e)
            }
        })?;

        if !new_file.shared_with.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO shared_with (file_id, email)
                SELECT $1, email FROM UNNEST($2::text[]) AS t(email)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(new_file.id)
            .bind(&new_file.shared_with)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert whitelist: {:?}", e);
                AppError::Database(e)
            })?;
        }

        if new_file.owner.is_some() {
            sqlx::query("INSERT INTO file_statistics (file_id) VALUES ($1)")
                .bind(new_file.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create file statistics: {:?}", e);
                    AppError::Database(e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit file creation: {:?}", e);
            AppError::Database(e)
        })?;

        self.get_by_id(new_file.id).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<File> {
        let sql = format!("{} WHERE f.id = $1", SELECT_FILE);
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch file {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        self.hydrate_one(row).await
    }

    async fn get_by_share_token(&self, share_token: &str) -> Result<File> {
        let sql = format!("{} WHERE f.share_token = $1", SELECT_FILE);
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(share_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch file by share token: {:?}", e);
                AppError::Database(e)
            })?;

        self.hydrate_one(row).await
    }

    async fn get_by_owner(
        &self,
        owner_id: Uuid,
        query: &OwnedFilesQuery,
        now: DateTime<Utc>,
    ) -> Result<(Vec<File>, i64)> {
        let filter = query
            .status
            .map(|s| format!(" AND {}", status_predicate(s)))
            .unwrap_or_default();

        let count_sql = format!("SELECT COUNT(*) FROM files f WHERE f.owner_id = $2{}", filter);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(now)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count owner files: {:?}", e);
                AppError::Database(e)
            })?;

        let list_sql = format!(
            "{} WHERE f.owner_id = $2{} ORDER BY {} LIMIT $3 OFFSET $4",
            SELECT_FILE,
            filter,
            order_clause(query)
        );
        let rows = sqlx::query_as::<_, FileRow>(&list_sql)
            .bind(now)
            .bind(owner_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list owner files: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((self.hydrate(rows).await?, total))
    }

    async fn status_summary(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<StatusSummary> {
        let sql = format!(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE {active}) AS active,
                   COUNT(*) FILTER (WHERE {pending}) AS pending,
                   COUNT(*) FILTER (WHERE {expired}) AS expired
            FROM files f
            WHERE f.owner_id = $2
            "#,
            active = status_predicate(FileStatus::Active),
            pending = status_predicate(FileStatus::Pending),
            expired = status_predicate(FileStatus::Expired),
        );

        sqlx::query_as::<_, StatusSummary>(&sql)
            .bind(now)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to summarize owner files: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete file {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<File>> {
        let sql = format!(
            "{} WHERE {} ORDER BY f.available_to ASC",
            SELECT_FILE,
            status_predicate(FileStatus::Expired)
        );

        let rows = sqlx::query_as::<_, FileRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list expired files: {:?}", e);
                AppError::Database(e)
            })?;

        self.hydrate(rows).await
    }
}
