use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::policy::models::SystemPolicy;

/// Storage for the singleton upload policy
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Current stored policy, `None` when nothing was ever written
    async fn get(&self) -> Result<Option<SystemPolicy>>;

    /// Replace the stored policy and return what was written
    async fn put(&self, policy: &SystemPolicy) -> Result<SystemPolicy>;
}

pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the default row if the table is empty
    pub async fn ensure_default(&self) -> Result<()> {
        let defaults = SystemPolicy::default();

        let inserted = sqlx::query(
            r#"
            INSERT INTO system_policy (
                id, max_file_size_mb, min_validity_hours, max_validity_days,
                default_validity_days, require_password_min_length
            )
            VALUES (1, $1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(defaults.max_file_size_mb)
        .bind(defaults.min_validity_hours)
        .bind(defaults.max_validity_days)
        .bind(defaults.default_validity_days)
        .bind(defaults.require_password_min_length)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to ensure default system policy: {:?}", e);
            AppError::Database(e)
        })?
        .rows_affected();

        if inserted > 0 {
            tracing::info!("Default system policy created");
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn get(&self) -> Result<Option<SystemPolicy>> {
        sqlx::query_as::<_, SystemPolicy>(
            r#"
            SELECT max_file_size_mb, min_validity_hours, max_validity_days,
                   default_validity_days, require_password_min_length, updated_at
            FROM system_policy
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read system policy: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn put(&self, policy: &SystemPolicy) -> Result<SystemPolicy> {
        sqlx::query_as::<_, SystemPolicy>(
            r#"
            INSERT INTO system_policy (
                id, max_file_size_mb, min_validity_hours, max_validity_days,
                default_validity_days, require_password_min_length, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE SET
                max_file_size_mb = EXCLUDED.max_file_size_mb,
                min_validity_hours = EXCLUDED.min_validity_hours,
                max_validity_days = EXCLUDED.max_validity_days,
                default_validity_days = EXCLUDED.default_validity_days,
                require_password_min_length = EXCLUDED.require_password_min_length,
                updated_at = NOW()
            RETURNING max_file_size_mb, min_validity_hours, max_validity_days,
                      default_validity_days, require_password_min_length, updated_at
            "#,
        )
        .bind(policy.max_file_size_mb)
        .bind(policy.min_validity_hours)
        .bind(policy.max_validity_days)
        .bind(policy.default_validity_days)
        .bind(policy.require_password_min_length)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update system policy: {:?}", e);
            AppError::Database(e)
        })
    }
}
