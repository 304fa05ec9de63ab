// src/db/session_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::SessionStore,
    models::session::{NewSession, SessionFilter, SessionRecord},
};

const SESSION_COLUMNS: &str = r#"
    id, user_id, tenant_id, token_hash, created_at, last_seen_at,
    expires_at, revoked_at, ip, user_agent
"#;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // INSERT aceita um executor (pool ou transação)
    async fn insert<'e, E>(&self, executor: E, new: &NewSession) -> Result<SessionRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO sessions (
                user_id, tenant_id, token_hash, created_at, last_seen_at,
                expires_at, ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7)
            RETURNING {SESSION_COLUMNS}
            "#
        );

        let session = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(new.user_id)
            .bind(new.tenant_id)
            .bind(&new.token_hash)
            .bind(new.created_at)
            .bind(new.expires_at)
            .bind(new.ip.as_deref())
            .bind(new.user_agent.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(session)
    }

    async fn revoke_active<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = $3
            WHERE user_id = $1
              AND tenant_id = $2
              AND revoked_at IS NULL
              AND expires_at > $3
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, new: &NewSession) -> Result<SessionRecord, AppError> {
        self.insert(&self.pool, new).await
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = $1");

        let session = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn touch_last_seen(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET last_seen_at = $2
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn extend_expiry(
        &self,
        token_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET expires_at = GREATEST(expires_at, $2)
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(new_expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = $2
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_active(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.revoke_active(&self.pool, user_id, tenant_id, now).await
    }

    async fn replace_active(&self, new: &NewSession) -> Result<(SessionRecord, u64), AppError> {
        // Inicia a transação
        let mut tx = self.pool.begin().await?;

        // Trava o membership: dois logins simultâneos do mesmo par viram fila
        sqlx::query(
            r#"
            SELECT id FROM tenant_memberships
            WHERE tenant_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let revoked = self
            .revoke_active(&mut *tx, new.user_id, new.tenant_id, new.created_at)
            .await?;
        let session = self.insert(&mut *tx, new).await?;

        // Commit
        tx.commit().await?;

        Ok((session, revoked))
    }

    async fn list_recent(
        &self,
        filter: SessionFilter,
        limit: i64,
    ) -> Result<Vec<SessionRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#
        );

        let sessions = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(filter.tenant_id)
            .bind(filter.user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }
}
