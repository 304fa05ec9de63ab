// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::store::EventStore,
    models::audit::{AuditEntry, NewAuthEvent},
};

// Só faz INSERT: eventos e auditoria são imutáveis
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for AuditRepository {
    async fn record_auth_event(&self, event: &NewAuthEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auth_events (
                event_type, tenant_id, user_id, success, message,
                ip, user_agent, host, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.event_type)
        .bind(event.tenant_id)
        .bind(event.user_id)
        .bind(event.success)
        .bind(event.message.as_deref())
        .bind(event.ip.as_deref())
        .bind(event.user_agent.as_deref())
        .bind(event.host.as_deref())
        .bind(sqlx::types::Json(&event.metadata))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_audit_entry(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                tenant_id, actor_membership_id, action, resource_type, resource_id,
                success, message, method, path, ip, user_agent, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.tenant_id)
        .bind(entry.actor_membership_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id.as_deref())
        .bind(entry.success)
        .bind(entry.message.as_deref())
        .bind(entry.method.as_deref())
        .bind(entry.path.as_deref())
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .bind(sqlx::types::Json(&entry.metadata))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
