// src/db/rbac_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::RbacStore, models::rbac::Role};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RbacStore for RbacRepository {
    // 1. Cargos atribuídos ao membership
    async fn roles_for_membership(&self, membership_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.tenant_id, r.name, r.description
            FROM roles r
            INNER JOIN membership_roles mr ON mr.role_id = r.id
            WHERE mr.membership_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(membership_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    // 2. Chaves de permissão de um cargo ("patients.read", ...)
    async fn permission_keys_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.key
            FROM permissions p
            INNER JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.key
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }
}
