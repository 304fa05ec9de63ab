// src/models/rbac.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// O que sai do banco (Tabela roles)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}
