// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Status do Tenant (a "Clínica")
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

// ---
// 2. Tenant
// ---
// Um espaço de trabalho isolado, identificado pelo subdomínio (slug).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub status: TenantStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Só tenants ACTIVE e não apagados aceitam sessões.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none() && self.status == TenantStatus::Active
    }
}

// ---
// 3. Categoria do membro dentro da clínica
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipCategory {
    Superadmin,
    Admin,
    User,
    Professional,
}

// ---
// 4. TenantMembership (a "Ponte" Usuário-Tenant)
// ---
// (tenant_id, user_id) é único.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantMembership {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub category: MembershipCategory,
    pub is_active: bool,
}

// Uma opção no seletor de clínicas (antes do login)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOption {
    pub slug: String,
    pub name: String,
    pub status: TenantStatus,
}

impl From<&Tenant> for TenantOption {
    fn from(tenant: &Tenant) -> Self {
        Self {
            slug: tenant.slug.clone(),
            name: tenant.name.clone(),
            status: tenant.status,
        }
    }
}
