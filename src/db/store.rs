// src/db/store.rs
//
// Contratos de acesso a dados do núcleo de auth. Existem duas
// implementações: Postgres (os *Repository) e memória (MemoryStore).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        audit::{AuditEntry, NewAuthEvent},
        auth::User,
        rbac::Role,
        session::{NewSession, SessionFilter, SessionRecord},
        tenancy::{Tenant, TenantMembership},
    },
};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, new: &NewSession) -> Result<SessionRecord, AppError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError>;

    /// Idempotente; não mexe em sessões revogadas.
    async fn touch_last_seen(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError>;

    /// Nunca encurta: fica o maior entre o prazo atual e `new_expires_at`.
    async fn extend_expiry(
        &self,
        token_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Idempotente. Devolve `true` só se esta chamada revogou a sessão.
    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Revoga todas as sessões ativas (não revogadas, não expiradas) do par.
    async fn revoke_all_active(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// `revoke_all_active` + `create` numa única unidade atômica.
    /// Devolve a sessão nova e quantas foram revogadas.
    async fn replace_active(&self, new: &NewSession) -> Result<(SessionRecord, u64), AppError>;

    /// Mais recentes primeiro.
    async fn list_recent(
        &self,
        filter: SessionFilter,
        limit: i64,
    ) -> Result<Vec<SessionRecord>, AppError>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError>;

    /// Busca "suave" por nome (contém, sem diferenciar maiúsculas), só tenants ativos.
    async fn search_active_by_name(&self, query: &str, limit: i64)
        -> Result<Vec<Tenant>, AppError>;

    async fn find_membership(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TenantMembership>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `email` já deve vir normalizado.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn roles_for_membership(&self, membership_id: Uuid) -> Result<Vec<Role>, AppError>;

    async fn permission_keys_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record_auth_event(&self, event: &NewAuthEvent) -> Result<(), AppError>;

    async fn record_audit_entry(&self, entry: &AuditEntry) -> Result<(), AppError>;
}
