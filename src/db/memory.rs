// src/db/memory.rs
//
// Backend em memória dos stores. Usado nos testes e para rodar a API sem
// Postgres. Um único Mutex guarda tudo, então cada operação é atômica.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{EventStore, RbacStore, SessionStore, TenantStore, UserStore},
    models::{
        audit::{AuditEntry, NewAuthEvent},
        auth::{normalize_email, User},
        rbac::Role,
        session::{NewSession, SessionFilter, SessionRecord},
        tenancy::{MembershipCategory, Tenant, TenantMembership, TenantStatus},
    },
};

#[derive(Default)]
struct State {
    tenants: Vec<Tenant>,
    users: Vec<User>,
    memberships: Vec<TenantMembership>,
    roles: Vec<Role>,
    role_permissions: HashMap<Uuid, Vec<String>>,
    membership_roles: HashMap<Uuid, Vec<Uuid>>,
    sessions: Vec<SessionRecord>,
    auth_events: Vec<NewAuthEvent>,
    audit_entries: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_events: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---
    // Carga de dados
    // ---

    pub async fn add_tenant(&self, slug: &str, name: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            status: TenantStatus::Active,
            deleted_at: None,
            created_at: Utc::now(),
        };
        self.state.lock().await.tenants.push(tenant.clone());
        tenant
    }

    /// Grava o hash bcrypt da senha (custo mínimo, só para testes e dev).
    pub async fn add_user(&self, email: &str, password: &str) -> Result<User, AppError> {
        let password_hash = bcrypt::hash(password, 4)?;
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.lock().await.users.push(user.clone());
        Ok(user)
    }

    pub async fn add_membership(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        category: MembershipCategory,
    ) -> TenantMembership {
        let membership = TenantMembership {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            category,
            is_active: true,
        };
        self.state.lock().await.memberships.push(membership.clone());
        membership
    }

    pub async fn add_role(&self, tenant_id: Uuid, name: &str, permissions: &[&str]) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            description: None,
        };
        let mut state = self.state.lock().await;
        state.role_permissions.insert(
            role.id,
            permissions.iter().map(|p| p.to_string()).collect(),
        );
        state.roles.push(role.clone());
        role
    }

    pub async fn grant_role(&self, membership_id: Uuid, role_id: Uuid) {
        self.state
            .lock()
            .await
            .membership_roles
            .entry(membership_id)
            .or_default()
            .push(role_id);
    }

    pub async fn set_tenant_status(&self, tenant_id: Uuid, status: TenantStatus) {
        let mut state = self.state.lock().await;
        if let Some(tenant) = state.tenants.iter_mut().find(|t| t.id == tenant_id) {
            tenant.status = status;
            if status == TenantStatus::Deleted {
                tenant.deleted_at.get_or_insert_with(Utc::now);
            }
        }
    }

    pub async fn set_user_active(&self, user_id: Uuid, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.is_active = active;
        }
    }

    pub async fn set_membership_active(&self, membership_id: Uuid, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(m) = state.memberships.iter_mut().find(|m| m.id == membership_id) {
            m.is_active = active;
        }
    }

    /// Reescreve uma sessão direto (simula tempo passando nos testes).
    pub async fn update_session<F>(&self, session_id: Uuid, change: F)
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut state = self.state.lock().await;
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            change(session);
        }
    }

    /// Faz toda escrita de evento/auditoria falhar.
    pub fn set_event_failure(&self, fail: bool) {
        self.fail_events.store(fail, Ordering::SeqCst);
    }

    // ---
    // Inspeção
    // ---

    pub async fn sessions(&self) -> Vec<SessionRecord> {
        self.state.lock().await.sessions.clone()
    }

    pub async fn auth_events(&self) -> Vec<NewAuthEvent> {
        self.state.lock().await.auth_events.clone()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit_entries.clone()
    }

    fn events_unavailable(&self) -> Result<(), AppError> {
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow!(
                "event store indisponível"
            )));
        }
        Ok(())
    }
}

fn new_record(new: &NewSession) -> SessionRecord {
    SessionRecord {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        tenant_id: new.tenant_id,
        token_hash: new.token_hash.clone(),
        created_at: new.created_at,
        last_seen_at: Some(new.created_at),
        expires_at: new.expires_at,
        revoked_at: None,
        ip: new.ip.clone(),
        user_agent: new.user_agent.clone(),
    }
}

fn insert_session(state: &mut State, new: &NewSession) -> Result<SessionRecord, AppError> {
    // token_hash é UNIQUE, como no banco
    if state.sessions.iter().any(|s| s.token_hash == new.token_hash) {
        return Err(AppError::InternalServerError(anyhow!(
            "token_hash duplicado"
        )));
    }
    let record = new_record(new);
    state.sessions.push(record.clone());
    Ok(record)
}

fn revoke_active(state: &mut State, user_id: Uuid, tenant_id: Uuid, now: DateTime<Utc>) -> u64 {
    let mut count = 0;
    for session in state
        .sessions
        .iter_mut()
        .filter(|s| s.user_id == user_id && s.tenant_id == tenant_id)
        .filter(|s| s.is_active_at(now))
    {
        session.revoked_at = Some(now);
        count += 1;
    }
    count
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, new: &NewSession) -> Result<SessionRecord, AppError> {
        let mut state = self.state.lock().await;
        insert_session(&mut state, new)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn touch_last_seen(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if let Some(session) = state
            .sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && !s.is_revoked())
        {
            session.last_seen_at = Some(now);
        }
        Ok(())
    }

    async fn extend_expiry(
        &self,
        token_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if let Some(session) = state
            .sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && !s.is_revoked())
        {
            session.expires_at = session.expires_at.max(new_expires_at);
        }
        Ok(())
    }

    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state
            .sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && !s.is_revoked())
        {
            Some(session) => {
                session.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_active(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        Ok(revoke_active(&mut state, user_id, tenant_id, now))
    }

    async fn replace_active(&self, new: &NewSession) -> Result<(SessionRecord, u64), AppError> {
        let mut state = self.state.lock().await;
        let revoked = revoke_active(&mut state, new.user_id, new.tenant_id, new.created_at);
        let record = insert_session(&mut state, new)?;
        Ok((record, revoked))
    }

    async fn list_recent(
        &self,
        filter: SessionFilter,
        limit: i64,
    ) -> Result<Vec<SessionRecord>, AppError> {
        let state = self.state.lock().await;
        let mut sessions: Vec<SessionRecord> = state
            .sessions
            .iter()
            .filter(|s| s.tenant_id == filter.tenant_id)
            .filter(|s| filter.user_id.is_none_or(|user_id| s.user_id == user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(sessions)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let state = self.state.lock().await;
        Ok(state.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let state = self.state.lock().await;
        Ok(state.tenants.iter().find(|t| t.slug == slug).cloned())
    }

    async fn search_active_by_name(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Tenant>, AppError> {
        let needle = query.to_lowercase();
        let state = self.state.lock().await;
        let mut found: Vec<Tenant> = state
            .tenants
            .iter()
            .filter(|t| t.is_active() && t.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(found)
    }

    async fn find_membership(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TenantMembership>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .find(|m| m.tenant_id == tenant_id && m.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl RbacStore for MemoryStore {
    async fn roles_for_membership(&self, membership_id: Uuid) -> Result<Vec<Role>, AppError> {
        let state = self.state.lock().await;
        let granted: HashSet<Uuid> = state
            .membership_roles
            .get(&membership_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        Ok(state
            .roles
            .iter()
            .filter(|r| granted.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn permission_keys_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .role_permissions
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn record_auth_event(&self, event: &NewAuthEvent) -> Result<(), AppError> {
        self.events_unavailable()?;
        self.state.lock().await.auth_events.push(event.clone());
        Ok(())
    }

    async fn record_audit_entry(&self, entry: &AuditEntry) -> Result<(), AppError> {
        self.events_unavailable()?;
        self.state.lock().await.audit_entries.push(entry.clone());
        Ok(())
    }
}
