// src/models/session.rs

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::tenancy::MembershipCategory;

// ---
// 1. Sessão persistida
// ---
// Nunca é apagada, só marcada como revogada. O token cru nunca chega aqui,
// apenas o hash dele.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,

    #[serde(skip_serializing)]
    pub token_hash: String,

    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl SessionRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Não revogada e ainda dentro do prazo absoluto.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }
}

// O que o login entrega ao store para criar uma sessão nova
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

// Filtro das listagens de sessões (tela de "últimos acessos" e admin)
#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
}

// ---
// 2. Motivos de falha da validação
// ---
// Exatamente um por chamada. Não são erros: são resultados esperados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    Missing,
    Invalid,
    Revoked,
    Expired,
    Idle,
    TenantInactive,
    HostMismatch,
    UserInactive,
    MembershipInactive,
}

/// Não autenticado (volta para o login) ou proibido (página de "sem acesso").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Unauthenticated,
    Forbidden,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::Missing => "missing",
            FailReason::Invalid => "invalid",
            FailReason::Revoked => "revoked",
            FailReason::Expired => "expired",
            FailReason::Idle => "idle",
            FailReason::TenantInactive => "tenant_inactive",
            FailReason::HostMismatch => "host_mismatch",
            FailReason::UserInactive => "user_inactive",
            FailReason::MembershipInactive => "membership_inactive",
        }
    }

    /// Logar de novo não resolve um membership inativo.
    pub fn class(&self) -> FailureClass {
        match self {
            FailReason::MembershipInactive => FailureClass::Forbidden,
            _ => FailureClass::Unauthenticated,
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---
// 3. Resumo mínimo (visão "status", usada pelos guards de rota)
// ---
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(session: &SessionRecord) -> Self {
        Self {
            user_id: session.user_id,
            tenant_id: session.tenant_id,
            expires_at: session.expires_at,
            last_seen_at: session.last_seen_at,
        }
    }
}

// ---
// 4. AuthContext (visão completa, usada pela autorização)
// ---
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub membership_id: Uuid,
    pub category: MembershipCategory,
    pub permissions: HashSet<String>,
}

impl AuthContext {
    pub fn is_superadmin(&self) -> bool {
        self.category == MembershipCategory::Superadmin
    }

    /// SUPERADMIN passa direto; os demais precisam da permissão explícita.
    pub fn can(&self, permission: &str) -> bool {
        self.is_superadmin() || self.permissions.contains(permission)
    }

    /// Permissões em ordem estável, para respostas JSON.
    pub fn sorted_permissions(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.permissions.iter().cloned().collect();
        keys.sort();
        keys
    }
}

/// Resultado da visão completa: ou há contexto, ou há um motivo.
#[derive(Debug, Clone)]
pub enum Authentication {
    Authenticated(AuthContext),
    Unauthenticated(FailReason),
}

/// Resultado da visão de status.
#[derive(Debug, Clone)]
pub enum AuthStatus {
    Active(SessionSummary),
    Rejected(FailReason),
}
