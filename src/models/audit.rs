// src/models/audit.rs

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::common::request::RequestMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "auth_event_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventType {
    LoginSuccess,
    LoginFailed,
    Logout,
    SessionRevoked,
    SessionExpired,
    SessionIdleTimeout,
}

// Registro imutável de um evento de autenticação.
// Tudo opcional exceto o tipo: o logout, por exemplo, pode não saber o tenant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthEvent {
    pub event_type: AuthEventType,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub success: bool,
    pub message: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
    pub metadata: Value,
}

impl NewAuthEvent {
    pub fn new(event_type: AuthEventType, success: bool) -> Self {
        Self {
            event_type,
            tenant_id: None,
            user_id: None,
            success,
            message: None,
            ip: None,
            user_agent: None,
            host: None,
            metadata: Value::Null,
        }
    }

    pub fn tenant(mut self, tenant_id: Option<Uuid>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Copia ip, user-agent e host da requisição atual.
    pub fn client(mut self, meta: &RequestMeta) -> Self {
        self.ip = meta.ip.clone();
        self.user_agent = meta.user_agent.clone();
        self.host = meta.host.clone();
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// Auditoria de ações sobre recursos (ex: "patients.list").
// O ator é sempre um membership do tenant em que a ação aconteceu.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub actor_membership_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Value,
}

// O que o handler descreve; o EventLogger completa com o contexto.
// `tenant_id` só é usado para recusar escrita em outro tenant.
#[derive(Debug, Clone, Default)]
pub struct AuditAction {
    pub tenant_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub metadata: Value,
}
