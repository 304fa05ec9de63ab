// src/services/audit.rs

use std::sync::Arc;

use crate::{
    common::request::RequestMeta,
    db::store::EventStore,
    models::{
        audit::{AuditAction, AuditEntry, NewAuthEvent},
        session::AuthContext,
    },
};

// Canal lateral de eventos. Todo erro de escrita morre aqui (com um warn):
// auditoria nunca derruba uma decisão de autenticação.
#[derive(Clone)]
pub struct EventLogger {
    store: Arc<dyn EventStore>,
}

impl EventLogger {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn emit(&self, event: NewAuthEvent) {
        if let Err(e) = self.store.record_auth_event(&event).await {
            tracing::warn!(
                event_type = ?event.event_type,
                "Falha ao gravar evento de autenticação: {:?}",
                e
            );
        }
    }

    /// Grava a ação no log de auditoria do tenant do contexto.
    /// Escrita para outro tenant é ignorada.
    pub async fn audit(&self, ctx: &AuthContext, meta: &RequestMeta, action: AuditAction) {
        if let Some(target) = action.tenant_id {
            if target != ctx.tenant_id {
                tracing::warn!(
                    action = %action.action,
                    "Auditoria ignorada: tenant diferente do contexto"
                );
                return;
            }
        }

        let entry = AuditEntry {
            tenant_id: ctx.tenant_id,
            actor_membership_id: ctx.membership_id,
            action: action.action,
            resource_type: action.resource_type,
            resource_id: action.resource_id,
            success: action.success,
            message: action.message,
            method: action.method,
            path: action.path,
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            metadata: action.metadata,
        };

        if let Err(e) = self.store.record_audit_entry(&entry).await {
            tracing::warn!(action = %entry.action, "Falha ao gravar auditoria: {:?}", e);
        }
    }
}
