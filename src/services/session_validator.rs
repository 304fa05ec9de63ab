// src/services/session_validator.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::{
    common::{error::AppError, request::RequestMeta},
    config::AuthConfig,
    db::Stores,
    models::{
        audit::{AuthEventType, NewAuthEvent},
        auth::User,
        session::{AuthContext, AuthStatus, Authentication, FailReason, SessionRecord, SessionSummary},
        tenancy::{Tenant, TenantMembership},
    },
    services::{
        audit::EventLogger, permissions::PermissionResolver, tenant_resolver::TenantResolver,
        token::TokenCodec,
    },
};

/// Tudo o que uma validação bem-sucedida carrega.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub token_hash: String,
    pub session: SessionRecord,
    pub tenant: Tenant,
    pub user: User,
    pub membership: TenantMembership,
    /// Preenchido quando a renovação deslizante estendeu o prazo nesta chamada.
    pub renewed_until: Option<DateTime<Utc>>,
}

/// Resultado de uma validação: sessão válida ou exatamente um motivo.
pub type Verdict = Result<ValidatedSession, FailReason>;

// A máquina de estados da sessão. Falhas esperadas voltam como `FailReason`;
// só erro de infraestrutura (store fora do ar) sobe como `AppError`.
#[derive(Clone)]
pub struct SessionValidator {
    config: Arc<AuthConfig>,
    codec: TokenCodec,
    resolver: TenantResolver,
    stores: Stores,
    events: EventLogger,
    permissions: PermissionResolver,
}

impl SessionValidator {
    pub fn new(
        config: Arc<AuthConfig>,
        codec: TokenCodec,
        resolver: TenantResolver,
        stores: Stores,
        events: EventLogger,
        permissions: PermissionResolver,
    ) -> Self {
        Self {
            config,
            codec,
            resolver,
            stores,
            events,
            permissions,
        }
    }

    pub async fn validate(&self, meta: &RequestMeta) -> Result<Verdict, AppError> {
        self.validate_at(meta, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<Verdict, AppError> {
        // 1. Cookie
        let Some(token) = meta.token.as_deref() else {
            return Ok(Err(FailReason::Missing));
        };

        // 2. Sessão pelo hash
        let token_hash = self.codec.hash(token);
        let Some(mut session) = self.stores.sessions.find_by_hash(&token_hash).await? else {
            return Ok(Err(FailReason::Invalid));
        };

        // 3. Já revogada
        if session.is_revoked() {
            return Ok(Err(FailReason::Revoked));
        }

        // 4. Expiração absoluta (revoga: é uma ação de segurança)
        if session.is_expired_at(now) {
            self.stores.sessions.revoke(&token_hash, now).await?;
            self.events
                .emit(
                    NewAuthEvent::new(AuthEventType::SessionExpired, true)
                        .tenant(Some(session.tenant_id))
                        .user(Some(session.user_id))
                        .message("Session expired")
                        .client(meta)
                        .metadata(json!({ "expiresAt": session.expires_at })),
                )
                .await;
            tracing::info!(session_id = %session.id, "Sessão expirada revogada");
            return Ok(Err(FailReason::Expired));
        }

        // 5. Inatividade
        if let Some(last_seen) = session.last_seen_at {
            if now - last_seen > self.config.idle_limit {
                self.stores.sessions.revoke(&token_hash, now).await?;
                self.events
                    .emit(
                        NewAuthEvent::new(AuthEventType::SessionIdleTimeout, true)
                            .tenant(Some(session.tenant_id))
                            .user(Some(session.user_id))
                            .message("Session revoked due to inactivity")
                            .client(meta)
                            .metadata(json!({ "lastSeenAt": last_seen })),
                    )
                    .await;
                tracing::info!(session_id = %session.id, "Sessão inativa revogada");
                return Ok(Err(FailReason::Idle));
            }
        }

        // 6. Tenant (não revoga: o tenant pode voltar a ficar ativo)
        let Some(tenant) = self.stores.tenants.find_by_id(session.tenant_id).await? else {
            return Ok(Err(FailReason::Invalid));
        };
        if !tenant.is_active() {
            self.reject(
                meta,
                &session,
                "Tenant inactive",
                json!({ "status": tenant.status, "deletedAt": tenant.deleted_at }),
            )
            .await;
            return Ok(Err(FailReason::TenantInactive));
        }

        // 7. O host precisa apontar para o tenant da sessão (também não revoga)
        if !self.config.allow_host_bypass {
            let host_slug = self.resolver.slug_from_host(meta);
            if host_slug.as_deref() != Some(tenant.slug.as_str()) {
                self.reject(
                    meta,
                    &session,
                    "Host/tenant mismatch",
                    json!({ "host": meta.host, "expectedSlug": tenant.slug, "got": host_slug }),
                )
                .await;
                return Ok(Err(FailReason::HostMismatch));
            }
        }

        // 8. Usuário
        let user = match self.stores.users.find_by_id(session.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.reject(meta, &session, "User inactive", json!({})).await;
                return Ok(Err(FailReason::UserInactive));
            }
        };

        // 9. Membership
        let membership = match self.stores.tenants.find_membership(tenant.id, user.id).await? {
            Some(membership) if membership.is_active => membership,
            other => {
                self.reject(
                    meta,
                    &session,
                    "Membership inactive",
                    json!({
                        "membershipFound": other.is_some(),
                        "membershipActive": other.map(|m| m.is_active),
                    }),
                )
                .await;
                return Ok(Err(FailReason::MembershipInactive));
            }
        };

        // 10. Efeitos colaterais com throttle. Erros aqui só vão para o log.
        let stale = session
            .last_seen_at
            .is_none_or(|last_seen| now - last_seen > self.config.touch_interval);
        if stale {
            match self.stores.sessions.touch_last_seen(&token_hash, now).await {
                Ok(()) => session.last_seen_at = Some(now),
                Err(e) => tracing::warn!("Falha ao atualizar last_seen_at: {:?}", e),
            }
        }

        let renewed_until = self.renew(&token_hash, &mut session, now).await;

        // 11. Ok
        Ok(Ok(ValidatedSession {
            token_hash,
            session,
            tenant,
            user,
            membership,
            renewed_until,
        }))
    }

    // Renovação deslizante: só estende, nunca encurta
    async fn renew(
        &self,
        token_hash: &str,
        session: &mut SessionRecord,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let policy = self.config.renew?;
        if session.expires_at - now >= policy.threshold {
            return None;
        }

        let new_expiry = now.checked_add_signed(policy.window)?;
        if new_expiry <= session.expires_at {
            return None;
        }

        match self.stores.sessions.extend_expiry(token_hash, new_expiry).await {
            Ok(()) => {
                session.expires_at = new_expiry;
                Some(new_expiry)
            }
            Err(e) => {
                tracing::warn!("Falha ao renovar sessão: {:?}", e);
                None
            }
        }
    }

    async fn reject(
        &self,
        meta: &RequestMeta,
        session: &SessionRecord,
        message: &str,
        metadata: serde_json::Value,
    ) {
        self.events
            .emit(
                NewAuthEvent::new(AuthEventType::LoginFailed, false)
                    .tenant(Some(session.tenant_id))
                    .user(Some(session.user_id))
                    .message(message)
                    .client(meta)
                    .metadata(metadata),
            )
            .await;
    }

    // ---
    // Visões públicas
    // ---

    /// Visão de status: só o suficiente para decidir um redirect.
    pub fn status_of(verdict: &Verdict) -> AuthStatus {
        match verdict {
            Ok(valid) => AuthStatus::Active(SessionSummary::from(&valid.session)),
            Err(reason) => AuthStatus::Rejected(*reason),
        }
    }

    pub async fn status(&self, meta: &RequestMeta) -> Result<AuthStatus, AppError> {
        let verdict = self.validate(meta).await?;
        Ok(Self::status_of(&verdict))
    }

    /// Visão completa: resolve as permissões do membership.
    pub async fn context_for(&self, verdict: &Verdict) -> Result<Authentication, AppError> {
        let valid = match verdict {
            Ok(valid) => valid,
            Err(reason) => return Ok(Authentication::Unauthenticated(*reason)),
        };

        let permissions = self.permissions.resolve(valid.membership.id).await?;

        Ok(Authentication::Authenticated(AuthContext {
            user_id: valid.user.id,
            tenant_id: valid.tenant.id,
            membership_id: valid.membership.id,
            category: valid.membership.category,
            permissions,
        }))
    }

    pub async fn context(&self, meta: &RequestMeta) -> Result<Authentication, AppError> {
        let verdict = self.validate(meta).await?;
        self.context_for(&verdict).await
    }
}
