// src/services/auth.rs

use std::sync::{Arc, LazyLock};

use bcrypt::verify;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::{
    common::{
        error::AppError,
        redirect::{sanitize_next, DEFAULT_AFTER_LOGIN},
        request::RequestMeta,
    },
    config::AuthConfig,
    db::Stores,
    models::{
        audit::{AuthEventType, NewAuthEvent},
        auth::{normalize_email, LoginUserPayload},
        session::{NewSession, SessionRecord},
        tenancy::Tenant,
    },
    services::{audit::EventLogger, tenant_resolver::TenantResolver, token::TokenCodec},
};

// Hash de referência para e-mails desconhecidos (calculado no primeiro uso)
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("dora-unknown-user", bcrypt::DEFAULT_COST).ok());

// Nunca autentica ninguém; só consome o tempo de uma verificação real.
fn verify_against_dummy(password: &str) -> bool {
    match DUMMY_HASH.as_deref() {
        Some(hash) => {
            let _ = verify(password, hash);
        }
        None => tracing::warn!("Hash de referência indisponível"),
    }
    false
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
    pub remember: bool,
    pub next: Option<String>,
}

impl From<LoginUserPayload> for LoginCommand {
    fn from(payload: LoginUserPayload) -> Self {
        Self {
            email: payload.email,
            password: payload.password,
            remember: payload.remember,
            next: payload.next,
        }
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    /// Token cru. Só vai para o cookie.
    pub token: String,
    pub session: SessionRecord,
    pub redirect_to: String,
    /// Quantas sessões anteriores do mesmo (usuário, tenant) foram revogadas.
    pub superseded: u64,
}

#[derive(Debug, Default)]
pub struct LogoutOutcome {
    /// `true` só se esta chamada revogou a sessão.
    pub revoked: bool,
    pub session: Option<SessionRecord>,
}

// Ciclo de vida da sessão: login (cria) e logout (revoga)
#[derive(Clone)]
pub struct AuthService {
    config: Arc<AuthConfig>,
    codec: TokenCodec,
    resolver: TenantResolver,
    stores: Stores,
    events: EventLogger,
}

impl AuthService {
    pub fn new(
        config: Arc<AuthConfig>,
        codec: TokenCodec,
        resolver: TenantResolver,
        stores: Stores,
        events: EventLogger,
    ) -> Self {
        Self {
            config,
            codec,
            resolver,
            stores,
            events,
        }
    }

    pub async fn login(
        &self,
        command: LoginCommand,
        meta: &RequestMeta,
    ) -> Result<LoginOutcome, AppError> {
        self.login_at(command, meta, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        command: LoginCommand,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AppError> {
        // 1. Campos obrigatórios
        let email = normalize_email(&command.email);
        if email.is_empty() || command.password.is_empty() {
            return Err(AppError::MissingCredentials);
        }

        // 2. Tenant da requisição
        let tenant = self.resolve_tenant(meta).await?;

        // 3. Usuário (mesma resposta para "não existe" e "inativo")
        let user = match self.stores.users.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                // Mesmo custo de bcrypt de um usuário real: o tempo de resposta
                // não revela quais e-mails existem
                let password_clone = command.password.clone();
                tokio::task::spawn_blocking(move || verify_against_dummy(&password_clone))
                    .await
                    .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?;

                self.login_failed(meta, &tenant, None, "Invalid credentials").await;
                return Err(AppError::InvalidCredentials);
            }
        };

        // 4. Senha. Executa a verificação em um thread separado
        let password_clone = command.password.clone();
        let password_hash_clone = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?;

        let is_password_valid = match verified {
            Ok(valid) => valid,
            Err(e) => {
                // Hash corrompido no banco: para o cliente é só credencial inválida
                tracing::warn!(user_id = %user.id, "Hash de senha ilegível: {:?}", e);
                false
            }
        };
        if !is_password_valid {
            self.login_failed(meta, &tenant, Some(user.id), "Invalid credentials")
                .await;
            return Err(AppError::InvalidCredentials);
        }

        // 5. Vínculo com o tenant
        match self.stores.tenants.find_membership(tenant.id, user.id).await? {
            Some(membership) if membership.is_active => {}
            _ => {
                self.login_failed(meta, &tenant, Some(user.id), "No access to tenant")
                    .await;
                return Err(AppError::NoTenantAccess);
            }
        }

        // 6 + 7. Sessão única: revoga as ativas e cria a nova na mesma unidade
        let token = self.codec.issue()?;
        let expires_at = now
            .checked_add_signed(self.config.lifetime(command.remember))
            .ok_or_else(|| anyhow::anyhow!("Prazo da sessão fora do intervalo de datas"))?;
        let new_session = NewSession {
            user_id: user.id,
            tenant_id: tenant.id,
            token_hash: self.codec.hash(&token),
            created_at: now,
            expires_at,
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
        };
        let (session, superseded) = self.stores.sessions.replace_active(&new_session).await?;

        if superseded > 0 {
            self.events
                .emit(
                    NewAuthEvent::new(AuthEventType::SessionRevoked, true)
                        .tenant(Some(tenant.id))
                        .user(Some(user.id))
                        .message("Previous sessions revoked by new login")
                        .client(meta)
                        .metadata(json!({ "count": superseded })),
                )
                .await;
        }

        // 8. Sucesso
        let redirect_to = sanitize_next(command.next.as_deref(), DEFAULT_AFTER_LOGIN);
        self.events
            .emit(
                NewAuthEvent::new(AuthEventType::LoginSuccess, true)
                    .tenant(Some(tenant.id))
                    .user(Some(user.id))
                    .message("Session created")
                    .client(meta)
                    .metadata(json!({
                        "remember": command.remember,
                        "expiresAt": expires_at,
                        "redirectTo": redirect_to,
                    })),
            )
            .await;

        tracing::info!(
            user_id = %user.id,
            tenant = %tenant.slug,
            superseded,
            "Login efetuado"
        );

        Ok(LoginOutcome {
            token,
            session,
            redirect_to,
            superseded,
        })
    }

    async fn resolve_tenant(&self, meta: &RequestMeta) -> Result<Tenant, AppError> {
        let Some(slug) = self.resolver.resolve_slug(meta) else {
            return Err(AppError::InvalidTenant);
        };
        match self.stores.tenants.find_by_slug(&slug).await? {
            Some(tenant) if tenant.is_active() => Ok(tenant),
            _ => Err(AppError::InvalidTenant),
        }
    }

    async fn login_failed(
        &self,
        meta: &RequestMeta,
        tenant: &Tenant,
        user_id: Option<uuid::Uuid>,
        message: &str,
    ) {
        tracing::info!(tenant = %tenant.slug, "Login recusado: {}", message);
        self.events
            .emit(
                NewAuthEvent::new(AuthEventType::LoginFailed, false)
                    .tenant(Some(tenant.id))
                    .user(user_id)
                    .message(message)
                    .client(meta),
            )
            .await;
    }

    pub async fn logout(&self, meta: &RequestMeta) -> Result<LogoutOutcome, AppError> {
        self.logout_at(meta, Utc::now()).await
    }

    /// Sempre "dá certo": sem cookie, ou com sessão já revogada, é no-op.
    pub async fn logout_at(
        &self,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<LogoutOutcome, AppError> {
        let Some(token) = meta.token.as_deref() else {
            tracing::debug!("Logout sem sessão");
            return Ok(LogoutOutcome::default());
        };

        let token_hash = self.codec.hash(token);
        // Lida antes de revogar, só para o trilho de auditoria
        let session = self.stores.sessions.find_by_hash(&token_hash).await?;
        let revoked = self.stores.sessions.revoke(&token_hash, now).await?;

        self.events
            .emit(
                NewAuthEvent::new(AuthEventType::Logout, true)
                    .tenant(session.as_ref().map(|s| s.tenant_id))
                    .user(session.as_ref().map(|s| s.user_id))
                    .message("Session revoked by user")
                    .client(meta)
                    .metadata(json!({ "alreadyRevoked": !revoked })),
            )
            .await;

        Ok(LogoutOutcome { revoked, session })
    }
}
