// src/config.rs

use std::{env, sync::Arc};

use anyhow::{bail, Context};
use chrono::Duration;

use crate::{
    db::Stores,
    services::{
        audit::EventLogger,
        auth::AuthService,
        permissions::PermissionResolver,
        session_validator::SessionValidator,
        tenancy_service::TenantService,
        tenant_resolver::TenantResolver,
        token::TokenCodec,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

// Renovação deslizante: quando falta menos que `threshold` para expirar,
// a sessão passa a expirar em `now + window` (nunca encurta).
#[derive(Debug, Clone, Copy)]
pub struct RenewPolicy {
    pub threshold: Duration,
    pub window: Duration,
}

// Configuração do núcleo de autenticação (vem das variáveis de ambiente)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub env: AppEnv,
    pub cookie_name: String,
    pub token_pepper: String,
    pub session_ttl: Duration,
    pub remember_ttl: Duration,
    pub idle_limit: Duration,
    pub touch_interval: Duration,
    pub renew: Option<RenewPolicy>,
    pub allow_host_bypass: bool,
    pub allow_tenant_header: bool,
}

const DEV_PEPPER: &str = "dev-pepper";

impl AuthConfig {
    /// Valores padrão de desenvolvimento (também usados pelos testes).
    pub fn development() -> Self {
        Self {
            env: AppEnv::Development,
            cookie_name: "dora_session".to_string(),
            token_pepper: DEV_PEPPER.to_string(),
            session_ttl: Duration::days(1),
            remember_ttl: Duration::days(30),
            idle_limit: Duration::minutes(30),
            touch_interval: Duration::minutes(10),
            renew: None,
            allow_host_bypass: false,
            allow_tenant_header: true,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de busca (testável sem mexer no ambiente).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let env = match get("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => AppEnv::Development,
            Some("production") | Some("prod") => AppEnv::Production,
            Some(other) => bail!("APP_ENV inválido: {other}"),
        };
        let is_dev = env == AppEnv::Development;

        let token_pepper = match get("AUTH_TOKEN_PEPPER") {
            Some(pepper) => pepper,
            None if is_dev => DEV_PEPPER.to_string(),
            None => bail!("AUTH_TOKEN_PEPPER deve ser definido em produção"),
        };
        if !is_dev && token_pepper == DEV_PEPPER {
            bail!("AUTH_TOKEN_PEPPER não pode usar o valor de desenvolvimento em produção");
        }

        let session_ttl = parse_duration(&get, "AUTH_SESSION_DAYS", 1, MAX_DAYS, Duration::try_days)?;
        let remember_ttl =
            parse_duration(&get, "AUTH_REMEMBER_DAYS", 30, MAX_DAYS, Duration::try_days)?;
        let idle_limit =
            parse_duration(&get, "AUTH_IDLE_MINUTES", 30, MAX_MINUTES, Duration::try_minutes)?;
        let touch_interval =
            parse_duration(&get, "AUTH_TOUCH_MINUTES", 10, MAX_MINUTES, Duration::try_minutes)?;

        let renew = match get("AUTH_RENEW_THRESHOLD_HOURS") {
            Some(raw) => {
                let hours = parse_bounded("AUTH_RENEW_THRESHOLD_HOURS", &raw, MAX_HOURS)?;
                Some(RenewPolicy {
                    threshold: to_duration("AUTH_RENEW_THRESHOLD_HOURS", hours, Duration::try_hours)?,
                    window: session_ttl,
                })
            }
            None => None,
        };

        // Bypass de host só existe em desenvolvimento, mesmo se a flag vier ligada
        let bypass_flag = parse_bool(&get, "AUTH_ALLOW_HOST_BYPASS", false)?;
        if bypass_flag && !is_dev {
            tracing::warn!("AUTH_ALLOW_HOST_BYPASS ignorado fora de desenvolvimento");
        }

        Ok(Self {
            env,
            cookie_name: get("AUTH_COOKIE_NAME").unwrap_or_else(|| "dora_session".to_string()),
            token_pepper,
            session_ttl,
            remember_ttl,
            idle_limit,
            touch_interval,
            renew,
            allow_host_bypass: bypass_flag && is_dev,
            allow_tenant_header: parse_bool(&get, "AUTH_ALLOW_TENANT_HEADER", is_dev)?,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.env == AppEnv::Production
    }

    pub fn lifetime(&self, remember: bool) -> Duration {
        if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        }
    }
}

// Limites dos prazos configuráveis (10 anos / 1 semana)
const MAX_DAYS: i64 = 3650;
const MAX_HOURS: i64 = MAX_DAYS * 24;
const MAX_MINUTES: i64 = 7 * 24 * 60;

fn parse_duration<G>(
    get: &G,
    key: &str,
    default: i64,
    max: i64,
    unit: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let value = match get(key) {
        None => default,
        Some(raw) => parse_bounded(key, &raw, max)?,
    };
    to_duration(key, value, unit)
}

fn parse_bounded(key: &str, raw: &str, max: i64) -> anyhow::Result<i64> {
    let value: i64 = raw
        .parse()
        .with_context(|| format!("{key} deve ser um número inteiro, veio: {raw}"))?;
    if value <= 0 || value > max {
        bail!("{key} deve estar entre 1 e {max}, veio: {value}");
    }
    Ok(value)
}

fn to_duration(key: &str, value: i64, unit: fn(i64) -> Option<Duration>) -> anyhow::Result<Duration> {
    unit(value).with_context(|| format!("{key} fora do intervalo suportado: {value}"))
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> anyhow::Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).as_deref() {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => bail!("{key} deve ser true/false, veio: {other}"),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub stores: Stores,
    pub auth_service: AuthService,
    pub validator: SessionValidator,
    pub tenant_service: TenantService,
    pub events: EventLogger,
}

impl AppState {
    // --- Monta o gráfico de dependências ---
    pub fn new(config: AuthConfig, stores: Stores) -> Self {
        let config = Arc::new(config);

        let codec = TokenCodec::new(config.token_pepper.clone());
        let resolver = TenantResolver::new(config.allow_tenant_header);
        let events = EventLogger::new(stores.events.clone());
        let permissions = PermissionResolver::new(stores.rbac.clone());

        let validator = SessionValidator::new(
            config.clone(),
            codec.clone(),
            resolver.clone(),
            stores.clone(),
            events.clone(),
            permissions,
        );
        let auth_service = AuthService::new(
            config.clone(),
            codec,
            resolver,
            stores.clone(),
            events.clone(),
        );
        let tenant_service = TenantService::new(stores.tenants.clone());

        Self {
            config,
            stores,
            auth_service,
            validator,
            tenant_service,
            events,
        }
    }
}
