// src/common/request.rs

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::config::AppState;

// Cabeçalho de override do tenant (só confiável em dev / proxies internos)
pub const TENANT_OVERRIDE_HEADER: &str = "x-tenant";

// Tudo o que o núcleo de auth precisa saber da requisição.
// Montado uma vez por requisição e passado adiante; nada daqui é global.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub token: Option<String>,
    pub host: Option<String>,
    pub tenant_override: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        Self {
            token: extract_cookie(headers, cookie_name),
            host: header_str(headers, header::HOST.as_str()),
            tenant_override: header_str(headers, TENANT_OVERRIDE_HEADER),
            ip: extract_client_ip(headers),
            user_agent: header_str(headers, header::USER_AGENT.as_str()),
        }
    }
}

// Extrator: qualquer handler pode pedir `RequestMeta` diretamente
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(RequestMeta::from_headers(
            &parts.headers,
            &app_state.config.cookie_name,
        ))
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Lê o valor de um cookie específico do cabeçalho `Cookie`.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        let Ok(value) = header_value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                let val = val.trim();
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// IP do cliente: primeiro item do `x-forwarded-for`, senão `x-real-ip`.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }
    header_str(headers, "x-real-ip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; dora_session=abc123; lang=pt"),
        );
        assert_eq!(extract_cookie(&headers, "dora_session").as_deref(), Some("abc123"));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("dora_session="));
        assert_eq!(extract_cookie(&headers, "dora_session"), None);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 172.16.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("10.0.0.1"));

        headers.remove("x-forwarded-for");
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("192.168.0.9"));
    }

    #[test]
    fn meta_collects_host_override_and_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("acme.localhost:3000"));
        headers.insert(TENANT_OVERRIDE_HEADER, HeaderValue::from_static("Acme"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let meta = RequestMeta::from_headers(&headers, "dora_session");
        assert_eq!(meta.host.as_deref(), Some("acme.localhost:3000"));
        assert_eq!(meta.tenant_override.as_deref(), Some("Acme"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert!(meta.token.is_none());
    }
}
