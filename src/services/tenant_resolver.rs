// src/services/tenant_resolver.rs

use std::net::IpAddr;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::common::request::RequestMeta;

// Subdomínios operacionais da plataforma. Nunca são tenants.
pub const RESERVED_SUBDOMAINS: [&str; 5] = ["www", "app", "api", "admin", "static"];

pub fn is_reserved(label: &str) -> bool {
    RESERVED_SUBDOMAINS.contains(&label)
}

// Tira a porta (":3000") e deixa em minúsculas
fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) && !name.contains(':') =>
        {
            name.to_string()
        }
        _ => host,
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[') || host.parse::<IpAddr>().is_ok()
}

/// Extrai o slug do tenant a partir do cabeçalho `host`.
///
/// - `acme.localhost[:porta]` -> `acme` (convenção de dev)
/// - `acme.dominio.com`, `acme.preview.dominio.com` -> `acme`
/// - `localhost`, IPs e subdomínios reservados -> `None`
pub fn extract_subdomain(host: &str) -> Option<String> {
    let clean = normalize_host(host);
    if clean.is_empty() || is_ip_literal(&clean) {
        return None;
    }

    let labels: Vec<&str> = clean.split('.').filter(|l| !l.is_empty()).collect();

    let candidate = match labels.as_slice() {
        [sub, "localhost"] => *sub,
        [sub, _, _, ..] => *sub,
        _ => return None,
    };

    if is_reserved(candidate) {
        None
    } else {
        Some(candidate.to_string())
    }
}

// Decide qual tenant a requisição está mirando.
// Nunca adivinha: `None` significa "não dá para continuar".
#[derive(Debug, Clone)]
pub struct TenantResolver {
    allow_override_header: bool,
}

impl TenantResolver {
    pub fn new(allow_override_header: bool) -> Self {
        Self {
            allow_override_header,
        }
    }

    /// Só o subdomínio, sem fallback (usado na checagem de host da sessão).
    pub fn slug_from_host(&self, meta: &RequestMeta) -> Option<String> {
        meta.host.as_deref().and_then(extract_subdomain)
    }

    /// Subdomínio primeiro; depois o cabeçalho `x-tenant`, se permitido.
    pub fn resolve_slug(&self, meta: &RequestMeta) -> Option<String> {
        if let Some(slug) = self.slug_from_host(meta) {
            return Some(slug);
        }

        if !self.allow_override_header {
            return None;
        }

        meta.tenant_override
            .as_deref()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty() && !is_reserved(value))
    }
}

/// Converte um nome livre ("Clínica São José") num slug ("clinica-sao-jose").
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    // NFD separa a letra base do acento; a marca combinante é descartada
    let lowered = input.trim().to_lowercase();
    for ch in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
        }
        // qualquer outro caractere é descartado
    }

    slug
}
