// src/common/redirect.rs

use url::form_urlencoded;

use crate::models::session::{FailReason, FailureClass};

pub const DEFAULT_AFTER_LOGIN: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";
pub const NO_ACCESS_PATH: &str = "/no-access";

/// Aceita só caminhos internos relativos ("/algo"). Qualquer outra coisa
/// cai no `fallback`.
///
/// Não trata path traversal ("/a/../../etc" passa): quem resolve isso é o
/// roteador, não o login.
pub fn sanitize_next(next: Option<&str>, fallback: &str) -> String {
    let Some(candidate) = next.map(str::trim) else {
        return fallback.to_string();
    };

    let is_internal = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.contains("://")
        && !candidate.contains('\\');

    if is_internal {
        candidate.to_string()
    } else {
        fallback.to_string()
    }
}

/// Para onde mandar quem falhou na validação da sessão.
pub fn redirect_for(reason: FailReason, next: Option<&str>) -> String {
    match reason.class() {
        FailureClass::Forbidden => NO_ACCESS_PATH.to_string(),
        FailureClass::Unauthenticated => {
            let mut query = form_urlencoded::Serializer::new(String::new());
            query.append_pair("reason", reason.as_str());
            if let Some(next) = next {
                query.append_pair("next", next);
            }
            format!("{LOGIN_PATH}?{}", query.finish())
        }
    }
}
