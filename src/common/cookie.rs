// src/common/cookie.rs

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use chrono::{DateTime, Utc};

use crate::config::AuthConfig;

// Formato exigido pelo atributo Expires (IMF-fixdate)
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Cookie httpOnly com o token cru. Expira junto com a sessão.
pub fn session_cookie(
    config: &AuthConfig,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = (expires_at - now).num_seconds().max(0);
    let mut cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={}; Max-Age={max_age}",
        config.cookie_name,
        expires_at.format(HTTP_DATE),
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Apaga o cookie no navegador, exista sessão ou não.
pub fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0",
        config.cookie_name
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
