// src/middleware/auth.rs

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use crate::{
    common::{cookie::session_cookie, error::AppError, redirect::redirect_for, request::RequestMeta},
    config::AppState,
    models::session::{AuthContext, Authentication},
    services::session_validator::{ValidatedSession, Verdict},
};

// ---
// Memoização por requisição
// ---
// O primeiro extractor que precisa do veredito calcula e guarda nos
// "extensions" da requisição. Nada sobrevive à requisição.

#[derive(Clone)]
struct MemoVerdict(Verdict);

#[derive(Clone)]
struct MemoContext(Authentication);

/// Valida a sessão uma única vez por requisição.
pub async fn verdict_for(parts: &mut Parts, state: &AppState) -> Result<Verdict, AppError> {
    if let Some(MemoVerdict(verdict)) = parts.extensions.get::<MemoVerdict>() {
        return Ok(verdict.clone());
    }

    let meta = RequestMeta::from_headers(&parts.headers, &state.config.cookie_name);
    let verdict = state.validator.validate(&meta).await?;

    if let (Ok(valid), Some(token)) = (&verdict, meta.token) {
        if let Some(refresh) = parts.extensions.get::<CookieRefresh>() {
            refresh.offer(valid, token);
        }
    }

    parts.extensions.insert(MemoVerdict(verdict.clone()));
    Ok(verdict)
}

/// Visão completa (com permissões), também memoizada.
pub async fn authentication_for(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Authentication, AppError> {
    if let Some(MemoContext(auth)) = parts.extensions.get::<MemoContext>() {
        return Ok(auth.clone());
    }

    let verdict = verdict_for(parts, state).await?;
    let auth = state.validator.context_for(&verdict).await?;

    parts.extensions.insert(MemoContext(auth.clone()));
    Ok(auth)
}

// ---
// Extractors
// ---

/// Exige sessão válida. 401 com o motivo, ou 403 se o membership está inativo.
pub struct CurrentAuth(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match authentication_for(parts, &app_state).await? {
            Authentication::Authenticated(ctx) => Ok(CurrentAuth(ctx)),
            Authentication::Unauthenticated(reason) => Err(reason.into()),
        }
    }
}

/// Nunca rejeita por falta de sessão; o handler decide o que fazer.
pub struct MaybeAuth(pub Authentication);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(MaybeAuth(authentication_for(parts, &app_state).await?))
    }
}

// ---
// Renovação do cookie
// ---
// Quando a renovação deslizante estende a sessão, o cookie precisa acompanhar
// o novo prazo. O validador não enxerga a resposta, então deixa a oferta
// aqui e o middleware `refresh_session_cookie` escreve o Set-Cookie.

#[derive(Clone, Default)]
pub struct CookieRefresh(Arc<Mutex<Option<(String, DateTime<Utc>)>>>);

impl CookieRefresh {
    fn offer(&self, valid: &ValidatedSession, token: String) {
        let Some(expires_at) = valid.renewed_until else {
            return;
        };
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some((token, expires_at));
        }
    }

    fn take(&self) -> Option<(String, DateTime<Utc>)> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

pub async fn refresh_session_cookie(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let refresh = CookieRefresh::default();
    request.extensions_mut().insert(refresh.clone());

    let mut response = next.run(request).await;

    if let Some((token, expires_at)) = refresh.take() {
        match session_cookie(&app_state.config, &token, expires_at, Utc::now()) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => tracing::warn!("Falha ao montar cookie renovado: {:?}", e),
        }
    }

    response
}

// ---
// Guard de páginas
// ---

/// Páginas protegidas: sem sessão vai para o login (com motivo e `next`),
/// membership inativo vai para a página de "sem acesso".
pub async fn page_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let verdict = verdict_for(&mut parts, &app_state).await?;

    if let Err(reason) = verdict {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string());
        tracing::debug!(%reason, "Página protegida sem sessão válida");
        return Ok(Redirect::to(&redirect_for(reason, target.as_deref())).into_response());
    }

    Ok(next.run(axum::http::Request::from_parts(parts, body)).await)
}
