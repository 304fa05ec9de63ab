// src/handlers/auth.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    common::{
        cookie::{clear_session_cookie, session_cookie},
        error::AppError,
        redirect::LOGIN_PATH,
        request::RequestMeta,
    },
    config::AppState,
    middleware::auth::{CurrentAuth, MaybeAuth},
    models::{
        auth::{LoginUserPayload, RedirectResponse},
        session::{Authentication, SessionFilter},
    },
};

// Limite da tela "meus acessos"
const MY_SESSIONS_LIMIT: i64 = 25;

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    meta: RequestMeta,
    payload: Result<Json<LoginUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // Corpo ilegível (JSON inválido, content-type errado) também é "Missing credentials"
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!("Corpo de login rejeitado: {}", e);
        AppError::MissingCredentials
    })?;
    let payload = payload.normalized();
    // Campo vazio é sempre "Missing credentials", sem detalhar qual
    if let Err(e) = payload.validate() {
        tracing::debug!("Login com campos vazios: {}", e);
        return Err(AppError::MissingCredentials);
    }

    let outcome = app_state.auth_service.login(payload.into(), &meta).await?;

    let cookie = session_cookie(
        &app_state.config,
        &outcome.token,
        outcome.session.expires_at,
        Utc::now(),
    )
    .map_err(|e| anyhow::anyhow!("Cookie de sessão inválido: {}", e))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(RedirectResponse::to(outcome.redirect_to)),
    ))
}

// POST /api/auth/logout
// Sempre responde ok e apaga o cookie, exista sessão ou não.
pub async fn logout(
    State(app_state): State<AppState>,
    meta: RequestMeta,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.logout(&meta).await?;

    let cookie = clear_session_cookie(&app_state.config)
        .map_err(|e| anyhow::anyhow!("Cookie de logout inválido: {}", e))?;

    Ok(([(header::SET_COOKIE, cookie)], Json(RedirectResponse::to(LOGIN_PATH))))
}

// GET /api/auth/me
// Estado de autenticação para o cliente montar a interface.
pub async fn get_me(MaybeAuth(auth): MaybeAuth) -> impl IntoResponse {
    match auth {
        Authentication::Authenticated(ctx) => Json(json!({
            "ok": true,
            "authenticated": true,
            "userId": ctx.user_id,
            "tenantId": ctx.tenant_id,
            "membershipId": ctx.membership_id,
            "category": ctx.category,
            "permissions": ctx.sorted_permissions(),
        })),
        Authentication::Unauthenticated(reason) => Json(json!({
            "ok": true,
            "authenticated": false,
            "reason": reason,
        })),
    }
}

// GET /api/auth/me/sessions
pub async fn my_sessions(
    State(app_state): State<AppState>,
    CurrentAuth(ctx): CurrentAuth,
) -> Result<impl IntoResponse, AppError> {
    let sessions = app_state
        .stores
        .sessions
        .list_recent(
            SessionFilter {
                tenant_id: ctx.tenant_id,
                user_id: Some(ctx.user_id),
            },
            MY_SESSIONS_LIMIT,
        )
        .await?;

    Ok(Json(json!({ "ok": true, "sessions": sessions })))
}
