// src/handlers/tenancy.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    services::tenancy_service::WorkspaceMatch,
};

// ---
// 1. "Payload" (O "Formulário" da API)
// ---
// Texto livre digitado no seletor de clínicas, com um palpite de slug opcional
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTenantPayload {
    #[serde(default)]
    #[validate(length(max = 80, message = "Query is too long"))]
    pub query: String,

    #[validate(length(max = 63, message = "Slug is too long"))]
    pub slug_guess: Option<String>,
}

// ---
// 2. O "Handler" (A Rota)
// ---
// POST /api/tenant/resolve (público: roda antes do login)
pub async fn resolve_tenant(
    State(app_state): State<AppState>,
    Json(payload): Json<ResolveTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let found = app_state
        .tenant_service
        .resolve_workspace(&payload.query, payload.slug_guess.as_deref())
        .await?;

    let body = match found {
        WorkspaceMatch::Single(option) => json!({
            "ok": true,
            "slug": option.slug,
            "name": option.name,
        }),
        WorkspaceMatch::Options(options) => json!({ "ok": true, "options": options }),
    };

    Ok(Json(body))
}
