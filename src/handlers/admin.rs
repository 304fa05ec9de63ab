// src/handlers/admin.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::RequireSuperadmin,
    models::session::SessionFilter,
};

const ADMIN_SESSIONS_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSessionsQuery {
    pub user_id: Option<Uuid>,
}

// GET /api/admin/sessions?userId=
// Sessões do tenant atual (nunca de outro tenant).
pub async fn list_sessions(
    State(app_state): State<AppState>,
    RequireSuperadmin(ctx): RequireSuperadmin,
    Query(query): Query<AdminSessionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = app_state
        .stores
        .sessions
        .list_recent(
            SessionFilter {
                tenant_id: ctx.tenant_id,
                user_id: query.user_id,
            },
            ADMIN_SESSIONS_LIMIT,
        )
        .await?;

    Ok(Json(json!({ "ok": true, "sessions": sessions })))
}
