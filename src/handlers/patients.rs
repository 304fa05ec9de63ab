// src/handlers/patients.rs

use axum::{
    extract::State,
    http::{Method, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    common::request::RequestMeta,
    config::AppState,
    middleware::rbac::{PermPatientsRead, RequirePermission},
    models::audit::AuditAction,
};

// GET /api/patients
// A listagem em si ainda não existe; a rota já exige a permissão e audita.
pub async fn list_patients(
    State(app_state): State<AppState>,
    RequirePermission(ctx, _): RequirePermission<PermPatientsRead>,
    meta: RequestMeta,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    app_state
        .events
        .audit(
            &ctx,
            &meta,
            AuditAction {
                action: "patients.list".into(),
                resource_type: "patient".into(),
                success: true,
                method: Some(method.to_string()),
                path: Some(uri.path().to_string()),
                ..Default::default()
            },
        )
        .await;

    Json(json!({ "ok": true, "items": [] }))
}
