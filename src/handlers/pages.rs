// src/handlers/pages.rs

use axum::response::Html;

use crate::middleware::auth::CurrentAuth;

// GET /dashboard (atrás do page_guard)
pub async fn dashboard(CurrentAuth(ctx): CurrentAuth) -> Html<String> {
    Html(format!(
        "<!doctype html><title>Dashboard</title><main data-tenant=\"{}\" data-membership=\"{}\"></main>",
        ctx.tenant_id, ctx.membership_id
    ))
}
