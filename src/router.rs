// src/router.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::{config::AppState, handlers, middleware::auth::{page_guard, refresh_session_cookie}};

pub fn build_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::get_me))
        .route("/me/sessions", get(handlers::auth::my_sessions));

    let admin_routes = Router::new().route("/sessions", get(handlers::admin::list_sessions));

    // Páginas protegidas: redirecionam em vez de responder 401/403
    let page_routes = Router::new()
        .route("/dashboard", get(handlers::pages::dashboard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            page_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/tenant/resolve", post(handlers::tenancy::resolve_tenant))
        .route("/api/patients", get(handlers::patients::list_patients))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .merge(page_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            refresh_session_cookie,
        ))
        .with_state(app_state)
}
