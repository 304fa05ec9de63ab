//! Testes de integração da API de autenticação.
//!
//! Sobem o router completo sobre o `MemoryStore` e exercitam login, logout,
//! validação de sessão, autorização e o seletor de clínicas via `oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use dora_backend::{
    build_router,
    config::{AppState, AuthConfig, RenewPolicy},
    db::{MemoryStore, Stores},
    models::{
        audit::AuthEventType,
        auth::User,
        tenancy::{MembershipCategory, Tenant, TenantMembership, TenantStatus},
    },
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // Para o método `oneshot`

const HOST: &str = "acme.localhost:3000";
const PASSWORD: &str = "correct horse";

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    tenant: Tenant,
    user: User,
    membership: TenantMembership,
}

async fn setup_with(config: AuthConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tenant = store.add_tenant("acme", "Acme Clinic").await;
    let user = store.add_user("ana@acme.test", PASSWORD).await.unwrap();
    let membership = store
        .add_membership(tenant.id, user.id, MembershipCategory::Admin)
        .await;

    let state = AppState::new(config, Stores::memory(store.clone()));

    TestApp {
        app: build_router(state),
        store,
        tenant,
        user,
        membership,
    }
}

async fn setup() -> TestApp {
    setup_with(AuthConfig::development()).await
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    /// "dora_session=<token>" tirado do Set-Cookie.
    fn session_cookie(&self) -> String {
        let raw = self
            .headers
            .get(header::SET_COOKIE)
            .expect("resposta sem Set-Cookie")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .expect("resposta sem Location")
            .to_str()
            .unwrap()
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply {
        status,
        headers,
        body,
    }
}

fn post_json(uri: &str, host: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, host)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, host: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri).header(header::HOST, host);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, host: &str, email: &str, password: &str) -> Reply {
    send(
        app,
        post_json(
            "/api/auth/login",
            host,
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

async fn login_cookie(t: &TestApp) -> String {
    let reply = login(&t.app, HOST, "ana@acme.test", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
    reply.session_cookie()
}

async fn me(t: &TestApp, host: &str, cookie: &str) -> Value {
    let reply = send(&t.app, get("/api/auth/me", host, Some(cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.body
}

// ============================================================================
// Login / Logout
// ============================================================================

#[tokio::test]
async fn health_check() {
    let t = setup().await;
    let response = t.app.clone().oneshot(get("/api/health", HOST, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn login_sets_http_only_cookie_and_redirect() {
    let t = setup().await;
    let reply = send(
        &t.app,
        post_json(
            "/api/auth/login",
            HOST,
            None,
            json!({
                "email": "  ANA@acme.test ",
                "password": PASSWORD,
                "remember": true,
                "next": "/patients?page=2",
            }),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "ok": true, "redirectTo": "/patients?page=2" }));

    let raw = reply.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(raw.starts_with("dora_session="));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    assert!(raw.contains("Path=/"));
    // "remember" usa a janela longa (30 dias, em segundos)
    assert!(raw.contains("Max-Age=259"));

    // o token do cookie nunca é o que fica no banco
    let token = reply.session_cookie().trim_start_matches("dora_session=").to_string();
    let sessions = t.store.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_ne!(sessions[0].token_hash, token);
}

#[tokio::test]
async fn login_rejects_open_redirects() {
    let t = setup().await;
    for next in ["//evil.com", "https://evil.com", "evil"] {
        let reply = send(
            &t.app,
            post_json(
                "/api/auth/login",
                HOST,
                None,
                json!({ "email": "ana@acme.test", "password": PASSWORD, "next": next }),
            ),
        )
        .await;
        assert_eq!(reply.body["redirectTo"], "/dashboard", "{next}");
    }
}

#[tokio::test]
async fn login_failure_statuses() {
    let t = setup().await;

    let reply = login(&t.app, HOST, "", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Missing credentials");

    let reply = login(&t.app, "localhost:3000", "ana@acme.test", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Invalid tenant");

    // e-mail desconhecido e senha errada são indistinguíveis
    let unknown = login(&t.app, HOST, "ghost@acme.test", PASSWORD).await;
    let wrong = login(&t.app, HOST, "ana@acme.test", "nope").await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, wrong.body);

    t.store.set_user_active(t.user.id, false).await;
    let inactive = login(&t.app, HOST, "ana@acme.test", PASSWORD).await;
    assert_eq!(inactive.status, StatusCode::UNAUTHORIZED);
    assert_eq!(inactive.body, wrong.body);
    t.store.set_user_active(t.user.id, true).await;

    t.store.set_membership_active(t.membership.id, false).await;
    let reply = login(&t.app, HOST, "ana@acme.test", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["message"], "No access to tenant");

    assert!(t.store.sessions().await.is_empty());
}

#[tokio::test]
async fn unreadable_login_body_is_missing_credentials() {
    let t = setup().await;
    let requests = [
        ("application/json", "{not json"),
        ("application/json", "[1, 2]"),
        ("text/plain", r#"{"email":"ana@acme.test","password":"x"}"#),
    ];

    for (content_type, body) in requests {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let reply = send(&t.app, request).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{content_type} {body}");
        assert_eq!(reply.body, json!({ "ok": false, "message": "Missing credentials" }));
    }
    assert!(t.store.sessions().await.is_empty());
}

#[tokio::test]
async fn tenant_header_fallback_for_login() {
    let t = setup().await;
    let mut request = post_json(
        "/api/auth/login",
        "localhost:3000",
        None,
        json!({ "email": "ana@acme.test", "password": PASSWORD }),
    );
    request.headers_mut().insert("x-tenant", "acme".parse().unwrap());
    let reply = send(&t.app, request).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_is_always_ok_and_clears_cookie() {
    let t = setup().await;

    // sem sessão
    let reply = send(&t.app, post_json("/api/auth/logout", HOST, None, json!({}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "ok": true, "redirectTo": "/login" }));
    assert_eq!(reply.session_cookie(), "dora_session=");

    // com sessão: revoga, e o cookie antigo deixa de valer
    let cookie = login_cookie(&t).await;
    let reply = send(&t.app, post_json("/api/auth/logout", HOST, Some(&cookie), json!({}))).await;
    assert_eq!(reply.status, StatusCode::OK);

    let body = me(&t, HOST, &cookie).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["reason"], "revoked");

    // de novo: continua ok
    let reply = send(&t.app, post_json("/api/auth/logout", HOST, Some(&cookie), json!({}))).await;
    assert_eq!(reply.status, StatusCode::OK);

    let events = t.store.auth_events().await;
    let logout = events
        .iter()
        .find(|e| e.event_type == AuthEventType::Logout)
        .unwrap();
    assert_eq!(logout.tenant_id, Some(t.tenant.id));
    assert_eq!(logout.user_id, Some(t.user.id));
}

// ============================================================================
// Validação de sessão
// ============================================================================

#[tokio::test]
async fn me_reports_context_with_permissions() {
    let t = setup().await;
    let role = t
        .store
        .add_role(t.tenant.id, "clinician", &["patients.write", "patients.read"])
        .await;
    t.store.grant_role(t.membership.id, role.id).await;

    let cookie = login_cookie(&t).await;
    let body = me(&t, HOST, &cookie).await;

    assert_eq!(body["authenticated"], true);
    assert_eq!(body["userId"], json!(t.user.id));
    assert_eq!(body["tenantId"], json!(t.tenant.id));
    assert_eq!(body["membershipId"], json!(t.membership.id));
    assert_eq!(body["category"], "ADMIN");
    assert_eq!(body["permissions"], json!(["patients.read", "patients.write"]));

    let anonymous = send(&t.app, get("/api/auth/me", HOST, None)).await;
    assert_eq!(anonymous.body["authenticated"], false);
    assert_eq!(anonymous.body["reason"], "missing");

    let garbage = me(&t, HOST, "dora_session=not-a-real-token").await;
    assert_eq!(garbage["reason"], "invalid");
}

#[tokio::test]
async fn second_login_revokes_first_session() {
    let t = setup().await;
    let first = login_cookie(&t).await;
    let second = login_cookie(&t).await;

    assert_eq!(me(&t, HOST, &first).await["reason"], "revoked");
    assert_eq!(me(&t, HOST, &second).await["authenticated"], true);

    let now = Utc::now();
    let active = t
        .store
        .sessions()
        .await
        .into_iter()
        .filter(|s| s.is_active_at(now))
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn cookie_does_not_cross_subdomains() {
    let t = setup().await;
    t.store.add_tenant("other", "Other Clinic").await;
    let cookie = login_cookie(&t).await;

    let body = me(&t, "other.localhost:3000", &cookie).await;
    assert_eq!(body["reason"], "host_mismatch");

    // não revoga: continua válido no host certo
    assert_eq!(me(&t, HOST, &cookie).await["authenticated"], true);
}

#[tokio::test]
async fn suspended_tenant_blocks_without_revoking() {
    let t = setup().await;
    let cookie = login_cookie(&t).await;

    t.store.set_tenant_status(t.tenant.id, TenantStatus::Suspended).await;
    assert_eq!(me(&t, HOST, &cookie).await["reason"], "tenant_inactive");
    assert!(t.store.sessions().await.iter().all(|s| !s.is_revoked()));

    t.store.set_tenant_status(t.tenant.id, TenantStatus::Active).await;
    assert_eq!(me(&t, HOST, &cookie).await["authenticated"], true);
}

#[tokio::test]
async fn expired_and_idle_sessions_are_revoked() {
    let t = setup().await;

    let cookie = login_cookie(&t).await;
    let session = t.store.sessions().await.remove(0);
    t.store
        .update_session(session.id, |s| s.expires_at = Utc::now() - Duration::seconds(1))
        .await;
    assert_eq!(me(&t, HOST, &cookie).await["reason"], "expired");
    assert_eq!(me(&t, HOST, &cookie).await["reason"], "revoked");

    let cookie = login_cookie(&t).await;
    let session = t
        .store
        .sessions()
        .await
        .into_iter()
        .find(|s| !s.is_revoked())
        .unwrap();
    t.store
        .update_session(session.id, |s| {
            s.last_seen_at = Some(Utc::now() - Duration::minutes(31))
        })
        .await;
    assert_eq!(me(&t, HOST, &cookie).await["reason"], "idle");

    let types: Vec<AuthEventType> = t
        .store
        .auth_events()
        .await
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&AuthEventType::SessionExpired));
    assert!(types.contains(&AuthEventType::SessionIdleTimeout));
}

#[tokio::test]
async fn rolling_renewal_reissues_cookie() {
    let mut config = AuthConfig::development();
    config.renew = Some(RenewPolicy {
        threshold: Duration::hours(6),
        window: Duration::days(1),
    });
    let t = setup_with(config).await;
    let cookie = login_cookie(&t).await;

    // sem renovação ainda: nada de Set-Cookie
    let reply = send(&t.app, get("/api/auth/me", HOST, Some(&cookie))).await;
    assert!(reply.headers.get(header::SET_COOKIE).is_none());

    let session = t.store.sessions().await.remove(0);
    t.store
        .update_session(session.id, |s| s.expires_at = Utc::now() + Duration::hours(1))
        .await;

    let reply = send(&t.app, get("/api/auth/me", HOST, Some(&cookie))).await;
    assert_eq!(reply.body["authenticated"], true);
    assert_eq!(reply.session_cookie(), cookie);

    let renewed = t.store.sessions().await.remove(0);
    assert!(renewed.expires_at > Utc::now() + Duration::hours(23));
}

// ============================================================================
// Autorização
// ============================================================================

#[tokio::test]
async fn patients_require_permission_and_are_audited() {
    let t = setup().await;
    let cookie = login_cookie(&t).await;

    let anonymous = send(&t.app, get("/api/patients", HOST, None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["reason"], "missing");

    let denied = send(&t.app, get("/api/patients", HOST, Some(&cookie))).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["reason"], "missing_permission");

    let role = t.store.add_role(t.tenant.id, "reader", &["patients.read"]).await;
    t.store.grant_role(t.membership.id, role.id).await;

    let allowed = send(&t.app, get("/api/patients", HOST, Some(&cookie))).await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.body, json!({ "ok": true, "items": [] }));

    let entries = t.store.audit_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "patients.list");
    assert_eq!(entries[0].tenant_id, t.tenant.id);
    assert_eq!(entries[0].actor_membership_id, t.membership.id);
    assert_eq!(entries[0].method.as_deref(), Some("GET"));
    assert_eq!(entries[0].path.as_deref(), Some("/api/patients"));
}

#[tokio::test]
async fn superadmin_bypasses_permissions() {
    let t = setup().await;
    let boss = t.store.add_user("boss@acme.test", PASSWORD).await.unwrap();
    t.store
        .add_membership(t.tenant.id, boss.id, MembershipCategory::Superadmin)
        .await;

    let reply = login(&t.app, HOST, "boss@acme.test", PASSWORD).await;
    let cookie = reply.session_cookie();

    let patients = send(&t.app, get("/api/patients", HOST, Some(&cookie))).await;
    assert_eq!(patients.status, StatusCode::OK);

    // listagem administrativa: só SUPERADMIN, só o tenant atual
    login_cookie(&t).await;
    let reply = send(&t.app, get("/api/admin/sessions", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let sessions = reply.body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.get("tokenHash").is_none()));

    let filtered = send(
        &t.app,
        get(&format!("/api/admin/sessions?userId={}", t.user.id), HOST, Some(&cookie)),
    )
    .await;
    assert_eq!(filtered.body["sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_sessions_forbidden_for_regular_members() {
    let t = setup().await;
    let cookie = login_cookie(&t).await;
    let reply = send(&t.app, get("/api/admin/sessions", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["reason"], "superadmin_only");
}

#[tokio::test]
async fn my_sessions_lists_own_sessions_newest_first() {
    let t = setup().await;
    login_cookie(&t).await;
    let cookie = login_cookie(&t).await;

    let reply = send(&t.app, get("/api/auth/me/sessions", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let sessions = reply.body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[0]["revokedAt"].is_null());
    assert!(!sessions[1]["revokedAt"].is_null());

    let anonymous = send(&t.app, get("/api/auth/me/sessions", HOST, None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_membership_is_forbidden_not_unauthenticated() {
    let t = setup().await;
    let cookie = login_cookie(&t).await;
    t.store.set_membership_active(t.membership.id, false).await;

    let reply = send(&t.app, get("/api/auth/me/sessions", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["reason"], "membership_inactive");
}

// ============================================================================
// Guard de páginas
// ============================================================================

#[tokio::test]
async fn page_guard_redirects_by_failure_class() {
    let t = setup().await;

    let reply = send(&t.app, get("/dashboard?tab=today", HOST, None)).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/login?reason=missing&next=%2Fdashboard%3Ftab%3Dtoday");

    let cookie = login_cookie(&t).await;
    let reply = send(&t.app, get("/dashboard", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);

    t.store.set_membership_active(t.membership.id, false).await;
    let reply = send(&t.app, get("/dashboard", HOST, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/no-access");
}

// ============================================================================
// Seletor de clínicas
// ============================================================================

async fn resolve(t: &TestApp, body: Value) -> Reply {
    send(&t.app, post_json("/api/tenant/resolve", "localhost:3000", None, body)).await
}

#[tokio::test]
async fn tenant_resolve_outcomes() {
    let t = setup().await;
    t.store.add_tenant("acme-kids", "Acme Kids").await;
    let paused = t.store.add_tenant("paused", "Paused Clinic").await;
    t.store.set_tenant_status(paused.id, TenantStatus::Suspended).await;
    let gone = t.store.add_tenant("gone", "Gone Clinic").await;
    t.store.set_tenant_status(gone.id, TenantStatus::Deleted).await;

    let reply = resolve(&t, json!({ "query": "  " })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "missing_query");

    let reply = resolve(&t, json!({ "query": "anything", "slugGuess": "ACME" })).await;
    assert_eq!(reply.body, json!({ "ok": true, "slug": "acme", "name": "Acme Clinic" }));

    let reply = resolve(&t, json!({ "query": "kids" })).await;
    assert_eq!(reply.body["slug"], "acme-kids");

    let reply = resolve(&t, json!({ "query": "acm" })).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["options"].as_array().unwrap().len(), 2);
    assert_eq!(reply.body["options"][0]["status"], "ACTIVE");

    let reply = resolve(&t, json!({ "query": "x", "slugGuess": "paused" })).await;
    assert_eq!(reply.status, StatusCode::LOCKED);
    assert_eq!(reply.body["code"], "tenant_suspended");

    let reply = resolve(&t, json!({ "query": "x", "slugGuess": "gone" })).await;
    assert_eq!(reply.status, StatusCode::GONE);
    assert_eq!(reply.body["code"], "tenant_deleted");

    let reply = resolve(&t, json!({ "query": "nowhere" })).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], "tenant_not_found");

    let reply = resolve(&t, json!({ "query": "a".repeat(81) })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
