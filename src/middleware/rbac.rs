// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{AppError, ForbiddenReason},
    config::AppState,
    middleware::auth::CurrentAuth,
    models::session::AuthContext,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn key() -> &'static str;
}

/// 2. O Extractor (Guardião). Entrega o contexto já autorizado.
pub struct RequirePermission<T>(pub AuthContext, pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Sessão (401/403 se não houver contexto)
        let CurrentAuth(ctx) = CurrentAuth::from_request_parts(parts, state).await?;

        // B. SUPERADMIN passa direto; os demais precisam da chave
        let required = T::key();
        if !ctx.can(required) {
            tracing::info!(
                membership_id = %ctx.membership_id,
                permission = required,
                "Permissão negada"
            );
            return Err(AppError::Forbidden(ForbiddenReason::MissingPermission(
                required.to_string(),
            )));
        }

        Ok(RequirePermission(ctx, PhantomData))
    }
}

/// Só a categoria SUPERADMIN.
pub struct RequireSuperadmin(pub AuthContext);

impl<S> FromRequestParts<S> for RequireSuperadmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentAuth(ctx) = CurrentAuth::from_request_parts(parts, state).await?;
        if !ctx.is_superadmin() {
            return Err(AppError::Forbidden(ForbiddenReason::SuperadminOnly));
        }
        Ok(RequireSuperadmin(ctx))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermPatientsRead;
impl PermissionDef for PermPatientsRead {
    fn key() -> &'static str { "patients.read" }
}
