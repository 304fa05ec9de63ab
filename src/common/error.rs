// src/common/error.rs

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::session::{FailReason, FailureClass};

// Por que a autorização negou o acesso
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
    MembershipInactive,
    MissingPermission(String),
    SuperadminOnly,
}

impl ForbiddenReason {
    pub fn code(&self) -> &'static str {
        match self {
            ForbiddenReason::MembershipInactive => "membership_inactive",
            ForbiddenReason::MissingPermission(_) => "missing_permission",
            ForbiddenReason::SuperadminOnly => "superadmin_only",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::MissingPermission(key) => write!(f, "Missing permission: {key}"),
            ForbiddenReason::MembershipInactive => f.write_str("No active membership for tenant"),
            ForbiddenReason::SuperadminOnly => f.write_str("Superadmin only"),
        }
    }
}

// Erros do seletor de clínicas. A existência de um tenant não é segredo,
// então cada caso tem o seu código.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantLookupError {
    MissingQuery,
    NotFound,
    Suspended,
    Deleted,
}

impl TenantLookupError {
    pub fn code(&self) -> &'static str {
        match self {
            TenantLookupError::MissingQuery => "missing_query",
            TenantLookupError::NotFound => "tenant_not_found",
            TenantLookupError::Suspended => "tenant_suspended",
            TenantLookupError::Deleted => "tenant_deleted",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            TenantLookupError::MissingQuery => StatusCode::BAD_REQUEST,
            TenantLookupError::NotFound => StatusCode::NOT_FOUND,
            TenantLookupError::Suspended => StatusCode::LOCKED,
            TenantLookupError::Deleted => StatusCode::GONE,
        }
    }
}

impl fmt::Display for TenantLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            TenantLookupError::MissingQuery => "Missing query",
            TenantLookupError::NotFound => {
                "Clinic not found. Please check the name or workspace URL."
            }
            TenantLookupError::Suspended => "This clinic is suspended.",
            TenantLookupError::Deleted => "This clinic no longer exists.",
        };
        f.write_str(message)
    }
}

// O tipo de erro da aplicação, com `thiserror` para ergonomia.
// Falhas esperadas de sessão NÃO passam por aqui como exceção: o validador
// devolve um `FailReason`, e só vira erro na borda HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid tenant")]
    InvalidTenant,

    // Mesma mensagem para e-mail inexistente, usuário inativo e senha errada
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No access to tenant")]
    NoTenantAccess,

    #[error("Not authenticated ({0})")]
    Unauthenticated(FailReason),

    #[error("{0}")]
    Forbidden(ForbiddenReason),

    #[error("{0}")]
    TenantLookup(TenantLookupError),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<FailReason> for AppError {
    fn from(reason: FailReason) -> Self {
        match reason.class() {
            FailureClass::Forbidden => AppError::Forbidden(ForbiddenReason::MembershipInactive),
            FailureClass::Unauthenticated => AppError::Unauthenticated(reason),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "ok": false, "message": "One or more fields are invalid.", "details": details }),
                )
            }
            AppError::MissingCredentials | AppError::InvalidTenant => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "message": self.to_string() }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "ok": false, "message": self.to_string() }),
            ),
            AppError::NoTenantAccess => (
                StatusCode::FORBIDDEN,
                json!({ "ok": false, "message": self.to_string() }),
            ),
            AppError::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                json!({ "ok": false, "message": "Not authenticated", "reason": reason.as_str() }),
            ),
            AppError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                json!({ "ok": false, "message": reason.to_string(), "reason": reason.code() }),
            ),
            AppError::TenantLookup(err) => (
                err.status(),
                json!({ "ok": false, "message": err.to_string(), "code": err.code() }),
            ),

            // Todos os outros erros (banco, bcrypt, interno) viram 500.
            // O detalhe vai para o log, nunca para o cliente.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "message": "Unexpected error." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
