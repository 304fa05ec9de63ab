// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// Representa um usuário vindo do banco de dados (global, não pertence a um tenant)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// E-mails são comparados sempre em minúsculas e sem espaços.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Dados para login
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    pub remember: bool,

    pub next: Option<String>,
}

impl LoginUserPayload {
    /// Normaliza o e-mail antes da validação (" Ana@X.com " -> "ana@x.com").
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

// Resposta de login/logout: o cliente só precisa saber para onde ir
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    pub ok: bool,
    pub redirect_to: String,
}

impl RedirectResponse {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            ok: true,
            redirect_to: path.into(),
        }
    }
}
