// src/services/tenancy_service.rs

use std::sync::Arc;

use crate::{
    common::error::{AppError, TenantLookupError},
    db::store::TenantStore,
    models::tenancy::{TenantOption, TenantStatus},
    services::tenant_resolver::{is_reserved, slugify},
};

// Máximo de candidatos devolvidos ao seletor de clínicas
pub const MAX_CANDIDATES: i64 = 8;

/// Resposta do seletor: uma clínica certa ou uma lista para o usuário escolher.
#[derive(Debug, Clone)]
pub enum WorkspaceMatch {
    Single(TenantOption),
    Options(Vec<TenantOption>),
}

#[derive(Clone)]
pub struct TenantService {
    tenants: Arc<dyn TenantStore>,
}

impl TenantService {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }

    /// Seletor de clínicas antes do login.
    ///
    /// 1. Palpite de slug (informado ou derivado do texto) que acerte um tenant
    ///    resolve direto; se o tenant estiver suspenso/apagado, devolve o código.
    /// 2. Senão, busca por nome entre os tenants ativos.
    pub async fn resolve_workspace(
        &self,
        query: &str,
        slug_guess: Option<&str>,
    ) -> Result<WorkspaceMatch, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::TenantLookup(TenantLookupError::MissingQuery));
        }

        let guess = slug_guess
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| slugify(query));

        if !guess.is_empty() && !is_reserved(&guess) {
            if let Some(tenant) = self.tenants.find_by_slug(&guess).await? {
                if tenant.is_active() {
                    return Ok(WorkspaceMatch::Single(TenantOption::from(&tenant)));
                }
                let error = match tenant.status {
                    TenantStatus::Suspended if tenant.deleted_at.is_none() => {
                        TenantLookupError::Suspended
                    }
                    _ => TenantLookupError::Deleted,
                };
                return Err(AppError::TenantLookup(error));
            }
        }

        let mut candidates: Vec<TenantOption> = self
            .tenants
            .search_active_by_name(query, MAX_CANDIDATES)
            .await?
            .iter()
            .map(TenantOption::from)
            .collect();

        match candidates.len() {
            0 => Err(AppError::TenantLookup(TenantLookupError::NotFound)),
            1 => Ok(WorkspaceMatch::Single(candidates.remove(0))),
            _ => Ok(WorkspaceMatch::Options(candidates)),
        }
    }
}
