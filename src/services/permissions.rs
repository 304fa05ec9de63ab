// src/services/permissions.rs

use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use crate::{common::error::AppError, db::store::RbacStore};

// União das permissões de todos os cargos do membership.
// SUPERADMIN não aparece aqui: quem autoriza checa a categoria antes.
#[derive(Clone)]
pub struct PermissionResolver {
    rbac: Arc<dyn RbacStore>,
}

impl PermissionResolver {
    pub fn new(rbac: Arc<dyn RbacStore>) -> Self {
        Self { rbac }
    }

    pub async fn resolve(&self, membership_id: Uuid) -> Result<HashSet<String>, AppError> {
        let roles = self.rbac.roles_for_membership(membership_id).await?;

        let mut keys = HashSet::new();
        for role in roles {
            keys.extend(self.rbac.permission_keys_for_role(role.id).await?);
        }
        Ok(keys)
    }
}
