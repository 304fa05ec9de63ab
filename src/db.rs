// src/db.rs

use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

pub mod audit_repo;
pub mod memory;
pub mod rbac_repo;
pub mod session_repo;
pub mod store;
pub mod tenancy_repo;
pub mod user_repo;

pub use audit_repo::AuditRepository;
pub use memory::MemoryStore;
pub use rbac_repo::RbacRepository;
pub use session_repo::SessionRepository;
pub use store::{EventStore, RbacStore, SessionStore, TenantStore, UserStore};
pub use tenancy_repo::TenantRepository;
pub use user_repo::UserRepository;

// Conecta ao banco de dados, usando '?' para propagar erros
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// Os stores que o núcleo de auth usa, atrás de traits.
// Nada aqui guarda estado de sessão entre requisições.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub users: Arc<dyn UserStore>,
    pub rbac: Arc<dyn RbacStore>,
    pub events: Arc<dyn EventStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            tenants: Arc::new(TenantRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            rbac: Arc::new(RbacRepository::new(pool.clone())),
            events: Arc::new(AuditRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            sessions: store.clone(),
            tenants: store.clone(),
            users: store.clone(),
            rbac: store.clone(),
            events: store,
        }
    }
}
