//src/main.rs

use std::env;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use dora_backend::{build_router, db, AppState, AuthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carrega o .env antes de qualquer leitura de configuração
    dotenvy::dotenv().ok();

    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AuthConfig::from_env().context("Configuração de autenticação inválida")?;

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
    let pool = db::connect(&database_url).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::new(config, db::Stores::postgres(pool));
    let app = build_router(app_state);

    // Inicia o servidor
    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
