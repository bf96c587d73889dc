mod completion;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod service;
mod validator;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::completion::OpenAiCompletionClient;
use crate::config::{AppConfig, StoreConfig};
use crate::db::{PgMessageRepository, RestMessageRepository, TranscriptStore};
use crate::routes::api_routes::{router, CHAT_PATH};
use crate::service::relay_service::RelayService;

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TranscriptStore>> {
    match &config.store {
        StoreConfig::Rest { base_url, service_key } => {
            let repo = RestMessageRepository::new(base_url, service_key.clone(), config.store_timeout)
                .context("Failed to build store HTTP client")?;
            info!(base_url = %base_url, "Transcripts will be written through PostgREST");
            Ok(Arc::new(repo))
        }
        StoreConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(config.store_timeout)
                .connect(database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            info!("Database connection established and migrations applied");
            Ok(Arc::new(PgMessageRepository::new(pool, config.store_timeout)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!(
        openai_base_url = %config.openai_base_url,
        default_model = %config.default_model,
        store = config.store.backend_name(),
        "Configuration loaded"
    );

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let completion = OpenAiCompletionClient::new(
        &config.openai_base_url,
        config.openai_api_key.clone(),
        config.completion_timeout,
    )
    .context("Failed to build completion HTTP client")?;
    let store = build_store(&config).await?;
    let svc = RelayService::new(Arc::new(completion), store, config.default_model.clone());

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}{CHAT_PATH}");

    axum::serve(listener, router(svc)).await?;
    Ok(())
}
