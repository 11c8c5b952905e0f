pub(crate) mod api;
pub mod client;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use crate::core::config::{Settings, StoreBackend};
use crate::core::{state::AppState, telemetry};
use crate::repositories::memory::MemorySeed;
use crate::repositories::{AttemptStore, MemoryStore, PgStore};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let store = open_store(&settings).await?;
    let state = AppState::new(settings, store);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        store = %state.settings().database().backend.as_str(),
        "Wordcheck API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn AttemptStore>> {
    let database = settings.database();
    match database.backend {
        StoreBackend::Postgres => {
            let pool = db::init_pool(settings).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            let store = match &database.memory_seed_file {
                Some(path) => {
                    let store = MemoryStore::load(Path::new(path))?;
                    tracing::info!(seed = %path, "Loaded in-memory store seed");
                    store
                }
                None => {
                    tracing::warn!("In-memory store started without a seed; it holds no tests");
                    MemoryStore::from_seed(MemorySeed::default())
                }
            };
            Ok(Arc::new(store))
        }
    }
}
