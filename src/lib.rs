pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use api::routes::create_router;
pub use config::{AppConfig, StorageBackend};
pub use error::{FleetError, FleetResult};
pub use logic::{FleetQueries, IntegrityValidator};
pub use model::*;
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;
use tokio::net::TcpListener;

/// Builds the HTTP application over `store`.
pub fn app<S: Store + 'static>(store: Arc<S>) -> axum::Router {
    create_router::<S>().with_state(store)
}

/// Serves the API for `store` on an already bound listener until the
/// server stops.
pub async fn serve<S: Store + 'static>(store: Arc<S>, listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, app(store)).await?;
    Ok(())
}

/// Opens the configured store, optionally seeds it, and serves the API on
/// the configured address.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let postgres_store =
                PostgresStore::new(&config.database_url(), config.max_connections()).await?;

            log::info!("Running database migrations...");
            postgres_store.migrate().await?;

            start(Arc::new(postgres_store), config).await
        }
        StorageBackend::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            start(Arc::new(MemoryStore::new()), config).await
        }
    }
}

async fn start<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    if config.load_seed_data() {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("NeoMoto server running on http://{}", bind_address);

    serve(store, listener).await
}
