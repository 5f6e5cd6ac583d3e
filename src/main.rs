use std::sync::Arc;

use anyhow::{Context, Result};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use storefront_orderservice::{
    api::webhook::WebhookNotifier,
    platform::{app_state::AppState, bootstrap, config, db},
    repositories::{MemoryRepository, PgRepository},
    routes,
    storage::LocalObjectStorage,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = config::load()?;

    let notifier = Arc::new(WebhookNotifier::new(&config.webhook)?);
    tracing::info!(
        url = notifier.url(),
        mode = %config.notification_mode,
        "Order notifications configured"
    );

    tokio::fs::create_dir_all(&config.media.root_dir)
        .await
        .with_context(|| format!("Failed to create media root {}", config.media.root_dir.display()))?;
    let storage = Arc::new(LocalObjectStorage::new(
        config.media.root_dir.clone(),
        config.media.public_base_url.clone(),
    ));

    let state = match &config.database.url {
        Some(url) => {
            tracing::info!("Running migrations...");
            let migrations_count = db::run_migrations_blocking(MIGRATIONS, url).await?;
            tracing::info!("Run {} new migrations successfully", migrations_count);

            let pool = db::create_pool(url, config.database.max_connections).await?;
            AppState::new(
                Arc::new(PgRepository::new(pool)),
                notifier,
                storage,
                config.notification_mode,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, orders are kept in memory only");
            AppState::new(
                Arc::new(MemoryRepository::new()),
                notifier,
                storage,
                config.notification_mode,
            )
        }
    };

    let intake = state.intake.clone();
    let app = routes::app(state, &config.media);

    tracing::info!("Bootstrapping...");
    bootstrap::serve("OrderService", app, config.server.socket_addr()?).await?;

    intake.drain(config.server.shutdown_grace).await;
    Ok(())
}
