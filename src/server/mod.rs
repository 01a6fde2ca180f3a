pub mod app;
pub mod auth;
pub mod handlers;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(config: AppConfig, port: u16) -> Result<()> {
    let database_url = get_database_url(Some(&config.database_url));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    if config.llm.api_key.is_none() {
        tracing::warn!("MISTRAL_API_KEY is not set, generation requests will fail");
    }

    let cors_origin = config.cors_origin.clone();
    let state = app::AppState::from_config(db, config)?;
    let app = app::create_app(state, cors_origin.as_deref()).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api/v1/generate            - Prompt to map generation");
    info!("  /api/v1/join                - CSV to boundary join");
    info!("  /api/v1/*                   - Documents, logs, maps, shares, EPCI, templates");
    info!("  /map/:token                 - Public shared map");
}

pub async fn migrate_database(database_url: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_url));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
