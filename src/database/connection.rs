use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);

    if database_url.contains(":memory:") {
        // every pooled connection would otherwise see its own empty database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(20).min_connections(2);
    }

    opt.connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// Normalize a database location into a connection URL.
///
/// Full URLs (`sqlite:`, `postgres://`) pass through; anything else is a SQLite file path.
pub fn get_database_url(database: Option<&str>) -> String {
    match database {
        Some(":memory:") => "sqlite::memory:".to_string(),
        Some(url)
            if url.starts_with("sqlite:")
                || url.starts_with("postgres://")
                || url.starts_with("postgresql://") =>
        {
            url.to_string()
        }
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => "sqlite://geoprompt.db?mode=rwc".to_string(),
    }
}
