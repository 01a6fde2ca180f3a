use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sea_orm_migration::prelude::MigratorTrait;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use geoprompt::database::{establish_connection, get_database_url, migrations::Migrator};
use geoprompt::pipeline::{
    join, parse_csv, AddressApiLookup, GeocodingAdapter, JoinKeys, MistralClient,
};
use geoprompt::server::{self, MigrateDirection};
use geoprompt::services::{
    AuthService, GenerateRequest, GenerationLogService, GenerationService,
    ReferenceDocumentService, Role, StaticLayerService,
};
use geoprompt::AppConfig;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Overrides GEOPROMPT_DATABASE_URL
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long, default_value = "3000")]
        port: u16,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    User {
        #[clap(subcommand)]
        command: UserCommands,
    },
    /// Run one prompt through the generation pipeline and print the result as JSON
    Generate {
        #[clap(short, long)]
        prompt: String,
        /// CSV file joined onto the boundary layer for choropleth answers
        #[clap(long)]
        csv: Option<PathBuf>,
        #[clap(long)]
        layer: Option<String>,
        #[clap(long)]
        data_key: Option<String>,
    },
    /// Join a CSV file onto a boundary layer and print the FeatureCollection
    Join {
        #[clap(long)]
        csv: PathBuf,
        #[clap(long)]
        layer: String,
        #[clap(long, default_value = "code")]
        geo_key: String,
        #[clap(long)]
        geo_key_fallback: Option<String>,
        #[clap(long)]
        data_key: String,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(subcommand)]
        direction: MigrateDirection,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    Create {
        #[clap(long)]
        email: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        password: String,
        #[clap(long, default_value = "user")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = AppConfig::from_env();
    if let Some(database) = args.database {
        config.database_url = database;
    }

    match args.command {
        Commands::Serve { port, cors_origin } => {
            if cors_origin.is_some() {
                config.cors_origin = cors_origin;
            }
            info!("Starting server on port {}", port);
            server::start_server(config, port).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", config.database_url);
                server::migrate_database(&config.database_url, MigrateDirection::Up).await?;
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&config.database_url, direction).await?;
            }
        },
        Commands::User { command } => match command {
            UserCommands::Create {
                email,
                name,
                password,
                role,
            } => {
                let role = Role::from_str(&role)?;
                let db = establish_connection(&get_database_url(Some(&config.database_url))).await?;
                Migrator::up(&db, None).await?;
                let user = AuthService::new(db)
                    .create_user(&email, &name, &password, role)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
        },
        Commands::Generate {
            prompt,
            csv,
            layer,
            data_key,
        } => {
            let dataset_csv = csv.map(fs::read_to_string).transpose()?;
            let db = establish_connection(&get_database_url(Some(&config.database_url))).await?;
            Migrator::up(&db, None).await?;

            let layers = StaticLayerService::new(config.data_dir.clone());
            let geocoder = GeocodingAdapter::new(
                Arc::new(AddressApiLookup::new(&config.geocoder)?),
                config.region.clone(),
            )
            .with_concurrency(config.geocoder.concurrency);
            let service = GenerationService::new(
                Arc::new(ReferenceDocumentService::new(db.clone())),
                Arc::new(GenerationLogService::new(db)),
                Arc::new(MistralClient::new(&config.llm)?),
                geocoder,
                layers,
            );

            let result = service
                .generate(
                    None,
                    GenerateRequest {
                        prompt,
                        dataset_csv,
                        layer,
                        data_key,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Join {
            csv,
            layer,
            geo_key,
            geo_key_fallback,
            data_key,
        } => {
            let dataset = parse_csv(&fs::read_to_string(&csv)?)?;
            dataset.require_column(&data_key)?;
            let features = StaticLayerService::new(config.data_dir.clone())
                .load(&layer)
                .await?;

            let mut keys = JoinKeys::new(geo_key, data_key);
            if let Some(fallback) = geo_key_fallback {
                keys = keys.with_geo_fallback(fallback);
            }
            let output = join(&features.features, &dataset.rows, &keys);
            info!(
                joined = output.stats.joined_features,
                total_rows = output.stats.total_data_rows,
                "Join completed"
            );
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("handlebars=off,{}", log_level)))
        .with_writer(std::io::stderr)
        .init();
}
