use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::pipeline::{AddressApiLookup, AddressLookup, GeocodingAdapter, LlmClient, MistralClient};
use crate::services::{
    GenerationLogService, GenerationService, ReferenceDocumentService, StaticLayerService,
};

use super::handlers::{auth, catalog, documents, generation, health, logs, maps, shares};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub generation: GenerationService,
    pub layers: StaticLayerService,
}

impl AppState {
    /// Wire the pipeline against the given model and address lookup backends.
    pub fn new(
        db: DatabaseConnection,
        llm: Arc<dyn LlmClient>,
        lookup: Arc<dyn AddressLookup>,
        config: &AppConfig,
    ) -> Self {
        let layers = StaticLayerService::new(config.data_dir.clone());
        let geocoder = GeocodingAdapter::new(lookup, config.region.clone())
            .with_concurrency(config.geocoder.concurrency);
        let generation = GenerationService::new(
            Arc::new(ReferenceDocumentService::new(db.clone())),
            Arc::new(GenerationLogService::new(db.clone())),
            llm,
            geocoder,
            layers.clone(),
        );

        Self {
            db,
            generation,
            layers,
        }
    }

    /// Production wiring: Mistral for generation, the national address API for geocoding.
    pub fn from_config(db: DatabaseConnection, config: AppConfig) -> Result<Self> {
        let llm = MistralClient::new(&config.llm)?;
        let lookup = AddressApiLookup::new(&config.geocoder)?;
        Ok(Self::new(db, Arc::new(llm), Arc::new(lookup), &config))
    }
}

pub async fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .map_err(|e| anyhow!("Invalid CORS origin '{}': {}", origin, e))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/map/:token", get(shares::resolve_public))
        .nest("/api/v1", api_v1_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))

        // Generation pipeline
        .route("/generate", post(generation::generate))
        .route("/join", post(generation::join_dataset))
        .route("/layers", get(generation::list_layers))
        .route("/layers/:name", get(generation::get_layer))

        // Reference documents
        .route("/documents", get(documents::list_documents).post(documents::create_document))
        .route(
            "/documents/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::deactivate_document),
        )
        .route("/documents/:id/processed", post(documents::mark_processed))

        // Generation logs
        .route("/logs", get(logs::list_logs))
        .route("/logs/:id", get(logs::get_log))
        .route("/logs/:id/validation", put(logs::validate_log))

        // Saved maps
        .route("/maps", get(maps::list_maps).post(maps::save_map))
        .route("/maps/:id", get(maps::get_map))
        .route("/maps/:id/visibility", put(maps::set_visibility))

        // Shared links
        .route("/shares", get(shares::list_shares).post(shares::create_share))
        .route("/shares/:id", axum::routing::delete(shares::delete_share))
        .route("/shares/:id/visibility", put(shares::set_visibility))

        // Reference geography
        .route("/epci", get(catalog::list_epci).post(catalog::create_epci))
        .route(
            "/epci/:id",
            get(catalog::get_epci)
                .put(catalog::update_epci)
                .delete(catalog::delete_epci),
        )
        .route("/templates", get(catalog::list_templates).post(catalog::create_template))
        .route(
            "/templates/:id",
            get(catalog::get_template)
                .put(catalog::update_template)
                .delete(catalog::delete_template),
        )
}
