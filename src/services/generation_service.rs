//! Prompt-to-map orchestration.
//!
//! One call runs the whole pipeline: reference context, model call, response
//! repair, payload classification, then geocoding or a boundary join
//! depending on the payload type. Every attempt leaves a generation log.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::errors::{CoreError, CoreResult};
use crate::geojson::{Feature, FeatureCollection, Properties};
use crate::payload::{ChoroplethePayload, GeocodagePayload, LocationEntry, MapPayload};
use crate::pipeline::prompt_context::order_documents;
use crate::pipeline::{
    build_system_prompt, build_user_prompt, join, parse_csv, repair, GenerationLogStore,
    GenerationRecord, GeocodeRequest, GeocodeResult, GeocodingAdapter, JoinKeys, JoinOutput,
    JoinStats, LlmClient, ReferenceStore, RepairContext,
};
use crate::services::authorization::Actor;
use crate::services::layer_service::StaticLayerService;

/// Boundary files key their features on this property.
const DEFAULT_GEO_KEY: &str = "code";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    /// CSV joined onto the boundary layer when the model answers with a choropleth.
    pub dataset_csv: Option<String>,
    /// Boundary layer name; defaults to the payload's `dataLevel`.
    pub layer: Option<String>,
    /// CSV column holding the join key; defaults to the payload's `joinKey`.
    pub data_key: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub log_id: i32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: MapPayload,
    pub geojson: Option<FeatureCollection>,
    pub join_stats: Option<JoinStats>,
    pub parse_error: bool,
    pub warnings: Vec<String>,
    pub duration_ms: i64,
}

#[derive(Clone)]
pub struct GenerationService {
    documents: Arc<dyn ReferenceStore>,
    logs: Arc<dyn GenerationLogStore>,
    llm: Arc<dyn LlmClient>,
    geocoder: GeocodingAdapter,
    layers: StaticLayerService,
}

impl GenerationService {
    pub fn new(
        documents: Arc<dyn ReferenceStore>,
        logs: Arc<dyn GenerationLogStore>,
        llm: Arc<dyn LlmClient>,
        geocoder: GeocodingAdapter,
        layers: StaticLayerService,
    ) -> Self {
        Self {
            documents,
            logs,
            llm,
            geocoder,
            layers,
        }
    }

    pub async fn generate(
        &self,
        actor: Option<&Actor>,
        request: GenerateRequest,
    ) -> CoreResult<GenerationResult> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(CoreError::validation("Prompt cannot be empty"));
        }

        let started = Instant::now();
        let mut documents = self.documents.active_documents().await?;
        order_documents(&mut documents);
        let document_names: Vec<String> = documents
            .iter()
            .filter(|document| document.is_usable())
            .map(|document| document.name.clone())
            .collect();

        let system_prompt = build_system_prompt(&documents);
        let user_prompt = build_user_prompt(&prompt);
        info!(
            model = %self.llm.model_name(),
            documents = document_names.len(),
            prompt_chars = system_prompt.len() + user_prompt.len(),
            "Starting map generation"
        );

        let mut record = GenerationRecord {
            user_id: actor.map(|actor| actor.user_id),
            prompt: prompt.clone(),
            raw_response: None,
            parsed_response: None,
            success: false,
            error_message: None,
            model_name: self.llm.model_name().to_string(),
            system_prompt: system_prompt.clone(),
            duration_ms: 0,
            created_at: Utc::now(),
        };

        let raw = match self.llm.complete(&system_prompt, &user_prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, code = err.error_code(), "Model call failed");
                record.error_message = Some(err.to_string());
                record.duration_ms = elapsed_ms(started);
                if let Err(log_err) = self.logs.record(record).await {
                    warn!(error = %log_err, "Failed to record failed generation");
                }
                return Err(err.into());
            }
        };

        let outcome = repair(
            &raw,
            &RepairContext {
                prompt: &prompt,
                document_names: &document_names,
                generated_at: Utc::now(),
            },
        );
        let parse_error = outcome.parse_error();
        let mut warnings = Vec::new();

        let payload = match MapPayload::from_value(outcome.value.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Model payload does not match its declared type");
                warnings.push(err.to_string());
                match outcome.value {
                    Value::Object(object) => MapPayload::Other(object),
                    other => MapPayload::Other(Map::from_iter([("value".to_string(), other)])),
                }
            }
        };

        let (geojson, join_stats) = match &payload {
            MapPayload::Geocodage(inner) => (Some(self.place_locations(&inner.locations).await), None),
            MapPayload::Choroplethe(inner) => {
                match self.join_dataset(inner, &request, &mut warnings).await {
                    Some(JoinOutput { features, stats }) => (Some(features), Some(stats)),
                    None => (None, None),
                }
            }
            MapPayload::Complexe(inner) => {
                let features = self.place_layers(&inner.layers, &mut warnings).await;
                (Some(features), None)
            }
            MapPayload::Fallback(_) | MapPayload::Other(_) => (None, None),
        };

        let duration_ms = elapsed_ms(started);
        record.raw_response = Some(raw);
        record.parsed_response = Some(payload.to_value());
        record.success = !parse_error;
        record.error_message = if parse_error {
            Some("Model response could not be parsed".to_string())
        } else if !warnings.is_empty() {
            Some(warnings.join("; "))
        } else {
            None
        };
        record.duration_ms = duration_ms;
        let log_id = self.logs.record(record).await?;

        info!(
            log_id,
            kind = payload.kind().as_str(),
            parse_error,
            features = geojson.as_ref().map(FeatureCollection::len).unwrap_or(0),
            duration_ms,
            "Map generation finished"
        );

        Ok(GenerationResult {
            log_id,
            kind: payload.kind().as_str(),
            payload,
            geojson,
            join_stats,
            parse_error,
            warnings,
            duration_ms,
        })
    }

    /// Point features for each location, in input order. Coordinates the model
    /// supplied inside the region are kept; everything else is geocoded.
    async fn place_locations(&self, locations: &[LocationEntry]) -> FeatureCollection {
        let bounds = self.geocoder.region().bounds;
        let mut placed: Vec<Option<GeocodeResult>> = vec![None; locations.len()];
        let mut pending = Vec::new();

        for (index, location) in locations.iter().enumerate() {
            match (location.latitude, location.longitude) {
                (Some(latitude), Some(longitude)) if bounds.contains(latitude, longitude) => {
                    placed[index] = Some(GeocodeResult {
                        latitude,
                        longitude,
                        formatted_address: location.address.clone(),
                        approximate: false,
                    });
                }
                _ => pending.push((index, GeocodeRequest::new(&location.address, hint(location)))),
            }
        }

        if !pending.is_empty() {
            let requests: Vec<GeocodeRequest> =
                pending.iter().map(|(_, request)| request.clone()).collect();
            let results = self.geocoder.geocode_all(&requests).await;
            for ((index, _), result) in pending.into_iter().zip(results) {
                placed[index] = Some(result);
            }
        }

        let features = locations
            .iter()
            .zip(placed)
            .filter_map(|(location, result)| result.map(|result| location_feature(location, result)))
            .collect();
        FeatureCollection::new(features)
    }

    /// Geocoded sub-layers of a composite payload, tagged with their layer name.
    async fn place_layers(&self, layers: &[Value], warnings: &mut Vec<String>) -> FeatureCollection {
        let mut features = Vec::new();

        for (index, layer) in layers.iter().enumerate() {
            let name = layer
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("layer-{}", index + 1));
            let data = layer.get("data").cloned().unwrap_or(Value::Null);

            let Ok(inner) = serde_json::from_value::<GeocodagePayload>(data) else {
                debug!(layer = %name, "Composite layer is not a geocodage shape");
                warnings.push(format!("Layer '{}' was not placed: only geocodage layers are rendered", name));
                continue;
            };

            let placed = self.place_locations(&inner.locations).await;
            if placed.is_empty() {
                warnings.push(format!("Layer '{}' has no locations", name));
            }
            features.extend(placed.features.into_iter().map(|mut feature| {
                feature
                    .properties
                    .insert("layer".to_string(), Value::String(name.clone()));
                feature
            }));
        }

        FeatureCollection::new(features)
    }

    async fn join_dataset(
        &self,
        payload: &ChoroplethePayload,
        request: &GenerateRequest,
        warnings: &mut Vec<String>,
    ) -> Option<JoinOutput> {
        let csv = request.dataset_csv.as_deref()?;

        let layer_name = request
            .layer
            .clone()
            .unwrap_or_else(|| payload.data_level.clone());
        let layer = match self.layers.load(&layer_name).await {
            Ok(layer) => layer,
            Err(err) => {
                warn!(layer = %layer_name, error = %err, "Boundary layer unavailable for join");
                warnings.push(format!("Layer '{}' unavailable: {}", layer_name, err.message()));
                return None;
            }
        };

        let dataset = match parse_csv(csv) {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(error = %err, "Dataset could not be parsed");
                warnings.push(err.to_string());
                return None;
            }
        };

        let data_key = request
            .data_key
            .clone()
            .unwrap_or_else(|| payload.join_key.clone());
        if let Err(err) = dataset.require_column(&data_key) {
            warnings.push(err.to_string());
            return None;
        }

        let mut keys = JoinKeys::new(payload.join_key.clone(), data_key);
        if payload.join_key != DEFAULT_GEO_KEY {
            keys = keys.with_geo_fallback(DEFAULT_GEO_KEY);
        }

        Some(join(&layer.features, &dataset.rows, &keys))
    }
}

fn hint(location: &LocationEntry) -> Option<String> {
    ["commune", "ville", "city"]
        .iter()
        .find_map(|key| location.properties.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn location_feature(location: &LocationEntry, result: GeocodeResult) -> Feature {
    let mut properties: Properties = location.properties.clone();
    properties.insert("name".to_string(), Value::String(location.address.clone()));
    properties.insert(
        "address".to_string(),
        Value::String(result.formatted_address),
    );
    properties.insert("approximate".to_string(), Value::Bool(result.approximate));
    if let Some(code) = &location.code_insee {
        properties.insert("codeINSEE".to_string(), Value::String(code.clone()));
    }
    Feature::point(result.latitude, result.longitude, properties)
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
