use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{CoreError, CoreResult};
use crate::geojson::{parse_geojson, parse_geojsonl, FeatureCollection};
use crate::services::validation::ValidationService;

/// Declaration order is load preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerFormat {
    Geojson,
    Geojsonl,
}

impl LayerFormat {
    fn extension(&self) -> &'static str {
        match self {
            LayerFormat::Geojson => "geojson",
            LayerFormat::Geojsonl => "geojsonl",
        }
    }

    /// Only the extensions `load` resolves are listed.
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "geojson" => Some(LayerFormat::Geojson),
            "geojsonl" => Some(LayerFormat::Geojsonl),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub format: LayerFormat,
}

/// Boundary layers (communes, EPCI, départements) shipped as files in the data directory.
#[derive(Clone, Debug)]
pub struct StaticLayerService {
    data_dir: PathBuf,
}

impl StaticLayerService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Layers available on disk, sorted by name. A missing directory lists nothing.
    pub async fn list(&self) -> CoreResult<Vec<LayerSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(dir = %self.data_dir.display(), "Layer directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(CoreError::internal("Failed to read layer directory").with_source(err))
            }
        };

        let mut layers = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::internal("Failed to read layer directory").with_source(e))?
        {
            let path = entry.path();
            let (Some(stem), Some(extension)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };

            if let Some(format) = LayerFormat::from_extension(extension) {
                if ValidationService::validate_layer_name(stem).is_ok() {
                    layers.push(LayerSummary {
                        name: stem.to_string(),
                        format,
                    });
                }
            }
        }

        // one entry per name, in the format `load` would pick
        layers.sort_by(|a, b| a.name.cmp(&b.name).then(a.format.cmp(&b.format)));
        layers.dedup_by(|later, earlier| later.name == earlier.name);
        Ok(layers)
    }

    /// Load a layer by name, preferring `.geojson` over `.geojsonl`.
    pub async fn load(&self, name: &str) -> CoreResult<FeatureCollection> {
        let name = ValidationService::validate_layer_name(name)?;

        for format in [LayerFormat::Geojson, LayerFormat::Geojsonl] {
            let path = self
                .data_dir
                .join(format!("{}.{}", name, format.extension()));

            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(CoreError::internal("Failed to read layer file").with_source(err))
                }
            };

            let collection = match format {
                LayerFormat::Geojson => parse_geojson(&text),
                LayerFormat::Geojsonl => parse_geojsonl(&text),
            }
            .map_err(|e| {
                CoreError::internal(format!("Layer '{}' is not valid GeoJSON", name)).with_source(e)
            })?;

            debug!(layer = %name, features = collection.len(), "Loaded boundary layer");
            return Ok(collection);
        }

        Err(CoreError::not_found("Layer", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("departements.geojson"),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":null,"properties":{"code":"21"}}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("communes.geojsonl"),
            "{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"code\":\"21231\"}}\n{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"code\":\"25056\"}}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_lists_layer_files() {
        let dir = fixture();
        let service = StaticLayerService::new(dir.path());

        let layers = service.list().await.unwrap();
        assert_eq!(
            layers,
            vec![
                LayerSummary {
                    name: "communes".to_string(),
                    format: LayerFormat::Geojsonl
                },
                LayerSummary {
                    name: "departements".to_string(),
                    format: LayerFormat::Geojson
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_loads_both_formats() {
        let dir = fixture();
        let service = StaticLayerService::new(dir.path());

        assert_eq!(service.load("departements").await.unwrap().len(), 1);
        assert_eq!(service.load("communes").await.unwrap().len(), 2);

        let err = service.load("epci").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        let err = service.load("../secret").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_missing_directory_lists_nothing() {
        let service = StaticLayerService::new("/nonexistent/geoprompt-layers");
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listed_layers_are_loadable() {
        let dir = fixture();
        std::fs::write(dir.path().join("epci.json"), r#"{"type":"FeatureCollection","features":[]}"#)
            .unwrap();
        std::fs::write(dir.path().join("cantons.jsonl"), "").unwrap();
        std::fs::write(
            dir.path().join("departements.geojsonl"),
            "{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"code\":\"25\"}}\n",
        )
        .unwrap();
        let service = StaticLayerService::new(dir.path());

        let layers = service.list().await.unwrap();
        let names: Vec<&str> = layers.iter().map(|layer| layer.name.as_str()).collect();
        assert_eq!(names, vec!["communes", "departements"]);
        assert_eq!(layers[1].format, LayerFormat::Geojson);

        for layer in &layers {
            assert!(service.load(&layer.name).await.is_ok(), "{} should load", layer.name);
        }
    }
}
