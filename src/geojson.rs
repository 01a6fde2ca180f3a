//! Minimal GeoJSON model used by the pipeline.
//!
//! Geometry is kept as an opaque JSON value: the pipeline only ever copies
//! it from boundary files or builds `Point`s, it never inspects shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub type Properties = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

impl Feature {
    pub fn new(geometry: Value, properties: Properties) -> Self {
        Self {
            kind: feature_type(),
            geometry,
            properties,
            id: None,
        }
    }

    /// Point feature; GeoJSON orders coordinates as [longitude, latitude].
    pub fn point(latitude: f64, longitude: f64, properties: Properties) -> Self {
        Self::new(
            json!({ "type": "Point", "coordinates": [longitude, latitude] }),
            properties,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self)
            .unwrap_or_else(|_| json!({ "type": "FeatureCollection", "features": [] }))
    }
}

/// Parse a single-object GeoJSON document: either a FeatureCollection or a lone Feature.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    if value.get("type").and_then(Value::as_str) == Some("Feature") {
        let feature: Feature = serde_json::from_value(value)?;
        return Ok(FeatureCollection::new(vec![feature]));
    }
    serde_json::from_value(value)
}

/// Parse newline-delimited GeoJSON, one Feature per non-blank line.
pub fn parse_geojsonl(text: &str) -> Result<FeatureCollection, serde_json::Error> {
    let features = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<Feature>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureCollection::new(features))
}

/// Loose well-formedness check applied before a generated map is persisted.
///
/// Returns the list of problems found; an empty list means the value is a
/// FeatureCollection whose entries all look like Features.
pub fn feature_collection_problems(value: &Value) -> Vec<String> {
    let mut problems = Vec::new();

    let Some(object) = value.as_object() else {
        problems.push("payload is not a JSON object".to_string());
        return problems;
    };

    if object.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        problems.push("type is not FeatureCollection".to_string());
    }

    match object.get("features") {
        Some(Value::Array(features)) => {
            for (index, feature) in features.iter().enumerate() {
                if feature.get("type").and_then(Value::as_str) != Some("Feature") {
                    problems.push(format!("features[{}] is not a Feature", index));
                }
                if feature.get("geometry").is_none() {
                    problems.push(format!("features[{}] has no geometry", index));
                }
            }
        }
        Some(_) => problems.push("features is not an array".to_string()),
        None => problems.push("features is missing".to_string()),
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_uses_lon_lat_order() {
        let feature = Feature::point(47.3, 5.0, Properties::new());
        assert_eq!(feature.geometry["coordinates"], json!([5.0, 47.3]));
        assert_eq!(feature.kind, "Feature");
    }

    #[test]
    fn parses_lone_feature_as_collection() {
        let text = r#"{"type":"Feature","geometry":null,"properties":{"code":"21"}}"#;
        let collection = parse_geojson(text).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].properties["code"], json!("21"));
    }

    #[test]
    fn parses_geojsonl_skipping_blank_lines() {
        let text = "{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"code\":\"21\"}}\n\n{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"code\":\"25\"}}\n";
        let collection = parse_geojsonl(text).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[1].properties["code"], json!("25"));
        assert_eq!(collection.kind, "FeatureCollection");
    }

    #[test]
    fn reports_malformed_collections() {
        assert!(feature_collection_problems(&FeatureCollection::default().to_value()).is_empty());
        assert_eq!(
            feature_collection_problems(&json!({ "type": "Feature", "features": [] })),
            vec!["type is not FeatureCollection".to_string()]
        );

        let broken = json!({ "type": "FeatureCollection", "features": [{ "type": "Point" }] });
        let problems = feature_collection_problems(&broken);
        assert_eq!(problems.len(), 2);

        assert_eq!(feature_collection_problems(&json!([])).len(), 1);
    }
}
