//! Typed view of the JSON object the model returns.
//!
//! The model is asked for one of three shapes, selected by a `type`
//! discriminator. The repair step can additionally produce a `fallback`
//! object. Anything else that parsed as an object is carried as `Other`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload of type '{kind}' is malformed: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Geocodage,
    Choroplethe,
    Complexe,
    Fallback,
    Other,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Geocodage => "geocodage",
            PayloadKind::Choroplethe => "choroplèthe",
            PayloadKind::Complexe => "complexe",
            PayloadKind::Fallback => "fallback",
            PayloadKind::Other => "other",
        }
    }

    /// Accepts the discriminator with or without accents and in any case.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'è' | 'é' | 'ê' => 'e',
                'ô' => 'o',
                other => other,
            })
            .collect();
        match normalized.as_str() {
            "geocodage" | "geocoding" => PayloadKind::Geocodage,
            "choroplethe" | "choropleth" => PayloadKind::Choroplethe,
            "complexe" | "complex" => PayloadKind::Complexe,
            "fallback" => PayloadKind::Fallback,
            _ => PayloadKind::Other,
        }
    }
}

/// One place the model wants pinned on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    #[serde(alias = "adresse", alias = "nom", alias = "name")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_f64", alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        alias = "lon",
        alias = "lng"
    )]
    pub longitude: Option<f64>,
    #[serde(
        rename = "codeINSEE",
        alias = "code_insee",
        alias = "insee",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_insee: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeocodagePayload {
    #[serde(
        alias = "points",
        alias = "adresses",
        alias = "addresses",
        alias = "data"
    )]
    pub locations: Vec<LocationEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethePayload {
    #[serde(rename = "dataLevel", alias = "data_level", alias = "niveau")]
    pub data_level: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(rename = "joinKey", alias = "join_key")]
    pub join_key: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexePayload {
    #[serde(default)]
    pub layers: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapPayload {
    Geocodage(GeocodagePayload),
    Choroplethe(ChoroplethePayload),
    Complexe(ComplexePayload),
    Fallback(Map<String, Value>),
    Other(Map<String, Value>),
}

impl MapPayload {
    /// Classify a repaired object by its `type` discriminator.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let Value::Object(mut object) = value else {
            return Err(PayloadError::NotAnObject);
        };

        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .map(PayloadKind::parse)
            .unwrap_or(PayloadKind::Other);

        fn shape<T: serde::de::DeserializeOwned>(
            kind: PayloadKind,
            object: Map<String, Value>,
        ) -> Result<T, PayloadError> {
            serde_json::from_value(Value::Object(object)).map_err(|source| {
                PayloadError::Malformed {
                    kind: kind.as_str(),
                    source,
                }
            })
        }

        match kind {
            PayloadKind::Geocodage => {
                object.remove("type");
                Ok(MapPayload::Geocodage(shape(kind, object)?))
            }
            PayloadKind::Choroplethe => {
                object.remove("type");
                Ok(MapPayload::Choroplethe(shape(kind, object)?))
            }
            PayloadKind::Complexe => {
                object.remove("type");
                Ok(MapPayload::Complexe(shape(kind, object)?))
            }
            PayloadKind::Fallback => Ok(MapPayload::Fallback(object)),
            PayloadKind::Other => Ok(MapPayload::Other(object)),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            MapPayload::Geocodage(_) => PayloadKind::Geocodage,
            MapPayload::Choroplethe(_) => PayloadKind::Choroplethe,
            MapPayload::Complexe(_) => PayloadKind::Complexe,
            MapPayload::Fallback(_) => PayloadKind::Fallback,
            MapPayload::Other(_) => PayloadKind::Other,
        }
    }

    pub fn to_value(&self) -> Value {
        let tagged = |value: Result<Value, serde_json::Error>, kind: PayloadKind| {
            let mut object = match value {
                Ok(Value::Object(object)) => object,
                _ => Map::new(),
            };
            object.insert("type".to_string(), Value::String(kind.as_str().to_string()));
            Value::Object(object)
        };

        match self {
            MapPayload::Geocodage(inner) => tagged(serde_json::to_value(inner), self.kind()),
            MapPayload::Choroplethe(inner) => tagged(serde_json::to_value(inner), self.kind()),
            MapPayload::Complexe(inner) => tagged(serde_json::to_value(inner), self.kind()),
            MapPayload::Fallback(object) | MapPayload::Other(object) => {
                Value::Object(object.clone())
            }
        }
    }

    /// Title carried by the payload, if the model supplied one.
    pub fn title(&self) -> Option<&str> {
        let extra = match self {
            MapPayload::Geocodage(inner) => &inner.extra,
            MapPayload::Choroplethe(inner) => &inner.extra,
            MapPayload::Complexe(inner) => &inner.extra,
            MapPayload::Fallback(object) | MapPayload::Other(object) => object,
        };
        extra.get("title").and_then(Value::as_str)
    }
}

impl Serialize for MapPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
