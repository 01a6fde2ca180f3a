//! Attribute join between boundary features and tabular rows.

use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{JoinError, JoinResult};
use crate::geojson::{Feature, FeatureCollection, Properties};

/// One data row keyed by column name, in header order.
pub type DataRow = IndexMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinKeys {
    pub geo_key: String,
    #[serde(default)]
    pub geo_key_fallback: Option<String>,
    pub data_key: String,
}

impl JoinKeys {
    pub fn new(geo_key: impl Into<String>, data_key: impl Into<String>) -> Self {
        Self {
            geo_key: geo_key.into(),
            geo_key_fallback: None,
            data_key: data_key.into(),
        }
    }

    pub fn with_geo_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.geo_key_fallback = Some(fallback.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStats {
    pub total_data_rows: usize,
    pub total_geo_features: usize,
    pub joined_features: usize,
    /// Share of data rows that found a feature; 0 when there are no rows.
    pub joined_percentage: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JoinOutput {
    pub features: FeatureCollection,
    pub stats: JoinStats,
}

/// Integral floats render without a fractional part, so `21231.0` keys as `21231`.
fn number_string(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => number.to_string(),
    }
}

/// Key value as a trimmed string; numbers and booleans are stringified.
fn key_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number_string(number)),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn feature_key(feature: &Feature, keys: &JoinKeys) -> Option<String> {
    key_string(feature.properties.get(&keys.geo_key)).or_else(|| {
        keys.geo_key_fallback
            .as_ref()
            .and_then(|fallback| key_string(feature.properties.get(fallback)))
    })
}

pub fn joined_percentage(joined: usize, total_rows: usize) -> u32 {
    if total_rows == 0 {
        return 0;
    }
    (100.0 * joined as f64 / total_rows as f64).round() as u32
}

/// Join rows onto features. Features without a matching row are dropped;
/// row values win over feature properties on name collisions.
pub fn join(features: &[Feature], rows: &[DataRow], keys: &JoinKeys) -> JoinOutput {
    let mut joined = Vec::new();

    for feature in features {
        let Some(geo_value) = feature_key(feature, keys) else {
            continue;
        };

        let matched = rows
            .iter()
            .find(|row| key_string(row.get(&keys.data_key)).as_deref() == Some(geo_value.as_str()));

        if let Some(row) = matched {
            let mut properties: Properties = feature.properties.clone();
            for (column, value) in row {
                properties.insert(column.clone(), value.clone());
            }
            let mut output = Feature::new(feature.geometry.clone(), properties);
            output.id = feature.id.clone();
            joined.push(output);
        }
    }

    let stats = JoinStats {
        total_data_rows: rows.len(),
        total_geo_features: features.len(),
        joined_features: joined.len(),
        joined_percentage: joined_percentage(joined.len(), rows.len()),
    };

    tracing::info!(
        total_data_rows = stats.total_data_rows,
        total_geo_features = stats.total_geo_features,
        joined_features = stats.joined_features,
        joined_percentage = stats.joined_percentage,
        "Joined dataset onto boundaries"
    );

    JoinOutput {
        features: FeatureCollection::new(joined),
        stats,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsvDataset {
    pub headers: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl CsvDataset {
    pub fn require_column(&self, column: &str) -> JoinResult<()> {
        if self.headers.iter().any(|header| header == column) {
            Ok(())
        } else {
            Err(JoinError::MissingColumn(column.to_string()))
        }
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if !header.contains(',') && header.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Parse CSV text: first line is the header, fields may be double-quoted.
pub fn parse_csv(text: &str) -> JoinResult<CsvDataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let row: DataRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.clone(), Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(JoinError::EmptyDataset);
    }

    Ok(CsvDataset { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(properties: Value, geometry: Value) -> Feature {
        let Value::Object(properties) = properties else {
            panic!("properties must be an object");
        };
        Feature::new(geometry, properties)
    }

    fn row(pairs: &[(&str, &str)]) -> DataRow {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), json!(value)))
            .collect()
    }

    #[test]
    fn joins_matching_features_and_drops_the_rest() {
        let g1 = json!({ "type": "Polygon", "coordinates": [[[5.0, 47.0], [5.1, 47.0], [5.1, 47.1], [5.0, 47.0]]] });
        let g2 = json!({ "type": "Polygon", "coordinates": [[[6.0, 47.0], [6.1, 47.0], [6.1, 47.1], [6.0, 47.0]]] });
        let features = vec![
            feature(json!({ "code": "21231" }), g1.clone()),
            feature(json!({ "code": "25056" }), g2),
        ];
        let rows = vec![row(&[("insee", "21231"), ("population", "150000")])];

        let output = join(&features, &rows, &JoinKeys::new("code", "insee"));

        assert_eq!(output.features.len(), 1);
        let joined = &output.features.features[0];
        assert_eq!(joined.geometry, g1);
        assert_eq!(joined.properties["code"], json!("21231"));
        assert_eq!(joined.properties["population"], json!("150000"));
        assert_eq!(joined.properties["insee"], json!("21231"));
        assert_eq!(
            output.stats,
            JoinStats {
                total_data_rows: 1,
                total_geo_features: 2,
                joined_features: 1,
                joined_percentage: 100,
            }
        );
    }

    #[test]
    fn integral_float_keys_match_integer_text() {
        let features = vec![
            feature(json!({ "code": 21231.0 }), Value::Null),
            feature(json!({ "code": 25056.5 }), Value::Null),
        ];
        let rows = parse_csv("code,v\n21231,1\n25056,2\n").unwrap().rows;

        let output = join(&features, &rows, &JoinKeys::new("code", "code"));
        assert_eq!(output.stats.joined_features, 1);
        assert_eq!(output.features.features[0].properties["v"], json!("1"));
    }

    #[test]
    fn row_values_win_collisions_and_keys_are_trimmed_and_coerced() {
        let features = vec![feature(json!({ "code": 21231, "nom": "Dijon" }), Value::Null)];
        let rows = vec![row(&[("code", " 21231 "), ("nom", "DIJON")])];

        let output = join(&features, &rows, &JoinKeys::new("code", "code"));
        assert_eq!(output.stats.joined_features, 1);
        assert_eq!(output.features.features[0].properties["nom"], json!("DIJON"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let features = vec![feature(json!({ "code": "2A004" }), Value::Null)];
        let rows = vec![row(&[("code", "2a004")])];
        assert_eq!(join(&features, &rows, &JoinKeys::new("code", "code")).stats.joined_features, 0);
    }

    #[test]
    fn secondary_geo_key_is_used_when_primary_absent() {
        let features = vec![feature(json!({ "INSEE_COM": "25056" }), Value::Null)];
        let rows = vec![row(&[("insee", "25056")])];

        let keys = JoinKeys::new("code", "insee").with_geo_fallback("INSEE_COM");
        assert_eq!(join(&features, &rows, &keys).stats.joined_features, 1);
        assert_eq!(
            join(&features, &rows, &JoinKeys::new("code", "insee")).stats.joined_features,
            0
        );
    }

    #[test]
    fn first_matching_row_wins() {
        let features = vec![feature(json!({ "code": "1" }), Value::Null)];
        let rows = vec![row(&[("code", "1"), ("v", "first")]), row(&[("code", "1"), ("v", "second")])];
        let output = join(&features, &rows, &JoinKeys::new("code", "code"));
        assert_eq!(output.features.features[0].properties["v"], json!("first"));
        assert_eq!(output.stats.joined_percentage, 50);
    }

    #[test]
    fn join_is_idempotent() {
        let features = vec![
            feature(json!({ "code": "1" }), json!({ "type": "Point", "coordinates": [5.0, 47.0] })),
            feature(json!({ "code": "2" }), json!({ "type": "Point", "coordinates": [6.0, 47.5] })),
        ];
        let rows = vec![row(&[("code", "2"), ("x", "b")]), row(&[("code", "1"), ("x", "a")])];
        let keys = JoinKeys::new("code", "code");

        assert_eq!(join(&features, &rows, &keys), join(&features, &rows, &keys));
    }

    #[test]
    fn percentage_rounds_and_handles_empty_rows() {
        assert_eq!(joined_percentage(1, 3), 33);
        assert_eq!(joined_percentage(2, 3), 67);
        assert_eq!(joined_percentage(0, 0), 0);
        assert_eq!(join(&[], &[], &JoinKeys::new("a", "b")).stats.joined_percentage, 0);
    }

    #[test]
    fn parses_quoted_csv() {
        let dataset = parse_csv("insee,nom,population\n\"21231\",\"Dijon\",159346\n25056,Besançon,\" 119198\"\n\n").unwrap();
        assert_eq!(dataset.headers, vec!["insee", "nom", "population"]);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.rows[0]["nom"], json!("Dijon"));
        assert_eq!(dataset.rows[1]["population"], json!("119198"));
        assert!(dataset.require_column("insee").is_ok());
        assert!(matches!(dataset.require_column("code"), Err(JoinError::MissingColumn(_))));
    }

    #[test]
    fn parses_semicolon_csv_and_rejects_empty() {
        let dataset = parse_csv("code;taux\n21231;12,5\n").unwrap();
        assert_eq!(dataset.rows[0]["taux"], json!("12,5"));
        assert!(matches!(parse_csv("code,taux\n"), Err(JoinError::EmptyDataset)));
    }
}
