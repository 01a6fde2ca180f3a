use std::{collections::HashMap, path::PathBuf, time::Duration};

use serde::Serialize;

/// Named reference point used when an address cannot be placed inside the region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FallbackCity {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Latitude/longitude box used to reject geocoder hits outside the target region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

/// Administrative region every generated map is locked to.
#[derive(Clone, Debug, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub country: &'static str,
    pub bounds: BoundingBox,
    pub fallback_cities: &'static [FallbackCity],
}

static BFC_CITIES: &[FallbackCity] = &[
    FallbackCity {
        name: "Dijon",
        latitude: 47.3220,
        longitude: 5.0415,
    },
    FallbackCity {
        name: "Besançon",
        latitude: 47.2378,
        longitude: 6.0241,
    },
    FallbackCity {
        name: "Belfort",
        latitude: 47.6380,
        longitude: 6.8628,
    },
    FallbackCity {
        name: "Chalon-sur-Saône",
        latitude: 46.7808,
        longitude: 4.8539,
    },
    FallbackCity {
        name: "Auxerre",
        latitude: 47.7986,
        longitude: 3.5673,
    },
    FallbackCity {
        name: "Mâcon",
        latitude: 46.3069,
        longitude: 4.8287,
    },
    FallbackCity {
        name: "Nevers",
        latitude: 46.9896,
        longitude: 3.1590,
    },
    FallbackCity {
        name: "Vesoul",
        latitude: 47.6234,
        longitude: 6.1555,
    },
];

impl Region {
    pub fn bourgogne_franche_comte() -> Self {
        Self {
            name: "Bourgogne-Franche-Comté",
            abbreviation: "BFC",
            country: "France",
            bounds: BoundingBox {
                min_lat: 46.0,
                max_lat: 48.5,
                min_lon: 2.5,
                max_lon: 7.5,
            },
            fallback_cities: BFC_CITIES,
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::bourgogne_franche_comte()
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub concurrency: usize,
    pub request_timeout: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub llm: LlmConfig,
    pub geocoder: GeocoderConfig,
    pub data_dir: PathBuf,
    pub cors_origin: Option<String>,
    pub region: Region,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut values = HashMap::new();
        for (key, default) in Self::tracked_keys() {
            let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
            values.insert(key.to_string(), value);
        }
        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Self {
        fn read(values: &HashMap<String, String>, key: &str, default: &str) -> String {
            values
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        fn optional(values: &HashMap<String, String>, key: &str) -> Option<String> {
            values
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        let timeout_secs = values
            .get("GEOPROMPT_LLM_TIMEOUT_SECS")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(90);
        let temperature = values
            .get("GEOPROMPT_LLM_TEMPERATURE")
            .and_then(|value| value.trim().parse().ok())
            .filter(|value: &f32| (0.0..=2.0).contains(value))
            .unwrap_or(0.2);
        let concurrency = values
            .get("GEOPROMPT_GEOCODE_CONCURRENCY")
            .and_then(|value| value.trim().parse().ok())
            .filter(|value: &usize| *value > 0)
            .unwrap_or(1);

        Self {
            database_url: read(
                values,
                "GEOPROMPT_DATABASE_URL",
                "sqlite://geoprompt.db?mode=rwc",
            ),
            llm: LlmConfig {
                api_key: optional(values, "MISTRAL_API_KEY"),
                base_url: read(values, "MISTRAL_BASE_URL", "https://api.mistral.ai/v1"),
                model: read(values, "GEOPROMPT_MISTRAL_MODEL", "mistral-large-latest"),
                temperature,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            geocoder: GeocoderConfig {
                endpoint: read(
                    values,
                    "GEOPROMPT_GEOCODER_URL",
                    "https://api-adresse.data.gouv.fr/search/",
                ),
                concurrency,
                request_timeout: Duration::from_secs(10),
            },
            data_dir: PathBuf::from(read(values, "GEOPROMPT_DATA_DIR", "data")),
            cors_origin: optional(values, "GEOPROMPT_CORS_ORIGIN"),
            region: Region::bourgogne_franche_comte(),
        }
    }

    fn tracked_keys() -> Vec<(&'static str, &'static str)> {
        vec![
            ("GEOPROMPT_DATABASE_URL", "sqlite://geoprompt.db?mode=rwc"),
            ("MISTRAL_API_KEY", ""),
            ("MISTRAL_BASE_URL", "https://api.mistral.ai/v1"),
            ("GEOPROMPT_MISTRAL_MODEL", "mistral-large-latest"),
            ("GEOPROMPT_LLM_TEMPERATURE", "0.2"),
            ("GEOPROMPT_LLM_TIMEOUT_SECS", "90"),
            (
                "GEOPROMPT_GEOCODER_URL",
                "https://api-adresse.data.gouv.fr/search/",
            ),
            ("GEOPROMPT_GEOCODE_CONCURRENCY", "1"),
            ("GEOPROMPT_DATA_DIR", "data"),
            ("GEOPROMPT_CORS_ORIGIN", ""),
        ]
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_values_missing() {
        let config = AppConfig::from_map(&HashMap::new());
        assert_eq!(config.llm.model, "mistral-large-latest");
        assert_eq!(config.llm.api_key, None);
        assert_eq!(config.geocoder.concurrency, 1);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(90));
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let mut values = HashMap::new();
        values.insert("GEOPROMPT_GEOCODE_CONCURRENCY".to_string(), "0".to_string());
        values.insert("GEOPROMPT_LLM_TEMPERATURE".to_string(), "hot".to_string());
        values.insert("MISTRAL_API_KEY".to_string(), "  ".to_string());

        let config = AppConfig::from_map(&values);
        assert_eq!(config.geocoder.concurrency, 1);
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn fallback_cities_sit_inside_region() {
        let region = Region::bourgogne_franche_comte();
        assert!(region.fallback_cities.len() >= 8);
        for city in region.fallback_cities {
            // jitter is at most 0.05 degrees in each direction
            assert!(region.bounds.contains(city.latitude - 0.05, city.longitude - 0.05));
            assert!(region.bounds.contains(city.latitude + 0.05, city.longitude + 0.05));
        }
    }

    #[test]
    fn bounding_box_rejects_outside_points() {
        let bounds = Region::default().bounds;
        assert!(bounds.contains(47.32, 5.04));
        assert!(!bounds.contains(48.8566, 2.3522));
        assert!(!bounds.contains(f64::NAN, 5.0));
    }
}
