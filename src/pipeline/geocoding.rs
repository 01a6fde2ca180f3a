//! Address lookup with a region lock.
//!
//! `GeocodingAdapter::geocode` never fails: a lookup error, an empty answer or
//! a hit outside the region bounding box all degrade to a jittered point
//! around one of the region's reference cities.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{FallbackCity, GeocoderConfig, Region};
use crate::errors::GeocodeError;

const JITTER_DEGREES: f64 = 0.05;

/// Raw answer from an address lookup backend.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<GeocodeHit, GeocodeError>;
}

/// Client for the French national address API (`GET <endpoint>?q=...&limit=1`).
pub struct AddressApiLookup {
    endpoint: String,
    client: Client,
}

impl AddressApiLookup {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        Self::with_timeout(config.endpoint.clone(), config.request_timeout)
    }

    pub fn with_timeout(endpoint: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    features: Vec<LookupFeature>,
}

#[derive(Debug, Deserialize)]
struct LookupFeature {
    geometry: LookupGeometry,
    #[serde(default)]
    properties: LookupProperties,
}

#[derive(Debug, Deserialize)]
struct LookupGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupProperties {
    label: Option<String>,
}

#[async_trait]
impl AddressLookup for AddressApiLookup {
    async fn lookup(&self, query: &str) -> Result<GeocodeHit, GeocodeError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("limit", "1")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status().as_u16()));
        }

        let body: LookupResponse = resp.json().await?;
        let feature = body
            .features
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResult(query.to_string()))?;

        // coordinates are [longitude, latitude]
        match feature.geometry.coordinates.as_slice() {
            [longitude, latitude, ..] => Ok(GeocodeHit {
                latitude: *latitude,
                longitude: *longitude,
                label: feature
                    .properties
                    .label
                    .unwrap_or_else(|| query.to_string()),
            }),
            _ => Err(GeocodeError::NoResult(query.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    /// Set when the coordinate is a jittered reference city rather than a lookup hit.
    pub approximate: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeocodeRequest {
    pub location: String,
    pub hint: Option<String>,
}

impl GeocodeRequest {
    pub fn new(location: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            location: location.into(),
            hint,
        }
    }
}

#[derive(Clone)]
pub struct GeocodingAdapter {
    lookup: Arc<dyn AddressLookup>,
    region: Region,
    concurrency: usize,
}

impl GeocodingAdapter {
    pub fn new(lookup: Arc<dyn AddressLookup>, region: Region) -> Self {
        Self {
            lookup,
            region,
            concurrency: 1,
        }
    }

    /// Width of the fan-out used by `geocode_all`; 1 keeps lookups strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Query strings in the order they are tried.
    pub fn candidate_queries(&self, location: &str, hint: Option<&str>) -> Vec<String> {
        let location = location.trim();
        let context = hint
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(|hint| format!(", {}", hint))
            .unwrap_or_default();

        vec![
            format!("{}{}, {}", location, context, self.region.name),
            format!("{}{}, {}", location, context, self.region.abbreviation),
            format!("{}, {}", location, self.region.country),
            location.to_string(),
        ]
    }

    pub async fn geocode(&self, location: &str, hint: Option<&str>) -> GeocodeResult {
        for query in self.candidate_queries(location, hint) {
            match self.try_query(&query).await {
                Ok(hit) => {
                    tracing::debug!(query = %query, label = %hit.label, "Geocoded location");
                    return GeocodeResult {
                        latitude: hit.latitude,
                        longitude: hit.longitude,
                        formatted_address: hit.label,
                        approximate: false,
                    };
                }
                Err(err) => {
                    tracing::debug!(query = %query, error = %err, "Geocoding candidate rejected");
                }
            }
        }

        let result = self.fallback(location);
        tracing::warn!(
            location = %location,
            address = %result.formatted_address,
            "Geocoding failed, using approximate coordinates"
        );
        result
    }

    /// Geocode a batch, preserving input order in the output.
    pub async fn geocode_all(&self, requests: &[GeocodeRequest]) -> Vec<GeocodeResult> {
        stream::iter(requests.iter().cloned())
            .map(|request| async move {
                self.geocode(&request.location, request.hint.as_deref())
                    .await
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn try_query(&self, query: &str) -> Result<GeocodeHit, GeocodeError> {
        let hit = self.lookup.lookup(query).await?;
        if !self.region.bounds.contains(hit.latitude, hit.longitude) {
            return Err(GeocodeError::OutOfRegion {
                query: query.to_string(),
                latitude: hit.latitude,
                longitude: hit.longitude,
            });
        }
        Ok(hit)
    }

    pub fn fallback(&self, location: &str) -> GeocodeResult {
        self.fallback_with(location, &mut rand::thread_rng())
    }

    pub fn fallback_with<R: Rng>(&self, location: &str, rng: &mut R) -> GeocodeResult {
        let city = self
            .region
            .fallback_cities
            .choose(rng)
            .copied()
            .unwrap_or_else(|| self.region_center());

        let latitude = city.latitude + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES);
        let longitude = city.longitude + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES);
        let bounds = self.region.bounds;

        GeocodeResult {
            latitude: latitude.clamp(bounds.min_lat, bounds.max_lat),
            longitude: longitude.clamp(bounds.min_lon, bounds.max_lon),
            formatted_address: format!("{} (approx. {})", location.trim(), city.name),
            approximate: true,
        }
    }

    fn region_center(&self) -> FallbackCity {
        let bounds = self.region.bounds;
        FallbackCity {
            name: self.region.name,
            latitude: (bounds.min_lat + bounds.max_lat) / 2.0,
            longitude: (bounds.min_lon + bounds.max_lon) / 2.0,
        }
    }
}
