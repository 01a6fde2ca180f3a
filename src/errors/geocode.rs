//! Address lookup error types
//!
//! These never reach callers of the geocoding adapter: every variant is
//! converted into an approximate fallback coordinate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geocoder returned status {0}")]
    Status(u16),

    #[error("no result for '{0}'")]
    NoResult(String),

    #[error("result for '{query}' outside region ({latitude}, {longitude})")]
    OutOfRegion {
        query: String,
        latitude: f64,
        longitude: f64,
    },
}
