pub mod config;
pub mod errors;
pub mod geojson;
pub mod payload;
pub mod pipeline;

pub mod database;
pub mod services;

#[cfg(feature = "server")]
pub mod server;

pub use config::AppConfig;
pub use errors::{CoreError, CoreErrorKind, CoreResult};
