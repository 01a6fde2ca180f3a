//! Prompt-to-map pipeline components.
//!
//! Each stage is usable on its own; `services::generation_service` wires them
//! together with persistence.

pub mod geo_join;
pub mod geocoding;
pub mod llm;
pub mod prompt_context;
pub mod response_repair;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::CoreResult;

pub use geo_join::{join, parse_csv, CsvDataset, DataRow, JoinKeys, JoinOutput, JoinStats};
pub use geocoding::{
    AddressApiLookup, AddressLookup, GeocodeHit, GeocodeRequest, GeocodeResult, GeocodingAdapter,
};
pub use llm::{LlmClient, MistralClient};
pub use prompt_context::{build_system_prompt, build_user_prompt, ReferenceDocument};
pub use response_repair::{repair, RepairContext, RepairOutcome, RepairStage};

/// Source of reference documents for prompt context.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Active documents, oldest first.
    async fn active_documents(&self) -> CoreResult<Vec<ReferenceDocument>>;
}

/// One generation attempt, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub user_id: Option<i32>,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub parsed_response: Option<Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub model_name: String,
    pub system_prompt: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Sink for generation attempts.
#[async_trait]
pub trait GenerationLogStore: Send + Sync {
    /// Persist the attempt and return its id.
    async fn record(&self, record: GenerationRecord) -> CoreResult<i32>;
}
