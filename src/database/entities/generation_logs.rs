use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generation_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub parsed_response: Option<String>, // JSON
    pub success: bool,
    pub error_message: Option<String>,
    pub model_name: String,
    pub system_prompt: String,
    pub duration_ms: i64,
    pub validated: bool,
    pub validation_notes: Option<String>,
    pub corrected_geometry: Option<String>, // JSON
    pub validated_by: Option<i32>,
    pub validated_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
