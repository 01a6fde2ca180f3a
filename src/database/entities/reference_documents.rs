use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::ReferenceDocument;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reference_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub usage_prompt: Option<String>,
    pub tags: String, // JSON array of strings
    pub is_active: bool,
    pub embedding_processed: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}

impl From<Model> for ReferenceDocument {
    fn from(model: Model) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            usage_prompt: model.usage_prompt,
            tags,
            is_active: model.is_active,
            embedding_processed: model.embedding_processed,
            created_at: model.created_at,
        }
    }
}
