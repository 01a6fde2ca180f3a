use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::database::entities::reference_documents;
use crate::errors::{CoreError, CoreResult};
use crate::pipeline::{ReferenceDocument, ReferenceStore};
use crate::services::authorization::Actor;
use crate::services::validation::ValidationService;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub name: String,
    pub description: Option<String>,
    pub usage_prompt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub embedding_processed: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub usage_prompt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub embedding_processed: Option<bool>,
}

/// Admin-managed reference material for prompt context.
#[derive(Clone)]
pub struct ReferenceDocumentService {
    db: DatabaseConnection,
}

impl ReferenceDocumentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateDocumentRequest,
    ) -> CoreResult<reference_documents::Model> {
        actor.require_admin()?;

        let name = ValidationService::validate_title("Document name", &request.name)?;
        let tags = ValidationService::normalize_tags(&request.tags);
        let now = Utc::now();

        let document = reference_documents::ActiveModel {
            name: Set(name),
            description: Set(ValidationService::validate_description(
                request.description.as_deref(),
            )?),
            usage_prompt: Set(ValidationService::validate_description(
                request.usage_prompt.as_deref(),
            )?),
            tags: Set(encode_tags(&tags)?),
            is_active: Set(true),
            embedding_processed: Set(request.embedding_processed),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(document_id = document.id, name = %document.name, "Created reference document");
        Ok(document)
    }

    /// All documents, oldest first, including inactive ones.
    pub async fn list(&self) -> CoreResult<Vec<reference_documents::Model>> {
        Ok(reference_documents::Entity::find()
            .order_by_asc(reference_documents::Column::CreatedAt)
            .order_by_asc(reference_documents::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, id: i32) -> CoreResult<reference_documents::Model> {
        reference_documents::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("ReferenceDocument", id.to_string()))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        request: UpdateDocumentRequest,
    ) -> CoreResult<reference_documents::Model> {
        actor.require_admin()?;

        let mut document: reference_documents::ActiveModel = self.get(id).await?.into();

        if let Some(name) = request.name {
            document.name = Set(ValidationService::validate_title("Document name", &name)?);
        }
        if let Some(description) = request.description {
            document.description = Set(ValidationService::validate_description(Some(&description))?);
        }
        if let Some(usage_prompt) = request.usage_prompt {
            document.usage_prompt =
                Set(ValidationService::validate_description(Some(&usage_prompt))?);
        }
        if let Some(tags) = request.tags {
            document.tags = Set(encode_tags(&ValidationService::normalize_tags(&tags))?);
        }
        if let Some(is_active) = request.is_active {
            document.is_active = Set(is_active);
        }
        if let Some(embedding_processed) = request.embedding_processed {
            document.embedding_processed = Set(embedding_processed);
        }
        document.updated_at = Set(Utc::now());

        Ok(document.update(&self.db).await?)
    }

    /// Soft delete: the document stays listed but leaves the prompt context.
    pub async fn deactivate(&self, actor: &Actor, id: i32) -> CoreResult<reference_documents::Model> {
        self.update(
            actor,
            id,
            UpdateDocumentRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn mark_processed(
        &self,
        actor: &Actor,
        id: i32,
    ) -> CoreResult<reference_documents::Model> {
        self.update(
            actor,
            id,
            UpdateDocumentRequest {
                embedding_processed: Some(true),
                ..Default::default()
            },
        )
        .await
    }
}

#[async_trait]
impl ReferenceStore for ReferenceDocumentService {
    async fn active_documents(&self) -> CoreResult<Vec<ReferenceDocument>> {
        let documents = reference_documents::Entity::find()
            .filter(reference_documents::Column::IsActive.eq(true))
            .order_by_asc(reference_documents::Column::CreatedAt)
            .order_by_asc(reference_documents::Column::Id)
            .all(&self.db)
            .await?;

        Ok(documents.into_iter().map(ReferenceDocument::from).collect())
    }
}

fn encode_tags(tags: &[String]) -> CoreResult<String> {
    serde_json::to_string(tags)
        .map_err(|e| CoreError::internal("Failed to encode tags").with_source(e))
}
