use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::database::entities::reference_documents;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::reference_document_service::{
    CreateDocumentRequest, ReferenceDocumentService, UpdateDocumentRequest,
};

pub async fn list_documents(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<reference_documents::Model>>, CoreError> {
    Ok(Json(ReferenceDocumentService::new(state.db).list().await?))
}

pub async fn create_document(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<Json<reference_documents::Model>, CoreError> {
    let document = ReferenceDocumentService::new(state.db)
        .create(&user.actor, payload)
        .await?;
    Ok(Json(document))
}

pub async fn get_document(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<reference_documents::Model>, CoreError> {
    Ok(Json(ReferenceDocumentService::new(state.db).get(id).await?))
}

pub async fn update_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> Result<Json<reference_documents::Model>, CoreError> {
    let document = ReferenceDocumentService::new(state.db)
        .update(&user.actor, id, payload)
        .await?;
    Ok(Json(document))
}

/// Documents are never hard-deleted; DELETE deactivates.
pub async fn deactivate_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<reference_documents::Model>, CoreError> {
    let document = ReferenceDocumentService::new(state.db)
        .deactivate(&user.actor, id)
        .await?;
    Ok(Json(document))
}

pub async fn mark_processed(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<reference_documents::Model>, CoreError> {
    let document = ReferenceDocumentService::new(state.db)
        .mark_processed(&user.actor, id)
        .await?;
    Ok(Json(document))
}
