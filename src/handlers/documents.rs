use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::document::{self, FileType};
use policy::{
    Action, Resource, authorize, authorize_owner, fetch_visible, visible,
    validation::{DocumentDraft, FieldErrors, validate_document},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{ApiResponse, AppState, page_and_limit},
};

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateDocumentRequest {
    pub lease_id: Option<i32>,
    pub user_id: Option<i32>,
    pub property_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Opaque file reference
    #[validate(length(min = 1))]
    pub file: String,
    pub file_type: FileType,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateDocumentRequest {
    pub lease_id: Option<i32>,
    pub user_id: Option<i32>,
    pub property_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub file: Option<String>,
    pub file_type: Option<FileType>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: i32,
    pub lease_id: Option<i32>,
    pub user_id: Option<i32>,
    pub property_id: Option<i32>,
    pub title: String,
    pub file: String,
    pub file_type: FileType,
    pub description: Option<String>,
    pub uploaded_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<document::Model> for DocumentResponse {
    fn from(model: document::Model) -> Self {
        Self {
            id: model.id,
            lease_id: model.lease_id,
            user_id: model.user_id,
            property_id: model.property_id,
            title: model.title,
            file: model.file,
            file_type: model.file_type,
            description: model.description,
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct DocumentQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub file_type: Option<FileType>,
    pub lease_id: Option<i32>,
    pub property_id: Option<i32>,
}

/// Upload a document record; the caller becomes its uploader
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created successfully", body = ApiResponse<DocumentResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_document(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DocumentResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Document)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = DocumentDraft {
        lease_id: request.lease_id,
        user_id: request.user_id,
        property_id: request.property_id,
    };
    validate_document(&state.db, &actor, errors, &draft).await?;

    let saved = document::ActiveModel {
        lease_id: Set(request.lease_id),
        user_id: Set(request.user_id),
        property_id: Set(request.property_id),
        title: Set(request.title),
        file: Set(request.file),
        file_type: Set(request.file_type),
        description: Set(request.description),
        uploaded_by: Set(Some(actor.user_id())),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Document {} uploaded by user {}", saved.id, actor.user_id());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(DocumentResponse::from(saved), "Document created successfully")),
    ))
}

/// List documents visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Documents retrieved successfully", body = ApiResponse<Vec<DocumentResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_documents(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<DocumentQuery>>,
) -> Result<Json<ApiResponse<Vec<DocumentResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Document)?;

    let mut select = visible::<document::Entity>(&current.actor);
    if let Some(file_type) = query.file_type {
        select = select.filter(document::Column::FileType.eq(file_type));
    }
    if let Some(lease_id) = query.lease_id {
        select = select.filter(document::Column::LeaseId.eq(lease_id));
    }
    if let Some(property_id) = query.property_id {
        select = select.filter(document::Column::PropertyId.eq(property_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let documents = select
        .order_by_desc(document::Column::CreatedAt)
        .order_by_desc(document::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        documents.into_iter().map(DocumentResponse::from).collect(),
        "Documents retrieved successfully",
    )))
}

/// Get a document by ID
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}",
    tag = "documents",
    params(("document_id" = i32, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document retrieved successfully", body = ApiResponse<DocumentResponse>),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_document(
    Path(document_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<DocumentResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Document)?;
    let found = fetch_visible::<document::Entity, _>(&state.db, &current.actor, document_id).await?;
    Ok(Json(ApiResponse::new(
        DocumentResponse::from(found),
        "Document retrieved successfully",
    )))
}

/// Update a document; only its uploader, its subject or an admin may
#[utoipa::path(
    put,
    path = "/api/v1/documents/{document_id}",
    tag = "documents",
    params(("document_id" = i32, Path, description = "Document ID")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document updated successfully", body = ApiResponse<DocumentResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_document(
    Path(document_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<ApiResponse<DocumentResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Document)?;
    let existing = fetch_visible::<document::Entity, _>(&state.db, &actor, document_id).await?;
    authorize_owner(&actor, Action::Update, Resource::Document, &existing)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = DocumentDraft {
        lease_id: request.lease_id.or(existing.lease_id),
        user_id: request.user_id.or(existing.user_id),
        property_id: request.property_id.or(existing.property_id),
    };
    validate_document(&state.db, &actor, errors, &draft).await?;

    let mut active: document::ActiveModel = existing.into();
    active.lease_id = Set(draft.lease_id);
    active.user_id = Set(draft.user_id);
    active.property_id = Set(draft.property_id);
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(file) = request.file {
        active.file = Set(file);
    }
    if let Some(file_type) = request.file_type {
        active.file_type = Set(file_type);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse::new(
        DocumentResponse::from(updated),
        "Document updated successfully",
    )))
}

/// Delete a document; only its uploader, its subject or an admin may
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{document_id}",
    tag = "documents",
    params(("document_id" = i32, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_document(
    Path(document_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Delete, Resource::Document)?;
    let existing = fetch_visible::<document::Entity, _>(&state.db, &actor, document_id).await?;
    authorize_owner(&actor, Action::Delete, Resource::Document, &existing)?;
    existing.delete(&state.db).await?;

    info!("Document {} deleted", document_id);
    Ok(Json(ApiResponse::new(
        format!("Document {document_id} deleted"),
        "Document deleted successfully",
    )))
}
