use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::tenant;
use policy::{
    Action, Actor, Resource, authorize, authorize_owner, fetch_visible, visible,
    validation::{FieldErrors, TenantDraft, validate_tenant},
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
pub struct CreateTenantRequest {
    /// User with role `tenant` this profile extends
    pub user_id: i32,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    pub alternative_phone: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTenantRequest {
    pub user_id: Option<i32>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    pub alternative_phone: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    pub id: i32,
    pub user_id: i32,
    pub phone: String,
    pub alternative_phone: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tenant::Model> for TenantResponse {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            phone: model.phone,
            alternative_phone: model.alternative_phone,
            identification_type: model.identification_type,
            identification_number: model.identification_number,
            emergency_contact_name: model.emergency_contact_name,
            emergency_contact_phone: model.emergency_contact_phone,
            emergency_contact_relationship: model.emergency_contact_relationship,
            occupation: model.occupation,
            employer: model.employer,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct TenantQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub user_id: Option<i32>,
}

/// Create a tenant profile
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    tag = "tenants",
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant profile created successfully", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_tenant(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TenantResponse>>), ApiError> {
    authorize(&current.actor, Action::Create, Resource::Tenant)?;
    let errors = FieldErrors::from_shape(request.validate());
    validate_tenant(
        &state.db,
        errors,
        &TenantDraft {
            id: None,
            user_id: request.user_id,
        },
    )
    .await?;

    let saved = tenant::ActiveModel {
        user_id: Set(request.user_id),
        phone: Set(request.phone),
        alternative_phone: Set(request.alternative_phone),
        identification_type: Set(request.identification_type),
        identification_number: Set(request.identification_number),
        emergency_contact_name: Set(request.emergency_contact_name),
        emergency_contact_phone: Set(request.emergency_contact_phone),
        emergency_contact_relationship: Set(request.emergency_contact_relationship),
        occupation: Set(request.occupation),
        employer: Set(request.employer),
        notes: Set(request.notes),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Tenant profile {} created for user {}", saved.id, saved.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TenantResponse::from(saved),
            "Tenant profile created successfully",
        )),
    ))
}

/// List tenant profiles visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    tag = "tenants",
    params(TenantQuery),
    responses(
        (status = 200, description = "Tenant profiles retrieved successfully", body = ApiResponse<Vec<TenantResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_tenants(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<TenantQuery>>,
) -> Result<Json<ApiResponse<Vec<TenantResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Tenant)?;

    let mut select = visible::<tenant::Entity>(&current.actor);
    if let Some(user_id) = query.user_id {
        select = select.filter(tenant::Column::UserId.eq(user_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let tenants = select
        .order_by_asc(tenant::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        tenants.into_iter().map(TenantResponse::from).collect(),
        "Tenant profiles retrieved successfully",
    )))
}

/// Get a tenant profile by ID
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = i32, Path, description = "Tenant profile ID")),
    responses(
        (status = 200, description = "Tenant profile retrieved successfully", body = ApiResponse<TenantResponse>),
        (status = 404, description = "Tenant profile not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_tenant(
    Path(tenant_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<TenantResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Tenant)?;
    let found = fetch_visible::<tenant::Entity, _>(&state.db, &current.actor, tenant_id).await?;
    Ok(Json(ApiResponse::new(
        TenantResponse::from(found),
        "Tenant profile retrieved successfully",
    )))
}

/// Update a tenant profile; tenants may edit only their own
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = i32, Path, description = "Tenant profile ID")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Tenant profile updated successfully", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Tenant profile not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_tenant(
    Path(tenant_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateTenantRequest>,
) -> Result<Json<ApiResponse<TenantResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Tenant)?;
    let existing = fetch_visible::<tenant::Entity, _>(&state.db, &actor, tenant_id).await?;
    authorize_owner(&actor, Action::Update, Resource::Tenant, &existing)?;

    let mut errors = FieldErrors::from_shape(request.validate());
    let user_id = request.user_id.unwrap_or(existing.user_id);
    if matches!(actor, Actor::Tenant { .. }) && user_id != existing.user_id {
        errors.add("user", "read_only", "Tenants cannot move their profile to another user.");
    }
    validate_tenant(
        &state.db,
        errors,
        &TenantDraft {
            id: Some(existing.id),
            user_id,
        },
    )
    .await?;

    let mut active: tenant::ActiveModel = existing.into();
    active.user_id = Set(user_id);
    if let Some(phone) = request.phone {
        active.phone = Set(phone);
    }
    if let Some(value) = request.alternative_phone {
        active.alternative_phone = Set(Some(value));
    }
    if let Some(value) = request.identification_type {
        active.identification_type = Set(Some(value));
    }
    if let Some(value) = request.identification_number {
        active.identification_number = Set(Some(value));
    }
    if let Some(value) = request.emergency_contact_name {
        active.emergency_contact_name = Set(Some(value));
    }
    if let Some(value) = request.emergency_contact_phone {
        active.emergency_contact_phone = Set(Some(value));
    }
    if let Some(value) = request.emergency_contact_relationship {
        active.emergency_contact_relationship = Set(Some(value));
    }
    if let Some(value) = request.occupation {
        active.occupation = Set(Some(value));
    }
    if let Some(value) = request.employer {
        active.employer = Set(Some(value));
    }
    if let Some(value) = request.notes {
        active.notes = Set(Some(value));
    }

    let updated = active.update(&state.db).await?;
    info!("Tenant profile {} updated", updated.id);
    Ok(Json(ApiResponse::new(
        TenantResponse::from(updated),
        "Tenant profile updated successfully",
    )))
}

/// Delete a tenant profile
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = i32, Path, description = "Tenant profile ID")),
    responses(
        (status = 200, description = "Tenant profile deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Tenant profile not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_tenant(
    Path(tenant_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Delete, Resource::Tenant)?;
    let existing = fetch_visible::<tenant::Entity, _>(&state.db, &actor, tenant_id).await?;
    authorize_owner(&actor, Action::Delete, Resource::Tenant, &existing)?;
    existing.delete(&state.db).await?;

    info!("Tenant profile {} deleted", tenant_id);
    Ok(Json(ApiResponse::new(
        format!("Tenant profile {tenant_id} deleted"),
        "Tenant profile deleted successfully",
    )))
}
