use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::lease::{self, LeaseStatus};
use policy::{
    Action, Actor, Resource, authorize, authorize_owner, fetch_visible, visible,
    validation::{FieldErrors, LeaseDraft, validate_lease},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{ApiResponse, AppState, page_and_limit},
};

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateLeaseRequest {
    pub property_id: i32,
    pub unit_id: i32,
    /// Tenant profile ID
    pub tenant_id: i32,
    /// Ignored for landlords, who always sign their own leases
    pub landlord_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Option<Decimal>,
    /// Defaults to `pending`
    pub status: Option<LeaseStatus>,
    /// Opaque file reference of the signed contract
    pub document: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateLeaseRequest {
    pub property_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub tenant_id: Option<i32>,
    pub landlord_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<Decimal>,
    pub security_deposit: Option<Decimal>,
    pub status: Option<LeaseStatus>,
    pub document: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaseResponse {
    pub id: i32,
    pub property_id: i32,
    pub unit_id: i32,
    pub tenant_id: i32,
    pub landlord_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
    pub status: LeaseStatus,
    pub document: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<lease::Model> for LeaseResponse {
    fn from(model: lease::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            unit_id: model.unit_id,
            tenant_id: model.tenant_id,
            landlord_id: model.landlord_id,
            start_date: model.start_date,
            end_date: model.end_date,
            monthly_rent: model.monthly_rent,
            security_deposit: model.security_deposit,
            status: model.status,
            document: model.document,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct LeaseQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub status: Option<LeaseStatus>,
    pub property_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub tenant_id: Option<i32>,
}

/// Create a lease
#[utoipa::path(
    post,
    path = "/api/v1/leases",
    tag = "leases",
    request_body = CreateLeaseRequest,
    responses(
        (status = 201, description = "Lease created successfully", body = ApiResponse<LeaseResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_lease(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateLeaseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LeaseResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Lease)?;

    let mut errors = FieldErrors::from_shape(request.validate());
    let landlord_id = match (actor, request.landlord_id) {
        (Actor::Landlord { user_id }, _) => user_id,
        (_, Some(id)) => id,
        (_, None) => {
            errors.add("landlord", "required", "This field is required.");
            return Err(errors.into_error().into());
        }
    };

    let draft = LeaseDraft {
        property_id: request.property_id,
        unit_id: request.unit_id,
        tenant_id: request.tenant_id,
        landlord_id,
        start_date: request.start_date,
        end_date: request.end_date,
        monthly_rent: request.monthly_rent,
        security_deposit: request.security_deposit.unwrap_or(Decimal::ZERO),
    };
    validate_lease(&state.db, &actor, errors, &draft).await?;

    debug!(
        "Creating lease of unit {} for tenant {} from {} to {}",
        draft.unit_id, draft.tenant_id, draft.start_date, draft.end_date
    );
    let saved = lease::ActiveModel {
        property_id: Set(draft.property_id),
        unit_id: Set(draft.unit_id),
        tenant_id: Set(draft.tenant_id),
        landlord_id: Set(draft.landlord_id),
        start_date: Set(draft.start_date),
        end_date: Set(draft.end_date),
        monthly_rent: Set(draft.monthly_rent),
        security_deposit: Set(draft.security_deposit),
        status: Set(request.status.unwrap_or(LeaseStatus::Pending)),
        document: Set(request.document),
        notes: Set(request.notes),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Lease created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(LeaseResponse::from(saved), "Lease created successfully")),
    ))
}

/// List leases visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/leases",
    tag = "leases",
    params(LeaseQuery),
    responses(
        (status = 200, description = "Leases retrieved successfully", body = ApiResponse<Vec<LeaseResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_leases(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<LeaseQuery>>,
) -> Result<Json<ApiResponse<Vec<LeaseResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Lease)?;

    let mut select = visible::<lease::Entity>(&current.actor);
    if let Some(status) = query.status {
        select = select.filter(lease::Column::Status.eq(status));
    }
    if let Some(property_id) = query.property_id {
        select = select.filter(lease::Column::PropertyId.eq(property_id));
    }
    if let Some(unit_id) = query.unit_id {
        select = select.filter(lease::Column::UnitId.eq(unit_id));
    }
    if let Some(tenant_id) = query.tenant_id {
        select = select.filter(lease::Column::TenantId.eq(tenant_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let leases = select
        .order_by_asc(lease::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    debug!("Retrieved {} leases", leases.len());
    Ok(Json(ApiResponse::new(
        leases.into_iter().map(LeaseResponse::from).collect(),
        "Leases retrieved successfully",
    )))
}

/// Get a lease by ID
#[utoipa::path(
    get,
    path = "/api/v1/leases/{lease_id}",
    tag = "leases",
    params(("lease_id" = i32, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease retrieved successfully", body = ApiResponse<LeaseResponse>),
        (status = 404, description = "Lease not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_lease(
    Path(lease_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<LeaseResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Lease)?;
    let found = fetch_visible::<lease::Entity, _>(&state.db, &current.actor, lease_id).await?;
    Ok(Json(ApiResponse::new(LeaseResponse::from(found), "Lease retrieved successfully")))
}

/// Update a lease
#[utoipa::path(
    put,
    path = "/api/v1/leases/{lease_id}",
    tag = "leases",
    params(("lease_id" = i32, Path, description = "Lease ID")),
    request_body = UpdateLeaseRequest,
    responses(
        (status = 200, description = "Lease updated successfully", body = ApiResponse<LeaseResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Lease not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_lease(
    Path(lease_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateLeaseRequest>,
) -> Result<Json<ApiResponse<LeaseResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Lease)?;
    let existing = fetch_visible::<lease::Entity, _>(&state.db, &actor, lease_id).await?;
    authorize_owner(&actor, Action::Update, Resource::Lease, &existing)?;

    let errors = FieldErrors::from_shape(request.validate());
    let landlord_id = match actor {
        Actor::Landlord { user_id } => user_id,
        _ => request.landlord_id.unwrap_or(existing.landlord_id),
    };
    let draft = LeaseDraft {
        property_id: request.property_id.unwrap_or(existing.property_id),
        unit_id: request.unit_id.unwrap_or(existing.unit_id),
        tenant_id: request.tenant_id.unwrap_or(existing.tenant_id),
        landlord_id,
        start_date: request.start_date.unwrap_or(existing.start_date),
        end_date: request.end_date.unwrap_or(existing.end_date),
        monthly_rent: request.monthly_rent.unwrap_or(existing.monthly_rent),
        security_deposit: request.security_deposit.unwrap_or(existing.security_deposit),
    };
    validate_lease(&state.db, &actor, errors, &draft).await?;

    let mut active: lease::ActiveModel = existing.into();
    active.property_id = Set(draft.property_id);
    active.unit_id = Set(draft.unit_id);
    active.tenant_id = Set(draft.tenant_id);
    active.landlord_id = Set(draft.landlord_id);
    active.start_date = Set(draft.start_date);
    active.end_date = Set(draft.end_date);
    active.monthly_rent = Set(draft.monthly_rent);
    active.security_deposit = Set(draft.security_deposit);
    if let Some(status) = request.status {
        active.status = Set(status);
    }
    if let Some(document) = request.document {
        active.document = Set(Some(document));
    }
    if let Some(notes) = request.notes {
        active.notes = Set(Some(notes));
    }

    let updated = active.update(&state.db).await?;
    info!("Lease {} updated", updated.id);
    Ok(Json(ApiResponse::new(LeaseResponse::from(updated), "Lease updated successfully")))
}

/// Delete a lease with its payments and notifications
#[utoipa::path(
    delete,
    path = "/api/v1/leases/{lease_id}",
    tag = "leases",
    params(("lease_id" = i32, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Lease not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_lease(
    Path(lease_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Delete, Resource::Lease)?;
    let existing = fetch_visible::<lease::Entity, _>(&state.db, &actor, lease_id).await?;
    authorize_owner(&actor, Action::Delete, Resource::Lease, &existing)?;
    existing.delete(&state.db).await?;

    info!("Lease {} deleted", lease_id);
    Ok(Json(ApiResponse::new(
        format!("Lease {lease_id} deleted"),
        "Lease deleted successfully",
    )))
}
