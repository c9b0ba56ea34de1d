use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::unit::{self, UnitStatus};
use policy::{
    Action, Resource, authorize, fetch_visible, visible,
    validation::{FieldErrors, UnitDraft, validate_unit},
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
pub struct CreateUnitRequest {
    pub property_id: i32,
    /// Label unique within the property, e.g. "A-101"
    #[validate(length(min = 1, max = 50))]
    pub unit_number: String,
    pub floor: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub rent_amount: Decimal,
    /// Defaults to `available`
    pub status: Option<UnitStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUnitRequest {
    pub property_id: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub unit_number: Option<String>,
    pub floor: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub rent_amount: Option<Decimal>,
    pub status: Option<UnitStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnitResponse {
    pub id: i32,
    pub property_id: i32,
    pub unit_number: String,
    pub floor: Option<i32>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub rent_amount: Decimal,
    pub status: UnitStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<unit::Model> for UnitResponse {
    fn from(model: unit::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            unit_number: model.unit_number,
            floor: model.floor,
            bedrooms: model.bedrooms,
            bathrooms: model.bathrooms,
            rent_amount: model.rent_amount,
            status: model.status,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct UnitQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub property_id: Option<i32>,
    pub status: Option<UnitStatus>,
}

/// Create a unit
#[utoipa::path(
    post,
    path = "/api/v1/units",
    tag = "units",
    request_body = CreateUnitRequest,
    responses(
        (status = 201, description = "Unit created successfully", body = ApiResponse<UnitResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_unit(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UnitResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Unit)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = UnitDraft {
        id: None,
        property_id: request.property_id,
        unit_number: &request.unit_number,
        bedrooms: request.bedrooms.unwrap_or(0),
        bathrooms: request.bathrooms.unwrap_or(0),
        rent_amount: request.rent_amount,
    };
    validate_unit(&state.db, &actor, errors, &draft).await?;
    let (bedrooms, bathrooms) = (draft.bedrooms, draft.bathrooms);

    debug!("Creating unit '{}' in property {}", request.unit_number, request.property_id);
    let saved = unit::ActiveModel {
        property_id: Set(request.property_id),
        unit_number: Set(request.unit_number),
        floor: Set(request.floor),
        bedrooms: Set(bedrooms),
        bathrooms: Set(bathrooms),
        rent_amount: Set(request.rent_amount),
        status: Set(request.status.unwrap_or(UnitStatus::Available)),
        description: Set(request.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Unit created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UnitResponse::from(saved), "Unit created successfully")),
    ))
}

/// List units visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/units",
    tag = "units",
    params(UnitQuery),
    responses(
        (status = 200, description = "Units retrieved successfully", body = ApiResponse<Vec<UnitResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_units(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<UnitQuery>>,
) -> Result<Json<ApiResponse<Vec<UnitResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Unit)?;

    let mut select = visible::<unit::Entity>(&current.actor);
    if let Some(property_id) = query.property_id {
        select = select.filter(unit::Column::PropertyId.eq(property_id));
    }
    if let Some(status) = query.status {
        select = select.filter(unit::Column::Status.eq(status));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let units = select
        .order_by_asc(unit::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        units.into_iter().map(UnitResponse::from).collect(),
        "Units retrieved successfully",
    )))
}

/// Get a unit by ID
#[utoipa::path(
    get,
    path = "/api/v1/units/{unit_id}",
    tag = "units",
    params(("unit_id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit retrieved successfully", body = ApiResponse<UnitResponse>),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_unit(
    Path(unit_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<UnitResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Unit)?;
    let found = fetch_visible::<unit::Entity, _>(&state.db, &current.actor, unit_id).await?;
    Ok(Json(ApiResponse::new(UnitResponse::from(found), "Unit retrieved successfully")))
}

/// Update a unit
#[utoipa::path(
    put,
    path = "/api/v1/units/{unit_id}",
    tag = "units",
    params(("unit_id" = i32, Path, description = "Unit ID")),
    request_body = UpdateUnitRequest,
    responses(
        (status = 200, description = "Unit updated successfully", body = ApiResponse<UnitResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_unit(
    Path(unit_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateUnitRequest>,
) -> Result<Json<ApiResponse<UnitResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Unit)?;
    let existing = fetch_visible::<unit::Entity, _>(&state.db, &actor, unit_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let unit_number = request
        .unit_number
        .clone()
        .unwrap_or_else(|| existing.unit_number.clone());
    let draft = UnitDraft {
        id: Some(existing.id),
        property_id: request.property_id.unwrap_or(existing.property_id),
        unit_number: &unit_number,
        bedrooms: request.bedrooms.unwrap_or(existing.bedrooms),
        bathrooms: request.bathrooms.unwrap_or(existing.bathrooms),
        rent_amount: request.rent_amount.unwrap_or(existing.rent_amount),
    };
    validate_unit(&state.db, &actor, errors, &draft).await?;
    let (property_id, bedrooms, bathrooms, rent_amount) =
        (draft.property_id, draft.bedrooms, draft.bathrooms, draft.rent_amount);

    let mut active: unit::ActiveModel = existing.into();
    active.property_id = Set(property_id);
    active.unit_number = Set(unit_number);
    active.bedrooms = Set(bedrooms);
    active.bathrooms = Set(bathrooms);
    active.rent_amount = Set(rent_amount);
    if let Some(floor) = request.floor {
        active.floor = Set(Some(floor));
    }
    if let Some(status) = request.status {
        active.status = Set(status);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await?;
    info!("Unit {} updated", updated.id);
    Ok(Json(ApiResponse::new(UnitResponse::from(updated), "Unit updated successfully")))
}

/// Delete a unit
#[utoipa::path(
    delete,
    path = "/api/v1/units/{unit_id}",
    tag = "units",
    params(("unit_id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_unit(
    Path(unit_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::Unit)?;
    let existing = fetch_visible::<unit::Entity, _>(&state.db, &current.actor, unit_id).await?;
    existing.delete(&state.db).await?;

    info!("Unit {} deleted", unit_id);
    Ok(Json(ApiResponse::new(format!("Unit {unit_id} deleted"), "Unit deleted successfully")))
}
