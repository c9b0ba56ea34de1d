use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::lease;
use model::entities::property::{self, PropertyStatus, PropertyType};
use policy::{
    Action, Actor, Resource, authorize, authorize_owner, fetch_visible, visible,
    validation::{FieldErrors, PropertyDraft, validate_property},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{ApiResponse, AppState, page_and_limit},
};

/// Request body for creating a property
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreatePropertyRequest {
    /// Owning landlord. Ignored for landlords, who always own what they create.
    pub landlord_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub property_type: PropertyType,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub region: String,
    #[validate(length(min = 1, max = 100))]
    pub district: String,
    pub ward: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub street: String,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqft: Option<Decimal>,
    pub payment_terms: Option<String>,
    /// Defaults to `vacant`
    pub status: Option<PropertyStatus>,
}

/// Request body for updating a property; absent fields keep their value
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdatePropertyRequest {
    pub landlord_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub property_type: Option<PropertyType>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub region: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: Option<String>,
    pub ward: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub street: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqft: Option<Decimal>,
    pub payment_terms: Option<String>,
    pub status: Option<PropertyStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PropertyResponse {
    pub id: i32,
    pub landlord_id: i32,
    pub name: String,
    pub property_type: PropertyType,
    pub description: Option<String>,
    pub region: String,
    pub district: String,
    pub ward: Option<String>,
    pub street: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: Option<Decimal>,
    pub payment_terms: Option<String>,
    pub status: PropertyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<property::Model> for PropertyResponse {
    fn from(model: property::Model) -> Self {
        Self {
            id: model.id,
            landlord_id: model.landlord_id,
            name: model.name,
            property_type: model.property_type,
            description: model.description,
            region: model.region,
            district: model.district,
            ward: model.ward,
            street: model.street,
            bedrooms: model.bedrooms,
            bathrooms: model.bathrooms,
            area_sqft: model.area_sqft,
            payment_terms: model.payment_terms,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for listing properties
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct PropertyQuery {
    /// Page number (1-based)
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    /// Items per page
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub status: Option<PropertyStatus>,
    pub property_type: Option<PropertyType>,
    pub landlord_id: Option<i32>,
}

/// Create a property
#[utoipa::path(
    post,
    path = "/api/v1/properties",
    tag = "properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Property created successfully", body = ApiResponse<PropertyResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_property(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PropertyResponse>>), ApiError> {
    trace!("Entering create_property function");
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Property)?;

    let mut errors = FieldErrors::from_shape(request.validate());
    let landlord_id = match actor {
        Actor::Landlord { user_id } => user_id,
        _ => match request.landlord_id {
            Some(id) => id,
            None => {
                errors.add("landlord", "required", "This field is required.");
                return Err(errors.into_error().into());
            }
        },
    };

    let draft = PropertyDraft {
        landlord_id,
        bedrooms: request.bedrooms.unwrap_or(0),
        bathrooms: request.bathrooms.unwrap_or(0),
        area_sqft: request.area_sqft,
    };
    validate_property(&state.db, errors, &draft).await?;

    debug!("Creating property '{}' for landlord {}", request.name, landlord_id);
    let saved = property::ActiveModel {
        landlord_id: Set(landlord_id),
        name: Set(request.name),
        property_type: Set(request.property_type),
        description: Set(request.description),
        region: Set(request.region),
        district: Set(request.district),
        ward: Set(request.ward),
        street: Set(request.street),
        bedrooms: Set(draft.bedrooms),
        bathrooms: Set(draft.bathrooms),
        area_sqft: Set(request.area_sqft),
        payment_terms: Set(request.payment_terms),
        status: Set(request.status.unwrap_or(PropertyStatus::Vacant)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Property created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(PropertyResponse::from(saved), "Property created successfully")),
    ))
}

/// List properties visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/properties",
    tag = "properties",
    params(PropertyQuery),
    responses(
        (status = 200, description = "Properties retrieved successfully", body = ApiResponse<Vec<PropertyResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_properties(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<PropertyQuery>>,
) -> Result<Json<ApiResponse<Vec<PropertyResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Property)?;

    let mut select = visible::<property::Entity>(&current.actor);
    if let Some(status) = query.status {
        select = select.filter(property::Column::Status.eq(status));
    }
    if let Some(property_type) = query.property_type {
        select = select.filter(property::Column::PropertyType.eq(property_type));
    }
    if let Some(landlord_id) = query.landlord_id {
        select = select.filter(property::Column::LandlordId.eq(landlord_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let properties = select
        .order_by_asc(property::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    debug!("Retrieved {} properties", properties.len());
    Ok(Json(ApiResponse::new(
        properties.into_iter().map(PropertyResponse::from).collect(),
        "Properties retrieved successfully",
    )))
}

/// Get a property by ID
#[utoipa::path(
    get,
    path = "/api/v1/properties/{property_id}",
    tag = "properties",
    params(("property_id" = i32, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property retrieved successfully", body = ApiResponse<PropertyResponse>),
        (status = 404, description = "Property not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_property(
    Path(property_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<PropertyResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Property)?;
    let found = fetch_visible::<property::Entity, _>(&state.db, &current.actor, property_id).await?;
    Ok(Json(ApiResponse::new(
        PropertyResponse::from(found),
        "Property retrieved successfully",
    )))
}

/// Update a property
#[utoipa::path(
    put,
    path = "/api/v1/properties/{property_id}",
    tag = "properties",
    params(("property_id" = i32, Path, description = "Property ID")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Property updated successfully", body = ApiResponse<PropertyResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_property(
    Path(property_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<Json<ApiResponse<PropertyResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Property)?;
    let existing = fetch_visible::<property::Entity, _>(&state.db, &actor, property_id).await?;
    authorize_owner(&actor, Action::Update, Resource::Property, &existing)?;

    let errors = FieldErrors::from_shape(request.validate());
    let landlord_id = match actor {
        Actor::Landlord { user_id } => user_id,
        _ => request.landlord_id.unwrap_or(existing.landlord_id),
    };
    let draft = PropertyDraft {
        landlord_id,
        bedrooms: request.bedrooms.unwrap_or(existing.bedrooms),
        bathrooms: request.bathrooms.unwrap_or(existing.bathrooms),
        area_sqft: request.area_sqft.or(existing.area_sqft),
    };
    validate_property(&state.db, errors, &draft).await?;

    let reassigned = landlord_id != existing.landlord_id;
    let mut active: property::ActiveModel = existing.into();
    active.landlord_id = Set(landlord_id);
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(property_type) = request.property_type {
        active.property_type = Set(property_type);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(region) = request.region {
        active.region = Set(region);
    }
    if let Some(district) = request.district {
        active.district = Set(district);
    }
    if let Some(ward) = request.ward {
        active.ward = Set(Some(ward));
    }
    if let Some(street) = request.street {
        active.street = Set(street);
    }
    active.bedrooms = Set(draft.bedrooms);
    active.bathrooms = Set(draft.bathrooms);
    active.area_sqft = Set(draft.area_sqft);
    if let Some(payment_terms) = request.payment_terms {
        active.payment_terms = Set(Some(payment_terms));
    }
    if let Some(status) = request.status {
        active.status = Set(status);
    }

    // Leases follow their property to the new landlord.
    let txn = state.db.begin().await?;
    let updated = active.update(&txn).await?;
    if reassigned {
        let moved = lease::Entity::update_many()
            .col_expr(lease::Column::LandlordId, Expr::value(landlord_id))
            .filter(lease::Column::PropertyId.eq(updated.id))
            .exec(&txn)
            .await?;
        info!(
            "Property {} reassigned to landlord {}, {} lease(s) moved",
            updated.id, landlord_id, moved.rows_affected
        );
    }
    txn.commit().await?;
    info!("Property {} updated", updated.id);
    Ok(Json(ApiResponse::new(
        PropertyResponse::from(updated),
        "Property updated successfully",
    )))
}

/// Delete a property together with its units, leases and expenses
#[utoipa::path(
    delete,
    path = "/api/v1/properties/{property_id}",
    tag = "properties",
    params(("property_id" = i32, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_property(
    Path(property_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Delete, Resource::Property)?;
    let existing = fetch_visible::<property::Entity, _>(&state.db, &actor, property_id).await?;
    authorize_owner(&actor, Action::Delete, Resource::Property, &existing)?;

    existing.delete(&state.db).await?;
    info!("Property {} deleted", property_id);
    Ok(Json(ApiResponse::new(
        format!("Property {property_id} deleted"),
        "Property deleted successfully",
    )))
}
