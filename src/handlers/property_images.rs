use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::property_image;
use policy::{
    Action, Resource, authorize, fetch_visible, visible,
    validation::{FieldErrors, validate_property_child},
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
pub struct CreatePropertyImageRequest {
    pub property_id: i32,
    /// Opaque file reference
    #[validate(length(min = 1))]
    pub image: String,
    pub caption: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdatePropertyImageRequest {
    pub property_id: Option<i32>,
    #[validate(length(min = 1))]
    pub image: Option<String>,
    pub caption: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PropertyImageResponse {
    pub id: i32,
    pub property_id: i32,
    pub image: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl From<property_image::Model> for PropertyImageResponse {
    fn from(model: property_image::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            image: model.image,
            caption: model.caption,
            is_primary: model.is_primary,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct PropertyImageQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub property_id: Option<i32>,
}

/// Attach an image to a property
#[utoipa::path(
    post,
    path = "/api/v1/property-images",
    tag = "properties",
    request_body = CreatePropertyImageRequest,
    responses(
        (status = 201, description = "Image created successfully", body = ApiResponse<PropertyImageResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_property_image(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreatePropertyImageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PropertyImageResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::PropertyImage)?;
    let errors = FieldErrors::from_shape(request.validate());
    validate_property_child(&state.db, &actor, errors, request.property_id, None).await?;

    let saved = property_image::ActiveModel {
        property_id: Set(request.property_id),
        image: Set(request.image),
        caption: Set(request.caption),
        is_primary: Set(request.is_primary.unwrap_or(false)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Image {} attached to property {}", saved.id, saved.property_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            PropertyImageResponse::from(saved),
            "Image created successfully",
        )),
    ))
}

/// List property images visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/property-images",
    tag = "properties",
    params(PropertyImageQuery),
    responses(
        (status = 200, description = "Images retrieved successfully", body = ApiResponse<Vec<PropertyImageResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_property_images(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<PropertyImageQuery>>,
) -> Result<Json<ApiResponse<Vec<PropertyImageResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::PropertyImage)?;

    let mut select = visible::<property_image::Entity>(&current.actor);
    if let Some(property_id) = query.property_id {
        select = select.filter(property_image::Column::PropertyId.eq(property_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let images = select
        .order_by_asc(property_image::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        images.into_iter().map(PropertyImageResponse::from).collect(),
        "Images retrieved successfully",
    )))
}

/// Get a property image by ID
#[utoipa::path(
    get,
    path = "/api/v1/property-images/{image_id}",
    tag = "properties",
    params(("image_id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image retrieved successfully", body = ApiResponse<PropertyImageResponse>),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_property_image(
    Path(image_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<PropertyImageResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::PropertyImage)?;
    let found =
        fetch_visible::<property_image::Entity, _>(&state.db, &current.actor, image_id).await?;
    Ok(Json(ApiResponse::new(
        PropertyImageResponse::from(found),
        "Image retrieved successfully",
    )))
}

/// Update a property image
#[utoipa::path(
    put,
    path = "/api/v1/property-images/{image_id}",
    tag = "properties",
    params(("image_id" = i32, Path, description = "Image ID")),
    request_body = UpdatePropertyImageRequest,
    responses(
        (status = 200, description = "Image updated successfully", body = ApiResponse<PropertyImageResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_property_image(
    Path(image_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdatePropertyImageRequest>,
) -> Result<Json<ApiResponse<PropertyImageResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::PropertyImage)?;
    let existing = fetch_visible::<property_image::Entity, _>(&state.db, &actor, image_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let property_id = request.property_id.unwrap_or(existing.property_id);
    validate_property_child(&state.db, &actor, errors, property_id, None).await?;

    let mut active: property_image::ActiveModel = existing.into();
    active.property_id = Set(property_id);
    if let Some(image) = request.image {
        active.image = Set(image);
    }
    if let Some(caption) = request.caption {
        active.caption = Set(Some(caption));
    }
    if let Some(is_primary) = request.is_primary {
        active.is_primary = Set(is_primary);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse::new(
        PropertyImageResponse::from(updated),
        "Image updated successfully",
    )))
}

/// Delete a property image
#[utoipa::path(
    delete,
    path = "/api/v1/property-images/{image_id}",
    tag = "properties",
    params(("image_id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_property_image(
    Path(image_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::PropertyImage)?;
    let existing =
        fetch_visible::<property_image::Entity, _>(&state.db, &current.actor, image_id).await?;
    existing.delete(&state.db).await?;

    info!("Image {} deleted", image_id);
    Ok(Json(ApiResponse::new(
        format!("Image {image_id} deleted"),
        "Image deleted successfully",
    )))
}
