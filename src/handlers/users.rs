use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::user::{self, Role};
use policy::{
    Action, Resource, authorize, fetch_visible,
    validation::{FieldErrors, check_role_change, check_username_available},
    visible,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::{CurrentUser, hash_password},
    error::ApiError,
    schemas::{ApiResponse, AppState, page_and_limit},
};

/// Request body for creating a user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    /// Default: true
    pub is_active: Option<bool>,
    /// Default: false
    pub must_change_password: Option<bool>,
}

/// Request body for updating a user
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: Option<bool>,
    pub must_change_password: Option<bool>,
}

/// User as exposed over the API; never carries the password hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub must_change_password: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            phone: model.phone,
            profile_picture: model.profile_picture,
            must_change_password: model.must_change_password,
            is_active: model.is_active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct UserQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    authorize(&current.actor, Action::Create, Resource::User)?;

    let mut errors = FieldErrors::from_shape(request.validate());
    check_username_available(&state.db, &mut errors, &request.username, None).await?;
    errors.finish()?;

    debug!("Creating user '{}' with role {:?}", request.username, request.role);
    let saved = user::ActiveModel {
        username: Set(request.username),
        email: Set(request.email),
        password_hash: Set(hash_password(&request.password)?),
        first_name: Set(request.first_name.unwrap_or_default()),
        last_name: Set(request.last_name.unwrap_or_default()),
        role: Set(request.role),
        phone: Set(request.phone),
        profile_picture: Set(None),
        must_change_password: Set(request.must_change_password.unwrap_or(false)),
        is_active: Set(request.is_active.unwrap_or(true)),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("User created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(saved), "User created successfully")),
    ))
}

/// Get all users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<UserQuery>>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::User)?;

    let mut select = visible::<user::Entity>(&current.actor);
    if let Some(role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(user::Column::IsActive.eq(is_active));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let users = select
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(caller_id = current.user.id))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::User)?;
    let found = fetch_visible::<user::Entity, _>(&state.db, &current.actor, user_id).await?;
    Ok(Json(ApiResponse::new(UserResponse::from(found), "User retrieved successfully")))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(caller_id = current.user.id))]
pub async fn update_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    authorize(&current.actor, Action::Update, Resource::User)?;
    let existing = fetch_visible::<user::Entity, _>(&state.db, &current.actor, user_id).await?;

    let mut errors = FieldErrors::from_shape(request.validate());
    if let Some(username) = &request.username {
        check_username_available(&state.db, &mut errors, username, Some(existing.id)).await?;
    }
    if let Some(role) = request.role {
        check_role_change(&state.db, &mut errors, &existing, role).await?;
    }
    errors.finish()?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(username) = request.username {
        active.username = Set(username);
    }
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    if let Some(password) = request.password {
        active.password_hash = Set(hash_password(&password)?);
    }
    if let Some(first_name) = request.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = request.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(role) = request.role {
        warn!("Changing role of user {} to {:?}", user_id, role);
        active.role = Set(role);
    }
    if let Some(phone) = request.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(profile_picture) = request.profile_picture {
        active.profile_picture = Set(Some(profile_picture));
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(must_change_password) = request.must_change_password {
        active.must_change_password = Set(must_change_password);
    }

    let updated = active.update(&state.db).await?;
    info!("User {} updated", updated.id);
    Ok(Json(ApiResponse::new(UserResponse::from(updated), "User updated successfully")))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(caller_id = current.user.id))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::User)?;
    let existing = fetch_visible::<user::Entity, _>(&state.db, &current.actor, user_id).await?;
    existing.delete(&state.db).await?;

    info!("User {} deleted", user_id);
    Ok(Json(ApiResponse::new(
        format!("User {user_id} deleted"),
        "User deleted successfully",
    )))
}
