use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use model::entities::user::{self, Role};
use policy::validation::{FieldErrors, RegistrationDraft, validate_registration};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{CurrentUser, TokenType, hash_password, verify_password},
    error::ApiError,
    handlers::users::UserResponse,
    schemas::{ApiResponse, AppState},
};

/// Self-registration as landlord or tenant
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub password_confirm: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    /// Default: tenant. `admin` is rejected.
    pub role: Option<Role>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AccessToken {
    pub access: String,
}

/// Changes to the caller's own account; absent fields keep their value
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    /// New password; stored hashed and clears `must_change_password`
    #[validate(length(min = 8))]
    pub password: Option<String>,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    security(()),
    responses(
        (status = 201, description = "Account registered", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let role = request.role.unwrap_or(Role::Tenant);
    let errors = FieldErrors::from_shape(request.validate());
    let draft = RegistrationDraft {
        username: &request.username,
        password: &request.password,
        password_confirm: &request.password_confirm,
        role,
    };
    validate_registration(&state.db, errors, &draft).await?;

    let saved = user::ActiveModel {
        username: Set(request.username),
        email: Set(request.email),
        password_hash: Set(hash_password(&request.password)?),
        first_name: Set(request.first_name.unwrap_or_default()),
        last_name: Set(request.last_name.unwrap_or_default()),
        role: Set(role),
        phone: Set(request.phone),
        profile_picture: Set(None),
        must_change_password: Set(false),
        is_active: Set(true),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Registered user {} as {:?}", saved.id, saved.role);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(saved), "Registration successful")),
    ))
}

/// Exchange credentials for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    security(()),
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(request.username.as_str()))
        .one(&state.db)
        .await?;

    let user = match found {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!("Failed login attempt");
            return Err(ApiError::Unauthenticated("Invalid credentials".into()));
        }
    };
    if !user.is_active {
        warn!("Login attempt on disabled account {}", user.id);
        return Err(ApiError::Unauthenticated("User account is disabled".into()));
    }

    let tokens = TokenPair {
        access: state.tokens.issue(user.id, TokenType::Access)?,
        refresh: state.tokens.issue(user.id, TokenType::Refresh)?,
    };

    let user_id = user.id;
    let mut active: user::ActiveModel = user.into();
    active.last_login_at = Set(Some(Utc::now()));
    active.update(&state.db).await?;

    info!("User {} logged in", user_id);
    Ok(Json(ApiResponse::new(tokens, "Login successful")))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    security(()),
    responses(
        (status = 200, description = "Token refreshed", body = ApiResponse<AccessToken>),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessToken>>, ApiError> {
    let claims = state.tokens.verify(&request.refresh, TokenType::Refresh)?;
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthenticated("User not found or disabled".into()))?;

    debug!("Refreshing access token for user {}", user.id);
    let access = state.tokens.issue(user.id, TokenType::Access)?;
    Ok(Json(ApiResponse::new(AccessToken { access }, "Token refreshed")))
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/user",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(current), fields(user_id = current.user.id))]
pub async fn current_user(current: CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::new(
        UserResponse::from(current.user),
        "Current user retrieved successfully",
    ))
}

/// Update the authenticated user's own account
#[utoipa::path(
    put,
    path = "/api/v1/auth/user/update",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_current_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    FieldErrors::from_shape(request.validate()).finish()?;

    let mut active: user::ActiveModel = current.user.into();
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    if let Some(first_name) = request.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = request.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(phone) = request.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(profile_picture) = request.profile_picture {
        active.profile_picture = Set(Some(profile_picture));
    }
    if let Some(password) = request.password {
        active.password_hash = Set(hash_password(&password)?);
        active.must_change_password = Set(false);
    }

    let updated = active.update(&state.db).await?;
    info!("User {} updated their profile", updated.id);
    Ok(Json(ApiResponse::new(UserResponse::from(updated), "Profile updated successfully")))
}
