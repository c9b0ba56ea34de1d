use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::notification::{self, NotificationCategory, NotificationStatus, Priority};
use policy::{
    Action, Resource, authorize, fetch_visible,
    notifications::{check_status_change, respond},
    validation::{FieldErrors, validate_notification},
    visible,
};
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
pub struct CreateNotificationRequest {
    pub lease_id: i32,
    pub category: NotificationCategory,
    /// Defaults to `medium`
    pub priority: Option<Priority>,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateNotificationRequest {
    pub lease_id: Option<i32>,
    pub category: Option<NotificationCategory>,
    pub priority: Option<Priority>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// Admins and landlords only
    pub status: Option<NotificationStatus>,
}

/// Body of the respond action
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RespondRequest {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i32,
    pub lease_id: i32,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub subject: String,
    pub description: String,
    pub status: NotificationStatus,
    pub landlord_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<notification::Model> for NotificationResponse {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            lease_id: model.lease_id,
            category: model.category,
            priority: model.priority,
            subject: model.subject,
            description: model.description,
            status: model.status,
            landlord_response: model.landlord_response,
            responded_at: model.responded_at,
            responded_by: model.responded_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct NotificationQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub status: Option<NotificationStatus>,
    pub priority: Option<Priority>,
    pub category: Option<NotificationCategory>,
    pub lease_id: Option<i32>,
}

/// Raise a notification on a lease
#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    tag = "notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created successfully", body = ApiResponse<NotificationResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_notification(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Notification)?;
    let errors = FieldErrors::from_shape(request.validate());
    validate_notification(&state.db, &actor, errors, request.lease_id).await?;

    let saved = notification::ActiveModel {
        lease_id: Set(request.lease_id),
        category: Set(request.category),
        priority: Set(request.priority.unwrap_or(Priority::Medium)),
        subject: Set(request.subject),
        description: Set(request.description),
        status: Set(NotificationStatus::Pending),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Notification {} raised on lease {}", saved.id, saved.lease_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            NotificationResponse::from(saved),
            "Notification created successfully",
        )),
    ))
}

/// List notifications visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications retrieved successfully", body = ApiResponse<Vec<NotificationResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<NotificationQuery>>,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Notification)?;

    let mut select = visible::<notification::Entity>(&current.actor);
    if let Some(status) = query.status {
        select = select.filter(notification::Column::Status.eq(status));
    }
    if let Some(priority) = query.priority {
        select = select.filter(notification::Column::Priority.eq(priority));
    }
    if let Some(category) = query.category {
        select = select.filter(notification::Column::Category.eq(category));
    }
    if let Some(lease_id) = query.lease_id {
        select = select.filter(notification::Column::LeaseId.eq(lease_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let notifications = select
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        notifications.into_iter().map(NotificationResponse::from).collect(),
        "Notifications retrieved successfully",
    )))
}

/// Get a notification by ID
#[utoipa::path(
    get,
    path = "/api/v1/notifications/{notification_id}",
    tag = "notifications",
    params(("notification_id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification retrieved successfully", body = ApiResponse<NotificationResponse>),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_notification(
    Path(notification_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<NotificationResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Notification)?;
    let found =
        fetch_visible::<notification::Entity, _>(&state.db, &current.actor, notification_id).await?;
    Ok(Json(ApiResponse::new(
        NotificationResponse::from(found),
        "Notification retrieved successfully",
    )))
}

/// Update a notification
#[utoipa::path(
    put,
    path = "/api/v1/notifications/{notification_id}",
    tag = "notifications",
    params(("notification_id" = i32, Path, description = "Notification ID")),
    request_body = UpdateNotificationRequest,
    responses(
        (status = 200, description = "Notification updated successfully", body = ApiResponse<NotificationResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_notification(
    Path(notification_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateNotificationRequest>,
) -> Result<Json<ApiResponse<NotificationResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Notification)?;
    let existing =
        fetch_visible::<notification::Entity, _>(&state.db, &actor, notification_id).await?;

    let mut errors = FieldErrors::from_shape(request.validate());
    check_status_change(&actor, &mut errors, existing.status, request.status);
    let lease_id = request.lease_id.unwrap_or(existing.lease_id);
    validate_notification(&state.db, &actor, errors, lease_id).await?;

    let mut active: notification::ActiveModel = existing.into();
    active.lease_id = Set(lease_id);
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(priority) = request.priority {
        active.priority = Set(priority);
    }
    if let Some(subject) = request.subject {
        active.subject = Set(subject);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(status) = request.status {
        debug!("Moving notification {} to {:?}", notification_id, status);
        active.status = Set(status);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse::new(
        NotificationResponse::from(updated),
        "Notification updated successfully",
    )))
}

/// Delete a notification
#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{notification_id}",
    tag = "notifications",
    params(("notification_id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_notification(
    Path(notification_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::Notification)?;
    let existing =
        fetch_visible::<notification::Entity, _>(&state.db, &current.actor, notification_id).await?;
    existing.delete(&state.db).await?;

    info!("Notification {} deleted", notification_id);
    Ok(Json(ApiResponse::new(
        format!("Notification {notification_id} deleted"),
        "Notification deleted successfully",
    )))
}

/// Respond to a notification as landlord or admin; moves it to `in_progress`
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{notification_id}/respond",
    tag = "notifications",
    params(("notification_id" = i32, Path, description = "Notification ID")),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Response recorded", body = ApiResponse<NotificationResponse>),
        (status = 400, description = "Empty response", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn respond_to_notification(
    Path(notification_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<RespondRequest>,
) -> Result<Json<ApiResponse<NotificationResponse>>, ApiError> {
    let updated = respond(&state.db, &current.actor, notification_id, &request.response).await?;
    Ok(Json(ApiResponse::new(
        NotificationResponse::from(updated),
        "Response recorded successfully",
    )))
}
