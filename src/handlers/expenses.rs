use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::expense::{self, ExpenseCategory};
use policy::{
    Action, Resource, authorize, fetch_visible, visible,
    validation::{FieldErrors, validate_property_child},
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
pub struct CreateExpenseRequest {
    pub property_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Opaque file reference
    pub receipt: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateExpenseRequest {
    pub property_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub receipt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: i32,
    pub property_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            title: model.title,
            description: model.description,
            category: model.category,
            amount: model.amount,
            date: model.date,
            receipt: model.receipt,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct ExpenseQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub property_id: Option<i32>,
    pub category: Option<ExpenseCategory>,
}

/// Record an expense against a property
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    tag = "expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_expense(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Expense)?;
    let errors = FieldErrors::from_shape(request.validate());
    validate_property_child(&state.db, &actor, errors, request.property_id, Some(request.amount))
        .await?;

    debug!("Recording expense '{}' of {}", request.title, request.amount);
    let saved = expense::ActiveModel {
        property_id: Set(request.property_id),
        title: Set(request.title),
        description: Set(request.description),
        category: Set(request.category),
        amount: Set(request.amount),
        date: Set(request.date),
        receipt: Set(request.receipt),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Expense created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ExpenseResponse::from(saved), "Expense created successfully")),
    ))
}

/// List expenses visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    tag = "expenses",
    params(ExpenseQuery),
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_expenses(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<ExpenseQuery>>,
) -> Result<Json<ApiResponse<Vec<ExpenseResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Expense)?;

    let mut select = visible::<expense::Entity>(&current.actor);
    if let Some(property_id) = query.property_id {
        select = select.filter(expense::Column::PropertyId.eq(property_id));
    }
    if let Some(category) = query.category {
        select = select.filter(expense::Column::Category.eq(category));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let expenses = select
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        expenses.into_iter().map(ExpenseResponse::from).collect(),
        "Expenses retrieved successfully",
    )))
}

/// Get an expense by ID
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense retrieved successfully", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_expense(
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Expense)?;
    let found = fetch_visible::<expense::Entity, _>(&state.db, &current.actor, expense_id).await?;
    Ok(Json(ApiResponse::new(ExpenseResponse::from(found), "Expense retrieved successfully")))
}

/// Update an expense
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_expense(
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Expense)?;
    let existing = fetch_visible::<expense::Entity, _>(&state.db, &actor, expense_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let property_id = request.property_id.unwrap_or(existing.property_id);
    let amount = request.amount.unwrap_or(existing.amount);
    validate_property_child(&state.db, &actor, errors, property_id, Some(amount)).await?;

    let mut active: expense::ActiveModel = existing.into();
    active.property_id = Set(property_id);
    active.amount = Set(amount);
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(date) = request.date {
        active.date = Set(date);
    }
    if let Some(receipt) = request.receipt {
        active.receipt = Set(Some(receipt));
    }

    let updated = active.update(&state.db).await?;
    info!("Expense {} updated", updated.id);
    Ok(Json(ApiResponse::new(ExpenseResponse::from(updated), "Expense updated successfully")))
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_expense(
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::Expense)?;
    let existing = fetch_visible::<expense::Entity, _>(&state.db, &current.actor, expense_id).await?;
    existing.delete(&state.db).await?;

    info!("Expense {} deleted", expense_id);
    Ok(Json(ApiResponse::new(
        format!("Expense {expense_id} deleted"),
        "Expense deleted successfully",
    )))
}
