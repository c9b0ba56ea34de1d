use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::account::{self, AccountType};
use policy::{
    Action, Resource, authorize, fetch_visible,
    ledger::ensure_account_unreferenced,
    validation::{AccountDraft, FieldErrors, validate_account},
    visible,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{ApiResponse, AppState, page_and_limit},
};

/// Request body for creating a ledger account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAccountRequest {
    /// Chart-of-accounts code, unique (e.g. "1000")
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub account_type: AccountType,
    pub description: Option<String>,
    /// Opening balance (default: 0)
    pub balance: Option<Decimal>,
    pub parent_account_id: Option<i32>,
    /// Default: true
    pub is_active: Option<bool>,
}

/// Request body for updating a ledger account
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub description: Option<String>,
    pub balance: Option<Decimal>,
    pub parent_account_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// Account response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub description: Option<String>,
    pub balance: Decimal,
    pub parent_account_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<account::Model> for AccountResponse {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            account_type: model.account_type,
            description: model.description,
            balance: model.balance,
            parent_account_id: model.parent_account_id,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct AccountQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub account_type: Option<AccountType>,
    pub is_active: Option<bool>,
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "ledger",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_account(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    trace!("Entering create_account function");
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Account)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = AccountDraft {
        id: None,
        code: &request.code,
        parent_account_id: request.parent_account_id,
    };
    validate_account(&state.db, &actor, errors, &draft).await?;

    debug!("Creating account {} '{}'", request.code, request.name);
    let saved = account::ActiveModel {
        code: Set(request.code),
        name: Set(request.name),
        account_type: Set(request.account_type),
        description: Set(request.description),
        balance: Set(request.balance.unwrap_or(Decimal::ZERO)),
        parent_account_id: Set(request.parent_account_id),
        is_active: Set(request.is_active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Account created successfully with ID: {}, code: {}", saved.id, saved.code);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AccountResponse::from(saved), "Account created successfully")),
    ))
}

/// Get all accounts
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "ledger",
    params(AccountQuery),
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = ApiResponse<Vec<AccountResponse>>),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_accounts(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<AccountQuery>>,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Account)?;

    let mut select = visible::<account::Entity>(&current.actor);
    if let Some(account_type) = query.account_type {
        select = select.filter(account::Column::AccountType.eq(account_type));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(account::Column::IsActive.eq(is_active));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let accounts = select
        .order_by_asc(account::Column::Code)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    debug!("Retrieved {} accounts", accounts.len());
    Ok(Json(ApiResponse::new(
        accounts.into_iter().map(AccountResponse::from).collect(),
        "Accounts retrieved successfully",
    )))
}

/// Get a specific account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    tag = "ledger",
    params(("account_id" = i32, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account retrieved successfully", body = ApiResponse<AccountResponse>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Account)?;
    let found = fetch_visible::<account::Entity, _>(&state.db, &current.actor, account_id).await?;
    Ok(Json(ApiResponse::new(AccountResponse::from(found), "Account retrieved successfully")))
}

/// Update an account
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{account_id}",
    tag = "ledger",
    params(("account_id" = i32, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Account)?;
    let existing = fetch_visible::<account::Entity, _>(&state.db, &actor, account_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let code = request.code.clone().unwrap_or_else(|| existing.code.clone());
    let parent_account_id = request.parent_account_id.or(existing.parent_account_id);
    let draft = AccountDraft {
        id: Some(existing.id),
        code: &code,
        parent_account_id,
    };
    validate_account(&state.db, &actor, errors, &draft).await?;

    let mut active: account::ActiveModel = existing.into();
    active.code = Set(code);
    active.parent_account_id = Set(parent_account_id);
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(account_type) = request.account_type {
        active.account_type = Set(account_type);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(balance) = request.balance {
        active.balance = Set(balance);
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }

    let updated = active.update(&state.db).await?;
    info!("Account {} updated", updated.id);
    Ok(Json(ApiResponse::new(AccountResponse::from(updated), "Account updated successfully")))
}

/// Delete an account that no journal entry line references
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{account_id}",
    tag = "ledger",
    params(("account_id" = i32, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Account still referenced by ledger lines", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::Account)?;
    let existing = fetch_visible::<account::Entity, _>(&state.db, &current.actor, account_id).await?;
    ensure_account_unreferenced(&state.db, account_id).await?;
    existing.delete(&state.db).await?;

    info!("Account {} deleted", account_id);
    Ok(Json(ApiResponse::new(
        format!("Account {account_id} deleted"),
        "Account deleted successfully",
    )))
}
