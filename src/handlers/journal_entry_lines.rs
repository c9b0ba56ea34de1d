use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::journal_entry_line;
use policy::{
    Action, Resource, authorize, fetch_visible,
    ledger::{LineDraft, validate_line},
    validation::FieldErrors,
    visible,
};
use rust_decimal::Decimal;
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
pub struct CreateJournalEntryLineRequest {
    pub journal_entry_id: i32,
    pub account_id: i32,
    /// Default: 0
    pub debit: Option<Decimal>,
    /// Default: 0
    pub credit: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateJournalEntryLineRequest {
    pub journal_entry_id: Option<i32>,
    pub account_id: Option<i32>,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JournalEntryLineResponse {
    pub id: i32,
    pub journal_entry_id: i32,
    pub account_id: i32,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<journal_entry_line::Model> for JournalEntryLineResponse {
    fn from(model: journal_entry_line::Model) -> Self {
        Self {
            id: model.id,
            journal_entry_id: model.journal_entry_id,
            account_id: model.account_id,
            debit: model.debit,
            credit: model.credit,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct JournalEntryLineQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub journal_entry_id: Option<i32>,
    pub account_id: Option<i32>,
}

/// Add a line to an existing journal entry
#[utoipa::path(
    post,
    path = "/api/v1/journal-entry-lines",
    tag = "ledger",
    request_body = CreateJournalEntryLineRequest,
    responses(
        (status = 201, description = "Line created successfully", body = ApiResponse<JournalEntryLineResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_journal_entry_line(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateJournalEntryLineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JournalEntryLineResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::JournalEntryLine)?;

    let errors = FieldErrors::from_shape(request.validate());
    let line = LineDraft {
        account_id: request.account_id,
        debit: request.debit.unwrap_or(Decimal::ZERO),
        credit: request.credit.unwrap_or(Decimal::ZERO),
        description: request.description,
    };
    validate_line(&state.db, &actor, errors, request.journal_entry_id, &line).await?;

    let saved = journal_entry_line::ActiveModel {
        journal_entry_id: Set(request.journal_entry_id),
        account_id: Set(line.account_id),
        debit: Set(line.debit),
        credit: Set(line.credit),
        description: Set(line.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Line {} added to journal entry {}", saved.id, saved.journal_entry_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            JournalEntryLineResponse::from(saved),
            "Line created successfully",
        )),
    ))
}

/// List journal entry lines
#[utoipa::path(
    get,
    path = "/api/v1/journal-entry-lines",
    tag = "ledger",
    params(JournalEntryLineQuery),
    responses(
        (status = 200, description = "Lines retrieved successfully", body = ApiResponse<Vec<JournalEntryLineResponse>>),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_journal_entry_lines(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<JournalEntryLineQuery>>,
) -> Result<Json<ApiResponse<Vec<JournalEntryLineResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::JournalEntryLine)?;

    let mut select = visible::<journal_entry_line::Entity>(&current.actor);
    if let Some(journal_entry_id) = query.journal_entry_id {
        select = select.filter(journal_entry_line::Column::JournalEntryId.eq(journal_entry_id));
    }
    if let Some(account_id) = query.account_id {
        select = select.filter(journal_entry_line::Column::AccountId.eq(account_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let lines = select
        .order_by_asc(journal_entry_line::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        lines.into_iter().map(JournalEntryLineResponse::from).collect(),
        "Lines retrieved successfully",
    )))
}

/// Get a journal entry line by ID
#[utoipa::path(
    get,
    path = "/api/v1/journal-entry-lines/{line_id}",
    tag = "ledger",
    params(("line_id" = i32, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line retrieved successfully", body = ApiResponse<JournalEntryLineResponse>),
        (status = 404, description = "Line not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_journal_entry_line(
    Path(line_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<JournalEntryLineResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::JournalEntryLine)?;
    let found =
        fetch_visible::<journal_entry_line::Entity, _>(&state.db, &current.actor, line_id).await?;
    Ok(Json(ApiResponse::new(
        JournalEntryLineResponse::from(found),
        "Line retrieved successfully",
    )))
}

/// Update a journal entry line
#[utoipa::path(
    put,
    path = "/api/v1/journal-entry-lines/{line_id}",
    tag = "ledger",
    params(("line_id" = i32, Path, description = "Line ID")),
    request_body = UpdateJournalEntryLineRequest,
    responses(
        (status = 200, description = "Line updated successfully", body = ApiResponse<JournalEntryLineResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Line not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_journal_entry_line(
    Path(line_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateJournalEntryLineRequest>,
) -> Result<Json<ApiResponse<JournalEntryLineResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::JournalEntryLine)?;
    let existing =
        fetch_visible::<journal_entry_line::Entity, _>(&state.db, &actor, line_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let journal_entry_id = request.journal_entry_id.unwrap_or(existing.journal_entry_id);
    let line = LineDraft {
        account_id: request.account_id.unwrap_or(existing.account_id),
        debit: request.debit.unwrap_or(existing.debit),
        credit: request.credit.unwrap_or(existing.credit),
        description: request.description.or_else(|| existing.description.clone()),
    };
    validate_line(&state.db, &actor, errors, journal_entry_id, &line).await?;

    let mut active: journal_entry_line::ActiveModel = existing.into();
    active.journal_entry_id = Set(journal_entry_id);
    active.account_id = Set(line.account_id);
    active.debit = Set(line.debit);
    active.credit = Set(line.credit);
    active.description = Set(line.description);

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse::new(
        JournalEntryLineResponse::from(updated),
        "Line updated successfully",
    )))
}

/// Delete a journal entry line
#[utoipa::path(
    delete,
    path = "/api/v1/journal-entry-lines/{line_id}",
    tag = "ledger",
    params(("line_id" = i32, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Line not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_journal_entry_line(
    Path(line_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::JournalEntryLine)?;
    let existing =
        fetch_visible::<journal_entry_line::Entity, _>(&state.db, &current.actor, line_id).await?;
    existing.delete(&state.db).await?;

    info!("Journal entry line {} deleted", line_id);
    Ok(Json(ApiResponse::new(
        format!("Line {line_id} deleted"),
        "Line deleted successfully",
    )))
}
