use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::{journal_entry, journal_entry_line};
use policy::{
    Action, Resource, authorize, fetch_visible,
    ledger::{EntryDraft, EntryTotals, LineDraft, create_entry},
    validation::FieldErrors,
    visible,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, LoaderTrait, ModelTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    handlers::journal_entry_lines::JournalEntryLineResponse,
    schemas::{ApiResponse, AppState, page_and_limit},
};

/// One line of a journal entry created together with its header
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct JournalLineRequest {
    pub account_id: i32,
    /// Default: 0
    pub debit: Option<Decimal>,
    /// Default: 0
    pub credit: Option<Decimal>,
    pub description: Option<String>,
}

impl From<JournalLineRequest> for LineDraft {
    fn from(line: JournalLineRequest) -> Self {
        Self {
            account_id: line.account_id,
            debit: line.debit.unwrap_or(Decimal::ZERO),
            credit: line.credit.unwrap_or(Decimal::ZERO),
            description: line.description,
        }
    }
}

/// Request body for recording a journal entry.
///
/// When `lines` is present the entry and its lines are stored atomically and
/// must balance. Without `lines` only the header is stored.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateJournalEntryRequest {
    pub entry_date: NaiveDate,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    pub lines: Option<Vec<JournalLineRequest>>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateJournalEntryRequest {
    pub entry_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JournalEntryResponse {
    pub id: i32,
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub created_by: Option<i32>,
    pub lines: Vec<JournalEntryLineResponse>,
    pub totals: EntryTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntryResponse {
    fn new(entry: journal_entry::Model, mut lines: Vec<journal_entry_line::Model>) -> Self {
        lines.sort_by_key(|line| line.id);
        let totals = EntryTotals::of_lines(&lines);
        Self {
            id: entry.id,
            entry_date: entry.entry_date,
            description: entry.description,
            reference: entry.reference,
            created_by: entry.created_by,
            lines: lines.into_iter().map(JournalEntryLineResponse::from).collect(),
            totals,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct JournalEntryQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

/// Record a journal entry
#[utoipa::path(
    post,
    path = "/api/v1/journal-entries",
    tag = "ledger",
    request_body = CreateJournalEntryRequest,
    responses(
        (status = 201, description = "Journal entry created successfully", body = ApiResponse<JournalEntryResponse>),
        (status = 400, description = "Validation failed or lines do not balance", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_journal_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateJournalEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JournalEntryResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::JournalEntry)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = EntryDraft {
        entry_date: request.entry_date,
        description: request.description,
        reference: request.reference,
    };

    let (entry, lines) = match request.lines {
        Some(lines) => {
            let lines: Vec<LineDraft> = lines.into_iter().map(LineDraft::from).collect();
            debug!("Recording journal entry with {} lines", lines.len());
            create_entry(&state.db, &actor, errors, draft, lines).await?
        }
        None => {
            errors.finish()?;
            let entry = journal_entry::ActiveModel {
                entry_date: Set(draft.entry_date),
                description: Set(draft.description),
                reference: Set(draft.reference),
                created_by: Set(Some(actor.user_id())),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
            (entry, Vec::new())
        }
    };

    info!("Journal entry created successfully with ID: {}", entry.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            JournalEntryResponse::new(entry, lines),
            "Journal entry created successfully",
        )),
    ))
}

/// List journal entries with their lines and totals
#[utoipa::path(
    get,
    path = "/api/v1/journal-entries",
    tag = "ledger",
    params(JournalEntryQuery),
    responses(
        (status = 200, description = "Journal entries retrieved successfully", body = ApiResponse<Vec<JournalEntryResponse>>),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_journal_entries(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<JournalEntryQuery>>,
) -> Result<Json<ApiResponse<Vec<JournalEntryResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::JournalEntry)?;

    let (page, limit) = page_and_limit(query.page, query.limit);
    let entries = visible::<journal_entry::Entity>(&current.actor)
        .order_by_desc(journal_entry::Column::EntryDate)
        .order_by_desc(journal_entry::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;
    let lines = entries
        .load_many(journal_entry_line::Entity, &state.db)
        .await?;

    Ok(Json(ApiResponse::new(
        entries
            .into_iter()
            .zip(lines)
            .map(|(entry, lines)| JournalEntryResponse::new(entry, lines))
            .collect(),
        "Journal entries retrieved successfully",
    )))
}

/// Get a journal entry with its lines and totals
#[utoipa::path(
    get,
    path = "/api/v1/journal-entries/{entry_id}",
    tag = "ledger",
    params(("entry_id" = i32, Path, description = "Journal entry ID")),
    responses(
        (status = 200, description = "Journal entry retrieved successfully", body = ApiResponse<JournalEntryResponse>),
        (status = 404, description = "Journal entry not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_journal_entry(
    Path(entry_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<JournalEntryResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::JournalEntry)?;
    let entry = fetch_visible::<journal_entry::Entity, _>(&state.db, &current.actor, entry_id).await?;
    let lines = entry
        .find_related(journal_entry_line::Entity)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(
        JournalEntryResponse::new(entry, lines),
        "Journal entry retrieved successfully",
    )))
}

/// Update a journal entry header
#[utoipa::path(
    put,
    path = "/api/v1/journal-entries/{entry_id}",
    tag = "ledger",
    params(("entry_id" = i32, Path, description = "Journal entry ID")),
    request_body = UpdateJournalEntryRequest,
    responses(
        (status = 200, description = "Journal entry updated successfully", body = ApiResponse<JournalEntryResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Journal entry not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_journal_entry(
    Path(entry_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateJournalEntryRequest>,
) -> Result<Json<ApiResponse<JournalEntryResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::JournalEntry)?;
    let existing = fetch_visible::<journal_entry::Entity, _>(&state.db, &actor, entry_id).await?;
    FieldErrors::from_shape(request.validate()).finish()?;

    let mut active: journal_entry::ActiveModel = existing.into();
    if let Some(entry_date) = request.entry_date {
        active.entry_date = Set(entry_date);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(reference) = request.reference {
        active.reference = Set(Some(reference));
    }
    let updated = active.update(&state.db).await?;
    let lines = updated
        .find_related(journal_entry_line::Entity)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(
        JournalEntryResponse::new(updated, lines),
        "Journal entry updated successfully",
    )))
}

/// Delete a journal entry and its lines
#[utoipa::path(
    delete,
    path = "/api/v1/journal-entries/{entry_id}",
    tag = "ledger",
    params(("entry_id" = i32, Path, description = "Journal entry ID")),
    responses(
        (status = 200, description = "Journal entry deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Journal entry not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_journal_entry(
    Path(entry_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::JournalEntry)?;
    let existing = fetch_visible::<journal_entry::Entity, _>(&state.db, &current.actor, entry_id).await?;
    existing.delete(&state.db).await?;

    info!("Journal entry {} deleted", entry_id);
    Ok(Json(ApiResponse::new(
        format!("Journal entry {entry_id} deleted"),
        "Journal entry deleted successfully",
    )))
}
