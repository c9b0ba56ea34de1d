use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::payment::{self, PaymentMethod, PaymentStatus};
use policy::{
    Action, Resource, authorize, fetch_visible, visible,
    validation::{FieldErrors, PaymentDraft, validate_payment},
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
pub struct CreatePaymentRequest {
    /// Tenant profile ID; must match the lease
    pub tenant_id: i32,
    /// Must match the lease
    pub property_id: i32,
    pub lease_id: i32,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 100))]
    pub transaction_id: Option<String>,
    pub due_date: NaiveDate,
    /// Required when status is `completed`
    pub paid_date: Option<NaiveDate>,
    /// Defaults to `pending`
    pub status: Option<PaymentStatus>,
    pub proof_document: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdatePaymentRequest {
    pub tenant_id: Option<i32>,
    pub property_id: Option<i32>,
    pub lease_id: Option<i32>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 100))]
    pub transaction_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
    pub proof_document: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    pub tenant_id: i32,
    pub property_id: i32,
    pub lease_id: i32,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub proof_document: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            property_id: model.property_id,
            lease_id: model.lease_id,
            amount: model.amount,
            payment_method: model.payment_method,
            transaction_id: model.transaction_id,
            due_date: model.due_date,
            paid_date: model.paid_date,
            status: model.status,
            proof_document: model.proof_document,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct PaymentQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    pub status: Option<PaymentStatus>,
    pub lease_id: Option<i32>,
    pub tenant_id: Option<i32>,
    pub property_id: Option<i32>,
}

/// Record a payment
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created successfully", body = ApiResponse<PaymentResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn create_payment(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Create, Resource::Payment)?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = PaymentDraft {
        tenant_id: request.tenant_id,
        property_id: request.property_id,
        lease_id: request.lease_id,
        amount: request.amount,
        status: request.status.unwrap_or(PaymentStatus::Pending),
        paid_date: request.paid_date,
    };
    validate_payment(&state.db, &actor, errors, &draft).await?;

    debug!("Recording payment of {} on lease {}", draft.amount, draft.lease_id);
    let saved = payment::ActiveModel {
        tenant_id: Set(draft.tenant_id),
        property_id: Set(draft.property_id),
        lease_id: Set(draft.lease_id),
        amount: Set(draft.amount),
        payment_method: Set(request.payment_method),
        transaction_id: Set(request.transaction_id),
        due_date: Set(request.due_date),
        paid_date: Set(draft.paid_date),
        status: Set(draft.status),
        proof_document: Set(request.proof_document),
        notes: Set(request.notes),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Payment created successfully with ID: {}", saved.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(PaymentResponse::from(saved), "Payment created successfully")),
    ))
}

/// List payments visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "payments",
    params(PaymentQuery),
    responses(
        (status = 200, description = "Payments retrieved successfully", body = ApiResponse<Vec<PaymentResponse>>)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_payments(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(Query(query)): Valid<Query<PaymentQuery>>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ApiError> {
    authorize(&current.actor, Action::List, Resource::Payment)?;

    let mut select = visible::<payment::Entity>(&current.actor);
    if let Some(status) = query.status {
        select = select.filter(payment::Column::Status.eq(status));
    }
    if let Some(lease_id) = query.lease_id {
        select = select.filter(payment::Column::LeaseId.eq(lease_id));
    }
    if let Some(tenant_id) = query.tenant_id {
        select = select.filter(payment::Column::TenantId.eq(tenant_id));
    }
    if let Some(property_id) = query.property_id {
        select = select.filter(payment::Column::PropertyId.eq(property_id));
    }

    let (page, limit) = page_and_limit(query.page, query.limit);
    let payments = select
        .order_by_desc(payment::Column::DueDate)
        .order_by_desc(payment::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await?;

    Ok(Json(ApiResponse::new(
        payments.into_iter().map(PaymentResponse::from).collect(),
        "Payments retrieved successfully",
    )))
}

/// Get a payment by ID
#[utoipa::path(
    get,
    path = "/api/v1/payments/{payment_id}",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment retrieved successfully", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    authorize(&current.actor, Action::Retrieve, Resource::Payment)?;
    let found = fetch_visible::<payment::Entity, _>(&state.db, &current.actor, payment_id).await?;
    Ok(Json(ApiResponse::new(PaymentResponse::from(found), "Payment retrieved successfully")))
}

/// Update a payment
#[utoipa::path(
    put,
    path = "/api/v1/payments/{payment_id}",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment updated successfully", body = ApiResponse<PaymentResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.user.id))]
pub async fn update_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    let actor = current.actor;
    authorize(&actor, Action::Update, Resource::Payment)?;
    let existing = fetch_visible::<payment::Entity, _>(&state.db, &actor, payment_id).await?;

    let errors = FieldErrors::from_shape(request.validate());
    let draft = PaymentDraft {
        tenant_id: request.tenant_id.unwrap_or(existing.tenant_id),
        property_id: request.property_id.unwrap_or(existing.property_id),
        lease_id: request.lease_id.unwrap_or(existing.lease_id),
        amount: request.amount.unwrap_or(existing.amount),
        status: request.status.unwrap_or(existing.status),
        paid_date: request.paid_date.or(existing.paid_date),
    };
    validate_payment(&state.db, &actor, errors, &draft).await?;

    let mut active: payment::ActiveModel = existing.into();
    active.tenant_id = Set(draft.tenant_id);
    active.property_id = Set(draft.property_id);
    active.lease_id = Set(draft.lease_id);
    active.amount = Set(draft.amount);
    active.status = Set(draft.status);
    active.paid_date = Set(draft.paid_date);
    if let Some(payment_method) = request.payment_method {
        active.payment_method = Set(payment_method);
    }
    if let Some(transaction_id) = request.transaction_id {
        active.transaction_id = Set(Some(transaction_id));
    }
    if let Some(due_date) = request.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(proof_document) = request.proof_document {
        active.proof_document = Set(Some(proof_document));
    }
    if let Some(notes) = request.notes {
        active.notes = Set(Some(notes));
    }

    let updated = active.update(&state.db).await?;
    info!("Payment {} updated to status {:?}", updated.id, updated.status);
    Ok(Json(ApiResponse::new(PaymentResponse::from(updated), "Payment updated successfully")))
}

/// Delete a payment
#[utoipa::path(
    delete,
    path = "/api/v1/payments/{payment_id}",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    authorize(&current.actor, Action::Delete, Resource::Payment)?;
    let existing = fetch_visible::<payment::Entity, _>(&state.db, &current.actor, payment_id).await?;
    existing.delete(&state.db).await?;

    info!("Payment {} deleted", payment_id);
    Ok(Json(ApiResponse::new(
        format!("Payment {payment_id} deleted"),
        "Payment deleted successfully",
    )))
}
