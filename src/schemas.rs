use std::collections::BTreeMap;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::auth::TokenIssuer;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Issues and verifies bearer tokens
    pub tokens: TokenIssuer,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Field-keyed messages, present on validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Resolves optional `page`/`limit` query values into a zero-based page index and page size.
pub fn page_and_limit(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    (page - 1, limit)
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::current_user,
        crate::handlers::auth::update_current_user,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::properties::create_property,
        crate::handlers::properties::get_properties,
        crate::handlers::properties::get_property,
        crate::handlers::properties::update_property,
        crate::handlers::properties::delete_property,
        crate::handlers::property_images::create_property_image,
        crate::handlers::property_images::get_property_images,
        crate::handlers::property_images::get_property_image,
        crate::handlers::property_images::update_property_image,
        crate::handlers::property_images::delete_property_image,
        crate::handlers::units::create_unit,
        crate::handlers::units::get_units,
        crate::handlers::units::get_unit,
        crate::handlers::units::update_unit,
        crate::handlers::units::delete_unit,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenants,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::update_tenant,
        crate::handlers::tenants::delete_tenant,
        crate::handlers::leases::create_lease,
        crate::handlers::leases::get_leases,
        crate::handlers::leases::get_lease,
        crate::handlers::leases::update_lease,
        crate::handlers::leases::delete_lease,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::get_payments,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::update_payment,
        crate::handlers::payments::delete_payment,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expenses,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::documents::create_document,
        crate::handlers::documents::get_documents,
        crate::handlers::documents::get_document,
        crate::handlers::documents::update_document,
        crate::handlers::documents::delete_document,
        crate::handlers::notifications::create_notification,
        crate::handlers::notifications::get_notifications,
        crate::handlers::notifications::get_notification,
        crate::handlers::notifications::update_notification,
        crate::handlers::notifications::delete_notification,
        crate::handlers::notifications::respond_to_notification,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::get_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::update_account,
        crate::handlers::accounts::delete_account,
        crate::handlers::journal_entries::create_journal_entry,
        crate::handlers::journal_entries::get_journal_entries,
        crate::handlers::journal_entries::get_journal_entry,
        crate::handlers::journal_entries::update_journal_entry,
        crate::handlers::journal_entries::delete_journal_entry,
        crate::handlers::journal_entry_lines::create_journal_entry_line,
        crate::handlers::journal_entry_lines::get_journal_entry_lines,
        crate::handlers::journal_entry_lines::get_journal_entry_line,
        crate::handlers::journal_entry_lines::update_journal_entry_line,
        crate::handlers::journal_entry_lines::delete_journal_entry_line,
        crate::handlers::dashboard::get_dashboard_stats,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::RefreshRequest,
            crate::handlers::auth::TokenPair,
            crate::handlers::auth::AccessToken,
            crate::handlers::auth::UpdateProfileRequest,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::properties::CreatePropertyRequest,
            crate::handlers::properties::UpdatePropertyRequest,
            crate::handlers::properties::PropertyResponse,
            crate::handlers::property_images::CreatePropertyImageRequest,
            crate::handlers::property_images::UpdatePropertyImageRequest,
            crate::handlers::property_images::PropertyImageResponse,
            crate::handlers::units::CreateUnitRequest,
            crate::handlers::units::UpdateUnitRequest,
            crate::handlers::units::UnitResponse,
            crate::handlers::tenants::CreateTenantRequest,
            crate::handlers::tenants::UpdateTenantRequest,
            crate::handlers::tenants::TenantResponse,
            crate::handlers::leases::CreateLeaseRequest,
            crate::handlers::leases::UpdateLeaseRequest,
            crate::handlers::leases::LeaseResponse,
            crate::handlers::payments::CreatePaymentRequest,
            crate::handlers::payments::UpdatePaymentRequest,
            crate::handlers::payments::PaymentResponse,
            crate::handlers::expenses::CreateExpenseRequest,
            crate::handlers::expenses::UpdateExpenseRequest,
            crate::handlers::expenses::ExpenseResponse,
            crate::handlers::documents::CreateDocumentRequest,
            crate::handlers::documents::UpdateDocumentRequest,
            crate::handlers::documents::DocumentResponse,
            crate::handlers::notifications::CreateNotificationRequest,
            crate::handlers::notifications::UpdateNotificationRequest,
            crate::handlers::notifications::RespondRequest,
            crate::handlers::notifications::NotificationResponse,
            crate::handlers::accounts::CreateAccountRequest,
            crate::handlers::accounts::UpdateAccountRequest,
            crate::handlers::accounts::AccountResponse,
            crate::handlers::journal_entries::CreateJournalEntryRequest,
            crate::handlers::journal_entries::JournalLineRequest,
            crate::handlers::journal_entries::UpdateJournalEntryRequest,
            crate::handlers::journal_entries::JournalEntryResponse,
            crate::handlers::journal_entry_lines::CreateJournalEntryLineRequest,
            crate::handlers::journal_entry_lines::UpdateJournalEntryLineRequest,
            crate::handlers::journal_entry_lines::JournalEntryLineResponse,
            policy::dashboard::DashboardStats,
            policy::dashboard::PaymentCounts,
            policy::dashboard::RecentPayment,
            policy::dashboard::RecentNotification,
            policy::dashboard::ActiveLease,
            policy::ledger::EntryTotals,
            model::entities::user::Role,
            model::entities::property::PropertyType,
            model::entities::property::PropertyStatus,
            model::entities::unit::UnitStatus,
            model::entities::lease::LeaseStatus,
            model::entities::payment::PaymentMethod,
            model::entities::payment::PaymentStatus,
            model::entities::expense::ExpenseCategory,
            model::entities::document::FileType,
            model::entities::notification::NotificationCategory,
            model::entities::notification::Priority,
            model::entities::notification::NotificationStatus,
            model::entities::account::AccountType,
        )
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and the current user"),
        (name = "users", description = "User administration (admin only)"),
        (name = "properties", description = "Properties and their images"),
        (name = "units", description = "Rentable units"),
        (name = "tenants", description = "Tenant profiles"),
        (name = "leases", description = "Leases"),
        (name = "payments", description = "Rent payments"),
        (name = "expenses", description = "Property expenses"),
        (name = "documents", description = "Uploaded documents"),
        (name = "notifications", description = "Tenant notifications and landlord responses"),
        (name = "ledger", description = "Chart of accounts and journal entries"),
        (name = "dashboard", description = "Role-scoped summary figures"),
    ),
    info(
        title = "Rentals API",
        description = "Property rental management API with role-scoped access for admins, landlords and tenants",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
