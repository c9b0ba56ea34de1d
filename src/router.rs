use crate::handlers::{
    accounts::{create_account, delete_account, get_account, get_accounts, update_account},
    auth::{current_user, login, refresh, register, update_current_user},
    dashboard::get_dashboard_stats,
    documents::{create_document, delete_document, get_document, get_documents, update_document},
    expenses::{create_expense, delete_expense, get_expense, get_expenses, update_expense},
    health::health_check,
    journal_entries::{
        create_journal_entry, delete_journal_entry, get_journal_entries, get_journal_entry,
        update_journal_entry,
    },
    journal_entry_lines::{
        create_journal_entry_line, delete_journal_entry_line, get_journal_entry_line,
        get_journal_entry_lines, update_journal_entry_line,
    },
    leases::{create_lease, delete_lease, get_lease, get_leases, update_lease},
    notifications::{
        create_notification, delete_notification, get_notification, get_notifications,
        respond_to_notification, update_notification,
    },
    payments::{create_payment, delete_payment, get_payment, get_payments, update_payment},
    properties::{create_property, delete_property, get_properties, get_property, update_property},
    property_images::{
        create_property_image, delete_property_image, get_property_image, get_property_images,
        update_property_image,
    },
    tenants::{create_tenant, delete_tenant, get_tenant, get_tenants, update_tenant},
    units::{create_unit, delete_unit, get_unit, get_units, update_unit},
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/user", get(current_user))
        .route("/api/v1/auth/user/update", put(update_current_user))
        // Users (admin only)
        .route("/api/v1/users", get(get_users).post(create_user))
        .route(
            "/api/v1/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Properties and images
        .route("/api/v1/properties", get(get_properties).post(create_property))
        .route(
            "/api/v1/properties/:property_id",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route(
            "/api/v1/property-images",
            get(get_property_images).post(create_property_image),
        )
        .route(
            "/api/v1/property-images/:image_id",
            get(get_property_image)
                .put(update_property_image)
                .delete(delete_property_image),
        )
        // Units
        .route("/api/v1/units", get(get_units).post(create_unit))
        .route(
            "/api/v1/units/:unit_id",
            get(get_unit).put(update_unit).delete(delete_unit),
        )
        // Tenant profiles
        .route("/api/v1/tenants", get(get_tenants).post(create_tenant))
        .route(
            "/api/v1/tenants/:tenant_id",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        // Leases
        .route("/api/v1/leases", get(get_leases).post(create_lease))
        .route(
            "/api/v1/leases/:lease_id",
            get(get_lease).put(update_lease).delete(delete_lease),
        )
        // Payments
        .route("/api/v1/payments", get(get_payments).post(create_payment))
        .route(
            "/api/v1/payments/:payment_id",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        // Expenses
        .route("/api/v1/expenses", get(get_expenses).post(create_expense))
        .route(
            "/api/v1/expenses/:expense_id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        // Documents
        .route("/api/v1/documents", get(get_documents).post(create_document))
        .route(
            "/api/v1/documents/:document_id",
            get(get_document).put(update_document).delete(delete_document),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(get_notifications).post(create_notification),
        )
        .route(
            "/api/v1/notifications/:notification_id",
            get(get_notification)
                .put(update_notification)
                .delete(delete_notification),
        )
        .route(
            "/api/v1/notifications/:notification_id/respond",
            post(respond_to_notification),
        )
        // Ledger
        .route("/api/v1/accounts", get(get_accounts).post(create_account))
        .route(
            "/api/v1/accounts/:account_id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route(
            "/api/v1/journal-entries",
            get(get_journal_entries).post(create_journal_entry),
        )
        .route(
            "/api/v1/journal-entries/:entry_id",
            get(get_journal_entry)
                .put(update_journal_entry)
                .delete(delete_journal_entry),
        )
        .route(
            "/api/v1/journal-entry-lines",
            get(get_journal_entry_lines).post(create_journal_entry_line),
        )
        .route(
            "/api/v1/journal-entry-lines/:line_id",
            get(get_journal_entry_line)
                .put(update_journal_entry_line)
                .delete(delete_journal_entry_line),
        )
        // Dashboard
        .route("/api/v1/dashboard/stats", get(get_dashboard_stats))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Adds request metrics and the `/metrics` scrape endpoint.
///
/// The Prometheus recorder is process-global, so this may only be called once.
pub fn with_metrics(router: Router) -> Router {
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    router
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
}
