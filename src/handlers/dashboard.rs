use axum::{extract::State, response::Json};
use policy::dashboard::{DashboardStats, stats};
use tracing::{debug, instrument};

use crate::{
    auth::CurrentUser,
    error::ApiError,
    schemas::{ApiResponse, AppState},
};

/// Role-scoped summary figures for the caller's dashboard
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let summary = stats(&state.db, &current.actor).await?;
    debug!(role = ?current.actor.role(), "Dashboard statistics computed");
    Ok(Json(ApiResponse::new(summary, "Dashboard statistics retrieved successfully")))
}
