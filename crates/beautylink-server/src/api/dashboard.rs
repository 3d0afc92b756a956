use axum::{extract::State, Extension, Json};
use beautylink_core::dashboard::DashboardSummary;
use beautylink_db::RequestScope;
use chrono::Utc;

use crate::middleware::RequestId;

use super::{cancelled, ApiError, ApiResponse, AppState};

/// GET /api/v1/admin/dashboard: platform totals for the admin home page.
///
/// Widgets whose query failed come back zeroed and are named in `degraded`.
pub(super) async fn get_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(scope): Extension<RequestScope>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let summary = beautylink_db::load_dashboard(&state.pool, Utc::now(), &scope)
        .await
        .ok_or_else(|| cancelled(req_id.0.clone()))?;

    if !summary.degraded.is_empty() {
        tracing::warn!(widgets = ?summary.degraded, "dashboard served with degraded widgets");
    }

    Ok(ApiResponse::new(req_id.0, summary))
}
