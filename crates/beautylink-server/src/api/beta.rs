//! Beta test tracker routes: per-tester checklists and the admin overview.

use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap},
    Extension, Json,
};
use beautylink_core::beta::{
    broken_reports, overview, summarize_testers, BetaOverview, BetaTestResult, BrokenReport,
    StatusCounts, TestAction, TestDefinition, TestRole, TestStatus, TesterSummary, TrackerState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_data_error, map_db_error, parse_uuid, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct MarkTestRequest {
    pub status: String,
    pub comment: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TestStatusItem {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub status: TestStatus,
    pub comment: Option<String>,
    pub device_info: Option<String>,
    pub tested_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct TesterStatusResponse {
    pub user_id: Uuid,
    pub role: TestRole,
    pub counts: StatusCounts,
    pub tests: Vec<TestStatusItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResetResponse {
    pub user_id: Uuid,
    pub role: TestRole,
    pub cleared: u64,
    pub counts: StatusCounts,
}

#[derive(Debug, Serialize)]
pub(super) struct BetaOverviewResponse {
    pub overview: BetaOverview,
    pub testers: Vec<TesterSummary>,
    pub broken: Vec<BrokenReport>,
}

fn parse_role(request_id: &str, raw: &str) -> Result<TestRole, ApiError> {
    raw.parse::<TestRole>()
        .map_err(|e| map_data_error(request_id.to_owned(), &e))
}

fn parse_action(request_id: &str, body: MarkTestRequest) -> Result<TestAction, ApiError> {
    let status = body
        .status
        .parse::<TestStatus>()
        .map_err(|e| map_data_error(request_id.to_owned(), &e))?;
    match status {
        TestStatus::Working => Ok(TestAction::MarkWorking),
        TestStatus::Broken => Ok(TestAction::MarkBroken {
            comment: body.comment.unwrap_or_default(),
        }),
        TestStatus::Pending => Err(ApiError::new(
            request_id,
            "validation_error",
            "a test cannot be marked pending; reset the tester instead",
        )),
    }
}

fn status_item(tracker: &TrackerState, def: &TestDefinition) -> TestStatusItem {
    let result = tracker.result(&def.id);
    TestStatusItem {
        id: def.id.clone(),
        category: def.category.clone(),
        name: def.name.clone(),
        description: def.description.clone(),
        status: tracker.status(&def.id),
        comment: result.and_then(|r| r.comment.clone()),
        device_info: result.and_then(|r| r.device_info.clone()),
        tested_at: result.map(|r| r.tested_at),
    }
}

/// GET /api/v1/beta/catalog/{role}
pub(super) async fn get_catalog(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(role): Path<String>,
) -> Result<Json<ApiResponse<Vec<TestDefinition>>>, ApiError> {
    let role = parse_role(&req_id.0, &role)?;
    Ok(ApiResponse::new(
        req_id.0,
        state.catalog.for_role(role).to_vec(),
    ))
}

/// GET /api/v1/beta/{role}/testers/{user_id}: the tester's checklist.
pub(super) async fn get_tester_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((role, user_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TesterStatusResponse>>, ApiError> {
    let rid = req_id.0;
    let role = parse_role(&rid, &role)?;
    let user_id = parse_uuid(&rid, "user_id", &user_id)?;

    let rows = beautylink_db::list_beta_results_for_user(&state.pool, user_id, role)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?;
    let tracker = TrackerState::new(user_id, role, rows);

    let tests = state
        .catalog
        .for_role(role)
        .iter()
        .map(|def| status_item(&tracker, def))
        .collect();

    Ok(ApiResponse::new(
        rid,
        TesterStatusResponse {
            user_id,
            role,
            counts: tracker.counts(state.catalog),
            tests,
        },
    ))
}

/// PUT /api/v1/beta/{role}/testers/{user_id}/tests/{test_id}
///
/// Without an explicit `device_info` the request's `User-Agent` is recorded.
pub(super) async fn mark_test(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((role, user_id, test_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<MarkTestRequest>,
) -> Result<Json<ApiResponse<BetaTestResult>>, ApiError> {
    let rid = req_id.0;
    let role = parse_role(&rid, &role)?;
    let user_id = parse_uuid(&rid, "user_id", &user_id)?;

    let device_info = body
        .device_info
        .clone()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| {
            headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        });
    let action = parse_action(&rid, body)?;

    let rows = beautylink_db::list_beta_results_for_user(&state.pool, user_id, role)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?;
    let mut tracker = TrackerState::new(user_id, role, rows);

    let result = tracker
        .apply(state.catalog, &test_id, action, Utc::now(), device_info)
        .map_err(|e| map_data_error(rid.clone(), &e))?;
    let stored = beautylink_db::upsert_beta_result(&state.pool, &result)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?;

    tracing::info!(
        %user_id,
        role = %role,
        test_id = %stored.test_id,
        status = %stored.status,
        "beta test result recorded"
    );
    Ok(ApiResponse::new(rid, stored))
}

/// DELETE /api/v1/beta/{role}/testers/{user_id}: every test back to pending.
pub(super) async fn reset_tester(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((role, user_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ResetResponse>>, ApiError> {
    let rid = req_id.0;
    let role = parse_role(&rid, &role)?;
    let user_id = parse_uuid(&rid, "user_id", &user_id)?;

    let rows = beautylink_db::list_beta_results_for_user(&state.pool, user_id, role)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?;
    let mut tracker = TrackerState::new(user_id, role, rows);

    let cleared = beautylink_db::reset_beta_results(&state.pool, user_id, role)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?;
    let loaded = tracker.reset();
    if u64::try_from(loaded).ok() != Some(cleared) {
        tracing::debug!(%user_id, loaded, cleared, "results changed while resetting");
    }

    tracing::info!(%user_id, role = %role, cleared, "beta tester reset");
    Ok(ApiResponse::new(
        rid,
        ResetResponse {
            user_id,
            role,
            cleared,
            counts: tracker.counts(state.catalog),
        },
    ))
}

/// GET /api/v1/admin/beta/overview: per-tester progress and broken reports.
pub(super) async fn get_overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<BetaOverviewResponse>>, ApiError> {
    let rows = beautylink_db::list_all_beta_results(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    let testers = summarize_testers(&rows, state.catalog);
    let data = BetaOverviewResponse {
        overview: overview(&testers),
        broken: broken_reports(&rows, state.catalog),
        testers,
    };
    Ok(ApiResponse::new(req_id.0, data))
}
