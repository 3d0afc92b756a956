use axum::{
    extract::{Query, State},
    Extension, Json,
};
use beautylink_remote::GeocodeResult;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_remote_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct GeocodeQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct GeocodeItem {
    /// Text to send back as `location` on a provider search.
    pub label: String,
    #[serde(flatten)]
    pub result: GeocodeResult,
}

/// GET /api/v1/geocode?q=: address suggestions within Cameroon.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<ApiResponse<Vec<GeocodeItem>>>, ApiError> {
    let results = state
        .geocoder
        .search(params.q.as_deref().unwrap_or_default())
        .await
        .map_err(|e| map_remote_error(req_id.0.clone(), e))?;

    let data = results
        .into_iter()
        .map(|result| GeocodeItem {
            label: result.location_label(),
            result,
        })
        .collect();

    Ok(ApiResponse::new(req_id.0, data))
}
