//! GET /api/v1/services/{service_id}/providers: providers near a location.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use beautylink_core::providers::{
    filter_providers, resolve_search_location, LocationInput, LocationQuery, Provider,
    ProviderFilter,
};
use beautylink_db::{ProviderSearch, RequestScope};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{cancelled, map_data_error, map_db_error, parse_uuid, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ProviderQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProviderListResponse {
    pub service_id: Uuid,
    pub filter: ProviderFilter,
    pub location: Option<LocationQuery>,
    /// Providers found before the tab filter was applied.
    pub total: usize,
    pub providers: Vec<Provider>,
    pub empty_message: Option<&'static str>,
}

pub(super) async fn list_service_providers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(scope): Extension<RequestScope>,
    Path(service_id): Path<String>,
    Query(params): Query<ProviderQuery>,
) -> Result<Json<ApiResponse<ProviderListResponse>>, ApiError> {
    let rid = req_id.0;
    let service_id = parse_uuid(&rid, "service_id", &service_id)?;

    let filter = match params.filter.as_deref() {
        Some(raw) => raw
            .parse::<ProviderFilter>()
            .map_err(|e| map_data_error(rid.clone(), &e))?,
        None => ProviderFilter::default(),
    };

    let input = LocationInput {
        lat: params.lat,
        lon: params.lon,
        location: params.location,
    };
    input
        .validate()
        .map_err(|e| map_data_error(rid.clone(), &e))?;

    // The server keeps no per-user state; only the request's own location counts.
    let location = resolve_search_location(&input, None);
    let location_query = location.to_location_query();
    let search = ProviderSearch {
        service_id,
        location,
        radius_meters: state.config.search_radius_meters,
    };

    let all = beautylink_db::locate_providers(&state.pool, &search, &scope)
        .await
        .map_err(|e| map_db_error(rid.clone(), e))?
        .ok_or_else(|| cancelled(rid.clone()))?;

    let providers = filter_providers(&all, filter);
    let empty_message = providers.is_empty().then(|| filter.empty_message());

    Ok(ApiResponse::new(
        rid,
        ProviderListResponse {
            service_id,
            filter,
            location: location_query,
            total: all.len(),
            providers,
            empty_message,
        },
    ))
}
