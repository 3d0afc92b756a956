//! GET /api/v1/clients/{client_id}/bookings: a client's bookings for one tab.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use beautylink_core::bookings::{Booking, BookingPartition, BookingTab};
use beautylink_db::RequestScope;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{cancelled, map_data_error, map_db_error, parse_uuid, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct BookingsQuery {
    pub tab: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BookingsResponse {
    pub client_id: Uuid,
    pub tab: BookingTab,
    pub upcoming_count: usize,
    pub past_count: usize,
    pub bookings: Vec<Booking>,
}

pub(super) async fn list_client_bookings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(scope): Extension<RequestScope>,
    Path(client_id): Path<String>,
    Query(params): Query<BookingsQuery>,
) -> Result<Json<ApiResponse<BookingsResponse>>, ApiError> {
    let rid = req_id.0;
    let client_id = parse_uuid(&rid, "client_id", &client_id)?;
    let tab = match params.tab.as_deref() {
        Some(raw) => raw
            .parse::<BookingTab>()
            .map_err(|e| map_data_error(rid.clone(), &e))?,
        None => BookingTab::Upcoming,
    };

    let BookingPartition { upcoming, past } =
        beautylink_db::list_client_bookings(&state.pool, client_id, Utc::now(), &scope)
            .await
            .map_err(|e| map_db_error(rid.clone(), e))?
            .ok_or_else(|| cancelled(rid.clone()))?;

    let (upcoming_count, past_count) = (upcoming.len(), past.len());
    let bookings = match tab {
        BookingTab::Upcoming => upcoming,
        BookingTab::Past => past,
    };

    Ok(ApiResponse::new(
        rid,
        BookingsResponse {
            client_id,
            tab,
            upcoming_count,
            past_count,
            bookings,
        },
    ))
}
