//! Provider search: the `get_nearby_providers` procedure and the salon
//! address lookup that completes its rows.

use std::collections::HashMap;

use beautylink_core::providers::{
    merge_provider_details, rank_providers, salon_ids, MatchType, NearbyProvider, Provider,
    SalonAddress, SearchLocation,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::scope::RequestScope;
use crate::DbError;

/// A row from the `services` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: Uuid,
    pub name_fr: String,
    pub name_en: String,
    pub category: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub duration_minutes: i32,
    pub base_price: Decimal,
}

/// A row returned by `get_nearby_providers`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NearbyProviderRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub image: Option<String>,
    pub service_price: Option<Decimal>,
    pub distance_meters: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub match_type: Option<String>,
    pub is_mobile: Option<bool>,
    pub city: Option<String>,
}

impl TryFrom<NearbyProviderRow> for NearbyProvider {
    type Error = DbError;

    fn try_from(row: NearbyProviderRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(|_| DbError::Decode {
            column: "type",
            value: row.kind.clone(),
        })?;
        Ok(NearbyProvider {
            id: row.id,
            kind,
            name: row.name,
            rating: row.rating,
            review_count: row.review_count.unwrap_or(0),
            image: row.image,
            service_price: row.service_price,
            distance_meters: row.distance_meters,
            latitude: row.latitude,
            longitude: row.longitude,
            match_type: row
                .match_type
                .as_deref()
                .map_or(MatchType::ProximityOrFallback, MatchType::from_wire),
            is_mobile: row.is_mobile,
            city: row.city,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SalonAddressRow {
    id: Uuid,
    quarter: Option<String>,
    street: Option<String>,
    address: Option<String>,
    city: Option<String>,
}

impl From<SalonAddressRow> for SalonAddress {
    fn from(row: SalonAddressRow) -> Self {
        SalonAddress {
            id: row.id,
            quarter: row.quarter,
            street: row.street,
            address: row.address,
            city: row.city,
        }
    }
}

/// Everything a provider search needs besides the pool.
#[derive(Debug, Clone)]
pub struct ProviderSearch {
    pub service_id: Uuid,
    pub location: SearchLocation,
    pub radius_meters: u32,
}

/// Returns a service by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_service(pool: &PgPool, service_id: Uuid) -> Result<Option<ServiceRow>, DbError> {
    let row = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name_fr, name_en, category, description, images, duration_minutes, base_price \
         FROM services \
         WHERE id = $1",
    )
    .bind(service_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Calls `get_nearby_providers` and decodes its rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the call fails or [`DbError::Decode`] for a
/// provider type the procedure should never return.
pub async fn nearby_providers(
    pool: &PgPool,
    search: &ProviderSearch,
) -> Result<Vec<NearbyProvider>, DbError> {
    let radius = i32::try_from(search.radius_meters).unwrap_or(i32::MAX);
    let coords = search.location.coords;

    let rows = sqlx::query_as::<_, NearbyProviderRow>(
        "SELECT id, type, name, rating, review_count, image, service_price, distance_meters, \
                latitude, longitude, match_type, is_mobile, city \
         FROM get_nearby_providers($1, $2, $3, $4, $5, $6)",
    )
    .bind(coords.map(|c| c.lat))
    .bind(coords.map(|c| c.lon))
    .bind(radius)
    .bind(search.location.city.as_deref())
    .bind(search.location.district.as_deref())
    .bind(search.service_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(NearbyProvider::try_from).collect()
}

/// Batch-fetches address parts for the given salons.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn salon_addresses(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, SalonAddress>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, SalonAddressRow>(
        "SELECT id, quarter, street, address, city \
         FROM salons \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, SalonAddress::from(row)))
        .collect())
}

/// Ranked providers offering a service near a location.
///
/// Returns `Ok(None)` when `scope` was cancelled before the search finished.
/// A failed salon address lookup is logged and leaves salon addresses
/// unformatted instead of failing the search.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown service and [`DbError::Sqlx`]
/// if the service lookup or the procedure call fails.
pub async fn locate_providers(
    pool: &PgPool,
    search: &ProviderSearch,
    scope: &RequestScope,
) -> Result<Option<Vec<Provider>>, DbError> {
    let Some(service) = scope.run(get_service(pool, search.service_id)).await else {
        return Ok(None);
    };
    if service?.is_none() {
        return Err(DbError::NotFound(format!("service {}", search.service_id)));
    }

    let Some(rows) = scope.run(nearby_providers(pool, search)).await else {
        return Ok(None);
    };
    let rows = rows?;

    let ids = salon_ids(&rows);
    let details = if ids.is_empty() {
        HashMap::new()
    } else {
        let Some(details) = scope.run(salon_addresses(pool, &ids)).await else {
            return Ok(None);
        };
        details.unwrap_or_else(|e| {
            tracing::warn!(error = %e, salons = ids.len(), "salon address lookup failed");
            HashMap::new()
        })
    };

    let mut providers = merge_provider_details(&rows, &details);
    rank_providers(&mut providers, search.location.district.as_deref());

    tracing::debug!(
        service_id = %search.service_id,
        providers = providers.len(),
        "provider search complete"
    );
    Ok(Some(providers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beautylink_core::providers::ProviderKind;

    fn row(kind: &str, match_type: Option<&str>) -> NearbyProviderRow {
        NearbyProviderRow {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            name: "Chez Mireille".to_string(),
            rating: Some(4.5),
            review_count: None,
            image: None,
            service_price: Some(Decimal::new(5000, 0)),
            distance_meters: Some(1200.0),
            latitude: Some(4.05),
            longitude: Some(9.7),
            match_type: match_type.map(str::to_string),
            is_mobile: None,
            city: Some("Douala".to_string()),
        }
    }

    #[test]
    fn row_decodes_kind_and_match_type() {
        let provider = NearbyProvider::try_from(row("salon", Some("city_match"))).unwrap();
        assert_eq!(provider.kind, ProviderKind::Salon);
        assert_eq!(provider.match_type, MatchType::CityMatch);
        assert_eq!(provider.review_count, 0);
    }

    #[test]
    fn missing_match_type_is_fallback_tier() {
        let provider = NearbyProvider::try_from(row("therapist", None)).unwrap();
        assert_eq!(provider.match_type, MatchType::ProximityOrFallback);
    }

    #[test]
    fn unknown_kind_is_a_decode_error() {
        let err = NearbyProvider::try_from(row("spa", Some("city_match"))).unwrap_err();
        assert!(matches!(err, DbError::Decode { column: "type", .. }));
    }
}
