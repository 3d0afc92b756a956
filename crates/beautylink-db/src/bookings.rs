//! Client booking list: one relational fetch plus two best-effort lookups.

use std::collections::HashMap;

use beautylink_core::bookings::{
    enrich_bookings, enrichment_keys, partition_bookings, Booking, BookingItem, BookingParty,
    BookingPartition, SalonRef, ServiceImageIndex, ServiceImages, TherapistRef, UserName,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::scope::RequestScope;
use crate::DbError;

/// One booking with its provider columns and items aggregated as JSON.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub salon_id: Option<Uuid>,
    pub salon_name: Option<String>,
    pub salon_image: Option<String>,
    pub therapist_id: Option<Uuid>,
    pub therapist_user_id: Option<Uuid>,
    pub therapist_business_name: Option<String>,
    pub therapist_image: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub subtotal: Decimal,
    pub travel_fee: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub items: Json<Vec<BookingItemRow>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingItemRow {
    pub service_name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| DbError::Decode {
            column: "status",
            value: row.status.clone(),
        })?;

        let party = match (row.salon_id, row.therapist_id, row.therapist_user_id) {
            (Some(id), None, _) => BookingParty::Salon(SalonRef {
                id,
                name: row.salon_name.unwrap_or_default(),
                image: row.salon_image,
            }),
            (None, Some(id), Some(user_id)) => BookingParty::Therapist(TherapistRef {
                id,
                user_id,
                business_name: row.therapist_business_name,
                image: row.therapist_image,
                display_name: None,
            }),
            _ => {
                return Err(DbError::Decode {
                    column: "salon_id/therapist_id",
                    value: format!("booking {} has no single provider", row.id),
                })
            }
        };

        Ok(Booking {
            id: row.id,
            client_id: row.client_id,
            party,
            scheduled_at: row.scheduled_at,
            status,
            subtotal: row.subtotal,
            travel_fee: row.travel_fee,
            tip: row.tip,
            total: row.total,
            items: row
                .items
                .0
                .into_iter()
                .map(|item| BookingItem {
                    service_name: item.service_name,
                    price: item.price,
                    duration_minutes: item.duration_minutes,
                    images: Vec::new(),
                })
                .collect(),
            cover_image: None,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceImagesRow {
    pub name_fr: String,
    pub name_en: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserNameRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Bookings of one client with items and provider columns, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for a
/// row that breaks the status or single-provider constraints.
pub async fn fetch_client_bookings(pool: &PgPool, client_id: Uuid) -> Result<Vec<Booking>, DbError> {
    let rows = sqlx::query_as::<_, BookingRow>(
        "SELECT b.id, b.client_id, \
                s.id AS salon_id, s.name AS salon_name, s.image AS salon_image, \
                t.id AS therapist_id, t.user_id AS therapist_user_id, \
                t.business_name AS therapist_business_name, t.profile_image AS therapist_image, \
                b.scheduled_at, b.status, b.subtotal, b.travel_fee, b.tip, b.total, \
                COALESCE( \
                    (SELECT json_agg(json_build_object( \
                                'service_name', bi.service_name, \
                                'price', bi.price::text, \
                                'duration_minutes', bi.duration_minutes) \
                            ORDER BY bi.created_at, bi.id) \
                     FROM booking_items bi \
                     WHERE bi.booking_id = b.id), \
                    '[]'::json) AS items \
         FROM bookings b \
         LEFT JOIN salons s ON s.id = b.salon_id \
         LEFT JOIN therapists t ON t.id = b.therapist_id \
         WHERE b.client_id = $1 \
         ORDER BY b.scheduled_at DESC",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Booking::try_from).collect()
}

/// Services whose French or English name is in `names`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn services_by_names(
    pool: &PgPool,
    names: &[String],
) -> Result<Vec<ServiceImages>, DbError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ServiceImagesRow>(
        "SELECT name_fr, name_en, images \
         FROM services \
         WHERE name_fr = ANY($1) OR name_en = ANY($1) \
         ORDER BY created_at, id",
    )
    .bind(names)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ServiceImages {
            name_fr: row.name_fr,
            name_en: row.name_en,
            images: row.images,
        })
        .collect())
}

/// First and last names of the given users.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn users_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, UserName>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, UserNameRow>(
        "SELECT id, first_name, last_name \
         FROM users \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.id,
                UserName {
                    id: row.id,
                    first_name: row.first_name,
                    last_name: row.last_name,
                },
            )
        })
        .collect())
}

/// A client's bookings split into upcoming and past, with item images and
/// therapist names filled in where they can be found.
///
/// Returns `Ok(None)` when `scope` was cancelled. Failures of the two
/// enrichment lookups are logged and leave the affected fields empty.
///
/// # Errors
///
/// Returns [`DbError`] if the primary booking fetch fails.
pub async fn list_client_bookings(
    pool: &PgPool,
    client_id: Uuid,
    now: DateTime<Utc>,
    scope: &RequestScope,
) -> Result<Option<BookingPartition>, DbError> {
    let Some(bookings) = scope.run(fetch_client_bookings(pool, client_id)).await else {
        return Ok(None);
    };
    let mut bookings = bookings?;

    let keys = enrichment_keys(&bookings);
    let names: Vec<String> = keys.service_names.into_iter().collect();
    let user_ids: Vec<Uuid> = keys.therapist_user_ids.into_iter().collect();

    let images = if names.is_empty() {
        ServiceImageIndex::default()
    } else {
        let Some(services) = scope.run(services_by_names(pool, &names)).await else {
            return Ok(None);
        };
        match services {
            Ok(services) => ServiceImageIndex::new(services),
            Err(e) => {
                tracing::warn!(error = %e, %client_id, "service image lookup failed");
                ServiceImageIndex::default()
            }
        }
    };

    let users = if user_ids.is_empty() {
        HashMap::new()
    } else {
        let Some(users) = scope.run(users_by_ids(pool, &user_ids)).await else {
            return Ok(None);
        };
        users.unwrap_or_else(|e| {
            tracing::warn!(error = %e, %client_id, "therapist name lookup failed");
            HashMap::new()
        })
    };

    enrich_bookings(&mut bookings, &images, &users);
    Ok(Some(partition_bookings(bookings, now)))
}

#[cfg(test)]
mod tests {
    use beautylink_core::bookings::BookingStatus;

    use super::*;

    fn row() -> BookingRow {
        BookingRow {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            salon_id: None,
            salon_name: None,
            salon_image: None,
            therapist_id: None,
            therapist_user_id: None,
            therapist_business_name: None,
            therapist_image: None,
            scheduled_at: Utc::now(),
            status: "CONFIRMED".to_string(),
            subtotal: Decimal::new(8000, 0),
            travel_fee: Decimal::new(1000, 0),
            tip: Decimal::ZERO,
            total: Decimal::new(9000, 0),
            items: Json(vec![BookingItemRow {
                service_name: "Manucure".to_string(),
                price: Decimal::new(8000, 0),
                duration_minutes: 45,
            }]),
        }
    }

    #[test]
    fn salon_row_becomes_salon_party() {
        let mut r = row();
        r.salon_id = Some(Uuid::new_v4());
        r.salon_name = Some("Beauté Divine".to_string());
        let booking = Booking::try_from(r).unwrap();
        assert!(matches!(booking.party, BookingParty::Salon(ref s) if s.name == "Beauté Divine"));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.items.len(), 1);
        assert!(booking.items[0].images.is_empty());
    }

    #[test]
    fn therapist_row_leaves_display_name_for_enrichment() {
        let mut r = row();
        r.therapist_id = Some(Uuid::new_v4());
        r.therapist_user_id = Some(Uuid::new_v4());
        let booking = Booking::try_from(r).unwrap();
        match booking.party {
            BookingParty::Therapist(t) => assert!(t.display_name.is_none()),
            BookingParty::Salon(_) => panic!("expected a therapist booking"),
        }
    }

    #[test]
    fn row_without_provider_is_rejected() {
        let err = Booking::try_from(row()).unwrap_err();
        assert!(matches!(err, DbError::Decode { .. }));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut r = row();
        r.salon_id = Some(Uuid::new_v4());
        r.status = "LOST".to_string();
        assert!(matches!(
            Booking::try_from(r),
            Err(DbError::Decode {
                column: "status",
                ..
            })
        ));
    }

    #[test]
    fn item_json_decodes_text_prices() {
        let items: Vec<BookingItemRow> = serde_json::from_str(
            r#"[{"service_name":"Tresses","price":"15000.00","duration_minutes":240}]"#,
        )
        .unwrap();
        assert_eq!(items[0].price, Decimal::new(1_500_000, 2));
    }
}
