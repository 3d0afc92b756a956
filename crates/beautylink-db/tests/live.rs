//! Live integration tests for beautylink-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/beautylink-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use beautylink_core::beta::{BetaTestResult, TestRole, TestStatus};
use beautylink_core::bookings::{BookingParty, BookingStatus};
use beautylink_core::providers::{
    Coordinates, MatchType, ProviderKind, SearchLocation, MOBILE_ADDRESS_LABEL,
};
use beautylink_core::ServiceConfig;
use beautylink_db::{
    list_all_beta_results, list_beta_results_for_user, list_client_bookings, load_dashboard,
    locate_providers, reset_beta_results, run_migrations, seed_services, upsert_beta_result,
    DbError, ProviderSearch, RequestScope,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_user(pool: &sqlx::PgPool, first: &str, last: Option<&str>, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, first_name, last_name, role) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(format!("{}@example.cm", Uuid::new_v4()))
    .bind(first)
    .bind(last)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_user failed for '{first}': {e}"))
}

async fn insert_service(pool: &sqlx::PgPool, name_fr: &str, name_en: &str, images: &[&str]) -> Uuid {
    let images: Vec<String> = images.iter().map(|s| (*s).to_string()).collect();
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO services (name_fr, name_en, category, images) \
         VALUES ($1, $2, 'hair', $3) RETURNING id",
    )
    .bind(name_fr)
    .bind(name_en)
    .bind(images)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_service failed for '{name_en}': {e}"))
}

async fn insert_salon(
    pool: &sqlx::PgPool,
    name: &str,
    quarter: &str,
    coords: (f64, f64),
    service_id: Uuid,
) -> Uuid {
    let owner = insert_user(pool, "Owner", None, "SALON").await;
    let salon_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO salons (owner_id, name, quarter, street, city, latitude, longitude, verification_status) \
         VALUES ($1, $2, $3, 'Rue Joss', 'Douala', $4, $5, 'APPROVED') RETURNING id",
    )
    .bind(owner)
    .bind(name)
    .bind(quarter)
    .bind(coords.0)
    .bind(coords.1)
    .fetch_one(pool)
    .await
    .expect("insert salon");

    sqlx::query("INSERT INTO salon_services (salon_id, service_id, price) VALUES ($1, $2, 6000)")
        .bind(salon_id)
        .bind(service_id)
        .execute(pool)
        .await
        .expect("link salon service");
    salon_id
}

async fn insert_therapist(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    business_name: Option<&str>,
    quarter: &str,
    service_id: Option<Uuid>,
) -> Uuid {
    let therapist_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO therapists (user_id, business_name, quarter, city, verification_status) \
         VALUES ($1, $2, $3, 'Douala', 'APPROVED') RETURNING id",
    )
    .bind(user_id)
    .bind(business_name)
    .bind(quarter)
    .fetch_one(pool)
    .await
    .expect("insert therapist");

    if let Some(service_id) = service_id {
        sqlx::query(
            "INSERT INTO therapist_services (therapist_id, service_id, price) VALUES ($1, $2, 5000)",
        )
        .bind(therapist_id)
        .bind(service_id)
        .execute(pool)
        .await
        .expect("link therapist service");
    }
    therapist_id
}

async fn insert_booking(
    pool: &sqlx::PgPool,
    client_id: Uuid,
    salon_id: Option<Uuid>,
    therapist_id: Option<Uuid>,
    scheduled_in_hours: i64,
    status: &str,
    item_names: &[&str],
) -> Uuid {
    let booking_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO bookings (client_id, salon_id, therapist_id, scheduled_at, status, subtotal, total) \
         VALUES ($1, $2, $3, $4, $5, 10000, 10000) RETURNING id",
    )
    .bind(client_id)
    .bind(salon_id)
    .bind(therapist_id)
    .bind(Utc::now() + Duration::hours(scheduled_in_hours))
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("insert booking");

    for name in item_names {
        sqlx::query(
            "INSERT INTO booking_items (booking_id, service_name, price, duration_minutes) \
             VALUES ($1, $2, 10000, 60)",
        )
        .bind(booking_id)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert booking item");
    }
    booking_id
}

fn beta_result(user_id: Uuid, test_id: &str, status: TestStatus, comment: Option<&str>) -> BetaTestResult {
    BetaTestResult {
        user_id,
        test_id: test_id.to_string(),
        role: TestRole::Client,
        status,
        comment: comment.map(str::to_string),
        device_info: Some("Tecno Spark 10".to_string()),
        tested_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Migrations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn migrations_are_already_applied(pool: sqlx::PgPool) {
    let applied = run_migrations(&pool).await.expect("run_migrations failed");
    assert_eq!(applied, 0);
}

// ---------------------------------------------------------------------------
// Section 2: Provider locator
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn district_match_therapist_ranks_before_city_match_salon(pool: sqlx::PgPool) {
    let service_id = insert_service(&pool, "Tresses africaines", "African braids", &[]).await;
    // Salon in Bonapriso, about 2 km from the client in Akwa.
    let salon_id = insert_salon(&pool, "Salon Élégance", "Bonapriso", (4.0340, 9.6950), service_id).await;
    let user = insert_user(&pool, "Aïcha", Some("Mbarga"), "THERAPIST").await;
    let therapist_id = insert_therapist(&pool, user, None, "Akwa", Some(service_id)).await;

    let search = ProviderSearch {
        service_id,
        location: SearchLocation {
            coords: Some(Coordinates {
                lat: 4.0511,
                lon: 9.7000,
            }),
            district: Some("Akwa".to_string()),
            city: Some("Douala".to_string()),
            query: Some("Akwa, Douala".to_string()),
        },
        radius_meters: 30_000,
    };

    let providers = locate_providers(&pool, &search, &RequestScope::new())
        .await
        .expect("locate_providers failed")
        .expect("scope was not cancelled");

    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].id, therapist_id);
    assert_eq!(providers[0].match_type, MatchType::DistrictMatch);
    assert_eq!(providers[0].address, MOBILE_ADDRESS_LABEL);
    assert_eq!(providers[0].name, "Aïcha Mbarga");
    assert_eq!(providers[1].id, salon_id);
    assert_eq!(providers[1].kind, ProviderKind::Salon);
    assert_eq!(providers[1].address, "Bonapriso, Douala");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_service_is_not_found(pool: sqlx::PgPool) {
    let search = ProviderSearch {
        service_id: Uuid::new_v4(),
        location: SearchLocation::default(),
        radius_meters: 30_000,
    };
    let err = locate_providers(&pool, &search, &RequestScope::new())
        .await
        .expect_err("unknown service should fail");
    assert!(matches!(err, DbError::NotFound(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn service_without_providers_is_empty(pool: sqlx::PgPool) {
    let service_id = insert_service(&pool, "Soin du visage", "Facial", &[]).await;
    let search = ProviderSearch {
        service_id,
        location: SearchLocation::default(),
        radius_meters: 30_000,
    };
    let providers = locate_providers(&pool, &search, &RequestScope::new())
        .await
        .expect("locate_providers failed")
        .expect("scope was not cancelled");
    assert!(providers.is_empty());
}

// ---------------------------------------------------------------------------
// Section 3: Booking aggregator
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bookings_are_enriched_and_partitioned(pool: sqlx::PgPool) {
    let client = insert_user(&pool, "Brenda", Some("Ngono"), "CLIENT").await;
    let service_id = insert_service(
        &pool,
        "Manucure",
        "Manicure",
        &["https://img.example/manicure.jpg"],
    )
    .await;
    let salon_id = insert_salon(&pool, "Beauté Divine", "Akwa", (4.05, 9.70), service_id).await;
    let therapist_user = insert_user(&pool, "Carine", Some("Tchoua"), "THERAPIST").await;
    let therapist_id = insert_therapist(&pool, therapist_user, None, "Bali", None).await;

    let future_salon =
        insert_booking(&pool, client, Some(salon_id), None, 48, "CONFIRMED", &["Manucure"]).await;
    let pending_past = insert_booking(
        &pool,
        client,
        None,
        Some(therapist_id),
        -48,
        "PENDING",
        &["Retired service"],
    )
    .await;
    let done_past =
        insert_booking(&pool, client, Some(salon_id), None, -72, "COMPLETED", &["Manicure"]).await;

    let partition = list_client_bookings(&pool, client, Utc::now(), &RequestScope::new())
        .await
        .expect("list_client_bookings failed")
        .expect("scope was not cancelled");

    let upcoming: Vec<Uuid> = partition.upcoming.iter().map(|b| b.id).collect();
    let past: Vec<Uuid> = partition.past.iter().map(|b| b.id).collect();
    assert!(upcoming.contains(&future_salon));
    assert!(upcoming.contains(&pending_past));
    assert_eq!(past, vec![done_past]);

    let salon_booking = partition
        .upcoming
        .iter()
        .find(|b| b.id == future_salon)
        .expect("salon booking");
    assert_eq!(salon_booking.items[0].images, vec!["https://img.example/manicure.jpg"]);
    assert_eq!(
        salon_booking.cover_image.as_deref(),
        Some("https://img.example/manicure.jpg")
    );

    let therapist_booking = partition
        .upcoming
        .iter()
        .find(|b| b.id == pending_past)
        .expect("therapist booking");
    assert_eq!(therapist_booking.status, BookingStatus::Pending);
    assert!(therapist_booking.items[0].images.is_empty());
    match &therapist_booking.party {
        BookingParty::Therapist(t) => assert_eq!(t.display_name.as_deref(), Some("Carine Tchoua")),
        BookingParty::Salon(_) => panic!("expected therapist party"),
    }

    // English item names resolve too.
    assert_eq!(partition.past[0].items[0].images.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn salon_with_bookings_cannot_be_deleted(pool: sqlx::PgPool) {
    let client = insert_user(&pool, "Brenda", Some("Ngono"), "CLIENT").await;
    let service_id = insert_service(&pool, "Tresses", "Braids", &[]).await;
    let salon_id = insert_salon(&pool, "Beauté Divine", "Akwa", (4.05, 9.70), service_id).await;
    insert_booking(&pool, client, Some(salon_id), None, -24, "COMPLETED", &["Tresses"]).await;

    let err = sqlx::query("DELETE FROM salons WHERE id = $1")
        .bind(salon_id)
        .execute(&pool)
        .await
        .expect_err("salon with bookings must not be deleted");
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("bookings_salon_id_fkey"));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE salon_id = $1")
        .bind(salon_id)
        .fetch_one(&pool)
        .await
        .expect("count failed");
    assert_eq!(remaining, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn client_without_bookings_gets_empty_tabs(pool: sqlx::PgPool) {
    let client = insert_user(&pool, "Nadège", None, "CLIENT").await;
    let partition = list_client_bookings(&pool, client, Utc::now(), &RequestScope::new())
        .await
        .expect("list_client_bookings failed")
        .expect("scope was not cancelled");
    assert!(partition.upcoming.is_empty());
    assert!(partition.past.is_empty());
}

// ---------------------------------------------------------------------------
// Section 4: Beta test results
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn working_then_broken_then_reset_leaves_no_rows(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();

    upsert_beta_result(&pool, &beta_result(user, "client_login", TestStatus::Working, None))
        .await
        .expect("first upsert failed");
    let stored = upsert_beta_result(
        &pool,
        &beta_result(user, "client_login", TestStatus::Broken, Some("OTP never arrives")),
    )
    .await
    .expect("second upsert failed");
    assert_eq!(stored.status, TestStatus::Broken);

    let rows = list_beta_results_for_user(&pool, user, TestRole::Client)
        .await
        .expect("list failed");
    assert_eq!(rows.len(), 1, "upsert must keep one row per (user, test)");
    assert_eq!(rows[0].comment.as_deref(), Some("OTP never arrives"));

    let removed = reset_beta_results(&pool, user, TestRole::Client)
        .await
        .expect("reset failed");
    assert_eq!(removed, 1);

    let rows = list_beta_results_for_user(&pool, user, TestRole::Client)
        .await
        .expect("list failed");
    assert!(rows.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn working_without_comment_keeps_stored_comment(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    upsert_beta_result(
        &pool,
        &beta_result(user, "client_login", TestStatus::Broken, Some("OTP never arrives")),
    )
    .await
    .expect("broken upsert failed");

    let stored = upsert_beta_result(&pool, &beta_result(user, "client_login", TestStatus::Working, None))
        .await
        .expect("working upsert failed");
    assert_eq!(stored.status, TestStatus::Working);
    assert_eq!(stored.comment.as_deref(), Some("OTP never arrives"));

    let stored = upsert_beta_result(
        &pool,
        &beta_result(user, "client_login", TestStatus::Broken, Some("")),
    )
    .await
    .expect("second broken upsert failed");
    assert_eq!(stored.comment.as_deref(), Some(""));
}

#[sqlx::test(migrations = "../../migrations")]
async fn reset_only_touches_one_role(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    upsert_beta_result(&pool, &beta_result(user, "client_login", TestStatus::Working, None))
        .await
        .expect("client upsert failed");
    let mut provider = beta_result(user, "provider_signup", TestStatus::Working, None);
    provider.role = TestRole::Provider;
    upsert_beta_result(&pool, &provider)
        .await
        .expect("provider upsert failed");

    reset_beta_results(&pool, user, TestRole::Client)
        .await
        .expect("reset failed");

    let all = list_all_beta_results(&pool).await.expect("list all failed");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].role, TestRole::Provider);
}

#[sqlx::test(migrations = "../../migrations")]
async fn pending_results_are_never_stored(pool: sqlx::PgPool) {
    let err = upsert_beta_result(
        &pool,
        &beta_result(Uuid::new_v4(), "client_login", TestStatus::Pending, None),
    )
    .await
    .expect_err("pending must be rejected");
    assert!(matches!(err, DbError::InvalidInput(_)));
}

// ---------------------------------------------------------------------------
// Section 5: Dashboard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn empty_dashboard_is_all_defaults(pool: sqlx::PgPool) {
    let summary = load_dashboard(&pool, Utc::now(), &RequestScope::new())
        .await
        .expect("scope was not cancelled");
    assert_eq!(summary.active_clients, 0);
    assert_eq!(summary.gmv, Decimal::ZERO);
    assert!(summary.top_provider.is_none());
    assert_eq!(summary.revenue_last_7_days.len(), 7);
    assert!(summary.degraded.is_empty(), "degraded: {:?}", summary.degraded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn dashboard_counts_completed_bookings(pool: sqlx::PgPool) {
    let client = insert_user(&pool, "Brenda", None, "CLIENT").await;
    let service_id = insert_service(&pool, "Manucure", "Manicure", &[]).await;
    let salon_id = insert_salon(&pool, "Beauté Divine", "Akwa", (4.05, 9.70), service_id).await;
    insert_booking(&pool, client, Some(salon_id), None, -2, "COMPLETED", &["Manucure"]).await;
    insert_booking(&pool, client, Some(salon_id), None, 24, "PENDING", &["Manucure"]).await;

    let summary = load_dashboard(&pool, Utc::now(), &RequestScope::new())
        .await
        .expect("scope was not cancelled");
    assert_eq!(summary.active_clients, 1);
    assert_eq!(summary.active_providers, 1);
    assert_eq!(summary.gmv, Decimal::new(10_000, 0));
    assert_eq!(summary.bookings_last_24h, 2);
    assert_eq!(summary.recent_bookings.len(), 2);
    assert!(summary.top_provider.is_some());
    let week_total: Decimal = summary.revenue_last_7_days.iter().map(|p| p.amount).sum();
    assert_eq!(week_total, Decimal::new(10_000, 0));
}

// ---------------------------------------------------------------------------
// Section 6: Seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_services_is_idempotent(pool: sqlx::PgPool) {
    let services = vec![ServiceConfig {
        name_fr: "Pédicure".to_string(),
        name_en: "Pedicure".to_string(),
        category: "nails".to_string(),
        description: None,
        images: vec![],
        duration_minutes: 60,
        base_price: Decimal::new(5000, 0),
    }];

    assert_eq!(seed_services(&pool, &services).await.expect("seed failed"), 1);
    assert_eq!(seed_services(&pool, &services).await.expect("reseed failed"), 1);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services")
        .fetch_one(&pool)
        .await
        .expect("count failed");
    assert_eq!(count, 1);
}
