//! Offline tests for beautylink-db pool configuration and row types.
//! These tests do not require a live database connection.

use beautylink_core::{AppConfig, DataError, Environment};
use beautylink_db::{BetaTestResultRow, DbError, NearbyProviderRow, PoolConfig, RequestScope};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        api_base_url: "http://localhost:4000".to_string(),
        geocoder_base_url: "http://localhost:4001".to_string(),
        http_timeout_secs: 5,
        user_agent: "ua".to_string(),
        search_radius_meters: 30_000,
        state_path: PathBuf::from("./state.json"),
        services_path: PathBuf::from("./config/services.yaml"),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`NearbyProviderRow`] carries every
/// column returned by `get_nearby_providers`. No database required.
#[test]
fn nearby_provider_row_has_expected_fields() {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    let row = NearbyProviderRow {
        id: Uuid::new_v4(),
        kind: "therapist".to_string(),
        name: "Aïcha Mbarga".to_string(),
        rating: None,
        review_count: Some(3),
        image: None,
        service_price: Some(Decimal::new(12_000, 0)),
        distance_meters: None,
        latitude: None,
        longitude: None,
        match_type: Some("district_match".to_string()),
        is_mobile: Some(true),
        city: Some("Douala".to_string()),
    };

    assert_eq!(row.kind, "therapist");
    assert_eq!(row.review_count, Some(3));
    assert!(row.distance_meters.is_none());
}

#[test]
fn beta_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = BetaTestResultRow {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        test_id: "provider_buy_credits".to_string(),
        role: "provider".to_string(),
        status: "working".to_string(),
        comment: None,
        device_info: Some("iPhone 13".to_string()),
        tested_at: Utc::now(),
    };

    assert_eq!(row.role, "provider");
    assert_eq!(row.device_info.as_deref(), Some("iPhone 13"));
}

#[test]
fn db_error_becomes_validation_error() {
    let err: DataError = DbError::InvalidInput("pending".to_string()).into();
    assert_eq!(err.code(), "validation_error");
}

#[tokio::test]
async fn cancelled_scope_skips_work() {
    let scope = RequestScope::new();
    scope.cancel();
    assert!(scope.run(async { 1 }).await.is_none());
}
