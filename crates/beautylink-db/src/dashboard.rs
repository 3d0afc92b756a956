//! Read-model queries for the admin home page.
//!
//! Every widget has its own query. They run concurrently and a failed query
//! only blanks its own widget.

use beautylink_core::dashboard::{
    bucket_revenue_by_day, revenue_window_start, DailyRevenue, DashboardSummary, RecentBooking,
    TopProvider, RECENT_BOOKINGS_LIMIT,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::scope::RequestScope;
use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TopProviderRow {
    id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    avatar: Option<String>,
    total_revenue: Option<Decimal>,
    booking_count: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RecentBookingRow {
    id: Uuid,
    client_name: Option<String>,
    provider_name: Option<String>,
    scheduled_at: DateTime<Utc>,
    status: String,
    total: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DailyRevenueRow {
    day: NaiveDate,
    amount: Decimal,
}

async fn count(pool: &PgPool, sql: &str) -> Result<i64, DbError> {
    let n = sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?;
    Ok(n)
}

async fn sum(pool: &PgPool, sql: &str) -> Result<Decimal, DbError> {
    let total = sqlx::query_scalar::<_, Decimal>(sql).fetch_one(pool).await?;
    Ok(total)
}

/// Active users with the client role.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_clients(pool: &PgPool) -> Result<i64, DbError> {
    count(
        pool,
        "SELECT COUNT(*) FROM users WHERE role = 'CLIENT' AND is_active",
    )
    .await
}

/// Approved therapists plus approved salons.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_providers(pool: &PgPool) -> Result<i64, DbError> {
    count(
        pool,
        "SELECT (SELECT COUNT(*) FROM therapists WHERE verification_status = 'APPROVED') \
              + (SELECT COUNT(*) FROM salons WHERE verification_status = 'APPROVED')",
    )
    .await
}

/// Therapists and salons waiting for document review.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_pending_verifications(pool: &PgPool) -> Result<i64, DbError> {
    count(
        pool,
        "SELECT (SELECT COUNT(*) FROM therapists WHERE verification_status = 'PENDING') \
              + (SELECT COUNT(*) FROM salons WHERE verification_status = 'PENDING')",
    )
    .await
}

/// Total value of completed bookings.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn gross_merchandise_value(pool: &PgPool) -> Result<Decimal, DbError> {
    sum(
        pool,
        "SELECT COALESCE(SUM(total), 0) FROM bookings WHERE status = 'COMPLETED'",
    )
    .await
}

/// Revenue from completed credit purchases.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn platform_revenue(pool: &PgPool) -> Result<Decimal, DbError> {
    sum(
        pool,
        "SELECT COALESCE(SUM(amount), 0) FROM credit_purchases WHERE status = 'COMPLETED'",
    )
    .await
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_open_tickets(pool: &PgPool) -> Result<i64, DbError> {
    count(
        pool,
        "SELECT COUNT(*) FROM support_conversations WHERE status = 'OPEN'",
    )
    .await
}

/// Bookings created since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_bookings_since(pool: &PgPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE created_at >= $1")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Calls `get_top_provider`. `None` when no booking has completed yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the call fails.
pub async fn top_provider(pool: &PgPool) -> Result<Option<TopProvider>, DbError> {
    let row = sqlx::query_as::<_, TopProviderRow>(
        "SELECT id, first_name, last_name, avatar, total_revenue, booking_count \
         FROM get_top_provider()",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| TopProvider {
        id: row.id,
        first_name: row.first_name,
        last_name: row.last_name,
        avatar: row.avatar,
        total_revenue: row.total_revenue.unwrap_or_default(),
        booking_count: row.booking_count.unwrap_or_default(),
    }))
}

/// Latest bookings by creation time, with client and provider names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for an
/// unknown booking status.
pub async fn recent_bookings(pool: &PgPool, limit: i64) -> Result<Vec<RecentBooking>, DbError> {
    let rows = sqlx::query_as::<_, RecentBookingRow>(
        "SELECT b.id, \
                NULLIF(TRIM(CONCAT_WS(' ', c.first_name, c.last_name)), '') AS client_name, \
                COALESCE(s.name, NULLIF(t.business_name, ''), \
                         NULLIF(TRIM(CONCAT_WS(' ', tu.first_name, tu.last_name)), '')) AS provider_name, \
                b.scheduled_at, b.status, b.total, b.created_at \
         FROM bookings b \
         JOIN users c ON c.id = b.client_id \
         LEFT JOIN salons s ON s.id = b.salon_id \
         LEFT JOIN therapists t ON t.id = b.therapist_id \
         LEFT JOIN users tu ON tu.id = t.user_id \
         ORDER BY b.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let status = row.status.parse().map_err(|_| DbError::Decode {
                column: "status",
                value: row.status.clone(),
            })?;
            Ok(RecentBooking {
                id: row.id,
                client_name: row.client_name,
                provider_name: row.provider_name,
                scheduled_at: row.scheduled_at,
                status,
                total: row.total,
                created_at: row.created_at,
            })
        })
        .collect()
}

/// Completed booking totals per UTC day from `from` onwards.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn daily_revenue_since(pool: &PgPool, from: NaiveDate) -> Result<Vec<DailyRevenue>, DbError> {
    let rows = sqlx::query_as::<_, DailyRevenueRow>(
        "SELECT (scheduled_at AT TIME ZONE 'UTC')::date AS day, SUM(total) AS amount \
         FROM bookings \
         WHERE status = 'COMPLETED' \
           AND (scheduled_at AT TIME ZONE 'UTC')::date >= $1 \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(from)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DailyRevenue {
            day: row.day,
            amount: row.amount,
        })
        .collect())
}

fn or_default<T: Default>(widget: &str, result: Result<T, DbError>, degraded: &mut Vec<String>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(widget, error = %e, "dashboard query failed; showing default");
        degraded.push(widget.to_string());
        T::default()
    })
}

/// Loads every dashboard widget.
///
/// The queries run concurrently. A failing query is logged, its widget keeps
/// its zero/empty default and its name is listed in
/// [`DashboardSummary::degraded`]; the call itself never fails. Returns
/// `None` only when `scope` is cancelled.
pub async fn load_dashboard(
    pool: &PgPool,
    now: DateTime<Utc>,
    scope: &RequestScope,
) -> Option<DashboardSummary> {
    let today = now.date_naive();
    let queries = async {
        futures::join!(
            count_active_clients(pool),
            count_active_providers(pool),
            count_pending_verifications(pool),
            gross_merchandise_value(pool),
            platform_revenue(pool),
            count_open_tickets(pool),
            count_bookings_since(pool, now - Duration::hours(24)),
            top_provider(pool),
            recent_bookings(pool, RECENT_BOOKINGS_LIMIT),
            daily_revenue_since(pool, revenue_window_start(today)),
        )
    };

    let (
        clients,
        providers,
        pending,
        gmv,
        revenue,
        tickets,
        last_24h,
        top,
        recent,
        daily,
    ) = scope.run(queries).await?;

    let mut degraded = Vec::new();
    let daily = or_default("revenue_last_7_days", daily, &mut degraded);
    let top_provider = or_default("top_provider", top, &mut degraded);
    let recent_bookings = or_default("recent_bookings", recent, &mut degraded);
    Some(DashboardSummary {
        active_clients: or_default("active_clients", clients, &mut degraded),
        active_providers: or_default("active_providers", providers, &mut degraded),
        pending_verifications: or_default("pending_verifications", pending, &mut degraded),
        gmv: or_default("gmv", gmv, &mut degraded),
        platform_revenue: or_default("platform_revenue", revenue, &mut degraded),
        open_tickets: or_default("open_tickets", tickets, &mut degraded),
        bookings_last_24h: or_default("bookings_last_24h", last_24h, &mut degraded),
        top_provider,
        recent_bookings,
        revenue_last_7_days: bucket_revenue_by_day(&daily, today),
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_widget_falls_back_and_is_reported() {
        let mut degraded = Vec::new();
        let value: i64 = or_default(
            "open_tickets",
            Err(DbError::NotFound("support_conversations".to_string())),
            &mut degraded,
        );
        assert_eq!(value, 0);
        assert_eq!(degraded, vec!["open_tickets".to_string()]);
    }

    #[test]
    fn successful_widget_is_not_reported() {
        let mut degraded = Vec::new();
        let value = or_default("gmv", Ok(Decimal::new(42, 0)), &mut degraded);
        assert_eq!(value, Decimal::new(42, 0));
        assert!(degraded.is_empty());
    }
}
