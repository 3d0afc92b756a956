//! Admin dashboard read model.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bookings::BookingStatus;

/// Number of days covered by the revenue chart.
pub const REVENUE_WINDOW_DAYS: u64 = 7;

/// Number of bookings in the "recent bookings" list.
pub const RECENT_BOOKINGS_LIMIT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProvider {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub total_revenue: Decimal,
    pub booking_count: i64,
}

impl TopProvider {
    #[must_use]
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentBooking {
    pub id: Uuid,
    pub client_name: Option<String>,
    pub provider_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Revenue of one calendar day, as summed by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub amount: Decimal,
}

/// One bar of the revenue chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub day: NaiveDate,
    /// Short weekday label, e.g. `Mon`.
    pub label: String,
    pub amount: Decimal,
}

/// Everything the admin home page shows. Each field has a zero/empty
/// default used when its query fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub active_clients: i64,
    pub active_providers: i64,
    pub pending_verifications: i64,
    /// Value of completed bookings.
    pub gmv: Decimal,
    /// Completed credit purchases: what the platform actually earns.
    pub platform_revenue: Decimal,
    pub open_tickets: i64,
    pub bookings_last_24h: i64,
    pub top_provider: Option<TopProvider>,
    pub recent_bookings: Vec<RecentBooking>,
    pub revenue_last_7_days: Vec<RevenuePoint>,
    /// Names of the widgets whose query failed and fell back to defaults.
    pub degraded: Vec<String>,
}

/// First day of the revenue window ending on `today`.
#[must_use]
pub fn revenue_window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(REVENUE_WINDOW_DAYS - 1))
        .unwrap_or(today)
}

/// Buckets daily sums into exactly seven points ending on `today`, oldest
/// first. Days without revenue are zero; rows outside the window are
/// ignored and duplicate days are added up.
#[must_use]
pub fn bucket_revenue_by_day(rows: &[DailyRevenue], today: NaiveDate) -> Vec<RevenuePoint> {
    let start = revenue_window_start(today);
    start
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| RevenuePoint {
            day,
            label: day.format("%a").to_string(),
            amount: rows
                .iter()
                .filter(|r| r.day == day)
                .map(|r| r.amount)
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn revenue_has_seven_days_oldest_first() {
        let points = bucket_revenue_by_day(&[], day(10));
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].day, day(4));
        assert_eq!(points[6].day, day(10));
        assert!(points.iter().all(|p| p.amount == Decimal::ZERO));
    }

    #[test]
    fn revenue_sums_rows_and_ignores_out_of_window() {
        let rows = [
            DailyRevenue {
                day: day(10),
                amount: Decimal::new(15_000, 0),
            },
            DailyRevenue {
                day: day(10),
                amount: Decimal::new(5_000, 0),
            },
            DailyRevenue {
                day: day(4),
                amount: Decimal::new(2_500, 0),
            },
            DailyRevenue {
                day: day(3),
                amount: Decimal::new(99_999, 0),
            },
        ];
        let points = bucket_revenue_by_day(&rows, day(10));
        assert_eq!(points[6].amount, Decimal::new(20_000, 0));
        assert_eq!(points[0].amount, Decimal::new(2_500, 0));
        let total: Decimal = points.iter().map(|p| p.amount).sum();
        assert_eq!(total, Decimal::new(22_500, 0));
    }

    #[test]
    fn revenue_labels_are_weekdays() {
        // 2026-03-10 is a Tuesday.
        let points = bucket_revenue_by_day(&[], day(10));
        assert_eq!(points[6].label, "Tue");
        assert_eq!(points[0].label, "Wed");
    }

    #[test]
    fn top_provider_display_name_skips_missing_parts() {
        let provider = TopProvider {
            id: Uuid::nil(),
            first_name: Some("Carine".to_string()),
            last_name: None,
            avatar: None,
            total_revenue: Decimal::ZERO,
            booking_count: 0,
        };
        assert_eq!(provider.display_name(), "Carine");
    }

    #[test]
    fn default_summary_is_all_zero() {
        let summary = DashboardSummary::default();
        assert_eq!(summary.active_clients, 0);
        assert_eq!(summary.gmv, Decimal::ZERO);
        assert!(summary.top_provider.is_none());
        assert!(summary.revenue_last_7_days.is_empty());
    }
}
