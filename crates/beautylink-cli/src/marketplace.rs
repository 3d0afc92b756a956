//! Read-side marketplace commands: provider search, bookings, the admin
//! dashboard, and direct chats.

use beautylink_core::bookings::{Booking, BookingTab};
use beautylink_core::dashboard::DashboardSummary;
use beautylink_core::providers::{
    display_rating, filter_providers, resolve_search_location, LocationInput, Provider,
    ProviderFilter,
};
use beautylink_core::{AppConfig, LocalStore};
use beautylink_db::{ProviderSearch, RequestScope};
use beautylink_remote::{ApiClient, DirectChatRequest};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const CURRENCY: &str = "FCFA";

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

pub(crate) fn fmt_distance(meters: Option<f64>) -> String {
    match meters {
        Some(m) if m.is_finite() && m >= 1000.0 => format!("{:.1} km", m / 1000.0),
        Some(m) if m.is_finite() => format!("{m:.0} m"),
        _ => "\u{2014}".to_string(),
    }
}

fn fmt_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "\u{2014}".to_string(), |p| format!("{p} {CURRENCY}"))
}

/// Searches providers for a service.
///
/// An explicit location is remembered for later searches; without one the
/// last remembered location is used.
///
/// # Errors
///
/// Returns an error for invalid coordinates, an unknown service, or a failed
/// provider query.
pub(crate) async fn run_providers(
    pool: &PgPool,
    config: &AppConfig,
    service_id: Uuid,
    input: LocationInput,
    filter: ProviderFilter,
    scope: &RequestScope,
) -> anyhow::Result<()> {
    input.validate()?;

    let mut store = LocalStore::open(&config.state_path)?;
    let explicit = input.lat.is_some()
        || input
            .location
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
    let location = resolve_search_location(&input, store.user_location());

    if explicit {
        if let Some(query) = location.to_location_query() {
            if let Err(e) = store.set_user_location(query) {
                tracing::warn!(error = %e, "could not remember search location");
            }
        }
    }

    match location.query.as_deref() {
        Some(query) => println!("searching near {query}"),
        None if location.coords.is_some() => println!("searching near your coordinates"),
        None => println!("no location set; showing every approved provider"),
    }

    let search = ProviderSearch {
        service_id,
        location,
        radius_meters: config.search_radius_meters,
    };
    let Some(all) = beautylink_db::locate_providers(pool, &search, scope).await? else {
        println!("cancelled");
        return Ok(());
    };

    let shown = filter_providers(&all, filter);
    if shown.is_empty() {
        println!("{}", filter.empty_message());
        return Ok(());
    }

    print_providers(&shown);
    Ok(())
}

fn print_providers(providers: &[Provider]) {
    println!(
        "{:<30}{:<11}{:<8}{:<16}{:<11}ADDRESS",
        "NAME", "TYPE", "RATING", "PRICE", "DISTANCE"
    );
    for p in providers {
        println!(
            "{:<30}{:<11}{:<8}{:<16}{:<11}{}",
            truncate(&p.name, 28),
            p.kind.as_str(),
            display_rating(p.rating),
            fmt_price(p.service_price),
            fmt_distance(p.distance_meters),
            p.address
        );
    }
}

/// Lists a client's bookings for one tab.
///
/// # Errors
///
/// Returns an error if the booking query fails.
pub(crate) async fn run_bookings(
    pool: &PgPool,
    client_id: Uuid,
    tab: BookingTab,
    scope: &RequestScope,
) -> anyhow::Result<()> {
    let Some(partition) =
        beautylink_db::list_client_bookings(pool, client_id, Utc::now(), scope).await?
    else {
        println!("cancelled");
        return Ok(());
    };

    let bookings = partition.tab(tab);
    println!(
        "{} upcoming, {} past",
        partition.upcoming.len(),
        partition.past.len()
    );
    if bookings.is_empty() {
        println!("no bookings in this tab");
        return Ok(());
    }

    println!(
        "{:<18}{:<13}{:<26}{:<16}SERVICES",
        "WHEN", "STATUS", "PROVIDER", "TOTAL"
    );
    for booking in bookings {
        print_booking(booking);
    }
    Ok(())
}

fn print_booking(booking: &Booking) {
    let services = booking
        .items
        .iter()
        .map(|item| item.service_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let total = format!("{} {CURRENCY}", booking.total);
    println!(
        "{:<18}{:<13}{:<26}{:<16}{}",
        booking.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
        booking.status.as_str(),
        truncate(booking.party.display_name().unwrap_or("\u{2014}"), 24),
        total,
        services
    );
    if let Some(image) = booking.cover_image.as_deref() {
        println!("{:<18}{image}", "");
    }
}

/// Prints the admin dashboard.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails; failed widgets are
/// reported as degraded.
pub(crate) async fn run_dashboard(
    pool: &PgPool,
    json: bool,
    scope: &RequestScope,
) -> anyhow::Result<()> {
    let Some(summary) = beautylink_db::load_dashboard(pool, Utc::now(), scope).await else {
        println!("cancelled");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_dashboard(&summary);
    }
    Ok(())
}

fn print_dashboard(summary: &DashboardSummary) {
    println!("active clients         {}", summary.active_clients);
    println!("active providers       {}", summary.active_providers);
    println!("pending verifications  {}", summary.pending_verifications);
    println!("GMV                    {} {CURRENCY}", summary.gmv);
    println!("platform revenue       {} {CURRENCY}", summary.platform_revenue);
    println!("open tickets           {}", summary.open_tickets);
    println!("bookings (24h)         {}", summary.bookings_last_24h);

    match &summary.top_provider {
        Some(top) => println!(
            "top provider           {} ({} bookings, {} {CURRENCY})",
            top.display_name(),
            top.booking_count,
            top.total_revenue
        ),
        None => println!("top provider           \u{2014}"),
    }

    println!();
    println!("revenue, last 7 days");
    for point in &summary.revenue_last_7_days {
        println!("  {:<5}{} {CURRENCY}", point.label, point.amount);
    }

    if !summary.recent_bookings.is_empty() {
        println!();
        println!("recent bookings");
        for b in &summary.recent_bookings {
            println!(
                "  {}  {:<12}{:<22}{:<22}{} {CURRENCY}",
                b.scheduled_at.format("%Y-%m-%d %H:%M"),
                b.status.as_str(),
                truncate(b.client_name.as_deref().unwrap_or("\u{2014}"), 20),
                truncate(b.provider_name.as_deref().unwrap_or("\u{2014}"), 20),
                b.total
            );
        }
    }

    if !summary.degraded.is_empty() {
        println!();
        println!("unavailable widgets: {}", summary.degraded.join(", "));
    }
}

/// Opens (or reuses) a direct chat through the marketplace API.
///
/// # Errors
///
/// Returns an error if the request is invalid or the API call fails.
pub(crate) async fn run_chat(
    config: &AppConfig,
    request: &DirectChatRequest,
    token: Option<String>,
) -> anyhow::Result<()> {
    let mut client = ApiClient::new(
        &config.api_base_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?;
    if let Some(token) = token {
        client = client.with_access_token(token);
    }

    let chat = client.open_direct_chat(request).await?;
    println!("chat {}", chat.id);
    if let Some(at) = chat.last_message_at {
        println!("last message at {}", at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_switches_to_km_above_one_kilometre() {
        assert_eq!(fmt_distance(Some(850.4)), "850 m");
        assert_eq!(fmt_distance(Some(1300.0)), "1.3 km");
        assert_eq!(fmt_distance(None), "\u{2014}");
        assert_eq!(fmt_distance(Some(f64::NAN)), "\u{2014}");
    }

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("Chez Mireille", 28), "Chez Mireille");
        assert_eq!(truncate("Institut de beauté Bonapriso", 10), "Institu...");
    }
}
