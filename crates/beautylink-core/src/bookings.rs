//! Client booking list: upcoming/past split and best-effort enrichment.
//!
//! Booking items only carry a denormalised service name, so service images
//! are recovered by name, and therapists without a business name are named
//! after their user record. Both lookups are best-effort: a miss leaves the
//! field empty and is never an error.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "IN_PROGRESS" => Ok(BookingStatus::InProgress),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(DataError::Unknown(format!(
                "unknown booking status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalonRef {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapistRef {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: Option<String>,
    pub image: Option<String>,
    /// Resolved name: the business name, else the user's full name.
    pub display_name: Option<String>,
}

impl TherapistRef {
    fn needs_user_name(&self) -> bool {
        non_blank(self.business_name.as_deref()).is_none()
    }
}

/// Who provides the booking. A booking has exactly one of the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BookingParty {
    Salon(SalonRef),
    Therapist(TherapistRef),
}

impl BookingParty {
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            BookingParty::Salon(salon) => Some(salon.name.as_str()),
            BookingParty::Therapist(therapist) => therapist.display_name.as_deref(),
        }
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        match self {
            BookingParty::Salon(salon) => salon.image.as_deref(),
            BookingParty::Therapist(therapist) => therapist.image.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingItem {
    pub service_name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
    /// Filled by [`enrich_bookings`]; empty when no service matched.
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub party: BookingParty,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub subtotal: Decimal,
    pub travel_fee: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub items: Vec<BookingItem>,
    /// Image shown on the booking row, set by [`enrich_bookings`].
    #[serde(default)]
    pub cover_image: Option<String>,
}

impl Booking {
    /// Future bookings and anything still pending are "upcoming".
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at > now || self.status == BookingStatus::Pending
    }

    /// First image of the first item that has one, else the provider's image.
    fn representative_image(&self) -> Option<String> {
        self.items
            .iter()
            .find_map(|item| item.images.first())
            .map(String::as_str)
            .or_else(|| self.party.image())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingTab {
    Upcoming,
    Past,
}

impl FromStr for BookingTab {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(BookingTab::Upcoming),
            "past" => Ok(BookingTab::Past),
            other => Err(DataError::Validation(format!("unknown tab '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingPartition {
    pub upcoming: Vec<Booking>,
    pub past: Vec<Booking>,
}

impl BookingPartition {
    #[must_use]
    pub fn tab(&self, tab: BookingTab) -> &[Booking] {
        match tab {
            BookingTab::Upcoming => &self.upcoming,
            BookingTab::Past => &self.past,
        }
    }
}

/// Splits bookings into the two tabs, keeping input order within each.
#[must_use]
pub fn partition_bookings(bookings: Vec<Booking>, now: DateTime<Utc>) -> BookingPartition {
    let (upcoming, past): (Vec<Booking>, Vec<Booking>) =
        bookings.into_iter().partition(|b| b.is_upcoming(now));
    BookingPartition { upcoming, past }
}

/// Service names and images, from the `services` lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceImages {
    pub name_fr: String,
    pub name_en: Option<String>,
    pub images: Vec<String>,
}

/// Name lookup from service name (French or English) to its images.
#[derive(Debug, Clone, Default)]
pub struct ServiceImageIndex {
    by_name: HashMap<String, Vec<String>>,
}

impl ServiceImageIndex {
    /// Builds the index; when two services share a name the first one wins.
    #[must_use]
    pub fn new(services: Vec<ServiceImages>) -> Self {
        let mut by_name = HashMap::new();
        for service in services {
            if let Some(en) = service.name_en {
                by_name.entry(en).or_insert_with(|| service.images.clone());
            }
            by_name.entry(service.name_fr).or_insert(service.images);
        }
        Self { by_name }
    }

    /// Exact-name match. `None` when no service carries this name.
    #[must_use]
    pub fn resolve(&self, service_name: &str) -> Option<&[String]> {
        self.by_name.get(service_name).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserName {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserName {
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Business name when set, else the owner's full name.
#[must_use]
pub fn therapist_display_name(
    business_name: Option<&str>,
    user: Option<&UserName>,
) -> Option<String> {
    non_blank(business_name)
        .map(str::to_string)
        .or_else(|| user.and_then(UserName::full_name))
}

/// Keys for the two secondary lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentKeys {
    pub service_names: BTreeSet<String>,
    pub therapist_user_ids: BTreeSet<Uuid>,
}

#[must_use]
pub fn enrichment_keys(bookings: &[Booking]) -> EnrichmentKeys {
    let mut keys = EnrichmentKeys::default();
    for booking in bookings {
        for item in &booking.items {
            keys.service_names.insert(item.service_name.clone());
        }
        if let BookingParty::Therapist(therapist) = &booking.party {
            if therapist.needs_user_name() {
                keys.therapist_user_ids.insert(therapist.user_id);
            }
        }
    }
    keys
}

/// Attaches service images and therapist names fetched by the secondary lookups.
pub fn enrich_bookings(
    bookings: &mut [Booking],
    images: &ServiceImageIndex,
    users: &HashMap<Uuid, UserName>,
) {
    for booking in bookings.iter_mut() {
        for item in &mut booking.items {
            item.images = images
                .resolve(&item.service_name)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
        }
        if let BookingParty::Therapist(therapist) = &mut booking.party {
            therapist.display_name = therapist_display_name(
                therapist.business_name.as_deref(),
                users.get(&therapist.user_id),
            );
        }
        booking.cover_image = booking.representative_image();
    }
}
