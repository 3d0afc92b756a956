//! Provider matching for the service details page.
//!
//! The ranking itself happens inside the `get_nearby_providers` stored
//! procedure. This module covers what happens around that call: resolving
//! the location to search from, turning procedure rows plus salon address
//! details into displayable providers, and the district-first re-sort.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DataError;

/// Image shown when a provider has no picture of its own.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1560066984-138dadb4c035?w=400";

/// Address label for therapists who travel to the client.
pub const MOBILE_ADDRESS_LABEL: &str = "Mobile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Salon,
    Therapist,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Salon => "salon",
            ProviderKind::Therapist => "therapist",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "salon" => Ok(ProviderKind::Salon),
            "therapist" => Ok(ProviderKind::Therapist),
            other => Err(DataError::Validation(format!(
                "unknown provider type '{other}'"
            ))),
        }
    }
}

/// Match tier assigned by the nearby-providers procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    DistrictMatch,
    CityMatch,
    ProximityOrFallback,
}

impl MatchType {
    /// Maps the procedure's tier string; anything unrecognised is treated as
    /// the fallback tier.
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s {
            "district_match" => MatchType::DistrictMatch,
            "city_match" => MatchType::CityMatch,
            _ => MatchType::ProximityOrFallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Last location a user searched from, as persisted in local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub query: String,
    pub coords: Option<Coordinates>,
}

/// Location values supplied explicitly with a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationInput {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
}

impl LocationInput {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn is_empty(&self) -> bool {
        self.coordinates().is_none() && self.text().is_none()
    }

    /// Validates coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] when only one of lat/lon is given or
    /// either is out of range.
    pub fn validate(&self) -> Result<(), DataError> {
        match (self.lat, self.lon) {
            (Some(_), None) | (None, Some(_)) => Err(DataError::Validation(
                "lat and lon must be supplied together".to_string(),
            )),
            (Some(lat), Some(lon)) if !(-90.0..=90.0).contains(&lat) => Err(
                DataError::Validation(format!("latitude {lat} is out of range")),
            ),
            (Some(_), Some(lon)) if !(-180.0..=180.0).contains(&lon) => Err(
                DataError::Validation(format!("longitude {lon} is out of range")),
            ),
            _ => Ok(()),
        }
    }
}

/// Effective location handed to the nearby-providers procedure.
///
/// Every field may be absent; the procedure then falls back to its own
/// proximity tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchLocation {
    pub coords: Option<Coordinates>,
    pub district: Option<String>,
    pub city: Option<String>,
    /// Free text the location was derived from.
    pub query: Option<String>,
}

impl SearchLocation {
    /// The value worth persisting as "last used location", if any.
    #[must_use]
    pub fn to_location_query(&self) -> Option<LocationQuery> {
        if self.coords.is_none() && self.query.is_none() {
            return None;
        }
        Some(LocationQuery {
            query: self.query.clone().unwrap_or_default(),
            coords: self.coords,
        })
    }
}

/// Splits `"district, city"` on the first comma.
///
/// Without a comma the whole text is the district. Empty parts are `None`.
#[must_use]
pub fn split_location(text: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    match text.split_once(',') {
        Some((district, city)) => (non_empty(district), non_empty(city)),
        None => (non_empty(text), None),
    }
}

/// Picks the location to search from.
///
/// Explicit request values win as a whole; when the request carries no
/// location at all the last stored location is used.
#[must_use]
pub fn resolve_search_location(
    explicit: &LocationInput,
    stored: Option<&LocationQuery>,
) -> SearchLocation {
    if !explicit.is_empty() {
        let query = explicit.text().map(str::to_string);
        let (district, city) = query.as_deref().map(split_location).unwrap_or_default();
        return SearchLocation {
            coords: explicit.coordinates(),
            district,
            city,
            query,
        };
    }

    let Some(stored) = stored else {
        return SearchLocation::default();
    };

    let query = Some(stored.query.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let (district, city) = query.as_deref().map(split_location).unwrap_or_default();
    SearchLocation {
        coords: stored.coords,
        district,
        city,
        query,
    }
}

/// One row returned by `get_nearby_providers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyProvider {
    pub id: Uuid,
    pub kind: ProviderKind,
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub image: Option<String>,
    pub service_price: Option<Decimal>,
    pub distance_meters: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub match_type: MatchType,
    pub is_mobile: Option<bool>,
    pub city: Option<String>,
}

/// Denormalised address parts of a salon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalonAddress {
    pub id: Uuid,
    pub quarter: Option<String>,
    pub street: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// A provider ready for display, in ranked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub kind: ProviderKind,
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub image: String,
    pub service_price: Option<Decimal>,
    pub distance_meters: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub match_type: MatchType,
    pub is_mobile: Option<bool>,
    pub address: String,
}

/// Result tabs on the service details page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFilter {
    #[default]
    All,
    Salon,
    Individual,
}

impl FromStr for ProviderFilter {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ProviderFilter::All),
            "salon" => Ok(ProviderFilter::Salon),
            "individual" => Ok(ProviderFilter::Individual),
            other => Err(DataError::Validation(format!("unknown filter '{other}'"))),
        }
    }
}

impl ProviderFilter {
    #[must_use]
    pub fn accepts(self, kind: ProviderKind) -> bool {
        match self {
            ProviderFilter::All => true,
            ProviderFilter::Salon => kind == ProviderKind::Salon,
            ProviderFilter::Individual => kind == ProviderKind::Therapist,
        }
    }

    /// Message shown when the tab has no providers.
    #[must_use]
    pub fn empty_message(self) -> &'static str {
        match self {
            ProviderFilter::All => "No providers offer this service yet.",
            ProviderFilter::Salon => "No salons offer this service yet.",
            ProviderFilter::Individual => "No independent therapists offer this service yet.",
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Human-readable salon address: quarter and city, else the raw address,
/// else the city alone.
#[must_use]
pub fn format_salon_address(details: &SalonAddress) -> String {
    let quarter = present(details.quarter.as_deref());
    let city = present(details.city.as_deref());

    if let (Some(quarter), Some(city)) = (quarter, city) {
        return format!("{quarter}, {city}");
    }
    present(details.address.as_deref())
        .or(city)
        .unwrap_or_default()
        .to_string()
}

/// Therapists are shown as mobile unless they explicitly are not.
#[must_use]
pub fn therapist_address(is_mobile: Option<bool>, city: Option<&str>) -> String {
    if is_mobile == Some(false) {
        present(city).unwrap_or_default().to_string()
    } else {
        MOBILE_ADDRESS_LABEL.to_string()
    }
}

/// Salon ids that need an address lookup.
#[must_use]
pub fn salon_ids(rows: &[NearbyProvider]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = rows
        .iter()
        .filter(|r| r.kind == ProviderKind::Salon)
        .map(|r| r.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Combines procedure rows with salon address details.
///
/// Pure: the same inputs always produce the same providers.
#[must_use]
pub fn merge_provider_details(
    rows: &[NearbyProvider],
    salon_details: &HashMap<Uuid, SalonAddress>,
) -> Vec<Provider> {
    rows.iter()
        .map(|row| {
            let address = match row.kind {
                ProviderKind::Salon => match salon_details.get(&row.id) {
                    Some(details) => format_salon_address(details),
                    None => format_salon_address(&SalonAddress {
                        id: row.id,
                        city: row.city.clone(),
                        ..SalonAddress::default()
                    }),
                },
                ProviderKind::Therapist => therapist_address(row.is_mobile, row.city.as_deref()),
            };

            Provider {
                id: row.id,
                kind: row.kind,
                name: row.name.clone(),
                rating: row.rating,
                review_count: row.review_count,
                image: present(row.image.as_deref())
                    .unwrap_or(PLACEHOLDER_IMAGE_URL)
                    .to_string(),
                service_price: row.service_price,
                distance_meters: row.distance_meters,
                latitude: row.latitude,
                longitude: row.longitude,
                match_type: row.match_type,
                is_mobile: match row.kind {
                    ProviderKind::Therapist => row.is_mobile,
                    ProviderKind::Salon => None,
                },
                address,
            }
        })
        .collect()
}

/// Re-sorts providers when the search named a district.
///
/// District matches come first; within each tier providers are ordered by
/// ascending distance with unknown distances last. The sort is stable.
/// Without a district the procedure's order is kept.
pub fn rank_providers(providers: &mut [Provider], district: Option<&str>) {
    if present(district).is_none() {
        return;
    }

    providers.sort_by(|a, b| {
        let tier = |p: &Provider| u8::from(p.match_type != MatchType::DistrictMatch);
        let distance = |p: &Provider| p.distance_meters.unwrap_or(f64::MAX);
        tier(a)
            .cmp(&tier(b))
            .then_with(|| distance(a).total_cmp(&distance(b)))
    });
}

#[must_use]
pub fn filter_providers(providers: &[Provider], filter: ProviderFilter) -> Vec<Provider> {
    providers
        .iter()
        .filter(|p| filter.accepts(p.kind))
        .cloned()
        .collect()
}

/// Rating as displayed on provider cards.
#[must_use]
pub fn display_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) if r.is_finite() => format!("{r:.1}"),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
#[path = "providers_test.rs"]
mod tests;
