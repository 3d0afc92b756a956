//! Address search against a Nominatim server.
//!
//! Nominatim needs no API key but asks every client to send an identifying
//! `User-Agent`. Results are restricted to Cameroon.

use beautylink_core::providers::Coordinates;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::http::{build_client, decode_json, endpoint, parse_base_url};

const COUNTRY_CODES: &str = "cm";
const RESULT_LIMIT: &str = "5";

#[derive(Debug, Clone, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NominatimAddress {
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

/// One geocoding suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub display_name: String,
    pub coords: Coordinates,
    pub district: Option<String>,
    pub city: Option<String>,
}

impl GeocodeResult {
    /// `"district, city"` in the shape the provider search splits, or the
    /// display name when neither part is known.
    #[must_use]
    pub fn location_label(&self) -> String {
        match (self.district.as_deref(), self.city.as_deref()) {
            (Some(district), Some(city)) => format!("{district}, {city}"),
            (Some(part), None) | (None, Some(part)) => part.to_string(),
            (None, None) => self.display_name.clone(),
        }
    }
}

impl NominatimPlace {
    fn into_result(self) -> Option<GeocodeResult> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lon = self.lon.trim().parse::<f64>().ok()?;
        let address = self.address.unwrap_or_default();
        Some(GeocodeResult {
            display_name: self.display_name,
            coords: Coordinates { lat, lon },
            district: address
                .suburb
                .or(address.quarter)
                .or(address.neighbourhood)
                .or(address.city_district),
            city: address.city.or(address.town).or(address.village),
        })
    }
}

/// Client for the Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: Url,
}

impl GeocodeClient {
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RemoteError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Looks up addresses matching `query`.
    ///
    /// Entries with unparseable coordinates are skipped.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidInput`] if `query` is blank.
    /// - [`RemoteError::Http`] on network failure or non-2xx HTTP status.
    /// - [`RemoteError::Deserialize`] if the response is not a list of places.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>, RemoteError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RemoteError::InvalidInput(
                "search text must not be empty".to_string(),
            ));
        }

        let url = self.build_url(query)?;
        let response = self.client.get(url).send().await?;
        let places: Vec<NominatimPlace> =
            decode_json(response, &format!("search(q={query})")).await?;

        let total = places.len();
        let results: Vec<GeocodeResult> = places
            .into_iter()
            .filter_map(NominatimPlace::into_result)
            .collect();
        if results.len() < total {
            tracing::debug!(
                skipped = total - results.len(),
                "geocoder returned places without usable coordinates"
            );
        }
        Ok(results)
    }

    fn build_url(&self, query: &str) -> Result<Url, RemoteError> {
        let mut url = endpoint(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("addressdetails", "1")
            .append_pair("limit", RESULT_LIMIT)
            .append_pair("countrycodes", COUNTRY_CODES);
        Ok(url)
    }
}

#[cfg(test)]
#[path = "geocode_test.rs"]
mod tests;
