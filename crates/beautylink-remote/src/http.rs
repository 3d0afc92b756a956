//! Pieces shared by the two HTTP clients.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::RemoteError;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, RemoteError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// Parses `base_url` so that relative joins append to its path instead of
/// replacing the last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, RemoteError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| RemoteError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, RemoteError> {
    base.join(path).map_err(|e| RemoteError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Asserts a 2xx status and decodes the body as `T`.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, RemoteError> {
    let response = response.error_for_status()?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}
