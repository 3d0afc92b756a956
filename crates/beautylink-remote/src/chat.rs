//! Client for the marketplace REST API's chat endpoints.

use beautylink_core::providers::ProviderKind;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RemoteError;
use crate::http::{build_client, decode_json, endpoint, parse_base_url};

/// Body of `POST /chat/direct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectChatRequest {
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub provider_type: ProviderKind,
}

impl DirectChatRequest {
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidInput`] when a user tries to chat with themself
    /// or an id is nil.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.client_id.is_nil() || self.provider_id.is_nil() {
            return Err(RemoteError::InvalidInput(
                "client and provider ids are required".to_string(),
            ));
        }
        if self.client_id == self.provider_id {
            return Err(RemoteError::InvalidInput(
                "a client cannot open a chat with themself".to_string(),
            ));
        }
        Ok(())
    }
}

/// The conversation returned by the API; existing conversations are reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectChat {
    pub id: Uuid,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Client for the marketplace REST API.
///
/// Use [`ApiClient::new`] with the configured base URL (a wiremock server in
/// tests).
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RemoteError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url)?,
            access_token: None,
        })
    }

    /// Sends `token` as a bearer token on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Opens (or reuses) the direct conversation between a client and a provider.
    ///
    /// The request is validated before anything is sent.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidInput`] if the request fails validation.
    /// - [`RemoteError::Http`] on network failure or non-2xx HTTP status.
    /// - [`RemoteError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn open_direct_chat(
        &self,
        request: &DirectChatRequest,
    ) -> Result<DirectChat, RemoteError> {
        request.validate()?;

        let url = endpoint(&self.base_url, "chat/direct")?;
        let mut builder = self.client.post(url).json(request);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let chat: DirectChat = decode_json(response, "POST chat/direct").await?;
        tracing::debug!(chat_id = %chat.id, provider_id = %request.provider_id, "direct chat opened");
        Ok(chat)
    }
}
