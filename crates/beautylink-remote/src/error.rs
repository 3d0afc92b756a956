use beautylink_core::DataError;
use thiserror::Error;

/// Errors returned by the marketplace API and geocoder clients.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network or TLS failure, timeout, or non-2xx status from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A base URL from configuration could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Upstream 4xx responses become `NotFound`/`Validation` with a fixed message;
/// the `reqwest` error text names the upstream URL, so it is only logged.
impl From<RemoteError> for DataError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::InvalidInput(msg) => DataError::Validation(msg),
            RemoteError::Http(e) => match e.status() {
                Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                    tracing::debug!(error = %e, "upstream resource not found");
                    DataError::NotFound("the requested resource was not found".to_string())
                }
                Some(status) if status.is_client_error() => {
                    tracing::warn!(error = %e, "upstream rejected request");
                    DataError::Validation(format!(
                        "the request was rejected upstream (status {})",
                        status.as_u16()
                    ))
                }
                _ => DataError::Network(e.to_string()),
            },
            other @ (RemoteError::InvalidBaseUrl { .. } | RemoteError::Deserialize { .. }) => {
                DataError::Unknown(other.to_string())
            }
        }
    }
}
