use thiserror::Error;

/// Errors raised while building [`crate::AppConfig`] or loading config files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read services file {path}: {source}")]
    ServicesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse services file: {0}")]
    ServicesFileParse(#[source] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}

/// Errors raised while loading the embedded beta-test catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse beta test catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Error taxonomy shared by every data-access path.
///
/// Storage and HTTP errors are converted into one of these four variants so
/// that callers only ever pattern-match on this type when deciding how to
/// present a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl DataError {
    /// Stable machine-readable code used in API error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DataError::NotFound(_) => "not_found",
            DataError::Network(_) => "network_error",
            DataError::Validation(_) => "validation_error",
            DataError::Unknown(_) => "internal_error",
        }
    }
}
