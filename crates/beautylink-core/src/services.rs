//! Service catalog configuration (`config/services.yaml`).

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name_fr: String,
    pub name_en: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub duration_minutes: i32,
    pub base_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesFile {
    pub services: Vec<ServiceConfig>,
}

/// Load and validate the service catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_services(path: &Path) -> Result<ServicesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ServicesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_services(&content)
}

/// Parse and validate a service catalog document.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_services(yaml: &str) -> Result<ServicesFile, ConfigError> {
    let file: ServicesFile = serde_yaml::from_str(yaml).map_err(ConfigError::ServicesFileParse)?;
    validate_services(&file)?;
    Ok(file)
}

fn validate_services(file: &ServicesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for service in &file.services {
        if service.name_fr.trim().is_empty() || service.name_en.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service names must be non-empty".to_string(),
            ));
        }
        if service.duration_minutes <= 0 {
            return Err(ConfigError::Validation(format!(
                "service '{}' has non-positive duration {}",
                service.name_en, service.duration_minutes
            )));
        }
        if service.base_price.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "service '{}' has a negative price",
                service.name_en
            )));
        }
        if !seen.insert(service.name_en.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate service: '{}'",
                service.name_en
            )));
        }
    }

    Ok(())
}
