use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Default radius handed to the nearby-providers procedure.
pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 30_000;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BEAUTYLINK_ENV", "development"))?;

    let bind_addr = parse("BEAUTYLINK_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BEAUTYLINK_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BEAUTYLINK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BEAUTYLINK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BEAUTYLINK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let api_base_url = or_default("BEAUTYLINK_API_BASE_URL", "http://localhost:4000");
    let geocoder_base_url = or_default(
        "BEAUTYLINK_GEOCODER_BASE_URL",
        "https://nominatim.openstreetmap.org",
    );
    let http_timeout_secs = parse_u64("BEAUTYLINK_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("BEAUTYLINK_USER_AGENT", "beautylink/0.1 (marketplace)");
    let search_radius_meters = parse_u32(
        "BEAUTYLINK_SEARCH_RADIUS_METERS",
        &DEFAULT_SEARCH_RADIUS_METERS.to_string(),
    )?;
    if search_radius_meters == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BEAUTYLINK_SEARCH_RADIUS_METERS".to_string(),
            reason: "radius must be greater than zero".to_string(),
        });
    }
    let state_path = PathBuf::from(or_default(
        "BEAUTYLINK_STATE_PATH",
        "./.beautylink/state.json",
    ));
    let services_path = PathBuf::from(or_default(
        "BEAUTYLINK_SERVICES_PATH",
        "./config/services.yaml",
    ));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        api_base_url,
        geocoder_base_url,
        http_timeout_secs,
        user_agent,
        search_radius_meters,
        state_path,
        services_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for any value other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BEAUTYLINK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
