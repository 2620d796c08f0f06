//! Environment variable names read by this crate.
//!
//! Writers take their defaults from the `LOG_*` variables; the remaining
//! names feed the environment fields attached to every event unless the
//! caller supplies them explicitly.

/// Minimum severity name, e.g. `WARN`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Drop empty string values from emitted records.
pub const LOG_OMIT_EMPTY_ENV: &str = "LOG_OMITEMPTY";

/// Colourise console output.
pub const LOG_COLOURS_ENV: &str = "LOG_COLOURS";

/// Product the service belongs to.
pub const PRODUCT_ENV: &str = "PRODUCT";

/// Application name.
pub const APP_NAME_ENV: &str = "APP";

/// Deployment farm.
pub const APP_FARM_ENV: &str = "FARM";

/// Older name for the deployment farm, consulted when `FARM` is unset.
pub const APP_FARM_LEGACY_ENV: &str = "APP_ENV";

/// Application version.
pub const APP_VERSION_ENV: &str = "APP_VERSION";

/// Cloud region.
pub const AWS_REGION_ENV: &str = "AWS_REGION";

/// Cloud account id.
pub const AWS_ACCOUNT_ID_ENV: &str = "AWS_ACCOUNT_ID";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating an empty value as unset.
pub fn get_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read a boolean environment variable.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts. Anything else, including an unset variable, yields
/// `default`.
pub fn get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => parse_bool(&value).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
