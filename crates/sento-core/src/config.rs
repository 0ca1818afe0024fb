use std::str::FromStr;

use crate::app_config::{AppConfig, LogFormat, LogOutput};
use crate::ConfigError;

const DEFAULT_TWITTER_API_BASE_URL: &str = "https://api.twitter.com/";
const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org/";
const MAX_RELEVANT_WINDOW_HOURS: u64 = 24 * 365;

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
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let twitter_consumer_key = require("TWITTER_CONSUMER_API_KEY")?;
    let twitter_consumer_secret = require("TWITTER_CONSUMER_API_SECRET_KEY")?;
    let search_woeid: i64 = parse_value("SENTO_SEARCH_WOEID", &require("SENTO_SEARCH_WOEID")?)?;

    let log_level = or_default("SENTO_LOG_LEVEL", "info");
    let log_format = parse_log_format(&or_default("SENTO_LOG_FORMAT", "pretty"))?;
    let log_output = parse_log_output(&or_default("SENTO_LOG_OUTPUT", "console"))?;
    let log_dir = or_default("SENTO_LOG_DIR", "logs");

    let twitter_api_base_url = or_default("TWITTER_API_BASE_URL", DEFAULT_TWITTER_API_BASE_URL);
    let nominatim_base_url = or_default("NOMINATIM_BASE_URL", DEFAULT_NOMINATIM_BASE_URL);

    let raw = |var: &str, default: &str| or_default(var, default);

    let posts_group_size: usize =
        parse_value("SENTO_POSTS_GROUP_SIZE", &raw("SENTO_POSTS_GROUP_SIZE", "5"))?;
    if posts_group_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SENTO_POSTS_GROUP_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let search_page_size: u32 =
        parse_value("SENTO_SEARCH_PAGE_SIZE", &raw("SENTO_SEARCH_PAGE_SIZE", "100"))?;
    if !(1..=100).contains(&search_page_size) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SENTO_SEARCH_PAGE_SIZE".to_string(),
            reason: "must be between 1 and 100".to_string(),
        });
    }

    let relevant_window_hours: u64 = parse_value(
        "SENTO_RELEVANT_WINDOW_HOURS",
        &raw("SENTO_RELEVANT_WINDOW_HOURS", "12"),
    )?;
    if !(1..=MAX_RELEVANT_WINDOW_HOURS).contains(&relevant_window_hours) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SENTO_RELEVANT_WINDOW_HOURS".to_string(),
            reason: format!("must be between 1 and {MAX_RELEVANT_WINDOW_HOURS}"),
        });
    }

    Ok(AppConfig {
        database_url,
        log_level,
        log_format,
        log_output,
        log_dir,
        twitter_consumer_key,
        twitter_consumer_secret,
        twitter_api_base_url,
        nominatim_base_url,
        search_woeid,
        db_max_connections: parse_value(
            "SENTO_DB_MAX_CONNECTIONS",
            &raw("SENTO_DB_MAX_CONNECTIONS", "10"),
        )?,
        db_min_connections: parse_value(
            "SENTO_DB_MIN_CONNECTIONS",
            &raw("SENTO_DB_MIN_CONNECTIONS", "1"),
        )?,
        db_acquire_timeout_secs: parse_value(
            "SENTO_DB_ACQUIRE_TIMEOUT_SECS",
            &raw("SENTO_DB_ACQUIRE_TIMEOUT_SECS", "10"),
        )?,
        http_timeout_secs: parse_value(
            "SENTO_HTTP_TIMEOUT_SECS",
            &raw("SENTO_HTTP_TIMEOUT_SECS", "30"),
        )?,
        user_agent: or_default("SENTO_USER_AGENT", "sento-crawler/0.1 (trend-harvesting)"),
        geocoder_min_interval_ms: parse_value(
            "SENTO_GEOCODER_MIN_INTERVAL_MS",
            &raw("SENTO_GEOCODER_MIN_INTERVAL_MS", "1000"),
        )?,
        trends_interval_secs: parse_value(
            "SENTO_TRENDS_INTERVAL_SECS",
            &raw("SENTO_TRENDS_INTERVAL_SECS", "900"),
        )?,
        posts_interval_secs: parse_value(
            "SENTO_POSTS_INTERVAL_SECS",
            &raw("SENTO_POSTS_INTERVAL_SECS", "60"),
        )?,
        empty_poll_secs: parse_value("SENTO_EMPTY_POLL_SECS", &raw("SENTO_EMPTY_POLL_SECS", "5"))?,
        relevant_window_hours,
        posts_group_size,
        search_page_size,
        search_lang: or_default("SENTO_SEARCH_LANG", "es"),
        search_min_radius_km: parse_value(
            "SENTO_SEARCH_MIN_RADIUS_KM",
            &raw("SENTO_SEARCH_MIN_RADIUS_KM", "10"),
        )?,
        search_max_pages: parse_value(
            "SENTO_SEARCH_MAX_PAGES",
            &raw("SENTO_SEARCH_MAX_PAGES", "50"),
        )?,
        persist_cursors: parse_bool("SENTO_PERSIST_CURSORS", &raw("SENTO_PERSIST_CURSORS", "false"))?,
        max_retries: parse_value("SENTO_MAX_RETRIES", &raw("SENTO_MAX_RETRIES", "3"))?,
        retry_backoff_base_ms: parse_value(
            "SENTO_RETRY_BACKOFF_BASE_MS",
            &raw("SENTO_RETRY_BACKOFF_BASE_MS", "1000"),
        )?,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, ConfigError> {
    match s {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SENTO_LOG_FORMAT".to_string(),
            reason: format!("expected \"pretty\" or \"json\", got \"{other}\""),
        }),
    }
}

fn parse_log_output(s: &str) -> Result<LogOutput, ConfigError> {
    match s {
        "console" => Ok(LogOutput::Console),
        "daily_rotating_file" => Ok(LogOutput::DailyRotatingFile),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SENTO_LOG_OUTPUT".to_string(),
            reason: format!("expected \"console\" or \"daily_rotating_file\", got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
