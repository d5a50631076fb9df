use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_PRICE_REFRESH_CRONS: &str = "0 30 0 * * *;0 30 12 * * *";

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
///
/// # Errors
///
/// Returns `ConfigError` if required vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
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

    // Empty strings count as unset: a blank `FLIPKART_AFFILIATE_TOKEN=` line in
    // `.env` must disable the integration, not send an empty header.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("LENSMATCH_ENV", "development"));
    let bind_addr = parse_addr("LENSMATCH_BIND_ADDR", "0.0.0.0:3001")?;
    let log_level = or_default("LENSMATCH_LOG_LEVEL", "info");
    let catalogue_path = PathBuf::from(or_default(
        "LENSMATCH_CATALOGUE_PATH",
        "./config/lenses.json",
    ));
    let public_base_url = or_default("LENSMATCH_PUBLIC_BASE_URL", "http://localhost:3001")
        .trim_end_matches('/')
        .to_string();

    let db_max_connections = parse_u32("LENSMATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LENSMATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LENSMATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let affiliate_id = optional("FLIPKART_AFFILIATE_ID");
    let affiliate_token = optional("FLIPKART_AFFILIATE_TOKEN");
    let affiliate_base_url = or_default(
        "LENSMATCH_AFFILIATE_BASE_URL",
        "https://affiliate-api.flipkart.net",
    );
    let affiliate_timeout_secs = parse_u64("LENSMATCH_AFFILIATE_TIMEOUT_SECS", "15")?;

    let retail_base_url = or_default("LENSMATCH_RETAIL_BASE_URL", "https://www.amazon.in");
    let scraper_nav_timeout_secs = parse_u64("LENSMATCH_SCRAPER_NAV_TIMEOUT_SECS", "30")?;
    let scraper_selector_timeout_secs =
        parse_u64("LENSMATCH_SCRAPER_SELECTOR_TIMEOUT_SECS", "10")?;
    let scraper_max_attempts = parse_u32("LENSMATCH_SCRAPER_MAX_ATTEMPTS", "3")?;
    if scraper_max_attempts == 0 {
        return Err(invalid(
            "LENSMATCH_SCRAPER_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_retry_pause_ms = parse_u64("LENSMATCH_SCRAPER_RETRY_PAUSE_MS", "2000")?;
    let chrome_path = optional("LENSMATCH_CHROME_PATH").map(PathBuf::from);

    let batch_pacing_ms = parse_u64("LENSMATCH_BATCH_PACING_MS", "3000")?;
    let refresh_cooldown_secs = parse_u64("LENSMATCH_REFRESH_COOLDOWN_SECS", "600")?;
    let trust_proxy = parse_bool("LENSMATCH_TRUST_PROXY", "false")?;
    let scheduler_enabled = parse_bool("LENSMATCH_SCHEDULER_ENABLED", "true")?;
    let price_refresh_crons = parse_cron_list(&or_default(
        "LENSMATCH_PRICE_REFRESH_CRONS",
        DEFAULT_PRICE_REFRESH_CRONS,
    ));
    if scheduler_enabled && price_refresh_crons.is_empty() {
        return Err(invalid(
            "LENSMATCH_PRICE_REFRESH_CRONS",
            "at least one cron expression is required while the scheduler is enabled"
                .to_string(),
        ));
    }

    let brevo_api_key = optional("BREVO_API_KEY");
    let mail_from_email = optional("LENSMATCH_MAIL_FROM_EMAIL");
    let mail_from_name = or_default("LENSMATCH_MAIL_FROM_NAME", "LensMatch India");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        catalogue_path,
        public_base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        affiliate_id,
        affiliate_token,
        affiliate_base_url,
        affiliate_timeout_secs,
        retail_base_url,
        scraper_nav_timeout_secs,
        scraper_selector_timeout_secs,
        scraper_max_attempts,
        scraper_retry_pause_ms,
        chrome_path,
        batch_pacing_ms,
        refresh_cooldown_secs,
        trust_proxy,
        scheduler_enabled,
        price_refresh_crons,
        brevo_api_key,
        mail_from_email,
        mail_from_name,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Split a `;`-separated list of cron expressions. Commas are legal inside a
/// cron field, so they cannot be the separator.
fn parse_cron_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
