use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// Runtime settings, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend base URL; the built-in sample store is used when unset
    pub api_url: Option<String>,
    pub api_key: String,
    /// Signed-in user's session JWT, if any
    pub session_token: Option<String>,
    pub storage_path: PathBuf,
    pub debounce: Duration,
    pub access_duration: chrono::Duration,
    pub refresh_interval: Duration,
    pub admin_prefix: String,
    pub confidential_secret: Option<String>,
    pub site_secret: Option<String>,
    /// Site password the binary submits when the gate is enforced
    pub site_password: Option<String>,
    /// Confidential pricing password the binary submits, if any
    pub pricing_password: Option<String>,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: String::new(),
            session_token: None,
            storage_path: PathBuf::from("deal_scout_storage.json"),
            debounce: Duration::from_millis(300),
            access_duration: chrono::Duration::hours(24),
            refresh_interval: Duration::from_secs(60),
            admin_prefix: "/admin".to_string(),
            confidential_secret: None,
            site_secret: None,
            site_password: None,
            pricing_password: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` uses the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_url: optional(&lookup, "DEALS_API_URL"),
            api_key: optional(&lookup, "DEALS_API_KEY").unwrap_or_default(),
            session_token: optional(&lookup, "DEALS_SESSION_TOKEN"),
            storage_path: try_load(&lookup, "DEALS_STORAGE_PATH", defaults.storage_path.display())?,
            debounce: Duration::from_millis(try_load(&lookup, "DEALS_DEBOUNCE_MS", 300u64)?),
            access_duration: chrono::Duration::hours(try_load(&lookup, "DEALS_ACCESS_HOURS", 24i64)?),
            refresh_interval: Duration::from_secs(try_load(&lookup, "DEALS_REFRESH_SECS", 60u64)?),
            admin_prefix: try_load(&lookup, "DEALS_ADMIN_PREFIX", &defaults.admin_prefix)?,
            confidential_secret: optional(&lookup, "DEALS_CONFIDENTIAL_SECRET"),
            site_secret: optional(&lookup, "DEALS_SITE_SECRET"),
            site_password: optional(&lookup, "DEALS_PASSWORD"),
            pricing_password: optional(&lookup, "DEALS_PRICING_PASSWORD"),
            http_timeout: Duration::from_secs(try_load(&lookup, "DEALS_HTTP_TIMEOUT_SECS", 30u64)?),
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: impl Display,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = optional(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value {raw:?}: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.access_duration, chrono::Duration::hours(24));
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.admin_prefix, "/admin");
        assert_eq!(config.storage_path, PathBuf::from("deal_scout_storage.json"));
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = Config::from_lookup(lookup(&[
            ("DEALS_API_URL", "https://db.example.com"),
            ("DEALS_DEBOUNCE_MS", "150"),
            ("DEALS_ACCESS_HOURS", "1"),
            ("DEALS_CONFIDENTIAL_SECRET", "   "),
            ("DEALS_PRICING_PASSWORD", "letmein"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.access_duration, chrono::Duration::hours(1));
        assert!(config.confidential_secret.is_none());
        assert_eq!(config.pricing_password.as_deref(), Some("letmein"));
        assert!(config.site_password.is_none());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DEALS_REFRESH_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("DEALS_REFRESH_SECS"));
    }
}
