//! Runtime configuration from the process environment.

use crate::error::{LuxeFitError, Result};
use crate::image::{IntakeLimits, DEFAULT_MAX_UPLOAD_BYTES};
use crate::swap::providers::{GeminiModel, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::time::Duration;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "API_KEY"];

/// Settings for a studio session.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Gemini API key. `None` is a configuration error, not a request failure.
    pub api_key: Option<String>,
    /// Image model variant.
    pub model: GeminiModel,
    /// Deadline for each swap call.
    pub timeout: Duration,
    /// API base URL.
    pub base_url: String,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            timeout: DEFAULT_TIMEOUT,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

// Keeps the key out of logs and panics.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[set]"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// | Variable                   | Meaning                          |
    /// |----------------------------|----------------------------------|
    /// | `GOOGLE_API_KEY`/`API_KEY` | Gemini API key                   |
    /// | `LUXEFIT_MODEL`            | `flash` (default) or `pro`       |
    /// | `LUXEFIT_TIMEOUT_SECS`     | swap deadline, default 60        |
    /// | `LUXEFIT_MAX_UPLOAD_BYTES` | upload cap, default 20 MiB       |
    /// | `LUXEFIT_BASE_URL`         | API base URL                     |
    ///
    /// A missing key is not an error here; see [`Config::require_api_key`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self {
            api_key: API_KEY_ENV_VARS.iter().find_map(|&name| get(name)),
            ..Self::default()
        };

        if let Some(model) = get("LUXEFIT_MODEL") {
            config.model = model.parse()?;
        }
        if let Some(secs) = get("LUXEFIT_TIMEOUT_SECS") {
            let secs: u64 = parse_number("LUXEFIT_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(LuxeFitError::Config(
                    "LUXEFIT_TIMEOUT_SECS must be greater than zero".into(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = get("LUXEFIT_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("LUXEFIT_MAX_UPLOAD_BYTES", &bytes)?;
        }
        if let Some(url) = get("LUXEFIT_BASE_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LuxeFitError::Config(format!(
                    "LUXEFIT_BASE_URL must be an http(s) URL, got '{url}'"
                )));
            }
            config.base_url = url;
        }

        Ok(config)
    }

    /// Returns the API key or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            LuxeFitError::Config(format!(
                "no API key found; set {} (or {})",
                API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
            ))
        })
    }

    /// Upload limits derived from this configuration.
    pub fn intake_limits(&self) -> IntakeLimits {
        IntakeLimits {
            max_bytes: self.max_upload_bytes,
        }
    }
}

/// Reads the API key from the first non-empty known variable.
pub(crate) fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| LuxeFitError::Config(format!("{name} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_google_key_wins_over_generic_key() {
        let config = load(&[("API_KEY", "generic"), ("GOOGLE_API_KEY", "google")]).unwrap();
        assert_eq!(config.require_api_key().unwrap(), "google");

        let config = load(&[("API_KEY", "generic"), ("GOOGLE_API_KEY", "  ")]).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LUXEFIT_MODEL", "pro"),
            ("LUXEFIT_TIMEOUT_SECS", "45"),
            ("LUXEFIT_MAX_UPLOAD_BYTES", "1048576"),
            ("LUXEFIT_BASE_URL", "http://localhost:8080"),
        ])
        .unwrap();
        assert_eq!(config.model, GeminiModel::NanoBananaPro);
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.intake_limits().max_bytes, 1_048_576);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("LUXEFIT_TIMEOUT_SECS", "soon")],
            [("LUXEFIT_TIMEOUT_SECS", "0")],
            [("LUXEFIT_MODEL", "imagen")],
            [("LUXEFIT_BASE_URL", "localhost")],
        ] {
            assert!(matches!(load(&vars), Err(LuxeFitError::Config(_))));
        }
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = load(&[("GOOGLE_API_KEY", "super-secret")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[set]"));
    }
}
