//! Loading of the `config.json` settings file.
//!
//! The configuration is read exactly once at startup and then handed to every component that
//! needs it. A missing file is reported with guidance that depends on whether the example
//! template is present next to it.

use crate::workflow::guided::GuidedPlan;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.json";

/// Name of the template users are expected to copy to [`CONFIG_FILE`].
pub const EXAMPLE_CONFIG_FILE: &str = "config.example.json";

const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Please copy {} to {} and update it with your settings",
        file_name(.example),
        file_name(.config)
    )]
    MissingWithExample { config: PathBuf, example: PathBuf },

    #[error("Neither {} nor {} found!", file_name(.config), file_name(.example))]
    Missing { config: PathBuf, example: PathBuf },

    #[error("failed to read config file at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config file at {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
}

impl ConfigError {
    /// Whether this error means the settings file does not exist at all.
    ///
    /// Those cases get printed as plain guidance rather than as an error report.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingWithExample { .. } | Self::Missing { .. })
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// OAuth scopes requested during consent.
    pub scopes: Vec<String>,
    /// Where the authorization token is persisted between runs.
    pub token_file: PathBuf,
    /// Google client secrets file (installed application flavour).
    pub client_secrets_file: PathBuf,
    /// Timeout applied to every HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Overrides the built-in guided playlist.
    #[serde(default)]
    pub guided_playlist: Option<GuidedPlan>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Config {
    /// Loads [`CONFIG_FILE`] from `dir`.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let config = dir.join(CONFIG_FILE);
        let example = dir.join(EXAMPLE_CONFIG_FILE);

        if !config.exists() {
            return Err(if example.exists() {
                ConfigError::MissingWithExample { config, example }
            } else {
                ConfigError::Missing { config, example }
            });
        }

        let raw = std::fs::read_to_string(&config).map_err(|source| ConfigError::Read {
            path: config.clone(),
            source,
        })?;
        let parsed = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: config.clone(),
            source,
        })?;

        if parsed.scopes.is_empty() {
            return Err(ConfigError::Invalid {
                path: config,
                message: "`scopes` must list at least one OAuth scope".to_string(),
            });
        }

        tracing::debug!(
            path = %config.display(),
            scopes = parsed.scopes.len(),
            token_file = %parsed.token_file.display(),
            "loaded configuration"
        );
        Ok(parsed)
    }

    /// Parses the JSON content of a settings file.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The plan used by the guided builder, falling back to the built-in one.
    pub fn guided_plan(&self) -> GuidedPlan {
        self.guided_playlist.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "scopes": ["https://www.googleapis.com/auth/youtube"],
        "token_file": "token.json",
        "client_secrets_file": "client_secret.json"
    }"#;

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), FULL).unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.scopes, ["https://www.googleapis.com/auth/youtube"]);
        assert_eq!(config.token_file, PathBuf::from("token.json"));
        assert_eq!(config.client_secrets_file, PathBuf::from("client_secret.json"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.guided_playlist.is_none());
    }

    #[test]
    fn test_missing_config_with_example() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EXAMPLE_CONFIG_FILE), FULL).unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWithExample { .. }), "{err:?}");
        assert!(err.is_missing());
        assert_eq!(
            err.to_string(),
            "Please copy config.example.json to config.json and update it with your settings"
        );
    }

    #[test]
    fn test_missing_config_without_example() {
        let dir = tempfile::tempdir().unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }), "{err:?}");
        assert_eq!(
            err.to_string(),
            "Neither config.json nor config.example.json found!"
        );
    }

    #[test]
    fn test_each_required_key_is_enforced() {
        for key in ["scopes", "token_file", "client_secrets_file"] {
            let mut value: serde_json::Value = serde_json::from_str(FULL).unwrap();
            value.as_object_mut().unwrap().remove(key);

            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(CONFIG_FILE), value.to_string()).unwrap();

            let err = Config::load_from(dir.path()).unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }), "{key}: {err:?}");
            assert!(
                err.to_string().contains(&format!("missing field `{key}`")),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err:?}");
        assert!(!err.is_missing());
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"scopes": [], "token_file": "t.json", "client_secrets_file": "c.json"}"#,
        )
        .unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{err:?}");
    }

    #[test]
    fn test_optional_overrides() {
        let config = Config::parse(
            r#"{
                "scopes": ["a"],
                "token_file": "t.json",
                "client_secrets_file": "c.json",
                "request_timeout_secs": 5,
                "api_base_url": "http://127.0.0.1:9999",
                "guided_playlist": {
                    "title": "Aphex Twin",
                    "search_prefix": "Aphex Twin",
                    "items": ["Syro (2014)"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
        let plan = config.guided_plan();
        assert_eq!(plan.title, "Aphex Twin");
        assert_eq!(plan.items, ["Syro (2014)"]);
        assert_eq!(plan.privacy, "private");
    }
}
