//! Configuration loading for CivicLens services
//!
//! Provides two-tier configuration resolution with ENV → TOML priority.
//! The Gemini credential is deliberately optional: its absence selects the
//! demo-data fallback at startup rather than failing.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default ceiling on inline video payloads (20 MiB). Larger files are
/// rejected before any encoding or network attempt.
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 20 * 1024 * 1024;

/// Default Gemini model used for audits
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Default Gemini REST API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default bind address for the audit service
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

/// Backend (Gemini) client configuration.
///
/// Passed explicitly into the analysis client at construction; there is no
/// ambient module-level credential.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API credential; `None` selects the demo fallback path
    pub api_key: Option<String>,
    /// Model identifier (e.g. "gemini-3-pro-preview")
    pub model: String,
    /// REST API base URL
    pub endpoint: String,
    /// Ceiling on the inline video payload, in bytes
    pub max_video_bytes: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_video_bytes: DEFAULT_MAX_VIDEO_BYTES,
        }
    }
}

/// Service configuration resolved from environment and TOML file.
#[derive(Debug, Clone)]
pub struct CivicConfig {
    pub gemini: GeminiConfig,
    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for CivicConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// On-disk TOML configuration (~/.config/civiclens/civiclens.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_endpoint: Option<String>,
    pub max_video_mb: Option<u64>,
    pub bind_addr: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file. Missing file yields defaults; a present
    /// but malformed file is a configuration error.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Malformed config file {}: {}", path.display(), e)))
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("civiclens").join("civiclens.toml"))
}

impl CivicConfig {
    /// Resolve configuration with ENV → TOML priority.
    ///
    /// A credential found in both sources logs a warning and the
    /// environment value wins. No credential at all is not an error: the
    /// service starts in demo mode.
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let env_key = non_empty(std::env::var("CIVICLENS_GEMINI_API_KEY").ok());
        let toml_key = non_empty(toml_config.gemini_api_key.clone());

        if env_key.is_some() && toml_key.is_some() {
            warn!(
                "Gemini API key found in both environment and TOML config. \
                 Using environment (highest priority)."
            );
        }

        let api_key = match (env_key, toml_key) {
            (Some(key), _) => {
                info!("Gemini API key loaded from environment variable");
                Some(key)
            }
            (None, Some(key)) => {
                info!("Gemini API key loaded from TOML config");
                Some(key)
            }
            (None, None) => None,
        };

        let model = non_empty(std::env::var("CIVICLENS_GEMINI_MODEL").ok())
            .or_else(|| non_empty(toml_config.gemini_model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let endpoint = non_empty(std::env::var("CIVICLENS_GEMINI_ENDPOINT").ok())
            .or_else(|| non_empty(toml_config.gemini_endpoint.clone()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let max_video_bytes = std::env::var("CIVICLENS_MAX_VIDEO_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .or(toml_config.max_video_mb)
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(DEFAULT_MAX_VIDEO_BYTES);

        let bind_addr = non_empty(std::env::var("CIVICLENS_BIND_ADDR").ok())
            .or_else(|| non_empty(toml_config.bind_addr.clone()))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            gemini: GeminiConfig {
                api_key,
                model,
                endpoint,
                max_video_bytes,
            },
            bind_addr,
        }
    }

    /// Load configuration from the default config file location plus
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let toml_config = match default_config_path() {
            Some(path) => TomlConfig::load_from(&path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::resolve(&toml_config))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "CIVICLENS_GEMINI_API_KEY",
            "CIVICLENS_GEMINI_MODEL",
            "CIVICLENS_GEMINI_ENDPOINT",
            "CIVICLENS_MAX_VIDEO_MB",
            "CIVICLENS_BIND_ADDR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        clear_env();
        let config = CivicConfig::resolve(&TomlConfig::default());
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.max_video_bytes, DEFAULT_MAX_VIDEO_BYTES);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml() {
        clear_env();
        std::env::set_var("CIVICLENS_GEMINI_API_KEY", "env-key");
        let toml_config = TomlConfig {
            gemini_api_key: Some("toml-key".to_string()),
            ..Default::default()
        };
        let config = CivicConfig::resolve(&toml_config);
        assert_eq!(config.gemini.api_key.as_deref(), Some("env-key"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_toml_used_when_env_absent() {
        clear_env();
        let toml_config = TomlConfig {
            gemini_api_key: Some("toml-key".to_string()),
            gemini_model: Some("gemini-test".to_string()),
            max_video_mb: Some(5),
            bind_addr: Some("127.0.0.1:9999".to_string()),
            ..Default::default()
        };
        let config = CivicConfig::resolve(&toml_config);
        assert_eq!(config.gemini.api_key.as_deref(), Some("toml-key"));
        assert_eq!(config.gemini.model, "gemini-test");
        assert_eq!(config.gemini.max_video_bytes, 5 * 1024 * 1024);
        assert_eq!(config.bind_addr, "127.0.0.1:9999");
    }

    #[test]
    #[serial]
    fn test_whitespace_key_treated_as_absent() {
        clear_env();
        std::env::set_var("CIVICLENS_GEMINI_API_KEY", "   ");
        let config = CivicConfig::resolve(&TomlConfig::default());
        assert!(config.gemini.api_key.is_none());
        clear_env();
    }

    #[test]
    fn test_toml_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("civiclens.toml");
        std::fs::write(&path, "gemini_api_key = \"file-key\"\nmax_video_mb = 10\n").unwrap();
        let toml_config = TomlConfig::load_from(&path).unwrap();
        assert_eq!(toml_config.gemini_api_key.as_deref(), Some("file-key"));
        assert_eq!(toml_config.max_video_mb, Some(10));
    }

    #[test]
    fn test_missing_toml_file_defaults() {
        let toml_config =
            TomlConfig::load_from(std::path::Path::new("/nonexistent/civiclens.toml")).unwrap();
        assert!(toml_config.gemini_api_key.is_none());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("civiclens.toml");
        std::fs::write(&path, "gemini_api_key = [not toml").unwrap();
        assert!(TomlConfig::load_from(&path).is_err());
    }
}
