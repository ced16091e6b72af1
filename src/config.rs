// src/config.rs

//! Runtime settings.
//!
//! Read from `config.toml` in the platform config directory. Every field has
//! a default, so a partial file (or none at all) is fine. API keys can also
//! come from the environment, which wins over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::logging::project_directory;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Third-party credentials. A missing or blank key disables the collector
/// that needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub github_token: Option<String>,
    pub hibp: Option<String>,
    pub shodan: Option<String>,
    pub virustotal: Option<String>,
    pub safe_browsing: Option<String>,
    pub google_search: Option<String>,
    pub google_search_cx: Option<String>,
    pub hunter: Option<String>,
    pub veriphone: Option<String>,
}

pub const KEY_ENV_VARS: &[&str] = &[
    "GITHUB_TOKEN",
    "HIBP_API_KEY",
    "SHODAN_API_KEY",
    "VIRUSTOTAL_API_KEY",
    "GOOGLE_SAFE_BROWSING_KEY",
    "GOOGLE_SEARCH_API_KEY",
    "GOOGLE_SEARCH_CX",
    "HUNTER_API_KEY",
    "VERIPHONE_API_KEY",
];

impl ApiKeys {
    fn slot_for(&mut self, env_var: &str) -> Option<&mut Option<String>> {
        match env_var {
            "GITHUB_TOKEN" => Some(&mut self.github_token),
            "HIBP_API_KEY" => Some(&mut self.hibp),
            "SHODAN_API_KEY" => Some(&mut self.shodan),
            "VIRUSTOTAL_API_KEY" => Some(&mut self.virustotal),
            "GOOGLE_SAFE_BROWSING_KEY" => Some(&mut self.safe_browsing),
            "GOOGLE_SEARCH_API_KEY" => Some(&mut self.google_search),
            "GOOGLE_SEARCH_CX" => Some(&mut self.google_search_cx),
            "HUNTER_API_KEY" => Some(&mut self.hunter),
            "VERIPHONE_API_KEY" => Some(&mut self.veriphone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub collector_timeout_secs: u64,
    pub max_subdomains: usize,
    pub max_code_results: usize,
    pub user_agent: String,
    pub blocked_targets: Vec<String>,
    /// JSON-lines scan journal. Falls back to the data directory.
    pub scan_log_path: Option<PathBuf>,
    pub api_keys: ApiKeys,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collector_timeout_secs: 30,
            max_subdomains: 100,
            max_code_results: 50,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            blocked_targets: ["localhost", "127.0.0.1", "*.gov", "*.mil"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scan_log_path: None,
            api_keys: ApiKeys::default(),
        }
    }
}

impl Settings {
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs.max(1))
    }

    /// Loads the user's config file, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match default_config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults.");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config file.");
        Ok(settings)
    }

    /// Overrides API keys from `lookup`; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for &name in KEY_ENV_VARS {
            let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if let Some(slot) = self.api_keys.slot_for(name) {
                *slot = Some(value);
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    project_directory().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.collector_timeout(), Duration::from_secs(30));
        assert!(settings.blocked_targets.contains(&"*.mil".to_string()));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "collector_timeout_secs = 5\nmax_subdomains = 10\n\n[api_keys]\nshodan = \"abc\""
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.collector_timeout_secs, 5);
        assert_eq!(settings.max_subdomains, 10);
        assert_eq!(settings.max_code_results, 50);
        assert_eq!(settings.api_keys.shodan.as_deref(), Some("abc"));
        assert_eq!(settings.api_keys.hunter, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_subdomains = \"lots\"").unwrap();
        assert!(matches!(Settings::from_file(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn environment_overrides_keys() {
        let mut settings = Settings::default();
        settings.api_keys.virustotal = Some("from-file".into());
        settings.apply_env(|name| match name {
            "VIRUSTOTAL_API_KEY" => Some("from-env".into()),
            "HUNTER_API_KEY" => Some("   ".into()),
            "GOOGLE_SEARCH_CX" => Some("cx-1".into()),
            _ => None,
        });
        assert_eq!(settings.api_keys.virustotal.as_deref(), Some("from-env"));
        assert_eq!(settings.api_keys.hunter, None);
        assert_eq!(settings.api_keys.google_search_cx.as_deref(), Some("cx-1"));
    }
}
