//! Run configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.pooldl/
//!   config.yaml
//! ```
//!
//! ```yaml
//! LOGIN: my_name
//! API_KEY: 0123456789abcdef
//! PREFETCH: true
//! ```
//!
//! Every key is optional. `POOLDL_*` environment variables override the
//! file. As in the rest of the workspace, path-deriving functions come in an
//! `_at(home, …)` form and a convenience form that uses `dirs::home_dir()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://e621.net";

/// Default identifying user agent.
pub const DEFAULT_USER_AGENT: &str =
    "e621 Pool Downloader (https://github.com/jacklul/e621-Pool-Downloader)";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Recognized configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub login: Option<String>,
    pub api_key: Option<String>,
    /// Batch-resolve post metadata before the per-post pass.
    pub prefetch: bool,
    pub api_url: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login: None,
            api_key: None,
            prefetch: true,
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Basic-auth credentials for post lookups and file downloads.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Credentials, when both login and API key are set and non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        let login = self.login.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let api_key = self.api_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(Credentials {
            login: login.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Apply `POOLDL_LOGIN`, `POOLDL_API_KEY`, `POOLDL_PREFETCH` and
    /// `POOLDL_API_URL` from `lookup`.
    ///
    /// Unparseable `POOLDL_PREFETCH` values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(login) = lookup("POOLDL_LOGIN") {
            self.login = Some(login);
        }
        if let Some(api_key) = lookup("POOLDL_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(raw) = lookup("POOLDL_PREFETCH") {
            match parse_bool(&raw) {
                Some(prefetch) => self.prefetch = prefetch,
                None => tracing::warn!("ignoring POOLDL_PREFETCH={raw:?}: not a boolean"),
            }
        }
        if let Some(url) = lookup("POOLDL_API_URL") {
            self.api_url = url;
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.pooldl/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".pooldl").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the config at an explicit file path. A missing file yields
/// [`Config::default`].
pub fn load_from(path: &Path) -> Result<Config, CoreError> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.pooldl/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, CoreError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, CoreError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.prefetch);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "LOGIN: alice\nAPI_KEY: secret\nPREFETCH: false\n").unwrap();

        let config = load_at(home.path()).unwrap();
        assert!(!config.prefetch);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        let creds = config.credentials().expect("credentials");
        assert_eq!(creds.login, "alice");
        assert_eq!(creds.api_key, "secret");
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = Config {
            login: Some("alice".into()),
            api_key: Some("  ".into()),
            ..Config::default()
        };
        assert!(config.credentials().is_none());
    }

    #[test]
    fn credentials_debug_redacts_key() {
        let creds = Credentials {
            login: "alice".into(),
            api_key: "secret".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("POOLDL_LOGIN", "bob"),
            ("POOLDL_API_KEY", "k"),
            ("POOLDL_PREFETCH", "off"),
            ("POOLDL_API_URL", "http://127.0.0.1:9"),
        ]));
        assert!(!config.prefetch);
        assert_eq!(config.api_url, "http://127.0.0.1:9");
        assert_eq!(config.credentials().unwrap().login, "bob");
    }

    #[test]
    fn bad_prefetch_env_is_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("POOLDL_PREFETCH", "maybe")]));
        assert!(config.prefetch);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "PREFETCH: [unclosed").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }
}
