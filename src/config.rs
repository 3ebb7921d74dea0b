//! Service configuration.
//!
//! Settings come from three layers, later ones winning:
//!   1. built-in defaults,
//!   2. an optional TOML file (`ecosystem.toml` unless a path is given),
//!   3. environment variables, with `.env` loaded first via `dotenv`.
//!
//! Backend credentials are usually only present in the environment:
//! `SUPABASE_URL` / `SUPABASE_ANON_KEY`, or their `VITE_`-prefixed forms
//! shared with a front-end build. `DATABASE_URL` points the change feed at
//! the underlying PostgreSQL instance.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::logging::LogLevel;
use crate::model::BackendError;

pub const DEFAULT_CONFIG_PATH: &str = "ecosystem.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub realtime: RealtimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: Option<String>,
    /// Public (anon) API key.
    pub anon_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL and key, or a configuration error naming the variables to set.
    pub fn credentials(&self) -> Result<(&str, &str), BackendError> {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Ok((url.trim_end_matches('/'), key))
            }
            _ => Err(BackendError::Config(
                "backend is not configured. Please set SUPABASE_URL and SUPABASE_ANON_KEY \
                 (or VITE_SUPABASE_URL and VITE_SUPABASE_ANON_KEY)"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// PostgreSQL connection string for LISTEN/NOTIFY.
    pub database_url: Option<String>,
    /// NOTIFY channel the change triggers publish on.
    pub channel: String,
    /// Upper bound on delivered change batches per second; 0 disables the cap.
    pub events_per_second: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            channel: "company_changes".to_string(),
            events_per_second: 5,
        }
    }
}

impl RealtimeConfig {
    pub fn database_url(&self) -> Result<&str, BackendError> {
        self.database_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                BackendError::Config("change feed needs DATABASE_URL to be set".to_string())
            })
    }

    /// Minimum spacing between two delivered batches.
    pub fn min_interval(&self) -> Duration {
        if self.events_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.events_per_second
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    /// Configured level; unrecognized values fall back to `Info`.
    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.level).unwrap_or(LogLevel::Info)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, BackendError> {
        toml::from_str(text).map_err(|e| BackendError::Config(format!("invalid config file: {}", e)))
    }

    /// Loads `.env`, the TOML file and environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, BackendError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, BackendError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BackendError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies environment overrides using `lookup` (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = first_set(&lookup, &["VITE_SUPABASE_URL", "SUPABASE_URL"]) {
            self.backend.url = Some(url);
        }
        if let Some(key) = first_set(&lookup, &["VITE_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"]) {
            self.backend.anon_key = Some(key);
        }
        if let Some(db) = first_set(&lookup, &["DATABASE_URL"]) {
            self.realtime.database_url = Some(db);
        }
    }
}

fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.realtime.channel, "company_changes");
        assert_eq!(config.realtime.events_per_second, 5);
        assert_eq!(config.realtime.min_interval(), Duration::from_millis(200));
        assert_eq!(config.logging.level(), LogLevel::Info);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [backend]
            url = "https://demo.supabase.co/"

            [realtime]
            events_per_second = 0
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.backend.url.as_deref(), Some("https://demo.supabase.co/"));
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.realtime.channel, "company_changes");
        assert_eq!(config.realtime.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[backend\nurl = 3").unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_toml_str("[backend]\nurl = \"https://file.example\"").unwrap();
        config.apply_env(env(&[
            ("SUPABASE_URL", "https://env.example"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("DATABASE_URL", "postgres://localhost/eco"),
        ]));
        assert_eq!(config.backend.credentials().unwrap(), ("https://env.example", "anon"));
        assert_eq!(config.realtime.database_url().unwrap(), "postgres://localhost/eco");
    }

    #[test]
    fn test_vite_prefixed_variables_take_precedence() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("SUPABASE_URL", "https://plain.example"),
            ("VITE_SUPABASE_URL", "https://vite.example"),
            ("SUPABASE_ANON_KEY", "plain-key"),
        ]));
        assert_eq!(config.backend.url.as_deref(), Some("https://vite.example"));
        assert_eq!(config.backend.anon_key.as_deref(), Some("plain-key"));
    }

    #[test]
    fn test_missing_credentials_name_the_variables() {
        let err = Config::default().backend.credentials().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SUPABASE_URL"), "got: {}", message);
        assert!(message.contains("SUPABASE_ANON_KEY"), "got: {}", message);
    }

    #[test]
    fn test_credentials_strip_trailing_slash() {
        let mut config = Config::default();
        config.backend.url = Some("https://demo.supabase.co/".into());
        config.backend.anon_key = Some("k".into());
        assert_eq!(config.backend.credentials().unwrap().0, "https://demo.supabase.co");
    }

    #[test]
    fn test_missing_database_url_is_config_error() {
        assert!(matches!(
            RealtimeConfig::default().database_url(),
            Err(BackendError::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/ecosystem.toml"))).unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecosystem.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\ntimestamps = true\n").unwrap();
        let config = Config::load(Some(&path)).expect("config file should load");
        assert_eq!(config.logging.level(), LogLevel::Debug);
        assert!(config.logging.timestamps);
    }
}
