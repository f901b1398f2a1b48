//! TOML-based application configuration.
//!
//! Stores:
//! - API base URL and optional request timeout
//! - Tag decoding fallback policy
//! - Sobriety test timings, counts and reference sentence
//! - Check-in thresholds and the locate deep link
//! - The user profile injected into every flow
//!
//! Configuration is stored at `~/.config/saferound/config.toml`.
//! `SAFEROUND_API_URL` overrides `api.base_url` at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

pub const API_URL_ENV: &str = "SAFEROUND_API_URL";

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Absent means the transport's own behaviour.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Tag decoding policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    #[serde(default = "default_dose_grams")]
    pub default_dose_grams: f64,
    #[serde(default = "default_fallback_id_max_chars")]
    pub fallback_id_max_chars: usize,
}

/// Sobriety test parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SobrietyConfig {
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
    #[serde(default = "default_steadiness_duration_ms")]
    pub steadiness_duration_ms: u64,
    #[serde(default = "default_steadiness_window")]
    pub steadiness_window: usize,
    #[serde(default = "default_reaction_taps")]
    pub reaction_taps: usize,
    #[serde(default = "default_reference_sentence")]
    pub reference_sentence: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
}

/// Dead-man's switch thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_due_after_secs")]
    pub due_after_secs: u64,
    /// Additional silence after DUE before escalating to LOCATE.
    #[serde(default = "default_locate_after_secs")]
    pub locate_after_secs: u64,
}

/// Third-party location app hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateConfig {
    #[serde(default = "default_app_uri")]
    pub app_uri: String,
    #[serde(default = "default_web_fallback_url")]
    pub web_fallback_url: String,
}

/// The local user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub emergency_contacts: Vec<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/saferound/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tag: TagConfig,
    #[serde(default)]
    pub sobriety: SobrietyConfig,
    #[serde(default)]
    pub checkin: CheckInConfig,
    #[serde(default)]
    pub locate: LocateConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_dose_grams() -> f64 {
    14.0
}
fn default_fallback_id_max_chars() -> usize {
    32
}
fn default_sample_period_ms() -> u64 {
    100
}
fn default_steadiness_duration_ms() -> u64 {
    10_000
}
fn default_steadiness_window() -> usize {
    300
}
fn default_reaction_taps() -> usize {
    5
}
fn default_reference_sentence() -> String {
    "The quick brown fox jumps over the lazy dog.".into()
}
fn default_viewport_width() -> f64 {
    390.0
}
fn default_viewport_height() -> f64 {
    844.0
}
fn default_tick_secs() -> u64 {
    10
}
fn default_due_after_secs() -> u64 {
    3 * 60
}
fn default_locate_after_secs() -> u64 {
    2 * 60
}
fn default_app_uri() -> String {
    "life360://".into()
}
fn default_web_fallback_url() -> String {
    "https://www.life360.com/".into()
}
fn default_user_id() -> String {
    "demo-user-1".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            default_dose_grams: default_dose_grams(),
            fallback_id_max_chars: default_fallback_id_max_chars(),
        }
    }
}

impl Default for SobrietyConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period_ms(),
            steadiness_duration_ms: default_steadiness_duration_ms(),
            steadiness_window: default_steadiness_window(),
            reaction_taps: default_reaction_taps(),
            reference_sentence: default_reference_sentence(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            due_after_secs: default_due_after_secs(),
            locate_after_secs: default_locate_after_secs(),
        }
    }
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            app_uri: default_app_uri(),
            web_fallback_url: default_web_fallback_url(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            first_name: None,
            last_name: None,
            phone: None,
            emergency_contacts: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional fields serialize as null; accept numbers for them too.
                    serde_json::Value::Null => match value.parse::<u64>() {
                        Ok(n) => serde_json::Value::Number(n.into()),
                        Err(_) => serde_json::Value::String(value.into()),
                    },
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_from(&Self::path()?)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|_| {
            let mut cfg = Self::default();
            cfg.apply_env();
            cfg
        })
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Call [`Config::save`] to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        let dose = updated.tag.default_dose_grams;
        if !dose.is_finite() || dose <= 0.0 {
            return Err(invalid(format!("dose must be a positive number, got {dose}")));
        }
        *self = updated;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.api.timeout_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tag.fallback_id_max_chars, 32);
        assert_eq!(parsed.checkin.due_after_secs, 180);
        assert!(parsed.api.timeout_secs.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[tag]\ndefault_dose_grams = 10.0\n").unwrap();
        assert_eq!(parsed.tag.default_dose_grams, 10.0);
        assert_eq!(parsed.tag.fallback_id_max_chars, 32);
        assert_eq!(parsed.sobriety.reaction_taps, 5);
        assert_eq!(parsed.profile.user_id, "demo-user-1");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("api.base_url").as_deref(), Some("http://localhost:8000"));
        assert_eq!(cfg.get("checkin.tick_secs").as_deref(), Some("10"));
        assert!(cfg.get("api.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("sobriety.reaction_taps", "7").unwrap();
        assert_eq!(cfg.sobriety.reaction_taps, 7);
    }

    #[test]
    fn set_fills_optional_timeout() {
        let mut cfg = Config::default();
        cfg.set("api.timeout_secs", "15").unwrap();
        assert_eq!(cfg.request_timeout(), Some(std::time::Duration::from_secs(15)));
    }

    #[test]
    fn set_updates_string() {
        let mut cfg = Config::default();
        cfg.set("profile.user_id", "alice").unwrap();
        assert_eq!(cfg.profile.user_id, "alice");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("api.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("", "x").is_err());
    }

    #[test]
    fn set_rejects_non_positive_dose() {
        let mut cfg = Config::default();
        for value in ["0", "-5", "-0.5"] {
            assert!(matches!(
                cfg.set("tag.default_dose_grams", value),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
        assert_eq!(cfg.tag.default_dose_grams, 14.0);
        cfg.set("tag.default_dose_grams", "10.5").unwrap();
        assert_eq!(cfg.tag.default_dose_grams, 10.5);
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.set("checkin.tick_secs", "soon");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg.checkin.tick_secs, 10);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.locate.app_uri, "life360://");
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.profile.emergency_contacts = vec!["+15550100".into()];
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.profile.emergency_contacts, vec!["+15550100".to_string()]);
    }
}
