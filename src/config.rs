//! Configuration management
//!
//! Two layers: [`CheckerConfig`] is the persisted tool configuration (where
//! results live, which ffprobe to run), while [`Settings`] is the per-call
//! settings map handed over by the host for each operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{CheckerError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "IPTVChecker 1.0";

const APP_DIR: &str = "iptv_checker";
const RESULTS_FILE: &str = "iptv_checker_results.json";
const GROUPS_FILE: &str = "iptv_checker_groups.json";
const EXPORTS_DIR: &str = "exports";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_grace")]
    pub probe_grace_secs: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}
fn default_ffprobe() -> String { "ffprobe".to_string() }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_fetch_timeout() -> u64 { 30 }
fn default_grace() -> u64 { 5 }

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ffprobe_path: default_ffprobe(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout(),
            probe_grace_secs: default_grace(),
        }
    }
}

impl CheckerConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push("config.json");
        path
    }

    /// Load the saved config, falling back to defaults when absent or invalid
    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring invalid config {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Could not read config {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Config rooted at a specific data directory, other fields defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn results_file(&self) -> PathBuf {
        self.data_dir.join(RESULTS_FILE)
    }

    pub fn groups_file(&self) -> PathBuf {
        self.data_dir.join(GROUPS_FILE)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_DIR)
    }
}

/// Settings map as handed over by the host for each operation
pub type SettingsMap = HashMap<String, Value>;

/// Validated per-operation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub m3u_url: String,
    pub timeout_secs: u64,
    pub selected_groups: String,
}

impl Settings {
    /// Validate the settings needed by operations that fetch the playlist
    pub fn from_map(map: &SettingsMap) -> Result<Self> {
        let m3u_url = string_setting(map, "m3u_url");
        if m3u_url.is_empty() {
            return Err(CheckerError::MissingUrl);
        }
        if !m3u_url.starts_with("http://") && !m3u_url.starts_with("https://") {
            return Err(CheckerError::InvalidUrl(m3u_url));
        }

        Ok(Self {
            m3u_url,
            timeout_secs: timeout_setting(map)?,
            selected_groups: string_setting(map, "selected_groups"),
        })
    }
}

fn string_setting(map: &SettingsMap, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Read `timeout` as whole seconds; accepts numbers and numeric strings
pub fn timeout_setting(map: &SettingsMap) -> Result<u64> {
    match map.get("timeout") {
        None | Some(Value::Null) => Ok(DEFAULT_TIMEOUT_SECS),
        Some(Value::Number(n)) => {
            if let Some(secs) = n.as_u64() {
                Ok(secs)
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
                    _ => Err(CheckerError::InvalidTimeout(n.to_string())),
                }
            }
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(DEFAULT_TIMEOUT_SECS),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| CheckerError::InvalidTimeout(s.clone())),
        Some(other) => Err(CheckerError::InvalidTimeout(other.to_string())),
    }
}
