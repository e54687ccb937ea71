//! Engine settings: JSON file plus `SQLMAPPER_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Environment id; part of every cache key.
    pub environment_id: String,
    /// Global switch for second-level (namespace) caches.
    pub cache_enabled: bool,
    /// When false the local cache only lives for a single statement.
    pub local_cache_enabled: bool,
    pub default_autocommit: bool,
    /// Install the SQL logging interceptor.
    pub log_sql: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment_id: "development".to_string(),
            cache_enabled: true,
            local_cache_enabled: true,
            default_autocommit: false,
            log_sql: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Settings {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> { Ok(serde_json::from_str(s)?) }

    /// Read a JSON settings file; a missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() { return Ok(Self::default()); }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// File settings (if any) with environment overrides applied on top.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> { Ok(Self::load(path)?.with_env_overrides()) }

    pub fn from_env() -> Self { Self::default().with_env_overrides() }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SQLMAPPER_ENVIRONMENT") {
            if !v.trim().is_empty() { self.environment_id = v.trim().to_string(); }
        }
        if let Some(b) = env_flag("SQLMAPPER_CACHE_ENABLED") { self.cache_enabled = b; }
        if let Some(b) = env_flag("SQLMAPPER_LOCAL_CACHE") { self.local_cache_enabled = b; }
        if let Some(b) = env_flag("SQLMAPPER_AUTOCOMMIT") { self.default_autocommit = b; }
        if let Some(b) = env_flag("SQLMAPPER_LOG_SQL") { self.log_sql = b; }
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
