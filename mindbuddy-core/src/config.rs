//! Configuration management
//!
//! settings.json in the data directory selects the storage backend:
//! ```json
//! {
//!   "app": { "backend": "api", "apiUrl": "http://localhost:3001" }
//! }
//! ```
//! Environment variables override the file, which makes CI and local
//! testing setups simple. When no backend is named explicitly, one is
//! inferred from which connection settings are present.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Storage backend selected once at startup, never switched at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Api,
    Baas,
    Local,
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    backend: Option<BackendKind>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    baas_url: Option<String>,
    #[serde(default)]
    baas_anon_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// MindBuddy configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub api_url: Option<String>,
    pub baas_url: Option<String>,
    pub baas_anon_key: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            api_url: None,
            baas_url: None,
            baas_anon_key: None,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory.
    ///
    /// Backend selection, highest priority first:
    /// 1. MINDBUDDY_BACKEND environment variable
    /// 2. "backend" in settings.json
    /// 3. Inferred from which connection settings are present
    ///    (apiUrl -> api, baasUrl -> baas, neither -> local)
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let api_url = std::env::var("MINDBUDDY_API_URL")
            .ok()
            .or_else(|| raw.app.api_url.clone());
        let baas_url = std::env::var("MINDBUDDY_BAAS_URL")
            .ok()
            .or_else(|| raw.app.baas_url.clone());
        let baas_anon_key = std::env::var("MINDBUDDY_BAAS_ANON_KEY")
            .ok()
            .or_else(|| raw.app.baas_anon_key.clone());

        let backend = match std::env::var("MINDBUDDY_BACKEND").ok().as_deref() {
            Some("api") => BackendKind::Api,
            Some("baas") => BackendKind::Baas,
            Some("local") => BackendKind::Local,
            _ => raw.app.backend.unwrap_or(if api_url.is_some() {
                BackendKind::Api
            } else if baas_url.is_some() {
                BackendKind::Baas
            } else {
                BackendKind::Local
            }),
        };

        Ok(Self {
            backend,
            api_url,
            baas_url,
            baas_anon_key,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory, preserving settings this
    /// library doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.backend = Some(self.backend);
        settings.app.api_url = self.api_url.clone();
        settings.app.baas_url = self.baas_url.clone();
        settings.app.baas_anon_key = self.baas_anon_key.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_to_local() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
    }

    #[test]
    fn test_backend_inferred_from_api_url() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "apiUrl": "http://localhost:3001" } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Api);
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:3001"));
    }

    #[test]
    fn test_explicit_backend_wins_over_inference() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "backend": "local", "apiUrl": "http://localhost:3001" } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
    }

    #[test]
    fn test_save_round_trip_preserves_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "theme": "pastel" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.backend = BackendKind::Baas;
        config.baas_url = Some("https://example.supabase.co".to_string());
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap())
                .unwrap();
        assert_eq!(raw["app"]["backend"], "baas");
        assert_eq!(raw["app"]["theme"], "pastel");
    }
}
