use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trackline_core::EngineConfig;
use trackline_provider::ProviderConfig;

pub const CONFIG_FILE: &str = "trackline.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Reads and validates `path`. A missing or empty file means all defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: AppConfig = if content.trim().is_empty() {
        AppConfig::default()
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse yaml file: {}", path.display()))?
    };
    config
        .engine
        .validate()
        .with_context(|| format!("invalid engine settings in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "engine:\n  tick_interval_ms: 50\nprovider:\n  base_url: http://backend:9000\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.engine.tick_interval_ms, 50);
        assert_eq!(config.engine.search_debounce_ms, 300);
        assert_eq!(config.provider.base_url, "http://backend:9000");
        assert_eq!(config.provider.status_filter, "all");
    }

    #[test]
    fn invalid_engine_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "engine:\n  default_speed: 3\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("default_speed"));
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "engine: [unclosed\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
