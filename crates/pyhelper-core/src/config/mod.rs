//! Configuration Management
//!
//! This module handles configuration for pyhelper:
//! - Loading and saving configuration files
//! - Environment variable overrides
//! - Runtime configuration updates by key path

use pyhelper_shared::{HelperConfig, HelperError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Configuration file name looked up during discovery
pub const CONFIG_FILE_NAME: &str = "pyhelper.toml";

/// Configuration manager for pyhelper
#[derive(Debug)]
pub struct ConfigManager {
    /// Current configuration
    config: Arc<RwLock<HelperConfig>>,

    /// Configuration file path
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new(config: HelperConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            config_path: None,
        }
    }

    /// Create configuration manager from file
    #[instrument]
    pub async fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let config = HelperConfig::load_with_env(Some(path))?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Create with automatic configuration discovery
    #[instrument]
    pub async fn auto_discover() -> Result<Self> {
        debug!("Auto-discovering configuration");

        for path in Self::get_config_search_paths() {
            if path.exists() {
                debug!("Found configuration at: {}", path.display());
                return Self::from_file(path).await;
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::new(HelperConfig::load_with_env(None)?))
    }

    /// Path the configuration was loaded from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get current configuration (read-only)
    pub async fn get_config(&self) -> HelperConfig {
        self.config.read().await.clone()
    }

    /// Update configuration
    #[instrument(skip(self, new_config))]
    pub async fn update_config(&self, new_config: HelperConfig) -> Result<()> {
        info!("Updating configuration");

        new_config.validate()?;
        *self.config.write().await = new_config;

        if let Some(ref path) = self.config_path {
            self.save_to_file(path).await?;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// Save current configuration to file
    #[instrument(skip(self))]
    pub async fn save_to_file<P: AsRef<Path> + std::fmt::Debug>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Saving configuration to: {}", path.display());

        let config = self.config.read().await;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        config.save_to_file(path)?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Get configuration value by key path
    pub async fn get_value(&self, key_path: &str) -> Option<ConfigValue> {
        let config = self.config.read().await;
        Self::extract_value_by_path(&config, key_path)
    }

    /// Set configuration value by key path; the result must still validate
    #[instrument(skip(self, value))]
    pub async fn set_value(&self, key_path: &str, value: ConfigValue) -> Result<()> {
        debug!("Setting config value: {} = {:?}", key_path, value);

        let mut config = self.config.write().await;
        let mut updated = config.clone();
        Self::set_value_by_path(&mut updated, key_path, value)?;
        updated.validate()?;
        *config = updated;

        if let Some(ref path) = self.config_path {
            config.save_to_file(path)?;
        }

        Ok(())
    }

    /// Get configuration search paths
    fn get_config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".").join(CONFIG_FILE_NAME),
            PathBuf::from("./config").join(CONFIG_FILE_NAME),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pyhelper").join(CONFIG_FILE_NAME));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".pyhelper.toml"));
        }

        paths
    }

    /// Extract configuration value by dot-separated path
    fn extract_value_by_path(config: &HelperConfig, key_path: &str) -> Option<ConfigValue> {
        let parts: Vec<&str> = key_path.split('.').collect();

        match parts.as_slice() {
            ["analysis", "complexity_threshold"] => {
                Some(ConfigValue::Number(config.analysis.complexity_threshold as f64))
            }
            ["analysis", "disabled_rules"] => Some(string_array(&config.analysis.disabled_rules)),
            ["fix", "indent_width"] => Some(ConfigValue::Number(config.fix.indent_width as f64)),
            ["fix", "fixable"] => Some(string_array(&config.fix.fixable)),
            ["logging", "level"] => Some(ConfigValue::String(config.logging.level.clone())),
            ["logging", "json"] => Some(ConfigValue::Bool(config.logging.json)),
            _ => None,
        }
    }

    /// Set configuration value by dot-separated path
    fn set_value_by_path(config: &mut HelperConfig, key_path: &str, value: ConfigValue) -> Result<()> {
        let parts: Vec<&str> = key_path.split('.').collect();

        match (parts.as_slice(), value) {
            (["analysis", "complexity_threshold"], ConfigValue::Number(n)) => {
                config.analysis.complexity_threshold = whole_number(key_path, n)?;
            }
            (["analysis", "disabled_rules"], ConfigValue::Array(items)) => {
                config.analysis.disabled_rules = strings(key_path, items)?;
            }
            (["fix", "indent_width"], ConfigValue::Number(n)) => {
                config.fix.indent_width = whole_number(key_path, n)?;
            }
            (["fix", "fixable"], ConfigValue::Array(items)) => {
                config.fix.fixable = strings(key_path, items)?;
            }
            (["logging", "level"], ConfigValue::String(level)) => {
                config.logging.level = level;
            }
            (["logging", "json"], ConfigValue::Bool(json)) => {
                config.logging.json = json;
            }
            _ => {
                warn!("Rejected configuration path: {}", key_path);
                return Err(HelperError::Config {
                    message: format!("Unsupported configuration path: {}", key_path),
                });
            }
        }

        Ok(())
    }
}

fn string_array(values: &[String]) -> ConfigValue {
    ConfigValue::Array(values.iter().cloned().map(ConfigValue::String).collect())
}

fn whole_number(key_path: &str, n: f64) -> Result<usize> {
    if n.fract() != 0.0 || n < 0.0 || n > usize::MAX as f64 {
        return Err(HelperError::Config {
            message: format!("Expected a whole number for {}, got {}", key_path, n),
        });
    }
    Ok(n as usize)
}

fn strings(key_path: &str, items: Vec<ConfigValue>) -> Result<Vec<String>> {
    items
        .into_iter()
        .map(|item| match item {
            ConfigValue::String(s) => Ok(s),
            other => Err(HelperError::Config {
                message: format!("Expected strings for {}, got {}", key_path, other),
            }),
        })
        .collect()
}

/// Configuration value types
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    Number(f64),
    Array(Vec<ConfigValue>),
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Array(arr) => {
                write!(
                    f,
                    "[{}]",
                    arr.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_manager_creation() {
        let manager = ConfigManager::new(HelperConfig::default());

        let current_config = manager.get_config().await;
        assert_eq!(current_config.analysis.complexity_threshold, 10);
        assert!(manager.config_path().is_none());
    }

    #[tokio::test]
    async fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("pyhelper.toml");

        let mut config = HelperConfig::default();
        config.fix.indent_width = 2;
        let manager = ConfigManager::new(config);

        manager.save_to_file(&config_path).await.unwrap();
        assert!(config_path.exists());

        let loaded_manager = ConfigManager::from_file(&config_path).await.unwrap();
        let loaded_config = loaded_manager.get_config().await;
        assert_eq!(loaded_config.fix.indent_width, 2);
        assert_eq!(loaded_manager.config_path(), Some(config_path.as_path()));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let result = ConfigManager::from_file("/no/such/pyhelper.toml").await;
        assert!(matches!(result, Err(HelperError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_value_operations() {
        let manager = ConfigManager::new(HelperConfig::default());

        assert_eq!(
            manager.get_value("logging.level").await,
            Some(ConfigValue::String("info".to_string()))
        );
        assert_eq!(manager.get_value("nope.nothing").await, None);

        manager
            .set_value("logging.level", ConfigValue::String("debug".to_string()))
            .await
            .unwrap();
        manager
            .set_value("analysis.complexity_threshold", ConfigValue::Number(15.0))
            .await
            .unwrap();
        manager
            .set_value(
                "analysis.disabled_rules",
                ConfigValue::Array(vec![ConfigValue::String("I0001".to_string())]),
            )
            .await
            .unwrap();

        let updated_config = manager.get_config().await;
        assert_eq!(updated_config.logging.level, "debug");
        assert_eq!(updated_config.analysis.complexity_threshold, 15);
        assert_eq!(updated_config.analysis.disabled_rules, vec!["I0001"]);
    }

    #[tokio::test]
    async fn test_invalid_values_leave_config_untouched() {
        let manager = ConfigManager::new(HelperConfig::default());

        let result = manager
            .set_value("fix.indent_width", ConfigValue::Number(0.0))
            .await;
        assert!(matches!(result, Err(HelperError::InvalidConfiguration { .. })));

        let result = manager
            .set_value("fix.indent_width", ConfigValue::Number(2.5))
            .await;
        assert!(matches!(result, Err(HelperError::Config { .. })));

        let result = manager
            .set_value("logging.level", ConfigValue::Bool(true))
            .await;
        assert!(result.is_err());

        assert_eq!(manager.get_config().await, HelperConfig::default());
    }

    #[tokio::test]
    async fn test_update_config_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pyhelper.toml");
        HelperConfig::default().save_to_file(&config_path).unwrap();

        let manager = ConfigManager::from_file(&config_path).await.unwrap();
        let mut config = manager.get_config().await;
        config.logging.json = true;
        manager.update_config(config).await.unwrap();

        let reloaded = HelperConfig::load_from_file(&config_path).unwrap();
        assert!(reloaded.logging.json);
    }

    #[test]
    fn test_config_value_display() {
        let string_val = ConfigValue::String("test".to_string());
        assert_eq!(string_val.to_string(), "test");

        let bool_val = ConfigValue::Bool(true);
        assert_eq!(bool_val.to_string(), "true");

        let array_val = ConfigValue::Array(vec![
            ConfigValue::String("W0002".to_string()),
            ConfigValue::Number(4.0),
        ]);
        assert_eq!(array_val.to_string(), "[W0002, 4]");
    }
}
