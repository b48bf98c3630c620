//! Configuration model for pyhelper

use crate::error::{ConfigError, Result};
use crate::types::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable prefix, e.g. `PYHELPER__ANALYSIS__COMPLEXITY_THRESHOLD`
pub const ENV_PREFIX: &str = "PYHELPER";

/// Separator between nested keys in environment variables
pub const ENV_SEPARATOR: &str = "__";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for pyhelper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Diagnostic collection settings
    pub analysis: AnalysisConfig,

    /// Edit planning settings
    pub fix: FixConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Diagnostic collection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Complexity score above which W0001 is raised
    pub complexity_threshold: usize,

    /// Rules switched off, by code or name
    pub disabled_rules: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 10,
            disabled_rules: Vec::new(),
        }
    }
}

/// Edit planning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    /// Spaces per indentation unit for inserted lines
    pub indent_width: usize,

    /// Rules the fixer is allowed to act on
    pub fixable: Vec<String>,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            fixable: vec![Rule::MissingDocstring.code().to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl HelperConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        Self::build(Some(path), None)
    }

    /// Load configuration from an optional file, layered under `PYHELPER__*` variables
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
        }

        Self::build(path, None)
    }

    fn build(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("analysis.disabled_rules")
            .with_list_parse_key("fix.fixable")
            .source(env);

        let config: HelperConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be honored
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.analysis.complexity_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.complexity_threshold".to_string(),
                value: "0".to_string(),
            });
        }

        if !(1..=8).contains(&self.fix.indent_width) {
            return Err(ConfigError::InvalidValue {
                key: "fix.indent_width".to_string(),
                value: self.fix.indent_width.to_string(),
            });
        }

        for selector in &self.analysis.disabled_rules {
            let rule = Rule::from_selector(selector).ok_or_else(|| ConfigError::UnknownRule {
                selector: selector.clone(),
            })?;
            if rule == Rule::SyntaxError {
                return Err(ConfigError::UnsupportedRule {
                    code: rule.code().to_string(),
                    action: "disabled".to_string(),
                });
            }
        }

        for selector in &self.fix.fixable {
            let rule = Rule::from_selector(selector).ok_or_else(|| ConfigError::UnknownRule {
                selector: selector.clone(),
            })?;
            if rule != Rule::MissingDocstring {
                return Err(ConfigError::UnsupportedRule {
                    code: rule.code().to_string(),
                    action: "fixed".to_string(),
                });
            }
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Whether a rule is active; `E0001` always is
    pub fn is_rule_enabled(&self, rule: Rule) -> bool {
        if rule == Rule::SyntaxError {
            return true;
        }
        !self
            .analysis
            .disabled_rules
            .iter()
            .any(|selector| Rule::from_selector(selector) == Some(rule))
    }

    /// Rules currently active, in table order
    pub fn enabled_rules(&self) -> Vec<Rule> {
        Rule::ALL
            .into_iter()
            .filter(|rule| self.is_rule_enabled(*rule))
            .collect()
    }

    /// Whether the fixer may act on a rule
    pub fn is_fixable(&self, rule: Rule) -> bool {
        self.fix
            .fixable
            .iter()
            .any(|selector| Rule::from_selector(selector) == Some(rule))
    }
}
