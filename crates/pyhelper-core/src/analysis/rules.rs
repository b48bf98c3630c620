//! Active rule set for diagnostic collection

use pyhelper_shared::{AnalysisConfig, ConfigError, Rule};

/// Default complexity threshold for `W0001`
pub const DEFAULT_COMPLEXITY_THRESHOLD: usize = 10;

/// Rules evaluated by the collector, plus their tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    enabled: Vec<Rule>,
    complexity_threshold: usize,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            enabled: Rule::ALL.to_vec(),
            complexity_threshold: DEFAULT_COMPLEXITY_THRESHOLD,
        }
    }
}

impl RuleSet {
    /// Build the rule set from analysis settings
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        if config.complexity_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.complexity_threshold".to_string(),
                value: "0".to_string(),
            });
        }

        let mut disabled = Vec::new();
        for selector in &config.disabled_rules {
            let rule = Rule::from_selector(selector).ok_or_else(|| ConfigError::UnknownRule {
                selector: selector.clone(),
            })?;
            if rule == Rule::SyntaxError {
                return Err(ConfigError::UnsupportedRule {
                    code: rule.code().to_string(),
                    action: "disabled".to_string(),
                });
            }
            disabled.push(rule);
        }

        Ok(Self {
            enabled: Rule::ALL
                .into_iter()
                .filter(|rule| !disabled.contains(rule))
                .collect(),
            complexity_threshold: config.complexity_threshold,
        })
    }

    pub fn is_enabled(&self, rule: Rule) -> bool {
        self.enabled.contains(&rule)
    }

    pub fn enabled(&self) -> &[Rule] {
        &self.enabled
    }

    pub fn complexity_threshold(&self) -> usize {
        self.complexity_threshold
    }
}
