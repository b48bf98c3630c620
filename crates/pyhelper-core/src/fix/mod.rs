//! Automatic fixes for collected issues
//!
//! This module provides:
//! - Planning of anchored edits from issues
//! - Descending-anchor application of edit batches
//! - The [`BugFixer`] front end, including file-scoped fixing

pub mod applier;
pub mod planner;

pub use applier::{apply, apply_tracked};
pub use planner::{Edit, EditBatch, EditKind, EditPlanner};

use crate::analysis::CodeAnalyzer;
use pyhelper_shared::{ConfigError, FixConfig, HelperError, Issue, Result, Rule};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// A fix that made it into the patched text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFix {
    /// Anchor line in the original text
    pub line: usize,
    pub description: String,
}

/// Result of a fix operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub patched_text: String,
    /// Applied fixes, in application order
    pub applied: Vec<AppliedFix>,
}

impl FixOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn summary(&self) -> FixSummary {
        FixSummary {
            total_fixes: self.applied.len(),
            fixes: self.applied.clone(),
        }
    }
}

/// Report of applied fixes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub total_fixes: usize,
    pub fixes: Vec<AppliedFix>,
}

/// Plans and applies fixes for fixable issues
#[derive(Debug, Clone)]
pub struct BugFixer {
    analyzer: CodeAnalyzer,
    planner: EditPlanner,
    fixable: Vec<Rule>,
}

impl BugFixer {
    /// Create a fixer with the default fix settings
    pub fn new(analyzer: CodeAnalyzer) -> Self {
        Self {
            analyzer,
            planner: EditPlanner::default(),
            fixable: vec![Rule::MissingDocstring],
        }
    }

    /// Create a fixer from fix settings
    pub fn with_config(analyzer: CodeAnalyzer, config: &FixConfig) -> Result<Self> {
        if !(1..=8).contains(&config.indent_width) {
            return Err(ConfigError::InvalidValue {
                key: "fix.indent_width".to_string(),
                value: config.indent_width.to_string(),
            }
            .into());
        }

        let mut fixable = Vec::new();
        for selector in &config.fixable {
            let rule = Rule::from_selector(selector).ok_or_else(|| ConfigError::UnknownRule {
                selector: selector.clone(),
            })?;
            if rule != Rule::MissingDocstring {
                return Err(ConfigError::UnsupportedRule {
                    code: rule.code().to_string(),
                    action: "fixed".to_string(),
                }
                .into());
            }
            fixable.push(rule);
        }

        Ok(Self {
            analyzer,
            planner: EditPlanner::new(config.indent_width),
            fixable,
        })
    }

    /// Restrict the fixer to a subset of its fixable rules
    pub fn only(mut self, rules: &[Rule]) -> Self {
        self.fixable.retain(|rule| rules.contains(rule));
        self
    }

    pub fn analyzer(&self) -> &CodeAnalyzer {
        &self.analyzer
    }

    pub fn fixable(&self) -> &[Rule] {
        &self.fixable
    }

    /// Plan edits for the fixable subset of `issues` and apply them to `code`
    #[instrument(skip(self, code, issues), fields(issues = issues.len()))]
    pub fn plan_and_apply(&self, code: &str, issues: &[Issue]) -> FixOutcome {
        let selected: Vec<Issue> = issues
            .iter()
            .filter(|issue| self.fixable.contains(&issue.code))
            .cloned()
            .collect();

        let batch = self.planner.plan(code, &selected);
        let (patched_text, applied) = apply_tracked(code, &batch);
        debug!("Applied {} fix(es)", applied.len());

        FixOutcome {
            patched_text,
            applied: applied
                .into_iter()
                .map(|edit| AppliedFix {
                    line: edit.anchor_line,
                    description: edit.description.clone(),
                })
                .collect(),
        }
    }

    /// Analyze `code` and fix everything fixable
    pub fn fix_code(&self, code: &str) -> FixOutcome {
        let issues = self.analyzer.analyze(code);
        self.plan_and_apply(code, issues.as_slice())
    }

    /// Fix a file in place, analyzing it first when no issues are given
    #[instrument(skip(self, issues))]
    pub async fn fix_file(&self, path: &Path, issues: Option<&[Issue]>) -> Result<FixOutcome> {
        if !path.exists() {
            return Err(HelperError::NotFound {
                resource: path.display().to_string(),
            });
        }

        let code = tokio::fs::read_to_string(path).await?;
        let outcome = match issues {
            Some(issues) => self.plan_and_apply(&code, issues),
            None => self.fix_code(&code),
        };

        if !outcome.is_unchanged() {
            tokio::fs::write(path, &outcome.patched_text).await?;
            info!(
                "Wrote {} fix(es) to {}",
                outcome.applied.len(),
                path.display()
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixer() -> BugFixer {
        BugFixer::new(CodeAnalyzer::new().unwrap())
    }

    #[test]
    fn test_docstring_matches_body_indentation() {
        let outcome = fixer().fix_code("def f():\n  return 1\n");
        assert_eq!(outcome.patched_text, "def f():\n  \"\"\"f function.\"\"\"\n  return 1\n");

        let after = fixer().analyzer().analyze(&outcome.patched_text);
        assert!(!after.has_errors());
    }

    #[test]
    fn test_fix_code_inserts_docstrings() {
        let code = "class A:\n    def m(self):\n        return 1\n";
        let outcome = fixer().fix_code(code);

        assert_eq!(
            outcome.patched_text,
            "class A:\n    \"\"\"A class.\"\"\"\n    def m(self):\n        \"\"\"m function.\"\"\"\n        return 1\n"
        );
        let lines: Vec<usize> = outcome.applied.iter().map(|fix| fix.line).collect();
        assert_eq!(lines, vec![2, 1]);
    }

    #[test]
    fn test_only_fixable_rules_are_planned() {
        let fixer = fixer().only(&[]);
        let outcome = fixer.fix_code("def f():\n    pass\n");
        assert!(outcome.is_unchanged());
        assert_eq!(outcome.patched_text, "def f():\n    pass\n");
    }

    #[test]
    fn test_with_config_validates() {
        let analyzer = CodeAnalyzer::new().unwrap();
        let config = FixConfig {
            indent_width: 2,
            fixable: vec!["missing-docstring".to_string()],
        };
        let fixer = BugFixer::with_config(analyzer.clone(), &config).unwrap();
        assert_eq!(
            fixer.fix_code("def f():\n  pass\n").patched_text,
            "def f():\n  \"\"\"f function.\"\"\"\n  pass\n"
        );

        let bad = FixConfig {
            indent_width: 4,
            fixable: vec!["I0002".to_string()],
        };
        assert!(matches!(
            BugFixer::with_config(analyzer.clone(), &bad),
            Err(HelperError::InvalidConfiguration { .. })
        ));

        let bad = FixConfig {
            indent_width: 0,
            ..Default::default()
        };
        assert!(BugFixer::with_config(analyzer, &bad).is_err());
    }

    #[test]
    fn test_summary() {
        let outcome = fixer().fix_code("def a():\n    pass\n\ndef b():\n    pass\n");
        let summary = outcome.summary();
        assert_eq!(summary.total_fixes, 2);
        assert_eq!(summary.fixes[0].description, "Added docstring to function 'b'");
    }

    #[tokio::test]
    async fn test_fix_file_writes_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("module.py");
        tokio::fs::write(&path, "def f():\n    pass\n").await.unwrap();

        let outcome = fixer().fix_file(&path, None).await.unwrap();
        assert_eq!(outcome.applied.len(), 1);

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "def f():\n    \"\"\"f function.\"\"\"\n    pass\n");
    }

    #[tokio::test]
    async fn test_fix_file_with_given_issues() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("module.py");
        tokio::fs::write(&path, "def f():\n    pass\n").await.unwrap();

        let no_issues: Vec<Issue> = Vec::new();
        let outcome = fixer().fix_file(&path, Some(no_issues.as_slice())).await.unwrap();
        assert!(outcome.is_unchanged());
        let untouched = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(untouched, "def f():\n    pass\n");
    }

    #[tokio::test]
    async fn test_fix_missing_file() {
        let result = fixer().fix_file(Path::new("/no/such/module.py"), None).await;
        assert!(matches!(result, Err(HelperError::NotFound { .. })));
    }
}
