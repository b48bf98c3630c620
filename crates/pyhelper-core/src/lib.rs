//! # pyhelper Core
//!
//! Core engine for pyhelper, a Python code analyzer with safe auto-fixing.
//!
//! This crate provides:
//! - Parsing Python source into a lowered syntax tree
//! - Diagnostic collection with a fixed rule table
//! - Cyclomatic complexity scoring
//! - Anchored edit planning and descending-anchor application
//! - Configuration management

pub mod analysis;
pub mod config;
pub mod engine;
pub mod fix;

// Re-export commonly used types
pub use pyhelper_shared::*;

pub use analysis::{AnalysisSession, Analyzer, CodeAnalyzer, PythonParser, RuleSet, SourceParser};
pub use config::{ConfigManager, ConfigValue};
pub use engine::HelperEngine;
pub use fix::{AppliedFix, BugFixer, Edit, EditBatch, EditPlanner, FixOutcome, FixSummary};

use std::path::Path;

/// Main facade for pyhelper
///
/// This is the primary interface for library users. It owns an engine and
/// forwards to its components.
#[derive(Debug)]
pub struct PyHelper {
    engine: HelperEngine,
}

impl PyHelper {
    /// Create a new instance from defaults and environment overrides
    pub fn new() -> Result<Self> {
        Ok(Self {
            engine: HelperEngine::new()?,
        })
    }

    /// Create a new instance with custom configuration
    pub fn with_config(config: HelperConfig) -> Result<Self> {
        Ok(Self {
            engine: HelperEngine::with_config(config)?,
        })
    }

    /// Create a new instance from a configuration file
    pub async fn from_config_file(path: &Path) -> Result<Self> {
        let manager = ConfigManager::from_file(path).await?;
        Self::with_config(manager.get_config().await)
    }

    /// Get the underlying engine
    pub fn engine(&self) -> &HelperEngine {
        &self.engine
    }

    /// Get mutable access to the underlying engine
    pub fn engine_mut(&mut self) -> &mut HelperEngine {
        &mut self.engine
    }

    /// Analyze source text
    pub fn analyze(&self, code: &str) -> IssueCollection {
        self.engine.analyzer().analyze(code)
    }

    /// Analyze a file
    pub async fn analyze_file(&self, path: &Path) -> Result<IssueCollection> {
        self.engine.analyzer().analyze_file(path).await
    }

    /// Fix the fixable subset of `issues` in `code`
    pub fn plan_and_apply(&self, code: &str, issues: &[Issue]) -> FixOutcome {
        self.engine.fixer().plan_and_apply(code, issues)
    }

    /// Analyze and fix source text
    pub fn fix_code(&self, code: &str) -> FixOutcome {
        self.engine.fixer().fix_code(code)
    }

    /// Fix a file in place
    pub async fn fix_file(&self, path: &Path, issues: Option<&[Issue]>) -> Result<FixOutcome> {
        self.engine.fixer().fix_file(path, issues).await
    }

    /// Tally issues by severity
    pub fn summarize(&self, issues: &[Issue]) -> Statistics {
        analysis::summarize(issues)
    }

    /// Start a session that remembers its latest analysis
    pub fn session(&self) -> AnalysisSession<'_> {
        self.engine.session()
    }

    /// Get current configuration
    pub fn config(&self) -> &HelperConfig {
        self.engine.config()
    }
}
