//! Core engine that wires the pyhelper components together

use crate::analysis::{AnalysisSession, CodeAnalyzer, PythonParser, RuleSet, SourceParser};
use crate::config::ConfigManager;
use crate::fix::BugFixer;
use pyhelper_shared::{HelperConfig, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Main engine that owns the parser, analyzer and fixer
///
/// Components are built eagerly, in dependency order, when the engine is
/// created. A bad configuration fails construction instead of surfacing later.
#[derive(Debug)]
pub struct HelperEngine {
    /// Configuration manager
    config_manager: Arc<ConfigManager>,

    /// Diagnostic collector
    analyzer: CodeAnalyzer,

    /// Edit planner and applier front end
    fixer: BugFixer,

    /// Current configuration
    config: HelperConfig,
}

impl HelperEngine {
    /// Create a new engine from defaults and `PYHELPER__*` environment overrides
    #[instrument]
    pub fn new() -> Result<Self> {
        info!("Initializing pyhelper engine with default configuration");

        let config = HelperConfig::load_with_env(None)?;
        Self::with_config(config)
    }

    /// Create a new engine with the provided configuration
    #[instrument(skip(config))]
    pub fn with_config(config: HelperConfig) -> Result<Self> {
        config.validate()?;

        let parser = Arc::new(PythonParser::new()?);
        debug!("Python parser ready");

        Self::with_parser(config, parser)
    }

    /// Create an engine over a specific parser
    #[instrument(skip(config, parser))]
    pub fn with_parser(config: HelperConfig, parser: Arc<dyn SourceParser>) -> Result<Self> {
        config.validate()?;

        let rules = RuleSet::from_config(&config.analysis)?;
        let analyzer = CodeAnalyzer::with_parser(parser, rules);
        debug!("Analyzer ready with {} rule(s)", analyzer.rules().enabled().len());

        let fixer = BugFixer::with_config(analyzer.clone(), &config.fix)?;
        debug!("Fixer ready for {} rule(s)", fixer.fixable().len());

        let config_manager = Arc::new(ConfigManager::new(config.clone()));

        info!("pyhelper engine initialized successfully");

        Ok(Self {
            config_manager,
            analyzer,
            fixer,
            config,
        })
    }

    /// Get the configuration manager
    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// Get the analyzer
    pub fn analyzer(&self) -> &CodeAnalyzer {
        &self.analyzer
    }

    /// Get the fixer
    pub fn fixer(&self) -> &BugFixer {
        &self.fixer
    }

    /// Get the current configuration
    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    /// Start a session that remembers its latest analysis
    pub fn session(&self) -> AnalysisSession<'_> {
        AnalysisSession::new(&self.analyzer)
    }

    /// Update configuration at runtime, rebuilding the affected components
    #[instrument(skip(self, new_config))]
    pub async fn update_config(&mut self, new_config: HelperConfig) -> Result<()> {
        info!("Updating pyhelper engine configuration");

        new_config.validate()?;

        let rules = RuleSet::from_config(&new_config.analysis)?;
        let analyzer = CodeAnalyzer::with_parser(self.analyzer.parser(), rules);
        let fixer = BugFixer::with_config(analyzer.clone(), &new_config.fix)?;

        self.config_manager.update_config(new_config.clone()).await?;

        self.analyzer = analyzer;
        self.fixer = fixer;
        self.config = new_config;

        info!("Configuration updated successfully");
        Ok(())
    }
}
