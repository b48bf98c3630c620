//! Code analysis for Python source
//!
//! This module provides:
//! - Parsing into a lowered syntax tree
//! - Diagnostic collection against a rule set
//! - Complexity scoring and issue statistics
//! - Sessions that retain the latest result

pub mod analyzer;
pub mod metrics;
pub mod parser;
pub mod rules;
pub mod session;

// Re-export main types
pub use analyzer::CodeAnalyzer;
pub use metrics::{complexity, summarize};
pub use parser::{
    FunctionSignature, NodeId, NodeKind, Parameter, ParameterKind, ParseFailure, PythonParser,
    SourceParser, SyntaxNode, SyntaxTree,
};
pub use rules::RuleSet;
pub use session::AnalysisSession;

use pyhelper_shared::{IssueCollection, Result};
use std::path::Path;

/// Trait for analyzing Python code
pub trait Analyzer {
    /// Analyze a single file
    async fn analyze_file(&self, path: &Path) -> Result<IssueCollection>;

    /// Analyze in-memory source text
    fn analyze_source(&self, code: &str) -> IssueCollection;
}
