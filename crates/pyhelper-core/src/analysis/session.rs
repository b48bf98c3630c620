//! Analysis session
//!
//! Holds on to the most recent issue collection so a statistics query right
//! after an analysis call can summarize it.

use crate::analysis::analyzer::CodeAnalyzer;
use crate::analysis::metrics::summarize;
use pyhelper_shared::{IssueCollection, Statistics};

/// Per-caller session over a shared analyzer
#[derive(Debug)]
pub struct AnalysisSession<'a> {
    analyzer: &'a CodeAnalyzer,
    last: Option<IssueCollection>,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(analyzer: &'a CodeAnalyzer) -> Self {
        Self {
            analyzer,
            last: None,
        }
    }

    /// Analyze source text, replacing the retained collection
    pub fn analyze(&mut self, code: &str) -> IssueCollection {
        let issues = self.analyzer.analyze(code);
        self.last = Some(issues.clone());
        issues
    }

    /// Most recent collection, if any analysis has run
    pub fn last_issues(&self) -> Option<&IssueCollection> {
        self.last.as_ref()
    }

    /// Statistics of the most recent collection; all zero before the first call
    pub fn statistics(&self) -> Statistics {
        self.last
            .as_ref()
            .map(|issues| summarize(issues.as_slice()))
            .unwrap_or_default()
    }
}
