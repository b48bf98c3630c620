//! Core types used throughout pyhelper

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a code issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Diagnostic rule; each rule owns exactly one code and one severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Rule {
    #[serde(rename = "E0001")]
    SyntaxError,
    #[serde(rename = "W0001")]
    ExcessComplexity,
    #[serde(rename = "W0002")]
    MissingDocstring,
    #[serde(rename = "I0001")]
    MissingParameterAnnotation,
    #[serde(rename = "I0002")]
    MissingReturnAnnotation,
}

impl Rule {
    /// Every rule, in table order
    pub const ALL: [Rule; 5] = [
        Rule::SyntaxError,
        Rule::ExcessComplexity,
        Rule::MissingDocstring,
        Rule::MissingParameterAnnotation,
        Rule::MissingReturnAnnotation,
    ];

    /// Stable issue code
    pub fn code(self) -> &'static str {
        match self {
            Rule::SyntaxError => "E0001",
            Rule::ExcessComplexity => "W0001",
            Rule::MissingDocstring => "W0002",
            Rule::MissingParameterAnnotation => "I0001",
            Rule::MissingReturnAnnotation => "I0002",
        }
    }

    /// Human-friendly rule name
    pub fn name(self) -> &'static str {
        match self {
            Rule::SyntaxError => "syntax-error",
            Rule::ExcessComplexity => "excess-complexity",
            Rule::MissingDocstring => "missing-docstring",
            Rule::MissingParameterAnnotation => "missing-parameter-annotation",
            Rule::MissingReturnAnnotation => "missing-return-annotation",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Rule::SyntaxError => Severity::Error,
            Rule::ExcessComplexity | Rule::MissingDocstring => Severity::Warning,
            Rule::MissingParameterAnnotation | Rule::MissingReturnAnnotation => Severity::Info,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rule::SyntaxError => "Source text could not be parsed",
            Rule::ExcessComplexity => "Function cyclomatic complexity exceeds the threshold",
            Rule::MissingDocstring => "Function or class body does not start with a docstring",
            Rule::MissingParameterAnnotation => "Function parameter has no type annotation",
            Rule::MissingReturnAnnotation => "Function has no return type annotation",
        }
    }

    /// Resolve a rule from its code (`W0002`) or its name (`missing-docstring`)
    pub fn from_selector(selector: &str) -> Option<Rule> {
        let selector = selector.trim();
        Rule::ALL.into_iter().find(|rule| {
            rule.code().eq_ignore_ascii_case(selector) || rule.name() == selector
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of definition an issue was raised against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Function,
    Class,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Function => write!(f, "Function"),
            SubjectKind::Class => write!(f, "Class"),
        }
    }
}

/// The definition node that triggered an issue, as recorded from the syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
}

impl Subject {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Function,
            name: name.into(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Class,
            name: name.into(),
        }
    }
}

/// Code issue detected during analysis
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Issue {
    /// Line of the triggering node (1-based, 0 when unknown)
    pub line: usize,
    /// Column of the triggering node (0-based byte offset)
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub code: Rule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
}

impl Issue {
    /// Create an issue; severity always follows the rule table
    pub fn new(code: Rule, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: code.severity(),
            code,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}] {}",
            self.line, self.column, self.severity, self.code, self.message
        )
    }
}

/// Ordered issues produced by a single analysis call
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct IssueCollection(Vec<Issue>);

impl IssueCollection {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, issue: Issue) {
        self.0.push(issue);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.0
    }

    /// Whether any error-severity issue is present
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|issue| issue.severity == Severity::Error)
    }

    /// Issues raised by a single rule, in collection order
    pub fn with_rule(&self, rule: Rule) -> impl Iterator<Item = &Issue> + '_ {
        self.0.iter().filter(move |issue| issue.code == rule)
    }
}

impl From<Vec<Issue>> for IssueCollection {
    fn from(issues: Vec<Issue>) -> Self {
        Self(issues)
    }
}

impl FromIterator<Issue> for IssueCollection {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for IssueCollection {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a IssueCollection {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl Statistics {
    /// Count one more issue of the given severity
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.info += 1,
        }
        self.total = self.errors + self.warnings + self.info;
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issue(s): {} error(s), {} warning(s), {} info",
            self.total, self.errors, self.warnings, self.info
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        assert_eq!(Rule::SyntaxError.severity(), Severity::Error);
        assert_eq!(Rule::MissingDocstring.code(), "W0002");
        assert_eq!(Rule::MissingParameterAnnotation.severity(), Severity::Info);

        let codes: std::collections::HashSet<_> = Rule::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), Rule::ALL.len());
    }

    #[test]
    fn test_rule_selector() {
        assert_eq!(Rule::from_selector("w0001"), Some(Rule::ExcessComplexity));
        assert_eq!(
            Rule::from_selector("missing-return-annotation"),
            Some(Rule::MissingReturnAnnotation)
        );
        assert_eq!(Rule::from_selector("X1234"), None);
    }

    #[test]
    fn test_issue_display_and_serde() {
        let issue = Issue::new(Rule::MissingDocstring, 10, 4, "Function 'f' is missing a docstring")
            .with_subject(Subject::function("f"));

        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(
            issue.to_string(),
            "10:4: warning[W0002] Function 'f' is missing a docstring"
        );

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "W0002");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["subject"]["name"], "f");
    }

    #[test]
    fn test_statistics_record() {
        let mut stats = Statistics::default();
        stats.record(Severity::Error);
        stats.record(Severity::Info);
        stats.record(Severity::Info);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.warnings, 0);
        assert_eq!(stats.info, 2);
    }
}
