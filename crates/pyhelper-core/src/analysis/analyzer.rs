//! Diagnostic collector for Python source
//!
//! This module walks a [`SyntaxTree`] once, breadth-first, and evaluates the
//! active [`RuleSet`] against every function and class it meets:
//! - excess complexity (`W0001`)
//! - missing docstring (`W0002`)
//! - missing parameter annotation (`I0001`)
//! - missing return annotation (`I0002`)
//!
//! A parse failure short-circuits the walk with a single `E0001` issue.

use crate::analysis::metrics::complexity;
use crate::analysis::parser::{
    FunctionSignature, NodeId, NodeKind, ParseFailure, PythonParser, SourceParser, SyntaxTree,
};
use crate::analysis::rules::RuleSet;
use crate::analysis::Analyzer;
use pyhelper_shared::{HelperError, Issue, IssueCollection, Result, Rule, Subject, SubjectKind};
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Code analyzer for Python source text
#[derive(Clone)]
pub struct CodeAnalyzer {
    parser: Arc<dyn SourceParser>,
    rules: RuleSet,
}

impl fmt::Debug for CodeAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAnalyzer")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl CodeAnalyzer {
    /// Create a new code analyzer with the default rule set
    pub fn new() -> Result<Self> {
        Ok(Self::with_parser(Arc::new(PythonParser::new()?), RuleSet::default()))
    }

    /// Create an analyzer over a specific parser and rule set
    pub fn with_parser(parser: Arc<dyn SourceParser>, rules: RuleSet) -> Self {
        Self { parser, rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn parser(&self) -> Arc<dyn SourceParser> {
        Arc::clone(&self.parser)
    }

    /// Parse and analyze source text; every call returns a fresh collection
    #[instrument(skip(self, code), fields(bytes = code.len()))]
    pub fn analyze(&self, code: &str) -> IssueCollection {
        match self.parser.parse(code) {
            Ok(tree) => self.analyze_tree(&tree),
            Err(failure) => {
                debug!("Reporting parse failure: {}", failure);
                IssueCollection::from(vec![syntax_error(&failure)])
            }
        }
    }

    /// Analyze an already parsed tree
    pub fn analyze_tree(&self, tree: &SyntaxTree) -> IssueCollection {
        let mut issues = IssueCollection::new();
        let mut queue = VecDeque::from([tree.root()]);

        while let Some(id) = queue.pop_front() {
            let node = tree.node(id);
            match &node.kind {
                NodeKind::Function(signature) => self.check_function(tree, id, signature, &mut issues),
                NodeKind::Class => self.check_class(tree, id, &mut issues),
                _ => {}
            }
            queue.extend(node.children.iter().copied());
        }

        debug!("Collected {} issue(s) from {} node(s)", issues.len(), tree.len());
        issues
    }

    fn check_function(
        &self,
        tree: &SyntaxTree,
        id: NodeId,
        signature: &FunctionSignature,
        issues: &mut IssueCollection,
    ) {
        let node = tree.node(id);
        let name = node.name.as_deref().unwrap_or_default();
        let subject = Subject::function(name);
        let raise = |rule: Rule, message: String| {
            Issue::new(rule, node.line, node.column, message).with_subject(subject.clone())
        };

        if self.rules.is_enabled(Rule::ExcessComplexity) {
            let score = complexity(tree, id);
            if score > self.rules.complexity_threshold() {
                issues.push(raise(
                    Rule::ExcessComplexity,
                    format!("Function '{}' is too complex ({})", name, score),
                ));
            }
        }

        if self.rules.is_enabled(Rule::MissingDocstring) && !tree.has_docstring(id) {
            issues.push(raise(Rule::MissingDocstring, missing_docstring(SubjectKind::Function, name)));
        }

        if self.rules.is_enabled(Rule::MissingParameterAnnotation) {
            let receiver = receiver_index(tree, id, signature);
            for (index, parameter) in signature.parameters.iter().enumerate() {
                if Some(index) == receiver || parameter.annotated {
                    continue;
                }
                issues.push(raise(
                    Rule::MissingParameterAnnotation,
                    format!("Parameter '{}' is missing a type annotation", parameter.name),
                ));
            }
        }

        if self.rules.is_enabled(Rule::MissingReturnAnnotation) && !signature.has_return_annotation {
            issues.push(raise(
                Rule::MissingReturnAnnotation,
                format!("Function '{}' is missing a return type annotation", name),
            ));
        }
    }

    fn check_class(&self, tree: &SyntaxTree, id: NodeId, issues: &mut IssueCollection) {
        if !self.rules.is_enabled(Rule::MissingDocstring) || tree.has_docstring(id) {
            return;
        }

        let node = tree.node(id);
        let name = node.name.as_deref().unwrap_or_default();
        issues.push(
            Issue::new(
                Rule::MissingDocstring,
                node.line,
                node.column,
                missing_docstring(SubjectKind::Class, name),
            )
            .with_subject(Subject::class(name)),
        );
    }
}

impl Analyzer for CodeAnalyzer {
    async fn analyze_file(&self, path: &Path) -> Result<IssueCollection> {
        debug!("Analyzing file: {}", path.display());

        if !path.exists() {
            return Err(HelperError::NotFound {
                resource: path.display().to_string(),
            });
        }

        let content = tokio::fs::read_to_string(path).await?;
        Ok(self.analyze(&content))
    }

    fn analyze_source(&self, code: &str) -> IssueCollection {
        self.analyze(code)
    }
}

/// Position of the structural receiver parameter, if the function has one.
///
/// Methods bind their first positional parameter to the instance or class,
/// unless decorated with `staticmethod`.
fn receiver_index(tree: &SyntaxTree, id: NodeId, signature: &FunctionSignature) -> Option<usize> {
    if !tree.is_method(id) || signature.has_decorator("staticmethod") {
        return None;
    }

    signature
        .parameters
        .first()
        .filter(|parameter| parameter.kind.is_positional())
        .map(|_| 0)
}

fn missing_docstring(kind: SubjectKind, name: &str) -> String {
    format!("{} '{}' is missing a docstring", kind, name)
}

fn syntax_error(failure: &ParseFailure) -> Issue {
    Issue::new(
        Rule::SyntaxError,
        failure.line.unwrap_or(0),
        failure.offset.unwrap_or(0),
        format!("Syntax error: {}", failure.message),
    )
}
