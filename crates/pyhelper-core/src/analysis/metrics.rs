//! Complexity scoring and issue statistics
//!
//! - Cyclomatic complexity of a function subtree
//! - Severity tally of an issue collection

use crate::analysis::parser::{NodeId, NodeKind, SyntaxTree};
use pyhelper_shared::{Issue, Statistics};

/// Cyclomatic complexity of the subtree rooted at `function`.
///
/// Starts at 1, adds 1 for every conditional, loop and exception handler, and
/// `k - 1` for every short-circuit expression with `k` operands. Decorators,
/// parameter defaults and annotations are part of the subtree.
pub fn complexity(tree: &SyntaxTree, function: NodeId) -> usize {
    let mut score = 1;
    let mut stack = vec![function];

    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        score += match node.kind {
            NodeKind::Conditional | NodeKind::Loop | NodeKind::ExceptHandler => 1,
            NodeKind::BoolOp { operands } => operands.saturating_sub(1),
            _ => 0,
        };
        stack.extend(node.children.iter().copied());
    }

    score
}

/// Tally issues by severity
pub fn summarize(issues: &[Issue]) -> Statistics {
    let mut stats = Statistics::default();
    for issue in issues {
        stats.record(issue.severity);
    }
    stats
}
