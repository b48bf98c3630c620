//! End-to-end behavior of analysis and fixing

use pyhelper_core::analysis::{complexity, NodeKind, ParseFailure, SyntaxTree};
use pyhelper_core::fix::{apply, Edit, EditBatch, EditKind};
use pyhelper_core::{
    BugFixer, CodeAnalyzer, HelperConfig, PyHelper, PythonParser, Rule, RuleSet, Severity,
    SourceParser,
};
use std::sync::Arc;

fn helper() -> PyHelper {
    PyHelper::with_config(HelperConfig::default()).unwrap()
}

fn first_function_complexity(source: &str) -> usize {
    let tree = PythonParser::new().unwrap().parse(source).unwrap();
    let function = tree
        .descendants(tree.root())
        .into_iter()
        .find(|id| matches!(tree.node(*id).kind, NodeKind::Function(_)))
        .unwrap();
    complexity(&tree, function)
}

fn insert(anchor_line: usize, text: &str) -> Edit {
    Edit {
        anchor_line,
        inserted_text: text.to_string(),
        kind: EditKind::InsertAfterLine,
        description: text.to_string(),
    }
}

/// Applies edits one by one against the already mutated text
fn apply_in_sequence(text: &str, edits: &[&Edit]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    for edit in edits {
        lines.insert(edit.anchor_line, edit.inserted_text.clone());
    }
    lines.join("\n")
}

struct FailingParser;

impl SourceParser for FailingParser {
    fn parse(&self, _source: &str) -> Result<SyntaxTree, ParseFailure> {
        Err(ParseFailure {
            line: Some(2),
            offset: Some(5),
            message: "unexpected indent".to_string(),
        })
    }
}

#[test]
fn unclosed_construct_yields_single_error() {
    let issues = helper().analyze("def f(x):\n    return (x + 1\n\ndef g():\n    pass\n");

    assert_eq!(issues.len(), 1);
    let issue = &issues.as_slice()[0];
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.code, Rule::SyntaxError);
    assert!(issue.message.starts_with("Syntax error: "));
    assert!(issue.line >= 1);
}

#[test]
fn each_unclosed_or_empty_construct_yields_single_error() {
    let cases = [
        "values = [1, 2\nprint(values)\n",
        "table = {'a': 1\nprint(table)\n",
        "name = 'open\nprint(name)\n",
        "text = \"\"\"never closed\nprint(text)\n",
        "def f():\n",
        "class A:\n",
        "if ready:\n",
        "try:\n    run()\n",
    ];

    let helper = helper();
    for source in cases {
        let issues = helper.analyze(source);
        assert_eq!(issues.len(), 1, "{:?}", source);
        let issue = &issues.as_slice()[0];
        assert_eq!(issue.code, Rule::SyntaxError, "{:?}", source);
        assert_eq!(issue.severity, Severity::Error, "{:?}", source);
        assert!(issue.line >= 1, "{:?}", source);
    }
}

#[test]
fn recovered_invalid_python_is_a_syntax_error() {
    let cases = [
        ("print \"hello\"\n", 1),
        ("def f(a=1, b):\n    pass\n", 1),
        ("def f(x):\n  return x\n    y = 1\n", 3),
    ];

    let helper = helper();
    for (source, line) in cases {
        let issues = helper.analyze(source);
        assert_eq!(issues.len(), 1, "{:?}", source);
        assert_eq!(issues.as_slice()[0].code, Rule::SyntaxError, "{:?}", source);
        assert_eq!(issues.as_slice()[0].line, line, "{:?}", source);
    }
}

#[test]
fn header_expressions_count_toward_complexity() {
    assert_eq!(first_function_complexity("def f(x=a or b):\n    return x\n"), 2);
}

#[test]
fn structured_parse_failure_positions_are_reported() {
    let analyzer = CodeAnalyzer::with_parser(Arc::new(FailingParser), RuleSet::default());
    let issues = analyzer.analyze("whatever");

    assert_eq!(issues.len(), 1);
    let issue = &issues.as_slice()[0];
    assert_eq!((issue.line, issue.column), (2, 5));
    assert_eq!(issue.message, "Syntax error: unexpected indent");
}

#[test]
fn every_undocumented_definition_is_reported_at_its_line() {
    let code = "\
import os


class Config:
    path = os.sep

    def load(self) -> None:
        \"\"\"Load.\"\"\"

    def save(self) -> None:
        pass


@decorator
def helper() -> None:
    pass
";
    let issues = helper().analyze(code);
    let mut missing: Vec<(usize, String)> = issues
        .with_rule(Rule::MissingDocstring)
        .map(|issue| (issue.line, issue.subject.clone().unwrap().name))
        .collect();
    missing.sort();

    assert_eq!(
        missing,
        vec![
            (4, "Config".to_string()),
            (10, "save".to_string()),
            (15, "helper".to_string()),
        ]
    );
}

#[test]
fn annotation_issues_match_unannotated_parameters() {
    let code = "\
class Service:
    \"\"\"Service.\"\"\"

    def call(self, a: int, b, *args, c: str = '', **kwargs):
        \"\"\"Call.\"\"\"
";
    let issues = helper().analyze(code);

    let parameters: Vec<&str> = issues
        .with_rule(Rule::MissingParameterAnnotation)
        .map(|issue| issue.message.as_str())
        .collect();
    assert_eq!(
        parameters,
        vec![
            "Parameter 'b' is missing a type annotation",
            "Parameter 'args' is missing a type annotation",
            "Parameter 'kwargs' is missing a type annotation",
        ]
    );
    assert_eq!(issues.with_rule(Rule::MissingReturnAnnotation).count(), 1);
    assert_eq!(issues.len(), 4);
}

#[test]
fn two_parameter_function_yields_four_issues() {
    let issues = helper().analyze("def f(x,y):\n    return x+y\n");

    let codes: Vec<Rule> = issues.iter().map(|issue| issue.code).collect();
    assert_eq!(
        codes,
        vec![
            Rule::MissingDocstring,
            Rule::MissingParameterAnnotation,
            Rule::MissingParameterAnnotation,
            Rule::MissingReturnAnnotation,
        ]
    );

    let stats = helper().summarize(issues.as_slice());
    assert_eq!(stats.total, 4);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.info, 3);
}

#[test]
fn complexity_counts_branches_not_nesting() {
    let base = "def f(a, b):\n    return a\n";
    let one_if = "def f(a, b):\n    if a:\n        return a\n    return b\n";
    let two_ifs = "def f(a, b):\n    if a:\n        return a\n    if b:\n        return b\n";
    let nested = "def f(a, b):\n    if a:\n        if b:\n            return b\n    return a\n";
    let loop_and_handler =
        "def f(a, b):\n    for x in a:\n        try:\n            pass\n        except OSError:\n            pass\n";
    let short_circuit = "def f(a, b):\n    return a or b or a or b\n";

    assert_eq!(first_function_complexity(base), 1);
    assert_eq!(first_function_complexity(one_if), 2);
    assert_eq!(first_function_complexity(two_ifs), 3);
    assert_eq!(first_function_complexity(nested), 3);
    assert_eq!(first_function_complexity(loop_and_handler), 3);
    assert_eq!(first_function_complexity(short_circuit), 4);
}

#[test]
fn five_sequential_ifs_stay_under_threshold() {
    let mut code = String::from("def f(x: int) -> int:\n    \"\"\"F.\"\"\"\n");
    for i in 0..5 {
        code.push_str(&format!("    if x == {}:\n        return {}\n", i, i));
    }
    code.push_str("    return x\n");

    assert_eq!(first_function_complexity(&code), 6);
    assert_eq!(helper().analyze(&code).with_rule(Rule::ExcessComplexity).count(), 0);
}

#[test]
fn only_descending_application_places_edits_correctly() {
    let text = (1..=12)
        .map(|n| format!("line{}", n))
        .collect::<Vec<_>>()
        .join("\n");

    let e10 = insert(10, "after-10");
    let e7a = insert(7, "after-7a");
    let e7b = insert(7, "after-7b");
    let e3 = insert(3, "after-3");
    let batch: EditBatch = vec![e10.clone(), e7a.clone(), e7b.clone(), e3.clone()]
        .into_iter()
        .collect();

    let expected = "line1\nline2\nline3\nafter-3\nline4\nline5\nline6\nline7\nafter-7a\nafter-7b\n\
line8\nline9\nline10\nafter-10\nline11\nline12";
    assert_eq!(apply(&text, &batch), expected);

    let ascending = apply_in_sequence(&text, &[&e3, &e7a, &e7b, &e10]);
    assert_ne!(ascending, expected);

    let mixed = apply_in_sequence(&text, &[&e7a, &e3, &e10, &e7b]);
    assert_ne!(mixed, expected);
}

#[test]
fn fixes_do_not_disturb_other_definitions() {
    let code = "\
class Outer:
    def first(self):
        return 1

    def second(self):
        return 2
";
    let helper = helper();
    let issues = helper.analyze(code);
    let outcome = helper.plan_and_apply(code, issues.as_slice());

    assert_eq!(
        outcome.patched_text,
        "\
class Outer:
    \"\"\"Outer class.\"\"\"
    def first(self):
        \"\"\"first function.\"\"\"
        return 1

    def second(self):
        \"\"\"second function.\"\"\"
        return 2
"
    );
    let lines: Vec<usize> = outcome.applied.iter().map(|fix| fix.line).collect();
    assert_eq!(lines, vec![5, 2, 1]);

    let after = helper.analyze(&outcome.patched_text);
    assert_eq!(after.with_rule(Rule::MissingDocstring).count(), 0);
}

#[test]
fn fixing_complete_source_is_a_no_op() {
    let code = "\
\"\"\"Module.\"\"\"


def add(x: int, y: int) -> int:
    \"\"\"Add.\"\"\"
    return x + y
";
    let helper = helper();
    let issues = helper.analyze(code);
    let outcome = helper.plan_and_apply(code, issues.as_slice());

    assert!(outcome.applied.is_empty());
    assert_eq!(outcome.patched_text, code);
}

#[test]
fn second_fix_pass_changes_nothing() {
    let fixer = BugFixer::new(CodeAnalyzer::new().unwrap());
    let first = fixer.fix_code("def f():\n    pass\n\nclass C:\n    x = 1\n");
    assert_eq!(first.applied.len(), 2);

    let second = fixer.fix_code(&first.patched_text);
    assert!(second.applied.is_empty());
    assert_eq!(second.patched_text, first.patched_text);
}

#[test]
fn session_statistics_track_latest_analysis() {
    let helper = helper();
    let mut session = helper.session();

    session.analyze("def f(x,y):\n    return x+y\n");
    assert_eq!(session.statistics().total, 4);

    session.analyze("\"\"\"Clean.\"\"\"\n");
    assert_eq!(session.statistics().total, 0);
}
