//! Python parsing and syntax tree
//!
//! This module turns Python source text into a compact, read-only [`SyntaxTree`]:
//! - tree-sitter concrete syntax is lowered into an arena of [`SyntaxNode`]s
//! - function signatures are resolved up front (parameters, annotations, decorators)
//! - the first syntax error is reported as a structured [`ParseFailure`], including
//!   constructs the grammar recovers from but Python rejects (empty blocks, stray
//!   indentation, Python 2 statements, misordered defaults)
//!
//! Every walk in here uses an explicit stack, so deeply nested input cannot exhaust
//! the call stack.

use pyhelper_shared::{HelperError, Result};
use std::fmt;
use tracing::debug;
use tree_sitter::{Node, Parser};

/// Index of a node inside a [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// How a parameter can be passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    PositionalOnly,
    Positional,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    /// Whether the parameter can be bound by position (and so can be a receiver)
    pub fn is_positional(self) -> bool {
        matches!(self, ParameterKind::PositionalOnly | ParameterKind::Positional)
    }
}

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub annotated: bool,
    pub kind: ParameterKind,
}

/// Signature details of a function definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSignature {
    pub is_async: bool,
    /// Decorator expressions without the leading `@`
    pub decorators: Vec<String>,
    /// Parameters in declaration order; `*` and `/` markers are not included
    pub parameters: Vec<Parameter>,
    pub has_return_annotation: bool,
}

impl FunctionSignature {
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|decorator| {
            let callee = decorator.split('(').next().unwrap_or(decorator).trim();
            callee == name || callee.rsplit('.').next() == Some(name)
        })
    }
}

/// Kind of a lowered syntax node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    Function(FunctionSignature),
    Class,
    /// `if` or `elif`
    Conditional,
    /// `for`, `async for` or `while`
    Loop,
    ExceptHandler,
    /// Short-circuit `and` / `or` chain
    BoolOp { operands: usize },
    /// Expression statement made of a plain string literal
    StringStatement { blank: bool },
    Other(&'static str),
}

impl NodeKind {
    pub fn is_definition(&self) -> bool {
        matches!(self, NodeKind::Function(_) | NodeKind::Class)
    }
}

/// A node of the lowered syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub name: Option<String>,
    /// Line number (1-based)
    pub line: usize,
    /// Column (0-based byte offset)
    pub column: usize,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// Arena-backed syntax tree; node 0 is the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    /// Create a tree holding only an empty module
    pub fn new() -> Self {
        Self {
            nodes: vec![SyntaxNode {
                kind: NodeKind::Module,
                name: None,
                line: 1,
                column: 0,
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a node as the last child of `parent`
    pub fn push(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: Option<String>,
        line: usize,
        column: usize,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SyntaxNode {
            kind,
            name,
            line,
            column,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Node ids of `id` and all its descendants, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            ordered.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }

        ordered
    }

    /// Whether a definition's body opens with a non-blank string literal
    pub fn has_docstring(&self, id: NodeId) -> bool {
        self.node(id)
            .children
            .first()
            .map(|first| matches!(self.node(*first).kind, NodeKind::StringStatement { blank: false }))
            .unwrap_or(false)
    }

    /// A function whose nearest enclosing definition is a class.
    ///
    /// Statements such as `if` or `try` between the class and the function do not
    /// change that.
    pub fn is_method(&self, id: NodeId) -> bool {
        if !matches!(self.node(id).kind, NodeKind::Function(_)) {
            return false;
        }

        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            match self.node(ancestor).kind {
                NodeKind::Class => return true,
                NodeKind::Function(_) | NodeKind::Module => return false,
                _ => current = self.parent(ancestor),
            }
        }
        false
    }
}

/// Structured parse failure reported by a [`SourceParser`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Line of the failure (1-based)
    pub line: Option<usize>,
    /// Offset within the line (1-based)
    pub offset: Option<usize>,
    pub message: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.offset) {
            (Some(line), Some(offset)) => write!(f, "{} at {}:{}", self.message, line, offset),
            (Some(line), None) => write!(f, "{} at line {}", self.message, line),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Source parser trait
#[cfg_attr(test, mockall::automock)]
pub trait SourceParser: Send + Sync {
    /// Parse source text into a syntax tree
    fn parse(&self, source: &str) -> std::result::Result<SyntaxTree, ParseFailure>;
}

/// tree-sitter backed Python parser
#[derive(Clone)]
pub struct PythonParser {
    language: tree_sitter::Language,
}

impl fmt::Debug for PythonParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PythonParser").finish_non_exhaustive()
    }
}

impl PythonParser {
    /// Create a parser, checking that the grammar loads
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| HelperError::Internal {
                message: format!("Failed to load Python grammar: {}", e),
            })?;

        Ok(Self { language })
    }
}

impl SourceParser for PythonParser {
    fn parse(&self, source: &str) -> std::result::Result<SyntaxTree, ParseFailure> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).map_err(|e| ParseFailure {
            line: None,
            offset: None,
            message: format!("grammar unavailable: {}", e),
        })?;

        let tree = parser.parse(source, None).ok_or_else(|| ParseFailure {
            line: None,
            offset: None,
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if let Some(failure) = first_syntax_error(root)
            .or_else(|| first_invalid_construct(root, source.as_bytes()))
        {
            debug!("Parse failed: {}", failure);
            return Err(failure);
        }

        let lowered = lower(root, source.as_bytes());
        debug!("Lowered {} syntax nodes", lowered.len());
        Ok(lowered)
    }
}

/// First ERROR or MISSING node in document order
fn first_syntax_error(root: Node<'_>) -> Option<ParseFailure> {
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("expected `{}`", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return Some(ParseFailure {
                line: Some(position.row + 1),
                offset: Some(position.column + 1),
                message,
            });
        }

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn failure_at(node: Node<'_>, message: impl Into<String>) -> ParseFailure {
    let position = node.start_position();
    ParseFailure {
        line: Some(position.row + 1),
        offset: Some(position.column + 1),
        message: message.into(),
    }
}

/// Statements and clauses that must own a body
const COMPOUND_STATEMENTS: &[&str] = &[
    "function_definition",
    "class_definition",
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "with_statement",
    "try_statement",
    "except_clause",
    "finally_clause",
    "case_clause",
];

/// First construct, in document order, that tree-sitter accepts but Python rejects
fn first_invalid_construct(root: Node<'_>, source: &[u8]) -> Option<ParseFailure> {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let children = named_children(node);

        if COMPOUND_STATEMENTS.contains(&node.kind())
            && !children.iter().any(|child| child.kind() == "block")
        {
            return Some(failure_at(node, "expected an indented block"));
        }

        let failure = match node.kind() {
            "module" => misaligned_statement(&children, Some(0), source),
            "block" if children.is_empty() => Some(failure_at(
                node.parent().unwrap_or(node),
                "expected an indented block",
            )),
            "block" => misaligned_statement(&children, None, source),
            "try_statement" => {
                let handled = children
                    .iter()
                    .any(|child| matches!(child.kind(), "except_clause" | "finally_clause"));
                (!handled).then(|| failure_at(node, "expected 'except' or 'finally' block"))
            }
            "print_statement" => Some(failure_at(node, "Missing parentheses in call to 'print'")),
            "exec_statement" => Some(failure_at(node, "Missing parentheses in call to 'exec'")),
            "parameters" | "lambda_parameters" => required_after_default(&children).map(|param| {
                failure_at(param, "parameter without a default follows parameter with a default")
            }),
            "string" => {
                let terminated = node
                    .child(node.child_count().saturating_sub(1))
                    .map(|last| last.kind() == "string_end")
                    .unwrap_or(false);
                (!terminated).then(|| failure_at(node, "unterminated string literal"))
            }
            _ => None,
        };

        if failure.is_some() {
            return failure;
        }
        stack.extend(children.into_iter().rev());
    }

    None
}

/// First statement opening a line at a column other than its siblings'.
///
/// `expected` pins the column; otherwise the first statement sets it.
fn misaligned_statement(
    statements: &[Node<'_>],
    expected: Option<usize>,
    source: &[u8],
) -> Option<ParseFailure> {
    let first = statements.first()?;
    let column = expected.unwrap_or(first.start_position().column);

    statements
        .iter()
        .filter(|statement| opens_line(**statement, source))
        .find(|statement| statement.start_position().column != column)
        .map(|statement| {
            let message = if statement.start_position().column > column {
                "unexpected indent"
            } else {
                "unindent does not match any outer indentation level"
            };
            failure_at(*statement, message)
        })
}

/// Whether only whitespace precedes `node` on its line
fn opens_line(node: Node<'_>, source: &[u8]) -> bool {
    let start = node.start_byte();
    let line_start = start.saturating_sub(node.start_position().column);
    source
        .get(line_start..start)
        .map(|prefix| prefix.iter().all(|&b| matches!(b, b' ' | b'\t' | b'\x0c')))
        .unwrap_or(false)
}

/// A required positional parameter declared after one with a default
fn required_after_default<'t>(entries: &[Node<'t>]) -> Option<Node<'t>> {
    let mut defaulted = false;

    for entry in entries {
        match entry.kind() {
            "default_parameter" | "typed_default_parameter" => defaulted = true,
            "identifier" | "tuple_pattern" if defaulted => return Some(*entry),
            "typed_parameter" => {
                let splat = entry
                    .named_child(0)
                    .map(|inner| {
                        matches!(inner.kind(), "list_splat_pattern" | "dictionary_splat_pattern")
                    })
                    .unwrap_or(false);
                if splat {
                    return None;
                }
                if defaulted {
                    return Some(*entry);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => return None,
            _ => {}
        }
    }

    None
}

struct Pending<'t> {
    node: Node<'t>,
    parent: NodeId,
    decorators: Vec<Node<'t>>,
}

/// Lower a tree-sitter module into a [`SyntaxTree`]
fn lower(root: Node<'_>, source: &[u8]) -> SyntaxTree {
    let mut tree = SyntaxTree::new();
    let mut stack: Vec<Pending<'_>> = Vec::new();
    push_children(&mut stack, named_children(root), tree.root());

    while let Some(Pending {
        node,
        parent,
        decorators,
    }) = stack.pop()
    {
        let line = node.start_position().row + 1;
        let column = node.start_position().column;

        match node.kind() {
            "block" => push_children(&mut stack, named_children(node), parent),
            "decorated_definition" => {
                let decorators = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() == "decorator")
                    .collect();
                if let Some(definition) = node.child_by_field_name("definition") {
                    stack.push(Pending {
                        node: definition,
                        parent,
                        decorators,
                    });
                }
            }
            "function_definition" => {
                let signature = function_signature(node, source, &decorators);
                let id = tree.push(
                    parent,
                    NodeKind::Function(signature),
                    field_text(node, "name", source),
                    line,
                    column,
                );
                // Lowered after the body, so the body stays first among the children
                let mut header = decorators;
                header.extend(node.child_by_field_name("parameters"));
                header.extend(node.child_by_field_name("return_type"));
                push_children(&mut stack, header, id);
                push_body(&mut stack, node, id);
            }
            "class_definition" => {
                let id = tree.push(
                    parent,
                    NodeKind::Class,
                    field_text(node, "name", source),
                    line,
                    column,
                );
                push_body(&mut stack, node, id);
            }
            "boolean_operator" => {
                let operands = flatten_boolean(node);
                let id = tree.push(
                    parent,
                    NodeKind::BoolOp {
                        operands: operands.len(),
                    },
                    None,
                    line,
                    column,
                );
                push_children(&mut stack, operands, id);
            }
            "expression_statement" => {
                if let Some(blank) = docstring_literal(node, source) {
                    tree.push(parent, NodeKind::StringStatement { blank }, None, line, column);
                } else {
                    let id = tree.push(parent, NodeKind::Other(node.kind()), None, line, column);
                    push_children(&mut stack, named_children(node), id);
                }
            }
            kind => {
                let lowered = match kind {
                    "if_statement" | "elif_clause" => NodeKind::Conditional,
                    "for_statement" | "while_statement" => NodeKind::Loop,
                    "except_clause" => NodeKind::ExceptHandler,
                    other => NodeKind::Other(other),
                };
                let id = tree.push(parent, lowered, None, line, column);
                push_children(&mut stack, named_children(node), id);
            }
        }
    }

    tree
}

fn push_children<'t>(stack: &mut Vec<Pending<'t>>, children: Vec<Node<'t>>, parent: NodeId) {
    stack.extend(children.into_iter().rev().map(|node| Pending {
        node,
        parent,
        decorators: Vec::new(),
    }));
}

fn push_body<'t>(stack: &mut Vec<Pending<'t>>, definition: Node<'t>, id: NodeId) {
    if let Some(body) = definition.child_by_field_name("body") {
        push_children(stack, named_children(body), id);
    }
}

/// Named children, without comments and line continuations
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| text(child, source).to_string())
}

/// Operands of a same-operator `and`/`or` chain; parentheses stop the flattening
fn flatten_boolean(node: Node<'_>) -> Vec<Node<'_>> {
    let operator = node.child_by_field_name("operator").map(|op| op.kind());
    let mut operands = Vec::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        let same_chain = current.kind() == "boolean_operator"
            && current.child_by_field_name("operator").map(|op| op.kind()) == operator;

        if same_chain {
            if let Some(right) = current.child_by_field_name("right") {
                stack.push(right);
            }
            if let Some(left) = current.child_by_field_name("left") {
                stack.push(left);
            }
        } else {
            operands.push(current);
        }
    }

    operands
}

/// For a statement holding only a plain string literal, whether that literal is blank
fn docstring_literal(statement: Node<'_>, source: &[u8]) -> Option<bool> {
    let children = named_children(statement);
    let [expr] = children.as_slice() else {
        return None;
    };

    let mut expr = *expr;
    while expr.kind() == "parenthesized_expression" {
        expr = *named_children(expr).first()?;
    }

    let pieces = match expr.kind() {
        "string" => vec![expr],
        "concatenated_string" => named_children(expr),
        _ => return None,
    };

    let mut content = String::new();
    for piece in pieces {
        if piece.kind() != "string" {
            return None;
        }
        let mut raw = false;
        for part in named_children(piece) {
            match part.kind() {
                "string_start" => {
                    let prefix = text(part, source).trim_end_matches(['"', '\'']);
                    if prefix.chars().any(|c| matches!(c, 'f' | 'F' | 'b' | 'B' | 't' | 'T')) {
                        return None;
                    }
                    raw = prefix.contains(['r', 'R']);
                }
                "interpolation" => return None,
                "string_content" if raw => content.push_str(text(part, source)),
                "string_content" => push_unescaped(part, source, &mut content),
                _ => {}
            }
        }
    }

    Some(content.trim().is_empty())
}

/// Append string content with its escape sequences resolved
fn push_unescaped(part: Node<'_>, source: &[u8], content: &mut String) {
    let mut cursor = part.start_byte();
    for escape in named_children(part) {
        content.push_str(slice(source, cursor, escape.start_byte()));
        if escape.kind() == "escape_sequence" {
            content.extend(unescape(text(escape, source)));
        } else {
            content.push_str(text(escape, source));
        }
        cursor = escape.end_byte();
    }
    content.push_str(slice(source, cursor, part.end_byte()));
}

/// Character an escape sequence stands for; `None` for a line continuation
fn unescape(escape: &str) -> Option<char> {
    let body = escape.strip_prefix('\\')?;
    let decoded = match body.chars().next()? {
        '\n' | '\r' => return None,
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'f' => '\x0c',
        'v' => '\x0b',
        'a' => '\x07',
        'b' => '\x08',
        'x' | 'u' | 'U' => u32::from_str_radix(&body[1..], 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER),
        '0'..='7' => u32::from_str_radix(body, 8)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER),
        other => other,
    };
    Some(decoded)
}

fn slice(source: &[u8], start: usize, end: usize) -> &str {
    source
        .get(start..end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .unwrap_or("")
}

fn function_signature(
    node: Node<'_>,
    source: &[u8],
    decorators: &[Node<'_>],
) -> FunctionSignature {
    let is_async = node
        .child(0)
        .map(|first| first.kind() == "async")
        .unwrap_or(false);

    let parameters = node
        .child_by_field_name("parameters")
        .map(|params| parameters(params, source))
        .unwrap_or_default();

    let decorators = decorators
        .iter()
        .filter_map(|decorator| decorator.named_child(0))
        .map(|expr| text(expr, source).to_string())
        .collect();

    FunctionSignature {
        is_async,
        decorators,
        parameters,
        has_return_annotation: node.child_by_field_name("return_type").is_some(),
    }
}

fn parameters(list: Node<'_>, source: &[u8]) -> Vec<Parameter> {
    let entries = named_children(list);
    let has_positional_marker = entries
        .iter()
        .any(|entry| entry.kind() == "positional_separator");

    let mut positional_only = has_positional_marker;
    let mut keyword_only = false;
    let mut parameters = Vec::new();

    for entry in entries {
        let (target, annotated) = match entry.kind() {
            "positional_separator" => {
                positional_only = false;
                continue;
            }
            "keyword_separator" => {
                keyword_only = true;
                continue;
            }
            "typed_parameter" => match entry.named_child(0) {
                Some(inner) => (inner, true),
                None => continue,
            },
            "typed_default_parameter" => (entry, true),
            _ => (entry, false),
        };

        let (name, kind) = match target.kind() {
            "list_splat_pattern" => {
                keyword_only = true;
                (splat_name(target, source), ParameterKind::VarPositional)
            }
            "dictionary_splat_pattern" => (splat_name(target, source), ParameterKind::VarKeyword),
            "default_parameter" | "typed_default_parameter" => (
                field_text(target, "name", source).unwrap_or_default(),
                positional_kind(positional_only, keyword_only),
            ),
            _ => (
                text(target, source).to_string(),
                positional_kind(positional_only, keyword_only),
            ),
        };

        parameters.push(Parameter {
            name,
            annotated,
            kind,
        });
    }

    parameters
}

fn positional_kind(positional_only: bool, keyword_only: bool) -> ParameterKind {
    if keyword_only {
        ParameterKind::KeywordOnly
    } else if positional_only {
        ParameterKind::PositionalOnly
    } else {
        ParameterKind::Positional
    }
}

fn splat_name(pattern: Node<'_>, source: &[u8]) -> String {
    pattern
        .named_child(0)
        .map(|inner| text(inner, source).to_string())
        .unwrap_or_else(|| text(pattern, source).trim_start_matches('*').to_string())
}
