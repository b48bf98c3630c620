//! Edit planning
//!
//! Turns missing-docstring issues into line-anchored insertions. Positions and
//! names come from the issue itself; the source line is only checked to still
//! look like the definition before an edit is planned for it.

use pyhelper_shared::{Issue, Rule, Subject, SubjectKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kind of textual edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Insert a new line directly after the anchor line
    InsertAfterLine,
}

/// A single anchored edit against the original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Line the edit is anchored to (1-based, in the original text)
    pub anchor_line: usize,
    /// Full text of the inserted line, indentation included
    pub inserted_text: String,
    pub kind: EditKind,
    pub description: String,
}

/// Edits awaiting application, in planning order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditBatch(Vec<Edit>);

impl EditBatch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, edit: Edit) {
        self.0.push(edit);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Edit] {
        &self.0
    }
}

impl FromIterator<Edit> for EditBatch {
    fn from_iter<I: IntoIterator<Item = Edit>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EditBatch {
    type Item = Edit;
    type IntoIter = std::vec::IntoIter<Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Plans docstring insertions for missing-docstring issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlanner {
    indent_width: usize,
}

impl Default for EditPlanner {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

impl EditPlanner {
    pub fn new(indent_width: usize) -> Self {
        Self {
            indent_width: indent_width.max(1),
        }
    }

    pub fn indent_width(&self) -> usize {
        self.indent_width
    }

    /// Plan one edit per eligible issue, highest line first.
    ///
    /// Issues sharing a line keep their relative order. Issues whose line no
    /// longer reads as the recorded definition are skipped.
    pub fn plan(&self, text: &str, issues: &[Issue]) -> EditBatch {
        let lines: Vec<&str> = text.split('\n').collect();

        let mut eligible: Vec<(&Issue, &Subject)> = issues
            .iter()
            .filter(|issue| issue.code == Rule::MissingDocstring)
            .filter_map(|issue| issue.subject.as_ref().map(|subject| (issue, subject)))
            .collect();
        eligible.sort_by(|a, b| b.0.line.cmp(&a.0.line));

        let mut batch = EditBatch::new();
        for (issue, subject) in eligible {
            let Some(line) = issue
                .line
                .checked_sub(1)
                .and_then(|index| lines.get(index))
                .map(|line| line.trim_end_matches('\r'))
            else {
                warn!("Skipping docstring for '{}': line {} out of range", subject.name, issue.line);
                continue;
            };

            if !is_definition_line(line, subject) {
                debug!(
                    "Skipping docstring for '{}': line {} is not a recognizable definition",
                    subject.name, issue.line
                );
                continue;
            }

            let indent = leading_whitespace(line);
            let prefix = body_indent(&lines[issue.line..], indent).unwrap_or_else(|| {
                let unit = if indent.contains('\t') {
                    "\t".to_string()
                } else {
                    " ".repeat(self.indent_width)
                };
                format!("{}{}", indent, unit)
            });
            let noun = noun(subject.kind);

            batch.push(Edit {
                anchor_line: issue.line,
                inserted_text: format!("{}\"\"\"{} {}.\"\"\"", prefix, subject.name, noun),
                kind: EditKind::InsertAfterLine,
                description: format!("Added docstring to {} '{}'", noun, subject.name),
            });
        }

        debug!("Planned {} edit(s)", batch.len());
        batch
    }
}

fn noun(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Function => "function",
        SubjectKind::Class => "class",
    }
}

fn leading_whitespace(line: &str) -> &str {
    let end = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..end]
}

/// Indentation of the first statement line following a definition header,
/// when it is nested deeper than the header itself
fn body_indent(following: &[&str], header_indent: &str) -> Option<String> {
    let first = following
        .iter()
        .map(|line| line.trim_end_matches('\r'))
        .find(|line| {
            let code = line.trim_start_matches([' ', '\t']);
            !code.is_empty() && !code.starts_with('#')
        })?;

    let indent = leading_whitespace(first);
    (indent.len() > header_indent.len() && indent.starts_with(header_indent))
        .then(|| indent.to_string())
}

/// Whether `line` opens the definition of `subject` and ends its header there
fn is_definition_line(line: &str, subject: &Subject) -> bool {
    let mut rest = line.trim_start_matches([' ', '\t']);

    let keyword = match subject.kind {
        SubjectKind::Function => {
            if let Some(after) = rest.strip_prefix("async") {
                if after.starts_with([' ', '\t']) {
                    rest = after.trim_start_matches([' ', '\t']);
                }
            }
            "def"
        }
        SubjectKind::Class => "class",
    };

    let Some(after_keyword) = rest.strip_prefix(keyword) else {
        return false;
    };
    if !after_keyword.starts_with([' ', '\t']) {
        return false;
    }

    let Some(after_name) = after_keyword
        .trim_start_matches([' ', '\t'])
        .strip_prefix(subject.name.as_str())
    else {
        return false;
    };
    if !after_name.starts_with(['(', '[', ':', ' ', '\t']) {
        return false;
    }

    let code = line.split('#').next().unwrap_or(line);
    code.trim_end().ends_with(':')
}
