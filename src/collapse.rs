//! Duplicate library imports merged into one statement.
//!
//! Named imports of the same library module are grouped by exact module
//! path. The first statement of each group receives every group member's
//! bindings and the later statements are removed together with the line
//! break before them. Comments next to a removed statement survive unless
//! they trail it on the same line.
//!
//! Deprecated paths are left alone: another rule rewrites them first, and
//! the next pass collapses the result.

use std::collections::HashMap;

use rxmigrate_core::output::{Finding, RuleId};
use rxmigrate_core::patch::{Edit, Span};
use rxmigrate_core::text::skip_whitespace_back;
use rxmigrate_ts::{ImportView, SyntaxTree};

use crate::pass::PassContext;

pub const MESSAGE: &str = "duplicate RxJS import";

pub fn collapse_findings(cx: &PassContext<'_>) -> Vec<Finding> {
    let tree = cx.tree;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ImportView>> = HashMap::new();
    for import in tree.imports() {
        let eligible = import.named_bindings.is_some()
            && import.default_binding.is_none()
            && cx.paths.is_library_module(&import.module)
            && !cx.paths.is_deprecated(&import.module);
        if !eligible {
            continue;
        }
        let group = groups.entry(import.module.clone()).or_default();
        if group.is_empty() {
            order.push(import.module.clone());
        }
        group.push(import);
    }

    let mut findings = Vec::new();
    for module in order {
        let Some(group) = groups.remove(&module) else {
            continue;
        };
        if let Some(finding) = collapse_group(tree, &group) {
            tracing::debug!(module, statements = group.len(), "collapsing duplicate imports");
            findings.push(finding);
        }
    }
    findings
}

fn collapse_group(tree: &SyntaxTree, group: &[ImportView]) -> Option<Finding> {
    let (first, rest) = group.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let first_bindings = first.named_bindings?;

    let inner: Vec<&str> = group
        .iter()
        .filter_map(|import| import.named_bindings)
        .map(|bindings| braces_stripped(tree.text(bindings)))
        .filter(|inner| !inner.trim().is_empty())
        .collect();
    let mut edits = vec![Edit::replace(
        tree.span(first_bindings),
        format!("{{{}}}", inner.join(", ")),
    )];

    let source = tree.source();
    for import in rest {
        let span = tree.span(import.statement);
        let start = skip_whitespace_back(source, span.start);
        let end = trailing_comment_end(tree, span.end);
        edits.push(Edit::delete(Span::new(start, end)));
    }

    Some(Finding::new(
        RuleId::CollapseImports,
        tree.span(first.statement),
        MESSAGE,
        edits,
    ))
}

fn braces_stripped(text: &str) -> &str {
    let text = text.strip_prefix('{').unwrap_or(text);
    text.strip_suffix('}').unwrap_or(text)
}

/// End of the comments that follow `offset` on the same line.
fn trailing_comment_end(tree: &SyntaxTree, mut offset: usize) -> usize {
    let source = tree.source();
    for comment in tree.comments() {
        if comment.span.start < offset {
            continue;
        }
        let gap = &source[offset..comment.span.start];
        if !gap.chars().all(|c| c == ' ' || c == '\t') {
            break;
        }
        offset = comment.span.end;
    }
    offset
}
