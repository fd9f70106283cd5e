//! Patched operator chains to `.pipe(...)`.
//!
//! A chain is a maximal left-to-right sequence of patched operator calls on
//! a stream, `src.a(x).b(y)`. Its root is the expression the first operator
//! is called on. The rewrite keeps every argument list byte for byte and
//! only touches the joints between them:
//!
//! ```text
//! foo.do(log).map(f).subscribe(g)
//! foo.pipe(tap(log), map(f)).subscribe(g)
//! ```
//!
//! Besides chains, the rule removes imports that only patch operators onto
//! the prototype (`rxjs/add/operator/*`, `rxjs/operator/*`).

use rxmigrate_core::output::{Finding, RuleId};
use rxmigrate_core::patch::{Edit, Span};
use rxmigrate_ts::{NodeId, NodeKind, SyntaxTree};

use crate::pass::PassContext;
use crate::registry::ImportRegistry;
use crate::stream::StreamTypes;
use crate::tables::{is_instance_operator, pipeable_name};

pub const MESSAGE: &str = "Prefer pipeable operators";

// ============================================================================
// Chain resolution
// ============================================================================

/// A resolved chain: its root expression and operator calls, innermost
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub root: NodeId,
    pub links: Vec<NodeId>,
}

/// Finds chains in one tree.
pub struct ChainResolver<'a> {
    tree: &'a SyntaxTree,
    streams: &'a StreamTypes<'a>,
    namespace: &'a str,
}

impl<'a> ChainResolver<'a> {
    pub fn new(tree: &'a SyntaxTree, streams: &'a StreamTypes<'a>, namespace: &'a str) -> Self {
        ChainResolver {
            tree,
            streams,
            namespace,
        }
    }

    /// A call of a patched operator on a stream.
    ///
    /// Optional calls (`a?.map(f)`) and calls on the namespace itself
    /// (`Observable.merge(a, b)`) are never operators.
    pub fn is_operator_call(&self, node: NodeId) -> bool {
        if self.tree.kind(node) != NodeKind::CallExpression {
            return false;
        }
        let Some((callee, _)) = self.tree.call_parts(node) else {
            return false;
        };
        let Some((object, name)) = self.tree.property_access_parts(callee) else {
            return false;
        };
        is_instance_operator(self.tree.text(name))
            && self.tree.text(object) != self.namespace
            && self.streams.returns_stream_like(node)
    }

    /// Receiver of an operator call.
    fn receiver(&self, call: NodeId) -> Option<NodeId> {
        let (callee, _) = self.tree.call_parts(call)?;
        let (object, _) = self.tree.property_access_parts(callee)?;
        Some(object)
    }

    /// The chain headed by `node`, when `node` is the first operator call
    /// of one.
    pub fn chain_at(&self, node: NodeId) -> Option<Chain> {
        if !self.is_operator_call(node) {
            return None;
        }
        let root = self.receiver(node)?;
        if self.is_operator_call(root) {
            return None;
        }
        let root_is_stream = match self.tree.kind(root) {
            NodeKind::CallExpression | NodeKind::NewExpression => {
                self.streams.returns_stream_like(root)
            }
            _ => self.streams.has_stream_type(root),
        };
        if !root_is_stream {
            return None;
        }

        let mut links = vec![node];
        let mut current = node;
        while let Some(next) = self.next_link(current) {
            links.push(next);
            current = next;
        }
        Some(Chain { root, links })
    }

    /// The operator call `current` is the receiver of, if any.
    fn next_link(&self, current: NodeId) -> Option<NodeId> {
        let access = self.tree.parent(current)?;
        let (object, _) = self.tree.property_access_parts(access)?;
        if object != current {
            return None;
        }
        let call = self.tree.parent(access)?;
        let (callee, _) = self.tree.call_parts(call)?;
        (callee == access && self.is_operator_call(call)).then_some(call)
    }
}

// ============================================================================
// Rewrite
// ============================================================================

/// Edits turning one chain into a `.pipe(...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRewrite {
    /// From the first operator's dot to the end of the last call.
    pub span: Span,
    pub edits: Vec<Edit>,
    /// Pipeable function names, in chain order.
    pub operators: Vec<String>,
}

pub fn rewrite_chain(tree: &SyntaxTree, chain: &Chain) -> Option<ChainRewrite> {
    let source = tree.source();
    let mut edits = vec![Edit::insert(tree.span(chain.root).end, ".pipe(")];
    let mut operators = Vec::with_capacity(chain.links.len());
    let mut first_dot = None;

    for (index, &link) in chain.links.iter().enumerate() {
        let (callee, _) = tree.call_parts(link)?;
        let (object, name) = tree.property_access_parts(callee)?;
        let name_span = tree.span(name);
        let dot = member_dot(tree, Span::new(tree.span(object).end, name_span.start))?;
        first_dot.get_or_insert(dot);

        // Comments around the dot stay where they are.
        let canonical = pipeable_name(tree.text(name));
        edits.push(Edit::delete(Span::new(dot, dot + 1)));
        edits.push(Edit::replace(name_span, canonical));
        operators.push(canonical.to_string());

        let end = tree.span(link).end;
        if index + 1 < chain.links.len() {
            let separator = if source[end..].starts_with(char::is_whitespace) {
                ","
            } else {
                ", "
            };
            edits.push(Edit::insert(end, separator));
        } else {
            edits.push(Edit::insert(end, ")"));
        }
    }

    let last = *chain.links.last()?;
    Some(ChainRewrite {
        span: Span::new(first_dot?, tree.span(last).end),
        edits,
        operators,
    })
}

/// The `.` token in the gap between a receiver and a member name.
fn member_dot(tree: &SyntaxTree, gap: Span) -> Option<usize> {
    let in_comment = |offset: usize| {
        tree.comments()
            .iter()
            .any(|c| c.span.start <= offset && offset < c.span.end)
    };
    tree.source()[gap.start..gap.end]
        .match_indices('.')
        .map(|(i, _)| gap.start + i)
        .find(|&offset| !in_comment(offset))
}

// ============================================================================
// Rule
// ============================================================================

pub fn chain_findings(cx: &PassContext<'_>, registry: &mut ImportRegistry) -> Vec<Finding> {
    let tree = cx.tree;
    let mut findings = Vec::new();

    for import in tree.imports() {
        if cx.paths.is_patch_operator_import(&import.module) {
            let span = tree.span(import.statement);
            findings.push(Finding::new(
                RuleId::PipeableOperators,
                span,
                MESSAGE,
                vec![Edit::delete(span)],
            ));
        }
    }

    let resolver = ChainResolver::new(tree, &cx.streams, cx.namespace);
    let operators_module = cx.paths.operators();
    for node in tree.descendants(tree.root()) {
        let Some(chain) = resolver.chain_at(node) else {
            continue;
        };
        let Some(rewrite) = rewrite_chain(tree, &chain) else {
            continue;
        };
        let mut edits = rewrite.edits;
        for operator in &rewrite.operators {
            edits.extend(registry.request(&operators_module, operator, None));
        }
        tracing::debug!(
            span = %rewrite.span,
            operators = ?rewrite.operators,
            "rewriting operator chain"
        );
        findings.push(Finding::new(
            RuleId::PipeableOperators,
            rewrite.span,
            MESSAGE,
            edits,
        ));
    }
    findings
}
