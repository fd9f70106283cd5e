//! Arena syntax tree for parsed TypeScript.
//!
//! Nodes live in one vector owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. Every node records its kind, its byte span in the original
//! source and its children in source order. A parent index is built once
//! when the tree is assembled, so upward navigation is a table lookup.
//!
//! The node kinds form a closed set. Child layouts for the kinds the rewrite
//! rules inspect are documented on each variant; for every other kind the
//! children are simply its sub-expressions and sub-statements in order.
//! Type annotations are not represented: the parser skips them.

use rxmigrate_core::patch::Span;

use crate::lexer::Comment;

// ============================================================================
// Nodes
// ============================================================================

/// Handle to a node in a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of syntax node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root. Children: top-level statements.
    SourceFile,

    // === Modules ===
    /// Children: `[ImportClause?, StringLiteral]`.
    ImportDeclaration,
    /// Children: `[Identifier?, NamedImports | NamespaceImport?]`.
    ImportClause,
    /// The `{ ... }` of an import. Children: `ImportSpecifier*`.
    NamedImports,
    /// Children: `[Identifier]` or `[Identifier (imported), Identifier (local)]`.
    ImportSpecifier,
    /// `* as name`. Children: `[Identifier]`.
    NamespaceImport,
    ExportDeclaration,

    // === Statements ===
    VariableStatement,
    /// Children: `[binding, initializer?]`.
    VariableDeclaration,
    /// Destructuring pattern, kept opaque.
    BindingPattern,
    ExpressionStatement,
    Block,
    IfStatement,
    ForStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    SwitchStatement,
    CaseClause,
    BreakStatement,
    ContinueStatement,
    LabeledStatement,
    EmptyStatement,
    FunctionDeclaration,
    ClassDeclaration,
    ClassMember,
    Decorator,
    /// Interfaces, type aliases, enums, `declare` and namespaces, kept opaque.
    TypeDeclaration,
    Parameter,

    // === Expressions ===
    Identifier,
    StringLiteral,
    NumericLiteral,
    TemplateLiteral,
    RegexLiteral,
    ArrayLiteral,
    ObjectLiteral,
    /// `key: value`. Children: `[key, value]`.
    PropertyAssignment,
    /// `key` or `key = default` inside an object literal.
    ShorthandProperty,
    /// Object literal method. Children: `[key, Parameter*, Block]`.
    MethodDefinition,
    SpreadElement,
    /// Children: `[expression]`.
    Parenthesized,
    /// Children: `[Parameter*, body]`.
    ArrowFunction,
    FunctionExpression,
    ClassExpression,
    /// Children: `[callee, argument*]`. Also used for `f?.()`.
    CallExpression,
    /// Children: `[callee, argument*]`.
    NewExpression,
    /// `object.name`. Children: `[object, Identifier]`.
    PropertyAccess,
    /// `object?.name`. Children: `[object, Identifier]`.
    OptionalPropertyAccess,
    ElementAccess,
    TaggedTemplate,
    Unary,
    Postfix,
    /// Binary, logical, assignment and comma operators.
    Binary,
    Conditional,
    /// `expr as T` or `expr satisfies T`. Children: `[expression]`.
    AsExpression,
    /// `expr!`. Children: `[expression]`.
    NonNull,
}

/// A node in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<NodeId>,
}

// ============================================================================
// Tree
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
    comments: Vec<Comment>,
}

impl SyntaxTree {
    /// Assemble a tree and build its parent index.
    pub fn new(source: String, nodes: Vec<Node>, root: NodeId, comments: Vec<Comment>) -> Self {
        let mut parents = vec![None; nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            for child in &node.children {
                parents[child.index()] = Some(NodeId(index as u32));
            }
        }
        SyntaxTree {
            source,
            nodes,
            parents,
            root,
            comments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Comments in source order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Source text covered by a node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        &self.source[span.start..span.end]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    /// Top-level statements.
    pub fn statements(&self) -> &[NodeId] {
        self.children(self.root)
    }

    /// All nodes under `id` in pre-order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    // ------------------------------------------------------------------------
    // Shape accessors
    // ------------------------------------------------------------------------

    /// `(object, name)` of a non-optional property access.
    pub fn property_access_parts(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        if self.kind(id) != NodeKind::PropertyAccess {
            return None;
        }
        Some((self.child(id, 0)?, self.child(id, 1)?))
    }

    /// `(callee, arguments)` of a call or `new` expression.
    pub fn call_parts(&self, id: NodeId) -> Option<(NodeId, &[NodeId])> {
        match self.kind(id) {
            NodeKind::CallExpression | NodeKind::NewExpression => {
                let children = self.children(id);
                let (callee, args) = children.split_first()?;
                Some((*callee, args))
            }
            _ => None,
        }
    }

    /// Contents of a string literal without its quotes.
    ///
    /// Escape sequences are left as written.
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        if self.kind(id) != NodeKind::StringLiteral {
            return None;
        }
        let text = self.text(id);
        text.get(1..text.len().saturating_sub(1))
    }

    /// Structured views of every top-level import declaration.
    pub fn imports(&self) -> Vec<ImportView> {
        self.statements()
            .iter()
            .filter_map(|&stmt| self.import_view(stmt))
            .collect()
    }

    /// Structured view of one import declaration.
    pub fn import_view(&self, stmt: NodeId) -> Option<ImportView> {
        if self.kind(stmt) != NodeKind::ImportDeclaration {
            return None;
        }
        let children = self.children(stmt);
        let specifier = *children.last()?;
        let module = self.string_value(specifier)?.to_string();
        let module_span = self.span(specifier);

        let mut view = ImportView {
            statement: stmt,
            module,
            module_span: Span::new(module_span.start + 1, module_span.end - 1),
            default_binding: None,
            named_bindings: None,
            namespace: None,
            specifiers: Vec::new(),
        };

        let clause = children
            .iter()
            .copied()
            .find(|&c| self.kind(c) == NodeKind::ImportClause);
        if let Some(clause) = clause {
            for &part in self.children(clause) {
                match self.kind(part) {
                    NodeKind::Identifier => view.default_binding = Some(part),
                    NodeKind::NamespaceImport => view.namespace = Some(part),
                    NodeKind::NamedImports => {
                        view.named_bindings = Some(part);
                        view.specifiers = self
                            .children(part)
                            .iter()
                            .filter_map(|&spec| self.specifier_view(spec))
                            .collect();
                    }
                    _ => {}
                }
            }
        }
        Some(view)
    }

    fn specifier_view(&self, spec: NodeId) -> Option<SpecifierView> {
        let children = self.children(spec);
        match children {
            [name] => Some(SpecifierView {
                node: spec,
                property: None,
                name: *name,
            }),
            [property, name] => Some(SpecifierView {
                node: spec,
                property: Some(*property),
                name: *name,
            }),
            _ => None,
        }
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

// ============================================================================
// Import views
// ============================================================================

/// One top-level `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportView {
    pub statement: NodeId,
    /// Module specifier without quotes.
    pub module: String,
    /// Span of the module specifier inside its quotes.
    pub module_span: Span,
    pub default_binding: Option<NodeId>,
    /// The `{ ... }` node, when present.
    pub named_bindings: Option<NodeId>,
    pub namespace: Option<NodeId>,
    pub specifiers: Vec<SpecifierView>,
}

/// One `name` or `name as alias` inside named imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecifierView {
    pub node: NodeId,
    /// The imported name when an alias is present.
    pub property: Option<NodeId>,
    /// The local binding.
    pub name: NodeId,
}

impl SpecifierView {
    /// Name exported by the imported module.
    pub fn imported(&self) -> NodeId {
        self.property.unwrap_or(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn parent_index_matches_children() {
        let tree = parse("a.b(c);").unwrap();
        for id in tree.descendants(tree.root()) {
            for &child in tree.children(id) {
                assert_eq!(tree.parent(child), Some(id));
            }
        }
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn descendants_are_pre_order() {
        let tree = parse("f(x, y);").unwrap();
        let kinds: Vec<NodeKind> = tree.descendants(tree.root()).map(|id| tree.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::SourceFile,
                NodeKind::ExpressionStatement,
                NodeKind::CallExpression,
                NodeKind::Identifier,
                NodeKind::Identifier,
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn import_view_exposes_bindings() {
        let source = "import D, { a, b as c } from 'rxjs';\nimport 'rxjs/add/operator/map';";
        let tree = parse(source).unwrap();
        let imports = tree.imports();
        assert_eq!(imports.len(), 2);

        let first = &imports[0];
        assert_eq!(first.module, "rxjs");
        assert_eq!(&source[first.module_span.start..first.module_span.end], "rxjs");
        assert_eq!(tree.text(first.default_binding.unwrap()), "D");
        assert_eq!(first.specifiers.len(), 2);
        assert_eq!(tree.text(first.specifiers[1].imported()), "b");
        assert_eq!(tree.text(first.specifiers[1].name), "c");
        assert!(first.namespace.is_none());

        assert!(imports[1].named_bindings.is_none() && imports[1].default_binding.is_none());
        assert_eq!(imports[1].module, "rxjs/add/operator/map");
    }
}
