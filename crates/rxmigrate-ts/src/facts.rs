//! Declared type facts and the oracle that answers from them.
//!
//! [`TypeFacts`] is a plain serde table: named types with their bases and
//! members, the declared types of identifiers, and the return types of free
//! functions. Member and binding types are written as small type
//! expressions:
//!
//! ```text
//! Observable<number>        generic instantiation
//! Subject<T> | null         union
//! Observable<A> & Extra     intersection
//! string[]                  array
//! ```
//!
//! [`DeclaredTypes`] interns every type expression once when it is built and
//! then resolves expression nodes of one [`SyntaxTree`] structurally:
//! identifiers through bindings, property accesses through properties (or
//! statics when the object names a type), calls through methods or free
//! functions, and `new C()` to the declared type `C`. A variable declared
//! without an annotation takes the type of its initializer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use rxmigrate_core::error::{MigrateError, MigrateResult};
use serde::{Deserialize, Serialize};

use crate::oracle::{TypeId, TypeKind, TypeOracle};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

// ============================================================================
// Facts
// ============================================================================

/// Serializable type declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeFacts {
    /// Named classes and interfaces.
    pub types: BTreeMap<String, TypeDecl>,
    /// Identifier name to type expression.
    pub bindings: BTreeMap<String, String>,
    /// Free function name to return type expression.
    pub functions: BTreeMap<String, String>,
}

/// One named type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDecl {
    /// Direct base types, as type expressions.
    pub bases: Vec<String>,
    /// Instance method name to return type.
    pub methods: BTreeMap<String, String>,
    /// Instance property name to type.
    pub properties: BTreeMap<String, String>,
    /// Static method name to return type.
    pub statics: BTreeMap<String, String>,
}

impl TypeFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse facts from JSON text.
    pub fn from_json(json: &str) -> MigrateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load facts from a JSON file.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| MigrateError::InvalidInput {
            what: "type facts",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn with_type(mut self, name: impl Into<String>, decl: TypeDecl) -> Self {
        self.types.insert(name.into(), decl);
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.bindings.insert(name.into(), ty.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, ret: impl Into<String>) -> Self {
        self.functions.insert(name.into(), ret.into());
        self
    }

    /// Merge `other` into `self`. Entries of `other` win; members of a type
    /// declared on both sides are merged per member.
    pub fn merge(&mut self, other: TypeFacts) {
        for (name, decl) in other.types {
            match self.types.get_mut(&name) {
                Some(existing) => {
                    for base in decl.bases {
                        if !existing.bases.contains(&base) {
                            existing.bases.push(base);
                        }
                    }
                    existing.methods.extend(decl.methods);
                    existing.properties.extend(decl.properties);
                    existing.statics.extend(decl.statics);
                }
                None => {
                    self.types.insert(name, decl);
                }
            }
        }
        self.bindings.extend(other.bindings);
        self.functions.extend(other.functions);
    }
}

impl TypeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, ret: impl Into<String>) -> Self {
        self.methods.insert(name.into(), ret.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.properties.insert(name.into(), ty.into());
        self
    }

    pub fn with_static(mut self, name: impl Into<String>, ret: impl Into<String>) -> Self {
        self.statics.insert(name.into(), ret.into());
        self
    }
}

// ============================================================================
// Type table
// ============================================================================

/// Type names that never carry members.
const PRIMITIVES: &[&str] = &[
    "any",
    "unknown",
    "never",
    "void",
    "undefined",
    "null",
    "number",
    "string",
    "boolean",
    "bigint",
    "symbol",
    "object",
];

#[derive(Debug, Clone)]
enum TypeData {
    Reference { target: TypeId },
    Object { symbol: String, bases: Vec<TypeId> },
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    Unknown,
}

#[derive(Debug, Clone, Copy)]
enum MemberKind {
    Method,
    Property,
    Static,
}

#[derive(Debug, Default)]
struct Members {
    methods: HashMap<String, TypeId>,
    properties: HashMap<String, TypeId>,
    statics: HashMap<String, TypeId>,
}

impl Members {
    fn get(&self, kind: MemberKind, name: &str) -> Option<TypeId> {
        let table = match kind {
            MemberKind::Method => &self.methods,
            MemberKind::Property => &self.properties,
            MemberKind::Static => &self.statics,
        };
        table.get(name).copied()
    }
}

#[derive(Debug, Default)]
struct TypeTable {
    types: Vec<TypeData>,
    named: HashMap<String, TypeId>,
}

impl TypeTable {
    fn alloc(&mut self, data: TypeData) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(data);
        id
    }

    fn named_object(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.named.get(name) {
            return id;
        }
        let id = self.alloc(TypeData::Object {
            symbol: name.to_string(),
            bases: Vec::new(),
        });
        self.named.insert(name.to_string(), id);
        id
    }

    fn set_bases(&mut self, id: TypeId, new_bases: Vec<TypeId>) {
        if let Some(TypeData::Object { bases, .. }) = self.types.get_mut(id.0 as usize) {
            *bases = new_bases;
        }
    }

    fn get(&self, id: TypeId) -> Option<&TypeData> {
        self.types.get(id.0 as usize)
    }

    /// Intern a type expression.
    fn parse(&mut self, expr: &str) -> TypeId {
        let tokens = tokenize_type(expr);
        let mut pos = 0;
        let id = self.parse_union(&tokens, &mut pos);
        if pos < tokens.len() {
            tracing::warn!(expr, "trailing input in type expression ignored");
        }
        id
    }

    fn parse_union(&mut self, tokens: &[&str], pos: &mut usize) -> TypeId {
        if tokens.get(*pos) == Some(&"|") {
            *pos += 1;
        }
        let mut members = vec![self.parse_intersection(tokens, pos)];
        while tokens.get(*pos) == Some(&"|") {
            *pos += 1;
            members.push(self.parse_intersection(tokens, pos));
        }
        if members.len() == 1 {
            members[0]
        } else {
            self.alloc(TypeData::Union(members))
        }
    }

    fn parse_intersection(&mut self, tokens: &[&str], pos: &mut usize) -> TypeId {
        let mut members = vec![self.parse_postfix(tokens, pos)];
        while tokens.get(*pos) == Some(&"&") {
            *pos += 1;
            members.push(self.parse_postfix(tokens, pos));
        }
        if members.len() == 1 {
            members[0]
        } else {
            self.alloc(TypeData::Intersection(members))
        }
    }

    fn parse_postfix(&mut self, tokens: &[&str], pos: &mut usize) -> TypeId {
        let mut ty = self.parse_atom(tokens, pos);
        while tokens.get(*pos) == Some(&"[") && tokens.get(*pos + 1) == Some(&"]") {
            *pos += 2;
            let array = self.named_object("Array");
            ty = self.alloc(TypeData::Reference { target: array });
        }
        ty
    }

    fn parse_atom(&mut self, tokens: &[&str], pos: &mut usize) -> TypeId {
        let Some(&token) = tokens.get(*pos) else {
            return self.alloc(TypeData::Unknown);
        };
        *pos += 1;
        if token == "(" {
            let inner = self.parse_union(tokens, pos);
            if tokens.get(*pos) == Some(&")") {
                *pos += 1;
            }
            return inner;
        }
        if !token.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == '$') {
            return self.alloc(TypeData::Unknown);
        }
        let has_arguments = tokens.get(*pos) == Some(&"<");
        if has_arguments {
            *pos += 1;
            loop {
                self.parse_union(tokens, pos);
                match tokens.get(*pos) {
                    Some(&",") => *pos += 1,
                    Some(&">") => {
                        *pos += 1;
                        break;
                    }
                    _ => break,
                }
            }
        }
        if PRIMITIVES.contains(&token) {
            return self.alloc(TypeData::Unknown);
        }
        let target = self.named_object(token);
        if has_arguments {
            self.alloc(TypeData::Reference { target })
        } else {
            target
        }
    }
}

/// Split a type expression into names and single-character punctuation.
fn tokenize_type(expr: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        if ch.is_alphanumeric() || matches!(ch, '_' | '$' | '.' | '\'' | '"') {
            let mut end = start + ch.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if next.is_alphanumeric() || matches!(next, '_' | '$' | '.' | '\'' | '"') {
                    end = i + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(&expr[start..end]);
        } else {
            tokens.push(&expr[start..start + ch.len_utf8()]);
        }
    }
    tokens
}

// ============================================================================
// Oracle
// ============================================================================

/// [`TypeOracle`] backed by [`TypeFacts`] for one syntax tree.
#[derive(Debug)]
pub struct DeclaredTypes<'t> {
    tree: &'t SyntaxTree,
    table: TypeTable,
    members: HashMap<TypeId, Members>,
    bindings: HashMap<String, TypeId>,
    functions: HashMap<String, TypeId>,
}

impl<'t> DeclaredTypes<'t> {
    pub fn new(tree: &'t SyntaxTree, facts: &TypeFacts) -> Self {
        let mut table = TypeTable::default();
        for name in facts.types.keys() {
            table.named_object(name);
        }

        let mut members = HashMap::new();
        for (name, decl) in &facts.types {
            let id = table.named_object(name);
            let bases = decl.bases.iter().map(|b| table.parse(b)).collect();
            table.set_bases(id, bases);

            let mut entry = Members::default();
            for (member, ty) in &decl.methods {
                entry.methods.insert(member.clone(), table.parse(ty));
            }
            for (member, ty) in &decl.properties {
                entry.properties.insert(member.clone(), table.parse(ty));
            }
            for (member, ty) in &decl.statics {
                entry.statics.insert(member.clone(), table.parse(ty));
            }
            members.insert(id, entry);
        }

        let bindings = facts
            .bindings
            .iter()
            .map(|(name, ty)| (name.clone(), table.parse(ty)))
            .collect();
        let functions = facts
            .functions
            .iter()
            .map(|(name, ty)| (name.clone(), table.parse(ty)))
            .collect();

        tracing::trace!(types = table.types.len(), "built declared type table");
        let mut oracle = DeclaredTypes {
            tree,
            table,
            members,
            bindings,
            functions,
        };
        oracle.infer_initializers();
        oracle
    }

    /// Bind unannotated `const`/`let`/`var` names to the type of their
    /// initializer, in source order. Declared bindings are never replaced
    /// and the first resolvable declaration of a name wins.
    fn infer_initializers(&mut self) {
        let tree = self.tree;
        let mut inferred = 0usize;
        for node in tree.descendants(tree.root()) {
            if tree.kind(node) != NodeKind::VariableDeclaration {
                continue;
            }
            let (Some(binding), Some(init)) = (tree.child(node, 0), tree.child(node, 1)) else {
                continue;
            };
            if tree.kind(binding) != NodeKind::Identifier {
                continue;
            }
            let gap = &tree.source()[tree.span(binding).end..tree.span(init).start];
            if gap.trim_start().starts_with([':', '!']) {
                continue;
            }
            let name = tree.text(binding);
            if self.bindings.contains_key(name) {
                continue;
            }
            if let Some(ty) = self.type_of(init) {
                self.bindings.insert(name.to_string(), ty);
                inferred += 1;
            }
        }
        if inferred > 0 {
            tracing::trace!(inferred, "inferred bindings from initializers");
        }
    }

    /// Look a member up on `ty`, its generic target, union and intersection
    /// members and declared bases, depth-first.
    fn member(&self, ty: TypeId, name: &str, kind: MemberKind) -> Option<TypeId> {
        let mut visited = HashSet::new();
        let mut stack = vec![ty];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            match self.table.get(current)? {
                TypeData::Reference { target } => stack.push(*target),
                TypeData::Object { bases, .. } => {
                    let found = self
                        .members
                        .get(&current)
                        .and_then(|m| m.get(kind, name));
                    if found.is_some() {
                        return found;
                    }
                    stack.extend(bases.iter().rev());
                }
                TypeData::Union(parts) | TypeData::Intersection(parts) => {
                    stack.extend(parts.iter().rev())
                }
                TypeData::Unknown => {}
            }
        }
        None
    }

    /// The declared type an identifier names when it is used as a value
    /// without a binding, as in `Observable.of`.
    fn static_receiver(&self, object: NodeId) -> Option<TypeId> {
        if self.tree.kind(object) != NodeKind::Identifier {
            return None;
        }
        let name = self.tree.text(object);
        if self.bindings.contains_key(name) {
            return None;
        }
        self.table.named.get(name).copied()
    }
}

impl TypeOracle for DeclaredTypes<'_> {
    fn type_of(&self, node: NodeId) -> Option<TypeId> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Identifier => self.bindings.get(tree.text(node)).copied(),
            NodeKind::Parenthesized | NodeKind::NonNull => self.type_of(tree.child(node, 0)?),
            NodeKind::PropertyAccess => {
                let (object, name) = tree.property_access_parts(node)?;
                let name = tree.text(name);
                if let Some(ty) = self
                    .static_receiver(object)
                    .and_then(|recv| self.member(recv, name, MemberKind::Static))
                {
                    return Some(ty);
                }
                self.member(self.type_of(object)?, name, MemberKind::Property)
            }
            NodeKind::CallExpression | NodeKind::NewExpression => {
                self.resolved_return_type(node)
            }
            _ => None,
        }
    }

    fn resolved_return_type(&self, call: NodeId) -> Option<TypeId> {
        let tree = self.tree;
        let (callee, _) = tree.call_parts(call)?;
        if tree.kind(call) == NodeKind::NewExpression {
            if tree.kind(callee) != NodeKind::Identifier {
                return None;
            }
            return self.table.named.get(tree.text(callee)).copied();
        }
        match tree.kind(callee) {
            NodeKind::PropertyAccess => {
                let (object, name) = tree.property_access_parts(callee)?;
                let name = tree.text(name);
                if let Some(ty) = self
                    .static_receiver(object)
                    .and_then(|recv| self.member(recv, name, MemberKind::Static))
                {
                    return Some(ty);
                }
                self.member(self.type_of(object)?, name, MemberKind::Method)
            }
            NodeKind::Identifier => self.functions.get(tree.text(callee)).copied(),
            _ => None,
        }
    }

    fn type_kind(&self, ty: TypeId) -> TypeKind<'_> {
        match self.table.get(ty) {
            Some(TypeData::Reference { target }) => TypeKind::Reference { target: *target },
            Some(TypeData::Object { symbol, bases }) => TypeKind::Object {
                symbol: Some(symbol.as_str()),
                bases,
            },
            Some(TypeData::Union(parts)) => TypeKind::Union(parts),
            Some(TypeData::Intersection(parts)) => TypeKind::Intersection(parts),
            Some(TypeData::Unknown) | None => TypeKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn find(tree: &SyntaxTree, kind: NodeKind, text: &str) -> NodeId {
        tree.descendants(tree.root())
            .find(|&id| tree.kind(id) == kind && tree.text(id) == text)
            .unwrap()
    }

    fn stream_facts() -> TypeFacts {
        TypeFacts::new()
            .with_type(
                "Observable",
                TypeDecl::new()
                    .with_method("map", "Observable<any>")
                    .with_static("of", "Observable<any>"),
            )
            .with_type("Subject", TypeDecl::new().with_base("Observable<any>"))
            .with_type(
                "Store",
                TypeDecl::new().with_property("items$", "Observable<Item[]>"),
            )
    }

    mod facts_tests {
        use super::*;

        #[test]
        fn json_fields_default() {
            let facts = TypeFacts::from_json(
                r#"{ "bindings": { "foo": "Observable<number>" },
                     "types": { "Store": { "properties": { "x": "number" } } } }"#,
            )
            .unwrap();
            assert_eq!(facts.bindings["foo"], "Observable<number>");
            assert!(facts.functions.is_empty());
            assert!(facts.types["Store"].bases.is_empty());
        }

        #[test]
        fn merge_combines_members() {
            let mut base = stream_facts();
            base.merge(
                TypeFacts::new()
                    .with_type("Observable", TypeDecl::new().with_method("filter", "Observable<any>"))
                    .with_binding("x", "Subject<number>"),
            );
            let observable = &base.types["Observable"];
            assert!(observable.methods.contains_key("map"));
            assert!(observable.methods.contains_key("filter"));
            assert_eq!(base.bindings["x"], "Subject<number>");
        }

        #[test]
        fn load_reports_invalid_json_with_path() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("facts.json");
            std::fs::write(&path, "{ not json").unwrap();
            match TypeFacts::load(&path) {
                Err(MigrateError::InvalidInput { what, path: p, .. }) => {
                    assert_eq!(what, "type facts");
                    assert_eq!(p, path);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn load_reads_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("facts.json");
            std::fs::write(&path, r#"{"functions": {"make": "Observable<void>"}}"#).unwrap();
            let facts = TypeFacts::load(&path).unwrap();
            assert_eq!(facts.functions["make"], "Observable<void>");
        }
    }

    mod type_expression_tests {
        use super::*;

        #[test]
        fn generic_reference_targets_named_type() {
            let mut table = TypeTable::default();
            let id = table.parse("Observable<Array<number>>");
            let Some(TypeData::Reference { target }) = table.get(id) else {
                panic!("expected reference");
            };
            assert!(matches!(
                table.get(*target),
                Some(TypeData::Object { symbol, .. }) if symbol == "Observable"
            ));
        }

        #[test]
        fn unions_intersections_and_arrays() {
            let mut table = TypeTable::default();
            let union = table.parse("Subject<string> | null");
            assert!(matches!(table.get(union), Some(TypeData::Union(parts)) if parts.len() == 2));
            let inter = table.parse("A & (B | C)");
            assert!(matches!(table.get(inter), Some(TypeData::Intersection(parts)) if parts.len() == 2));
            let array = table.parse("Item[]");
            assert!(matches!(table.get(array), Some(TypeData::Reference { .. })));
        }

        #[test]
        fn primitives_are_unknown() {
            let mut table = TypeTable::default();
            let id = table.parse("number");
            assert!(matches!(table.get(id), Some(TypeData::Unknown)));
        }
    }

    mod oracle_tests {
        use super::*;

        #[test]
        fn identifier_property_and_method_types() {
            let tree = parse("store.items$.map(f);").unwrap();
            let facts = stream_facts().with_binding("store", "Store");
            let oracle = DeclaredTypes::new(&tree, &facts);

            let items = find(&tree, NodeKind::PropertyAccess, "store.items$");
            let ty = oracle.type_of(items).unwrap();
            assert!(matches!(oracle.type_kind(ty), TypeKind::Reference { .. }));

            let call = find(&tree, NodeKind::CallExpression, "store.items$.map(f)");
            let ret = oracle.resolved_return_type(call).unwrap();
            let TypeKind::Reference { target } = oracle.type_kind(ret) else {
                panic!("expected reference");
            };
            assert_eq!(oracle.symbol_name(target), Some("Observable"));
        }

        #[test]
        fn methods_are_inherited_from_bases() {
            let tree = parse("subject.map(f);").unwrap();
            let facts = stream_facts().with_binding("subject", "Subject<number>");
            let oracle = DeclaredTypes::new(&tree, &facts);
            let call = find(&tree, NodeKind::CallExpression, "subject.map(f)");
            assert!(oracle.resolved_return_type(call).is_some());
        }

        #[test]
        fn statics_resolve_on_unbound_type_names() {
            let tree = parse("Observable.of(1);").unwrap();
            let oracle = DeclaredTypes::new(&tree, &stream_facts());
            let call = find(&tree, NodeKind::CallExpression, "Observable.of(1)");
            assert!(oracle.resolved_return_type(call).is_some());
        }

        #[test]
        fn new_resolves_to_declared_type() {
            let tree = parse("new Subject();").unwrap();
            let oracle = DeclaredTypes::new(&tree, &stream_facts());
            let new_expr = find(&tree, NodeKind::NewExpression, "new Subject()");
            let ty = oracle.resolved_return_type(new_expr).unwrap();
            assert_eq!(oracle.symbol_name(ty), Some("Subject"));
        }

        #[test]
        fn unknown_names_and_casts_resolve_to_nothing() {
            let tree = parse("other.map(f);\n(x as any).map(f);").unwrap();
            let facts = stream_facts().with_binding("x", "Observable<number>");
            let oracle = DeclaredTypes::new(&tree, &facts);
            let other = find(&tree, NodeKind::CallExpression, "other.map(f)");
            assert_eq!(oracle.resolved_return_type(other), None);
            let cast = find(&tree, NodeKind::CallExpression, "(x as any).map(f)");
            assert_eq!(oracle.resolved_return_type(cast), None);
        }

        #[test]
        fn unannotated_variables_take_initializer_types() {
            let source = "const s = new Subject<number>();\nlet o = Observable.of(1), p = o.map(f);\ns.map(g);\np.map(h);";
            let tree = parse(source).unwrap();
            let oracle = DeclaredTypes::new(&tree, &stream_facts());

            let s_ty = oracle.type_of(find(&tree, NodeKind::Identifier, "s")).unwrap();
            assert_eq!(oracle.symbol_name(s_ty), Some("Subject"));
            assert!(oracle
                .resolved_return_type(find(&tree, NodeKind::CallExpression, "s.map(g)"))
                .is_some());
            assert!(oracle
                .resolved_return_type(find(&tree, NodeKind::CallExpression, "p.map(h)"))
                .is_some());
        }

        #[test]
        fn annotations_and_declared_bindings_are_not_inferred() {
            let source = "const a: Thing = new Subject();\nconst b = new Subject();\nconst c = unknown();";
            let tree = parse(source).unwrap();
            let facts = stream_facts().with_binding("b", "Store");
            let oracle = DeclaredTypes::new(&tree, &facts);

            assert_eq!(oracle.type_of(find(&tree, NodeKind::Identifier, "a")), None);
            let b_ty = oracle.type_of(find(&tree, NodeKind::Identifier, "b")).unwrap();
            assert_eq!(oracle.symbol_name(b_ty), Some("Store"));
            assert_eq!(oracle.type_of(find(&tree, NodeKind::Identifier, "c")), None);
        }

        #[test]
        fn cyclic_bases_terminate() {
            let tree = parse("a.missing();").unwrap();
            let facts = TypeFacts::new()
                .with_type("A", TypeDecl::new().with_base("B"))
                .with_type("B", TypeDecl::new().with_base("A"))
                .with_binding("a", "A");
            let oracle = DeclaredTypes::new(&tree, &facts);
            let call = find(&tree, NodeKind::CallExpression, "a.missing()");
            assert_eq!(oracle.resolved_return_type(call), None);
        }
    }
}
