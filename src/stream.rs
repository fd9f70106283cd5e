//! Stream type detection.
//!
//! A type is stream-like when it is, or derives from, one of the configured
//! root types or the library's own stream class. Generic instantiations are looked through to their target,
//! unions and intersections are stream-like when any member is, and base
//! types are followed transitively. Every type is visited at most once, so
//! cyclic base declarations terminate.

use std::collections::HashSet;

use rxmigrate_ts::{NodeId, TypeId, TypeKind, TypeOracle};

/// Stream predicate over one oracle.
pub struct StreamTypes<'a> {
    oracle: &'a dyn TypeOracle,
    roots: &'a [String],
    class: Option<&'a str>,
}

impl<'a> StreamTypes<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, roots: &'a [String]) -> Self {
        StreamTypes {
            oracle,
            roots,
            class: None,
        }
    }

    /// Also count `class` as a root, whatever the configured roots say.
    pub fn with_class(mut self, class: &'a str) -> Self {
        self.class = Some(class);
        self
    }

    fn is_root(&self, symbol: &str) -> bool {
        self.class == Some(symbol) || self.roots.iter().any(|root| root == symbol)
    }

    pub fn is_stream_like(&self, ty: TypeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![ty];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            match self.oracle.type_kind(current) {
                TypeKind::Reference { target } => stack.push(target),
                TypeKind::Object { symbol, bases } => {
                    if symbol.is_some_and(|s| self.is_root(s)) {
                        return true;
                    }
                    stack.extend(bases.iter().rev());
                }
                TypeKind::Union(parts) | TypeKind::Intersection(parts) => {
                    stack.extend(parts.iter().rev())
                }
                TypeKind::Unknown => {}
            }
        }
        false
    }

    /// The call resolves to a signature returning a stream.
    pub fn returns_stream_like(&self, call: NodeId) -> bool {
        self.oracle
            .resolved_return_type(call)
            .is_some_and(|ty| self.is_stream_like(ty))
    }

    /// The expression's static type is a stream.
    pub fn has_stream_type(&self, node: NodeId) -> bool {
        self.oracle
            .type_of(node)
            .is_some_and(|ty| self.is_stream_like(ty))
    }
}
