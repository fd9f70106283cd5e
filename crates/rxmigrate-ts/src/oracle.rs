//! Type oracle interface.
//!
//! The rewrite rules never compute types themselves. They ask a
//! [`TypeOracle`] for the static type of an expression node, for the return
//! type of the signature a call resolves to, and for the structure of a type
//! handle. Any type checker can sit behind this trait; the crate ships
//! [`DeclaredTypes`](crate::facts::DeclaredTypes), which answers from
//! declared type facts.

use crate::syntax::NodeId;

/// Opaque handle to a type known to an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Structural view of a type, as far as stream detection needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind<'a> {
    /// A generic instantiation such as `Observable<number>`.
    Reference { target: TypeId },
    /// A named class or interface with its direct base types.
    Object {
        symbol: Option<&'a str>,
        bases: &'a [TypeId],
    },
    Union(&'a [TypeId]),
    Intersection(&'a [TypeId]),
    /// Anything else (primitives, literals, unresolved names).
    Unknown,
}

/// Source of type information for one syntax tree.
pub trait TypeOracle {
    /// Static type of an expression.
    fn type_of(&self, node: NodeId) -> Option<TypeId>;

    /// Return type of the signature a call or `new` expression resolves to.
    fn resolved_return_type(&self, call: NodeId) -> Option<TypeId>;

    /// Structure of `ty`.
    fn type_kind(&self, ty: TypeId) -> TypeKind<'_>;

    /// Symbol name of `ty` when it is a named object type.
    fn symbol_name(&self, ty: TypeId) -> Option<&str> {
        match self.type_kind(ty) {
            TypeKind::Object { symbol, .. } => symbol,
            _ => None,
        }
    }
}
