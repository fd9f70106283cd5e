//! TypeScript front end for rxmigrate.
//!
//! This crate turns source text into the structures the rewrite rules query:
//! - Lexing with logos ([`lexer`])
//! - An arena syntax tree with parent links and import views ([`syntax`])
//! - A recursive-descent parser for the TypeScript subset in use ([`parser`])
//! - The type oracle interface ([`oracle`]) and a declared-facts
//!   implementation of it ([`facts`])

pub mod error;
pub mod facts;
pub mod lexer;
pub mod oracle;
pub mod parser;
pub mod syntax;

pub use error::{ParseError, ParseResult};
pub use facts::{DeclaredTypes, TypeDecl, TypeFacts};
pub use oracle::{TypeId, TypeKind, TypeOracle};
pub use parser::parse;
pub use syntax::{ImportView, NodeId, NodeKind, SpecifierView, SyntaxTree};
