//! The raw abstract syntax tree produced by the parser.
//!
//! The parser is required to have resolved all syntactic sugar into the
//! node variants defined here. Every expression carries a unique `ExprId`
//! (issued through [`build::AstBuilder`]) and a source location; the
//! inference pass keys its side tables by `ExprId`.

pub mod build;
pub mod decl;
pub mod expr;
pub mod prefix;

pub use build::AstBuilder;
pub use decl::{DataCtor, Decl, Instance, Module, TypeClass, TypeDecl};
pub use expr::{Expr, ExprId, ExprKind, Literal, PatternBlock, Predicate};
