//! Type representation and inference machinery for the Lumen compiler.
//!
//! Defines the structural type AST (`Type`), class predicates, composable
//! substitutions, the unifier, and polymorphic schemes. These form the
//! foundation of Hindley-Milner type inference with type classes.

pub mod names;
pub mod predicate;
pub mod scheme;
pub mod subst;
pub mod ty;
pub mod unify;

pub use names::NameSupply;
pub use predicate::{ClassPredicate, ClassPredicates};
pub use scheme::{generalize, Generalized, Scheme};
pub use subst::Subst;
pub use ty::Type;
pub use unify::{unify, Unification, UnifyError};
