//! Type inference and elaboration for the Lumen compiler.
//!
//! The pipeline here is constraint-based Hindley-Milner with type classes:
//! [`infer`] walks the raw AST producing fresh type variables, equality
//! constraints, and class-predicate requirements; [`solve`] turns the
//! constraint list into a substitution and discharges predicates against
//! the instance registry; generalization closes declaration types into
//! polymorphic schemes.

pub mod builtins;
pub mod classes;
pub mod constraint;
pub mod env;
pub mod error;
pub mod infer;
pub mod solve;

pub use classes::{ClassEnv, InstanceMatch, Resolution};
pub use constraint::{Constraint, ConstraintContext, Constraints};
pub use env::{CtorInfo, DataCtorsMap, TrackedTypes, TypeEnv};
pub use error::TypeError;
pub use infer::{infer, InferCtx};
pub use solve::{generalize_decl, solve, Solved};
