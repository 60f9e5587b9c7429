//! Errors raised during monomorphization and lowering.

use std::fmt;

use lumen_common::{Identifier, Location, UserError};
use lumen_types::Type;

/// An error encountered while specializing or lowering a definition.
#[derive(Clone, Debug)]
pub enum MonoError {
    /// An expression's type kept a class-constrained variable that nothing
    /// resolved; unitization would erase the constraint.
    UnresolvedClassConstraint {
        predicate: String,
        location: Location,
    },
    /// A statement follows one that always returns.
    UnreachableCode { location: Location },
    /// A function with a non-unit codomain has a path that neither
    /// returns nor produces the codomain value.
    NotAllPathsReturn { location: Location, codomain: Type },
    /// A match does not cover the scrutinee's type.
    NonExhaustive {
        location: Location,
        scrutinee_ty: Type,
        witness: String,
    },
    /// A match arm adds no coverage beyond the arms before it.
    UnreachableArm { location: Location },
    /// A class-method reference at a concrete type matched no instance
    /// method.
    NoMethodInstance { method: Identifier, ty: Type },
    /// A class-method reference matched more than one instance method.
    AmbiguousMethod {
        method: Identifier,
        ty: Type,
        candidates: Vec<String>,
    },
    /// A forceful cast outside the supported pointer-to-pointer subset.
    UnsupportedCast { location: Location, from: Type, to: Type },
    /// A variable escaped type checking without a definition.
    MissingDefinition { id: Identifier },
    /// A compiler invariant was violated; treated as a bug.
    Internal { message: String, location: Location },
}

impl MonoError {
    pub fn location(&self) -> Location {
        match self {
            MonoError::UnresolvedClassConstraint { location, .. }
            | MonoError::UnreachableCode { location }
            | MonoError::NotAllPathsReturn { location, .. }
            | MonoError::NonExhaustive { location, .. }
            | MonoError::UnreachableArm { location }
            | MonoError::UnsupportedCast { location, .. }
            | MonoError::Internal { location, .. } => location.clone(),
            MonoError::NoMethodInstance { method, .. }
            | MonoError::AmbiguousMethod { method, .. } => method.location.clone(),
            MonoError::MissingDefinition { id } => id.location.clone(),
        }
    }

    pub fn to_user_error(&self) -> UserError {
        let mut err = UserError::new(self.location(), self.to_string());
        if let MonoError::NonExhaustive { witness, .. } = self {
            err.add_info(self.location(), format!("for example, `{witness}` is not covered"));
        }
        err
    }
}

impl fmt::Display for MonoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonoError::UnresolvedClassConstraint { predicate, .. } => {
                write!(
                    f,
                    "cannot choose an instance for `{predicate}`; add a type hint with `as`"
                )
            }
            MonoError::UnreachableCode { .. } => write!(f, "this code will never run"),
            MonoError::NotAllPathsReturn { codomain, .. } => {
                write!(f, "not all control paths return a value of type `{codomain}`")
            }
            MonoError::NonExhaustive { scrutinee_ty, .. } => {
                write!(f, "match on `{scrutinee_ty}` is not exhaustive")
            }
            MonoError::UnreachableArm { .. } => {
                write!(f, "this match arm is unreachable")
            }
            MonoError::NoMethodInstance { method, ty } => {
                write!(f, "no instance provides `{}` at type `{}`", method.name, ty)
            }
            MonoError::AmbiguousMethod { method, ty, candidates } => {
                write!(
                    f,
                    "ambiguous method `{}` at type `{}`: candidates [{}]",
                    method.name,
                    ty,
                    candidates.join(", ")
                )
            }
            MonoError::UnsupportedCast { from, to, .. } => {
                write!(f, "unsupported cast from `{from}` to `{to}`")
            }
            MonoError::MissingDefinition { id } => {
                write!(f, "no definition found for `{}`", id.name)
            }
            MonoError::Internal { message, .. } => {
                write!(f, "internal compiler error: {message}")
            }
        }
    }
}
