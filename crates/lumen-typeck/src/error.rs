//! Type errors with provenance.
//!
//! Each variant carries enough to produce a clear message with the source
//! location of the offending construct. `to_user_error` renders the
//! structured form the driver accumulates.

use std::fmt;

use lumen_common::{Identifier, Location, UserError};
use lumen_types::{ClassPredicate, Type, UnifyError};

use crate::constraint::ConstraintContext;

/// An error encountered during declaration processing, inference, or
/// constraint solving.
#[derive(Clone, Debug)]
pub enum TypeError {
    // ── Scope ───────────────────────────────────────────────────────────
    /// A variable is referenced but bound nowhere.
    UndefinedIdentifier { id: Identifier },
    /// The same name declared twice at the top level.
    DuplicateDeclaration { id: Identifier, previous: Location },
    /// A type declaration or class repeats a type parameter.
    DuplicateTypeVariable { id: Identifier, decl: Identifier },

    // ── Kind / arity ────────────────────────────────────────────────────
    /// The same head constant applied to different numbers of arguments.
    KindMismatch { lhs: Type, rhs: Type, context: ConstraintContext },
    /// A constructor pattern with the wrong number of sub-patterns.
    CtorArityMismatch {
        ctor: Identifier,
        expected: usize,
        found: usize,
        location: Location,
    },
    /// Tuple dereference past the tuple's arity.
    TupleIndexOutOfBounds { index: usize, arity: usize, location: Location },

    // ── Unification ─────────────────────────────────────────────────────
    /// A type variable occurs inside the type it would be bound to.
    OccursCheck { var: Identifier, ty: Type, context: ConstraintContext },
    /// Two types that should be equal are not.
    TypeMismatch { lhs: Type, rhs: Type, context: ConstraintContext },

    // ── Classes / instances ─────────────────────────────────────────────
    /// A ground predicate matched no registered instance.
    NoInstance { predicate: ClassPredicate, location: Location },
    /// A predicate matched more than one equally specific instance.
    AmbiguousInstance {
        predicate: ClassPredicate,
        candidates: Vec<String>,
        location: Location,
    },
    /// A second instance for the same (class, head-constant) shape.
    DuplicateInstance { predicate: ClassPredicate, previous: Location },
    /// An instance omits a method required by its class.
    MissingInstanceMethod {
        predicate: ClassPredicate,
        method: Identifier,
    },
    /// At generalization time, a predicate mentioned no quantified
    /// variable and no instance discharged it.
    RemainingAmbiguous { predicate: ClassPredicate, location: Location },
    /// An instance names a class that was never declared.
    UnknownClass { id: Identifier },

    // ── Control flow ────────────────────────────────────────────────────
    BreakOutsideLoop { location: Location },
    ContinueOutsideLoop { location: Location },
    ReturnOutsideFunction { location: Location },
}

impl TypeError {
    /// Promote a unifier failure, attaching the constraint's provenance.
    pub fn from_unify(err: UnifyError, context: ConstraintContext) -> Self {
        match err {
            UnifyError::OccursCheck { var, ty } => TypeError::OccursCheck { var, ty, context },
            UnifyError::Mismatch { lhs, rhs } => TypeError::TypeMismatch { lhs, rhs, context },
            UnifyError::KindMismatch { lhs, rhs } => TypeError::KindMismatch { lhs, rhs, context },
        }
    }

    /// The primary location for diagnostics.
    pub fn location(&self) -> Location {
        match self {
            TypeError::UndefinedIdentifier { id } => id.location.clone(),
            TypeError::DuplicateDeclaration { id, .. } => id.location.clone(),
            TypeError::DuplicateTypeVariable { id, .. } => id.location.clone(),
            TypeError::KindMismatch { context, .. } => context.location.clone(),
            TypeError::CtorArityMismatch { location, .. } => location.clone(),
            TypeError::TupleIndexOutOfBounds { location, .. } => location.clone(),
            TypeError::OccursCheck { context, .. } => context.location.clone(),
            TypeError::TypeMismatch { context, .. } => context.location.clone(),
            TypeError::NoInstance { location, .. } => location.clone(),
            TypeError::AmbiguousInstance { location, .. } => location.clone(),
            TypeError::DuplicateInstance { predicate, .. } => {
                predicate.classname.location.clone()
            }
            TypeError::MissingInstanceMethod { predicate, .. } => {
                predicate.classname.location.clone()
            }
            TypeError::RemainingAmbiguous { location, .. } => location.clone(),
            TypeError::UnknownClass { id } => id.location.clone(),
            TypeError::BreakOutsideLoop { location }
            | TypeError::ContinueOutsideLoop { location }
            | TypeError::ReturnOutsideFunction { location } => location.clone(),
        }
    }

    /// Render to the structured diagnostic form the driver accumulates.
    pub fn to_user_error(&self) -> UserError {
        let mut err = UserError::new(self.location(), self.to_string());
        match self {
            TypeError::DuplicateDeclaration { previous, .. } => {
                err.add_info(previous.clone(), "previously declared here");
            }
            TypeError::DuplicateInstance { previous, .. } => {
                err.add_info(previous.clone(), "first instance declared here");
            }
            TypeError::OccursCheck { context, .. }
            | TypeError::TypeMismatch { context, .. }
            | TypeError::KindMismatch { context, .. } => {
                err.add_info(
                    context.location.clone(),
                    format!("while checking {}", context.message),
                );
            }
            _ => {}
        }
        err
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UndefinedIdentifier { id } => {
                write!(f, "undefined identifier `{}`", id.name)
            }
            TypeError::DuplicateDeclaration { id, .. } => {
                write!(f, "`{}` is declared more than once", id.name)
            }
            TypeError::DuplicateTypeVariable { id, decl } => {
                write!(f, "duplicate type variable `{}` in `{}`", id.name, decl.name)
            }
            TypeError::KindMismatch { lhs, rhs, .. } => {
                write!(f, "kind mismatch: `{lhs}` and `{rhs}` apply different arities")
            }
            TypeError::CtorArityMismatch { ctor, expected, found, .. } => {
                write!(
                    f,
                    "constructor `{}` takes {} arguments, pattern has {}",
                    ctor.name, expected, found
                )
            }
            TypeError::TupleIndexOutOfBounds { index, arity, .. } => {
                write!(f, "tuple index {index} out of bounds for arity {arity}")
            }
            TypeError::OccursCheck { var, ty, .. } => {
                write!(f, "infinite type: `{}` occurs in `{}`", var.name, ty)
            }
            TypeError::TypeMismatch { lhs, rhs, .. } => {
                write!(f, "type mismatch: expected `{lhs}`, found `{rhs}`")
            }
            TypeError::NoInstance { predicate, .. } => {
                write!(f, "no instance for `{predicate}`")
            }
            TypeError::AmbiguousInstance { predicate, candidates, .. } => {
                write!(
                    f,
                    "ambiguous instance for `{}`: candidates [{}]",
                    predicate,
                    candidates.join(", ")
                )
            }
            TypeError::DuplicateInstance { predicate, .. } => {
                write!(f, "duplicate instance `{predicate}`")
            }
            TypeError::MissingInstanceMethod { predicate, method } => {
                write!(f, "instance `{}` is missing method `{}`", predicate, method.name)
            }
            TypeError::RemainingAmbiguous { predicate, .. } => {
                write!(
                    f,
                    "cannot generalize: predicate `{predicate}` mentions no quantified \
                     variable and no instance discharges it"
                )
            }
            TypeError::UnknownClass { id } => {
                write!(f, "unknown type class `{}`", id.name)
            }
            TypeError::BreakOutsideLoop { .. } => write!(f, "`break` outside of loop"),
            TypeError::ContinueOutsideLoop { .. } => {
                write!(f, "`continue` outside of loop")
            }
            TypeError::ReturnOutsideFunction { .. } => {
                write!(f, "`return` outside of a function body")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_carries_notes() {
        let err = TypeError::DuplicateDeclaration {
            id: Identifier::new("f", Location::new("m.lm", 3, 1)),
            previous: Location::new("m.lm", 1, 1),
        };
        let user = err.to_user_error();
        assert_eq!(user.location, Location::new("m.lm", 3, 1));
        assert_eq!(user.infos.len(), 1);
        assert_eq!(user.infos[0].message, "previously declared here");
    }

    #[test]
    fn mismatch_display() {
        let err = TypeError::TypeMismatch {
            lhs: Type::int(),
            rhs: Type::bool(),
            context: ConstraintContext::new("if condition", Location::internal()),
        };
        assert_eq!(err.to_string(), "type mismatch: expected `Int`, found `Bool`");
    }
}
