//! Equality constraints with diagnostic provenance.
//!
//! Every constraint records where in the source it was generated and a
//! short phrase describing why, so a failed unification can say more than
//! "expected Int, found String". Constraints are solved strictly in the
//! order they were produced; stable ordering keeps error messages
//! reproducible.

use std::fmt;

use lumen_common::Location;
use lumen_types::Type;

/// Where a constraint came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintContext {
    /// A short phrase, e.g. "function call" or "if condition".
    pub message: String,
    pub location: Location,
}

impl ConstraintContext {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        ConstraintContext { message: message.into(), location }
    }
}

/// An equality constraint between two types.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub lhs: Type,
    pub rhs: Type,
    pub context: ConstraintContext,
}

impl Constraint {
    pub fn new(lhs: Type, rhs: Type, context: ConstraintContext) -> Self {
        Constraint { lhs, rhs, context }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {} ({})", self.lhs, self.rhs, self.context.message)
    }
}

/// The per-declaration constraint accumulator.
pub type Constraints = Vec<Constraint>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_context() {
        let c = Constraint::new(
            Type::int(),
            Type::bool(),
            ConstraintContext::new("if condition", Location::internal()),
        );
        assert_eq!(c.to_string(), "Int == Bool (if condition)");
    }
}
