//! Identifiers.
//!
//! An identifier is a name paired with the location it was written at.
//! Equality and hashing consider only the name: the same name written in
//! two places is one identifier as far as scoping and typing go. The
//! location rides along for diagnostics.

use std::fmt;

use serde::Serialize;

use crate::location::Location;

/// A name with a source location.
#[derive(Clone, Debug, Serialize)]
pub struct Identifier {
    pub name: String,
    pub location: Location,
}

impl Identifier {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Identifier { name: name.into(), location }
    }

    /// An identifier synthesized by the compiler.
    pub fn internal(name: impl Into<String>) -> Self {
        Identifier { name: name.into(), location: Location::internal() }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name // location intentionally excluded
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state); // location intentionally excluded
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_location() {
        let a = Identifier::new("x", Location::new("a.lm", 1, 1));
        let b = Identifier::new("x", Location::new("b.lm", 9, 9));
        assert_eq!(a, b);
    }

    #[test]
    fn hashes_by_name() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Identifier::new("x", Location::new("a.lm", 1, 1)));
        assert!(set.contains(&Identifier::internal("x")));
    }
}
