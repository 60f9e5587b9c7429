//! Substitutions over type variables.
//!
//! A substitution maps type-variable names to types. Composition applies
//! the right substitution first: `(s1 ∘ s2)(τ) = s1(s2(τ))`. Substitutions
//! produced by the unifier are idempotent: no variable in the domain
//! appears free in the range.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ty::Type;

/// A mapping from type-variable names to types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subst {
    map: FxHashMap<String, Type>,
}

impl Subst {
    pub fn empty() -> Self {
        Subst { map: FxHashMap::default() }
    }

    pub fn singleton(var: String, ty: Type) -> Self {
        let mut map = FxHashMap::default();
        map.insert(var, ty);
        Subst { map }
    }

    pub fn from_pairs(pairs: Vec<(String, Type)>) -> Self {
        Subst { map: pairs.into_iter().collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, var: &str) -> Option<&Type> {
        self.map.get(var)
    }

    /// A copy with `var` removed from the domain. Used when descending
    /// under a binder that shadows it.
    pub fn removing(&self, var: &str) -> Subst {
        let mut map = self.map.clone();
        map.remove(var);
        Subst { map }
    }

    /// Compose: `self ∘ other`, i.e. apply `other` first, then `self`.
    ///
    /// Every type in `other`'s range is rewritten under `self`; bindings of
    /// `self` for variables not in `other`'s domain carry over unchanged.
    pub fn compose(&self, other: &Subst) -> Subst {
        let mut map = FxHashMap::default();
        for (var, ty) in &other.map {
            map.insert(var.clone(), ty.rebind(self));
        }
        for (var, ty) in &self.map {
            map.entry(var.clone()).or_insert_with(|| ty.clone());
        }
        Subst { map }
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted for reproducible output.
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "{{")?;
        for (i, (var, ty)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} := {ty}")?;
        }
        write!(f, "}}")
    }
}
