//! Class predicates.
//!
//! A predicate `ClassName τ̅` records that the types `τ̅` must be covered
//! by an instance of the class. Predicate sets accompany schemes and
//! constrained type variables, and are kept ordered so that error output
//! and generalization are deterministic.

use std::collections::BTreeSet;
use std::fmt;

use lumen_common::Identifier;

use crate::subst::Subst;
use crate::ty::Type;

/// A single class constraint over one or more type arguments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassPredicate {
    pub classname: Identifier,
    pub params: Vec<Type>,
}

impl ClassPredicate {
    pub fn new(classname: Identifier, params: Vec<Type>) -> Self {
        ClassPredicate { classname, params }
    }

    /// Free type variables of the predicate's arguments.
    pub fn ftv(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for param in &self.params {
            out.extend(param.ftv());
        }
        out
    }

    /// Whether any argument mentions one of `vars`.
    pub fn mentions_any(&self, vars: &BTreeSet<String>) -> bool {
        self.ftv().iter().any(|v| vars.contains(v))
    }

    pub fn rebind(&self, subst: &Subst) -> ClassPredicate {
        ClassPredicate {
            classname: self.classname.clone(),
            params: self.params.iter().map(|p| p.rebind(subst)).collect(),
        }
    }
}

impl fmt::Display for ClassPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.classname.name)?;
        for param in &self.params {
            match param {
                Type::Id(_) | Type::Variable(_) => write!(f, " {param}")?,
                _ => write!(f, " ({param})")?,
            }
        }
        Ok(())
    }
}

/// An ordered set of class predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassPredicates(BTreeSet<ClassPredicate>);

impl ClassPredicates {
    pub fn new() -> Self {
        ClassPredicates(BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, pred: ClassPredicate) -> bool {
        self.0.insert(pred)
    }

    pub fn contains(&self, pred: &ClassPredicate) -> bool {
        self.0.contains(pred)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassPredicate> {
        self.0.iter()
    }

    pub fn union(&self, other: &ClassPredicates) -> ClassPredicates {
        ClassPredicates(self.0.union(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &ClassPredicates) -> ClassPredicates {
        ClassPredicates(self.0.difference(&other.0).cloned().collect())
    }

    pub fn extend(&mut self, other: ClassPredicates) {
        self.0.extend(other.0);
    }

    /// Free type variables across all predicates.
    pub fn ftv(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for pred in &self.0 {
            out.extend(pred.ftv());
        }
        out
    }

    pub fn rebind(&self, subst: &Subst) -> ClassPredicates {
        ClassPredicates(self.0.iter().map(|p| p.rebind(subst)).collect())
    }

    /// Split into (predicates mentioning at least one of `vars`, the rest).
    pub fn partition_mentioning(
        &self,
        vars: &BTreeSet<String>,
    ) -> (ClassPredicates, ClassPredicates) {
        let (hit, miss) = self.0.iter().cloned().partition(|p| p.mentions_any(vars));
        (ClassPredicates(hit), ClassPredicates(miss))
    }
}

impl FromIterator<ClassPredicate> for ClassPredicates {
    fn from_iter<I: IntoIterator<Item = ClassPredicate>>(iter: I) -> Self {
        ClassPredicates(iter.into_iter().collect())
    }
}

impl IntoIterator for ClassPredicates {
    type Item = ClassPredicate;
    type IntoIter = std::collections::btree_set::IntoIter<ClassPredicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ClassPredicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pred) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pred}")?;
        }
        Ok(())
    }
}
