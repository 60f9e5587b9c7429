//! Needed-definition tracking.
//!
//! A `DefnId` names one monomorphic specialization: an identifier plus the
//! concrete scheme it is needed at. The worklist records who asked for
//! each definition so that diagnostics can show the dependency chain.

use std::fmt;

use lumen_common::{Identifier, Location};
use lumen_types::{Scheme, Subst, Type};
use rustc_hash::FxHashMap;

use crate::error::MonoError;

/// One monomorphization request: a name at a concrete scheme.
#[derive(Clone, Debug)]
pub struct DefnId {
    pub id: Identifier,
    pub scheme: Scheme,
}

impl DefnId {
    pub fn new(id: Identifier, scheme: Scheme) -> Self {
        DefnId { id, scheme: scheme.normalize() }
    }

    /// Convert all remaining free type variables to `Unit`.
    ///
    /// Unconstrained polymorphism is representationally irrelevant, so
    /// unitizing is sound; a variable still carrying a class predicate is
    /// not unconstrained and is rejected instead.
    pub fn unitize(&self) -> Result<DefnId, MonoError> {
        if let Some(predicate) = self.scheme.predicates.iter().next() {
            return Err(MonoError::UnresolvedClassConstraint {
                predicate: predicate.to_string(),
                location: self.id.location.clone(),
            });
        }
        let subst = Subst::from_pairs(
            self.scheme.vars.iter().map(|v| (v.clone(), Type::unit())).collect(),
        );
        Ok(DefnId {
            id: self.id.clone(),
            scheme: Scheme::mono(self.scheme.ty.rebind(&subst)),
        })
    }

    /// The output-map key for this specialization.
    pub fn key(&self) -> DefnKey {
        DefnKey { name: self.id.name.clone(), ty: self.scheme.ty.repr() }
    }
}

impl fmt::Display for DefnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.id.name, self.scheme)
    }
}

/// A (name, monomorphic-type) key into the output map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefnKey {
    pub name: String,
    /// Canonical repr of the monomorphic type.
    pub ty: String,
}

impl fmt::Display for DefnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.name, self.ty)
    }
}

/// Who requested a definition, and from where.
#[derive(Clone, Debug)]
pub struct DefnRef {
    pub location: Location,
    pub from: DefnKey,
}

/// The monomorphization worklist: definitions still to translate, with
/// the references that demanded them.
#[derive(Debug, Default)]
pub struct NeededDefns {
    entries: FxHashMap<DefnKey, (DefnId, Vec<DefnRef>)>,
    queue: Vec<DefnKey>,
}

impl NeededDefns {
    pub fn new() -> Self {
        NeededDefns::default()
    }

    /// Record that `from` needs `defn_id`. First-time keys enter the
    /// work queue; repeats only add a back-reference.
    pub fn insert(&mut self, defn_id: DefnId, location: Location, from: DefnKey) {
        let key = defn_id.key();
        if !self.entries.contains_key(&key) {
            self.queue.push(key.clone());
            self.entries.insert(key.clone(), (defn_id, Vec::new()));
        }
        if let Some((_, refs)) = self.entries.get_mut(&key) {
            refs.push(DefnRef { location, from });
        }
    }

    pub fn pop(&mut self) -> Option<DefnId> {
        let key = self.queue.pop()?;
        Some(self.entries[&key].0.clone())
    }

    pub fn refs(&self, key: &DefnKey) -> &[DefnRef] {
        self.entries.get(key).map(|(_, refs)| refs.as_slice()).unwrap_or(&[])
    }
}
