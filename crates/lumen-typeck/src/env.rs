//! The typing environment and the data-constructor table.
//!
//! Both structures are built during the declaration-collection pre-pass
//! and grow monotonically across declarations within a compilation unit.
//! `extend` on the environment is persistent in spirit: it clones, so
//! callers can thread scoped extensions without mutation.

use std::collections::BTreeSet;

use lumen_common::Identifier;
use lumen_types::{Scheme, Subst, Type};
use rustc_hash::FxHashMap;

use lumen_ast::decl::TypeDecl;
use lumen_ast::ExprId;

use crate::error::TypeError;

/// Per-expression inferred types, keyed by node id.
pub type TrackedTypes = FxHashMap<ExprId, Type>;

/// The typing environment Γ: identifier → scheme.
#[derive(Clone, Debug, Default)]
pub struct TypeEnv {
    map: FxHashMap<String, Scheme>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv::default()
    }

    pub fn get(&self, name: &str) -> Option<&Scheme> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// A new environment with one more binding. Shadows any existing
    /// binding of the same name.
    pub fn extend(&self, name: &str, scheme: Scheme) -> TypeEnv {
        let mut map = self.map.clone();
        map.insert(name.to_string(), scheme);
        TypeEnv { map }
    }

    /// In-place insertion, used while building the global environment
    /// during declaration collection.
    pub fn insert(&mut self, name: &str, scheme: Scheme) {
        self.map.insert(name.to_string(), scheme);
    }

    /// Free type variables of every scheme in the environment.
    pub fn ftv(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for scheme in self.map.values() {
            out.extend(scheme.ftv());
        }
        out
    }

    /// Free type variables after applying a substitution to each scheme.
    pub fn ftv_under(&self, subst: &Subst) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for scheme in self.map.values() {
            out.extend(scheme.rebind(subst).ftv());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scheme)> {
        self.map.iter()
    }
}

/// What is known about one data constructor.
#[derive(Clone, Debug)]
pub struct CtorInfo {
    /// The defining type's name.
    pub type_name: String,
    pub id: Identifier,
    /// `∀ params. arg1 -> … -> argN -> T params`.
    pub scheme: Scheme,
    pub arity: usize,
    /// Declaration-order index, used as the runtime tag.
    pub tag: usize,
}

/// The data-constructor table: type name → constructors, plus a reverse
/// index from constructor name.
#[derive(Clone, Debug, Default)]
pub struct DataCtorsMap {
    by_type: FxHashMap<String, Vec<CtorInfo>>,
    by_ctor: FxHashMap<String, CtorInfo>,
    decl_locations: FxHashMap<String, Identifier>,
}

impl DataCtorsMap {
    pub fn new() -> Self {
        DataCtorsMap::default()
    }

    /// Process one type declaration: build a scheme per constructor and
    /// index them by type and by constructor name.
    pub fn register_type_decl(&mut self, decl: &TypeDecl) -> Result<(), TypeError> {
        if let Some(previous) = self.decl_locations.get(&decl.id.name) {
            return Err(TypeError::DuplicateDeclaration {
                id: decl.id.clone(),
                previous: previous.location.clone(),
            });
        }

        let mut seen_params = BTreeSet::new();
        for param in &decl.params {
            if !seen_params.insert(param.name.clone()) {
                return Err(TypeError::DuplicateTypeVariable {
                    id: param.clone(),
                    decl: decl.id.clone(),
                });
            }
        }

        let applied = decl.applied_type();
        let vars: Vec<String> = decl.params.iter().map(|p| p.name.clone()).collect();
        let mut ctors = Vec::with_capacity(decl.ctors.len());
        for (tag, ctor) in decl.ctors.iter().enumerate() {
            if self.by_ctor.contains_key(&ctor.id.name) {
                return Err(TypeError::DuplicateDeclaration {
                    id: ctor.id.clone(),
                    previous: self.by_ctor[&ctor.id.name].id.location.clone(),
                });
            }
            let mut terms = ctor.arg_types.clone();
            terms.push(applied.clone());
            let scheme = Scheme::new(
                vars.clone(),
                lumen_types::ClassPredicates::new(),
                Type::arrows(terms),
            );
            let info = CtorInfo {
                type_name: decl.id.name.clone(),
                id: ctor.id.clone(),
                scheme,
                arity: ctor.arg_types.len(),
                tag,
            };
            ctors.push(info.clone());
            self.by_ctor.insert(ctor.id.name.clone(), info);
        }
        self.by_type.insert(decl.id.name.clone(), ctors);
        self.decl_locations.insert(decl.id.name.clone(), decl.id.clone());
        Ok(())
    }

    pub fn ctors_of(&self, type_name: &str) -> Option<&[CtorInfo]> {
        self.by_type.get(type_name).map(|v| v.as_slice())
    }

    pub fn lookup_ctor(&self, ctor_name: &str) -> Option<&CtorInfo> {
        self.by_ctor.get(ctor_name)
    }

    pub fn all_ctors(&self) -> impl Iterator<Item = &CtorInfo> {
        self.by_ctor.values()
    }
}
