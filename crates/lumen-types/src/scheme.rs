//! Polymorphic type schemes.
//!
//! A scheme `∀ ᾱ. P ⇒ τ` quantifies the type variables of `τ` (and of the
//! predicate set `P`) that are not free in the ambient environment.
//! Instantiation replaces every bound variable with a fresh one carrying
//! the predicates that mention it; normalization renames bound variables
//! to a canonical sequence for display and hashing.

use std::collections::BTreeSet;
use std::fmt;

use lumen_common::Identifier;

use crate::names::NameSupply;
use crate::predicate::ClassPredicates;
use crate::subst::Subst;
use crate::ty::Type;

/// A polymorphic type scheme.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scheme {
    /// Quantified type-variable names, in order of first appearance.
    pub vars: Vec<String>,
    /// Class predicates bound by the scheme.
    pub predicates: ClassPredicates,
    /// The underlying type.
    pub ty: Type,
}

impl Scheme {
    pub fn new(vars: Vec<String>, predicates: ClassPredicates, ty: Type) -> Self {
        Scheme { vars, predicates, ty }
    }

    /// A monomorphic scheme: no quantified variables, no predicates.
    pub fn mono(ty: Type) -> Self {
        Scheme { vars: Vec::new(), predicates: ClassPredicates::new(), ty }
    }

    /// Count of bound class-predicate constraints.
    pub fn btvs(&self) -> usize {
        self.predicates.len()
    }

    /// Free type variables: those of the body and predicates minus the
    /// quantified set.
    pub fn ftv(&self) -> BTreeSet<String> {
        let mut out = self.ty.ftv();
        out.extend(self.predicates.ftv());
        for var in &self.vars {
            out.remove(var);
        }
        out
    }

    /// Whether the scheme quantifies nothing and constrains nothing.
    pub fn is_mono(&self) -> bool {
        self.vars.is_empty() && self.predicates.is_empty()
    }

    /// Replace every bound variable with a fresh one.
    ///
    /// Each fresh variable carries the (instantiated) predicates that
    /// mention it. Returns the instantiated type together with the full
    /// instantiated predicate set; callers turn the latter into instance
    /// requirements.
    pub fn instantiate(&self, supply: &mut NameSupply) -> (Type, ClassPredicates) {
        if self.vars.is_empty() {
            return (self.ty.clone(), self.predicates.clone());
        }

        // First pass: plain fresh names, so predicate mentions can be
        // discovered under the renaming.
        let fresh: Vec<(String, Identifier)> =
            self.vars.iter().map(|v| (v.clone(), supply.fresh())).collect();
        let plain = Subst::from_pairs(
            fresh
                .iter()
                .map(|(v, id)| (v.clone(), Type::variable(id.clone())))
                .collect(),
        );
        let renamed_preds = self.predicates.rebind(&plain);

        // Second pass: annotate each fresh variable with the predicates
        // that constrain it.
        let subst = Subst::from_pairs(
            fresh
                .iter()
                .map(|(v, id)| {
                    let mentioned: ClassPredicates = renamed_preds
                        .iter()
                        .filter(|p| p.ftv().contains(&id.name))
                        .cloned()
                        .collect();
                    (v.clone(), Type::variable_with(id.clone(), mentioned))
                })
                .collect(),
        );
        (self.ty.rebind(&subst), self.predicates.rebind(&subst))
    }

    /// Apply a substitution to the scheme body and predicates, leaving the
    /// quantified variables untouched (they shadow the substitution).
    pub fn rebind(&self, subst: &Subst) -> Scheme {
        let mut shadowed = subst.clone();
        for var in &self.vars {
            shadowed = shadowed.removing(var);
        }
        Scheme {
            vars: self.vars.clone(),
            predicates: self.predicates.rebind(&shadowed),
            ty: self.ty.rebind(&shadowed),
        }
    }

    /// Rename bound variables to the canonical sequence `a, b, c, …`.
    ///
    /// Canonical names that collide with a free variable of the scheme are
    /// skipped. Normalized schemes display and hash identically when they
    /// are α-equivalent.
    pub fn normalize(&self) -> Scheme {
        if self.vars.is_empty() {
            return self.clone();
        }
        let free = self.ftv();
        let mut names = canonical_names(&free);
        let mut new_vars = Vec::with_capacity(self.vars.len());
        let mut pairs = Vec::with_capacity(self.vars.len());
        for var in &self.vars {
            let fresh = names.next().expect("canonical name supply is infinite");
            pairs.push((var.clone(), Type::variable(Identifier::internal(&fresh))));
            new_vars.push(fresh);
        }
        let subst = Subst::from_pairs(pairs);
        Scheme {
            vars: new_vars,
            predicates: self.predicates.rebind(&subst),
            ty: self.ty.rebind(&subst),
        }
    }

    /// Canonical printable form of the normalized scheme.
    pub fn repr(&self) -> String {
        self.normalize().to_string()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.predicates.is_empty() {
            write!(f, "({}) => ", self.predicates)?;
        }
        write!(f, "{}", self.ty)
    }
}

/// An infinite iterator of canonical bound-variable names, skipping any
/// that would collide with the given free names.
fn canonical_names(avoid: &BTreeSet<String>) -> impl Iterator<Item = String> + '_ {
    (0u32..).filter_map(move |i| {
        let name = if i < 26 {
            ((b'a' + i as u8) as char).to_string()
        } else {
            format!("t{}", i - 26)
        };
        if avoid.contains(&name) {
            None
        } else {
            Some(name)
        }
    })
}

/// The outcome of generalization: the scheme, plus any predicates that
/// mention no quantified variable. Those must be discharged by an instance
/// (or reported) by the caller.
#[derive(Clone, Debug)]
pub struct Generalized {
    pub scheme: Scheme,
    pub leftover: ClassPredicates,
}

/// Close `ty` over the type variables not free in the environment.
///
/// `env_ftv` is the set of variables free in the ambient typing
/// environment. Predicates mentioning at least one quantified variable are
/// bound by the scheme; the rest are returned as leftovers.
pub fn generalize(env_ftv: &BTreeSet<String>, predicates: ClassPredicates, ty: Type) -> Generalized {
    let mut candidates = ty.ftv();
    candidates.extend(predicates.ftv());
    let quantified: BTreeSet<String> =
        candidates.into_iter().filter(|v| !env_ftv.contains(v)).collect();

    let (kept, leftover) = predicates.partition_mentioning(&quantified);

    // Order quantified variables by first appearance in the type, then in
    // the predicate set, for stable normalization.
    let mut vars = Vec::new();
    for name in appearance_order(&ty) {
        if quantified.contains(&name) && !vars.contains(&name) {
            vars.push(name);
        }
    }
    for pred in kept.iter() {
        for param in &pred.params {
            for name in appearance_order(param) {
                if quantified.contains(&name) && !vars.contains(&name) {
                    vars.push(name);
                }
            }
        }
    }

    Generalized { scheme: Scheme::new(vars, kept, ty), leftover }
}

/// Free variable names in first-appearance order.
fn appearance_order(ty: &Type) -> Vec<String> {
    fn walk(ty: &Type, bound: &mut Vec<String>, out: &mut Vec<String>) {
        match ty {
            Type::Id(_) => {}
            Type::Variable(var) => {
                if !bound.iter().any(|b| *b == var.id.name) && !out.contains(&var.id.name) {
                    out.push(var.id.name.clone());
                }
                for pred in var.predicates.iter() {
                    for param in &pred.params {
                        walk(param, bound, out);
                    }
                }
            }
            Type::Operator(f, x) => {
                walk(f, bound, out);
                walk(x, bound, out);
            }
            Type::Lambda(param, body) => {
                bound.push(param.name.clone());
                walk(body, bound, out);
                bound.pop();
            }
        }
    }
    let mut out = Vec::new();
    walk(ty, &mut Vec::new(), &mut out);
    out
}
