//! The constraint solver.
//!
//! Equalities are solved strictly left-to-right as produced, composing
//! each unifier into the accumulated substitution; stable ordering keeps
//! error messages reproducible. Once the equalities are done, every
//! pending class predicate is rewritten under the final substitution and
//! resolved against the instance registry; instance where-predicates
//! re-enter the queue until a fixpoint.

use std::collections::BTreeSet;

use lumen_types::{
    generalize, unify, ClassPredicate, ClassPredicates, NameSupply, Scheme, Subst, Type,
};

use crate::classes::{ClassEnv, Resolution};
use crate::constraint::Constraints;
use crate::env::TypeEnv;
use crate::error::TypeError;

/// A predicate successfully discharged by an instance. The monomorphizer
/// uses the index to pick the instance's method declarations.
#[derive(Clone, Debug)]
pub struct ResolvedInstance {
    pub predicate: ClassPredicate,
    pub class: String,
    pub instance_index: usize,
}

/// The result of solving a declaration's constraints.
#[derive(Clone, Debug, Default)]
pub struct Solved {
    /// The accumulated substitution.
    pub subst: Subst,
    /// Predicates whose head still has free variables; they participate
    /// in generalization.
    pub deferred: ClassPredicates,
    /// Ground predicates discharged by instances, in resolution order.
    pub resolutions: Vec<ResolvedInstance>,
}

/// Solve equality constraints, then resolve class predicates.
pub fn solve(
    constraints: &Constraints,
    requirements: &ClassPredicates,
    class_env: &ClassEnv,
    supply: &mut NameSupply,
) -> Result<Solved, TypeError> {
    let mut subst = Subst::empty();
    let mut pending: Vec<ClassPredicate> = requirements.iter().cloned().collect();

    for constraint in constraints {
        let lhs = constraint.lhs.rebind(&subst);
        let rhs = constraint.rhs.rebind(&subst);
        match unify(&lhs, &rhs) {
            Ok(unification) => {
                subst = unification.subst.compose(&subst);
                pending.extend(unification.pending);
            }
            Err(err) => {
                return Err(TypeError::from_unify(err, constraint.context.clone()));
            }
        }
    }

    let mut deferred = ClassPredicates::new();
    let mut resolutions = Vec::new();
    let mut seen: BTreeSet<ClassPredicate> = BTreeSet::new();
    while let Some(predicate) = pending.pop() {
        let predicate = predicate.rebind(&subst);
        if !seen.insert(predicate.clone()) {
            continue;
        }
        match class_env.resolve(&predicate, supply) {
            Resolution::Matched(matched) => {
                tracing::debug!(predicate = %predicate, "discharged by instance");
                pending.extend(matched.where_predicates.clone());
                resolutions.push(ResolvedInstance {
                    predicate,
                    class: matched.class,
                    instance_index: matched.instance_index,
                });
            }
            Resolution::Deferred => {
                deferred.insert(predicate);
            }
            Resolution::NoInstance => {
                let location = predicate.classname.location.clone();
                return Err(TypeError::NoInstance { predicate, location });
            }
            Resolution::Ambiguous(candidates) => {
                let location = predicate.classname.location.clone();
                return Err(TypeError::AmbiguousInstance { predicate, candidates, location });
            }
        }
    }

    Ok(Solved { subst, deferred, resolutions })
}

/// Generalize a declaration's solved type into a scheme.
///
/// Deferred predicates that mention a quantified variable are bound by the
/// scheme. A deferred predicate mentioning none must be discharged by an
/// instance outright; otherwise the declaration is rejected as
/// `RemainingAmbiguous`.
pub fn generalize_decl(
    env: &TypeEnv,
    deferred: ClassPredicates,
    ty: Type,
    class_env: &ClassEnv,
    supply: &mut NameSupply,
) -> Result<Scheme, TypeError> {
    let generalized = generalize(&env.ftv(), deferred, ty);

    let mut queue: Vec<ClassPredicate> = generalized.leftover.iter().cloned().collect();
    let mut seen = BTreeSet::new();
    while let Some(predicate) = queue.pop() {
        if !seen.insert(predicate.clone()) {
            continue;
        }
        match class_env.resolve(&predicate, supply) {
            Resolution::Matched(matched) => queue.extend(matched.where_predicates.clone()),
            _ => {
                let location = predicate.classname.location.clone();
                return Err(TypeError::RemainingAmbiguous { predicate, location });
            }
        }
    }

    Ok(generalized.scheme)
}
