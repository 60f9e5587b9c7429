//! Unification.
//!
//! `unify` computes the most general unifier of two type expressions as an
//! explicit, composable substitution, with the occurs check preventing
//! infinite types. Binding a predicate-constrained variable to a concrete
//! type surfaces the instantiated predicates as *pending* class
//! constraints for the solver to discharge.

use std::fmt;

use lumen_common::Identifier;

use crate::predicate::ClassPredicates;
use crate::subst::Subst;
use crate::ty::{Type, TypeVariable};

/// The result of a successful unification.
#[derive(Clone, Debug, Default)]
pub struct Unification {
    /// The most general unifier.
    pub subst: Subst,
    /// Class predicates that became concrete while binding constrained
    /// variables. The solver resolves these against the instance registry.
    pub pending: ClassPredicates,
}

impl Unification {
    fn trivial() -> Self {
        Unification::default()
    }
}

/// Why two types failed to unify.
#[derive(Clone, Debug, PartialEq)]
pub enum UnifyError {
    /// A variable occurs inside the type it would be bound to.
    OccursCheck { var: Identifier, ty: Type },
    /// Structurally incompatible types.
    Mismatch { lhs: Type, rhs: Type },
    /// The same head constant applied to a different number of arguments.
    KindMismatch { lhs: Type, rhs: Type },
}

impl fmt::Display for UnifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifyError::OccursCheck { var, ty } => {
                write!(f, "infinite type: `{}` occurs in `{}`", var.name, ty)
            }
            UnifyError::Mismatch { lhs, rhs } => {
                write!(f, "type mismatch: `{lhs}` vs `{rhs}`")
            }
            UnifyError::KindMismatch { lhs, rhs } => {
                write!(f, "kind mismatch: `{lhs}` and `{rhs}` apply different arities")
            }
        }
    }
}

/// Compute the most general unifier of `lhs` and `rhs`.
///
/// Applied type lambdas are β-reduced before structural comparison; a
/// lambda that survives reduction unifies with nothing.
pub fn unify(lhs: &Type, rhs: &Type) -> Result<Unification, UnifyError> {
    let lhs = lhs.reduce();
    let rhs = rhs.reduce();
    unify_reduced(&lhs, &rhs)
}

fn unify_reduced(lhs: &Type, rhs: &Type) -> Result<Unification, UnifyError> {
    // Bottom is the type of expressions that never produce a value; it
    // unifies with anything and binds nothing.
    if lhs.is_bottom() || rhs.is_bottom() {
        return Ok(Unification::trivial());
    }
    match (lhs, rhs) {
        (Type::Variable(a), Type::Variable(b)) if a.id == b.id => Ok(Unification::trivial()),

        // Two distinct variables: keep the left name, annotated with the
        // union of both predicate sets.
        (Type::Variable(a), Type::Variable(b)) => {
            let merged = Type::Variable(TypeVariable {
                id: a.id.clone(),
                predicates: a.predicates.union(&b.predicates),
            });
            Ok(Unification {
                subst: Subst::singleton(b.id.name.clone(), merged),
                pending: ClassPredicates::new(),
            })
        }

        // Variable against a concrete type: bind it, emitting the
        // variable's predicates instantiated at the bound type.
        (Type::Variable(var), ty) | (ty, Type::Variable(var)) => {
            if ty.ftv().contains(&var.id.name) {
                return Err(UnifyError::OccursCheck { var: var.id.clone(), ty: ty.clone() });
            }
            let binding = Subst::singleton(var.id.name.clone(), ty.clone());
            let pending = var.predicates.rebind(&binding);
            Ok(Unification { subst: binding, pending })
        }

        (Type::Id(a), Type::Id(b)) => {
            if a == b {
                Ok(Unification::trivial())
            } else {
                Err(UnifyError::Mismatch { lhs: lhs.clone(), rhs: rhs.clone() })
            }
        }

        (Type::Operator(f1, x1), Type::Operator(f2, x2)) => {
            let mut unification = unify_reduced(f1, f2).map_err(|err| match err {
                // Surface arity problems on the whole application.
                UnifyError::Mismatch { .. } if same_head_different_arity(lhs, rhs) => {
                    UnifyError::KindMismatch { lhs: lhs.clone(), rhs: rhs.clone() }
                }
                other => other,
            })?;
            let x1 = x1.rebind(&unification.subst);
            let x2 = x2.rebind(&unification.subst);
            let arg_unification = unify(&x1, &x2)?;
            unification.subst = arg_unification.subst.compose(&unification.subst);
            unification.pending.extend(arg_unification.pending);
            Ok(unification)
        }

        _ => {
            if same_head_different_arity(lhs, rhs) {
                Err(UnifyError::KindMismatch { lhs: lhs.clone(), rhs: rhs.clone() })
            } else {
                Err(UnifyError::Mismatch { lhs: lhs.clone(), rhs: rhs.clone() })
            }
        }
    }
}

/// Whether the two types share a head constant but apply it to different
/// numbers of arguments.
fn same_head_different_arity(lhs: &Type, rhs: &Type) -> bool {
    let (head_l, args_l) = lhs.spine();
    let (head_r, args_r) = rhs.spine();
    match (head_l, head_r) {
        (Type::Id(a), Type::Id(b)) => a == b && args_l.len() != args_r.len(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ClassPredicate;

    fn var(name: &str) -> Type {
        Type::variable(Identifier::internal(name))
    }

    fn constrained_var(name: &str, class: &str) -> Type {
        let pred = ClassPredicate::new(Identifier::internal(class), vec![var(name)]);
        Type::variable_with(
            Identifier::internal(name),
            ClassPredicates::from_iter([pred]),
        )
    }

    #[test]
    fn unify_var_with_concrete() {
        let u = unify(&var("a"), &Type::int()).unwrap();
        assert_eq!(var("a").rebind(&u.subst), Type::int());
    }

    #[test]
    fn unify_identical_vars_is_trivial() {
        let u = unify(&var("a"), &var("a")).unwrap();
        assert!(u.subst.is_empty());
    }

    #[test]
    fn unify_two_vars_merges_predicates() {
        let a = constrained_var("a", "Eq");
        let b = constrained_var("b", "Show");
        let u = unify(&a, &b).unwrap();
        // b is rebound to a, annotated with both constraints.
        match var("b").rebind(&u.subst) {
            Type::Variable(merged) => {
                assert_eq!(merged.id.name, "a");
                assert_eq!(merged.predicates.len(), 2);
            }
            other => panic!("expected variable, got {other}"),
        }
    }

    #[test]
    fn binding_constrained_var_emits_pending() {
        let a = constrained_var("a", "Show");
        let u = unify(&a, &Type::int()).unwrap();
        assert_eq!(u.pending.to_string(), "Show Int");
    }

    #[test]
    fn occurs_check_fires() {
        let a = var("a");
        let arrow = Type::arrow(a.clone(), Type::int());
        match unify(&a, &arrow) {
            Err(UnifyError::OccursCheck { var, .. }) => assert_eq!(var.name, "a"),
            other => panic!("expected occurs check, got {other:?}"),
        }
    }

    #[test]
    fn id_mismatch_reports_both_sides() {
        match unify(&Type::int(), &Type::bool()) {
            Err(UnifyError::Mismatch { lhs, rhs }) => {
                assert_eq!(lhs, Type::int());
                assert_eq!(rhs, Type::bool());
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn operator_unification_composes() {
        // a -> a ~ Int -> b  =>  a := Int, b := Int.
        let lhs = Type::arrow(var("a"), var("a"));
        let rhs = Type::arrow(Type::int(), var("b"));
        let u = unify(&lhs, &rhs).unwrap();
        assert_eq!(lhs.rebind(&u.subst), rhs.rebind(&u.subst));
        assert_eq!(var("b").rebind(&u.subst), Type::int());
    }

    #[test]
    fn kind_mismatch_on_arity() {
        let lhs = Type::maybe(Type::int());
        let rhs = Type::operator(Type::maybe(Type::int()), Type::bool());
        match unify(&lhs, &rhs) {
            Err(UnifyError::KindMismatch { .. }) => {}
            other => panic!("expected kind mismatch, got {other:?}"),
        }
    }

    #[test]
    fn applied_lambda_reduces_before_unifying() {
        // (Λ a. Maybe a) Int ~ Maybe Int.
        let lam = Type::lambda(Identifier::internal("a"), Type::maybe(var("a")));
        let applied = Type::operator(lam, Type::int());
        let u = unify(&applied, &Type::maybe(Type::int())).unwrap();
        assert!(u.subst.is_empty());
    }

    #[test]
    fn bare_lambda_does_not_unify() {
        let lam = Type::lambda(Identifier::internal("a"), var("a"));
        assert!(unify(&lam, &Type::int()).is_err());
    }

    #[test]
    fn bottom_unifies_with_anything() {
        let u = unify(&Type::bottom(), &Type::int()).unwrap();
        assert!(u.subst.is_empty());
        // Against a variable it binds nothing, leaving the variable free.
        let u = unify(&var("a"), &Type::bottom()).unwrap();
        assert!(u.subst.is_empty());
    }

    #[test]
    fn tuple_unification() {
        let lhs = Type::tuple(vec![var("a"), Type::int()]);
        let rhs = Type::tuple(vec![Type::bool(), var("b")]);
        let u = unify(&lhs, &rhs).unwrap();
        assert_eq!(lhs.rebind(&u.subst), rhs.rebind(&u.subst));
    }

    #[test]
    fn tuple_arity_mismatch_is_kind_error() {
        let lhs = Type::tuple(vec![var("a"), Type::int()]);
        let rhs = Type::tuple(vec![Type::bool()]);
        // Different tuple arities use different head constants, so this is
        // a plain mismatch rather than a kind error.
        assert!(unify(&lhs, &rhs).is_err());
    }

    // ── Property tests ──────────────────────────────────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_type() -> impl Strategy<Value = Type> {
            let leaf = prop_oneof![
                Just(Type::int()),
                Just(Type::bool()),
                Just(Type::unit()),
                "[abc]".prop_map(|name| Type::variable(Identifier::internal(name))),
            ];
            leaf.prop_recursive(3, 16, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Type::arrow(a, b)),
                    inner.clone().prop_map(Type::maybe),
                    (inner.clone(), inner).prop_map(|(a, b)| Type::tuple(vec![a, b])),
                ]
            })
        }

        proptest! {
            #[test]
            fn unifier_equates_both_sides(lhs in arb_type(), rhs in arb_type()) {
                if let Ok(u) = unify(&lhs, &rhs) {
                    prop_assert_eq!(lhs.rebind(&u.subst), rhs.rebind(&u.subst));
                }
            }

            #[test]
            fn substitution_is_idempotent(lhs in arb_type(), rhs in arb_type()) {
                if let Ok(u) = unify(&lhs, &rhs) {
                    let once = lhs.rebind(&u.subst);
                    prop_assert_eq!(once.rebind(&u.subst), once);
                }
            }
        }
    }
}
