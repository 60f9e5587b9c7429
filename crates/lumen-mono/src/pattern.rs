//! The pattern lattice.
//!
//! Match coverage is computed with set operations over an abstract
//! pattern domain: `intersect` (what two patterns both accept),
//! `difference` (what the first accepts and the second does not), and
//! `union`. Exhaustiveness subtracts each arm's coverage from a running
//! "remaining" set; a non-empty residue yields a synthesized witness
//! value, and an arm whose contribution is empty is unreachable.
//!
//! Constructor sets expand through the data-constructor table on demand.
//! Bool is treated as the two-constructor type `false | true`; the
//! infinite literal types (Int, String) are tracked as include/exclude
//! sets, so `difference` over them stays finite.

use std::collections::BTreeSet;

use lumen_ast::expr::{Literal, Predicate};
use lumen_common::Location;
use lumen_types::{unify, ty::tuple_ctor, Type};
use lumen_typeck::env::{CtorInfo, DataCtorsMap};

use crate::error::MonoError;

/// Pseudo type-name for tuple products in the lattice.
pub const TUPLE_TYPE: &str = "tuple";

/// One constructor's coverage: which type, which constructor, and the
/// coverage of each argument position.
#[derive(Clone, Debug, PartialEq)]
pub struct CtorPatternValue {
    pub type_name: String,
    pub name: String,
    pub tag: usize,
    pub args: Vec<Pattern>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiteralsKind {
    /// Exactly these values.
    Include,
    /// Every value except these.
    Exclude,
}

/// An element of the pattern lattice.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// The empty set: identity for union, absorbing for intersect.
    Nothing,
    /// All inhabitants of a type.
    AllOf(Type),
    /// Values built with one constructor.
    CtorPattern(CtorPatternValue),
    /// A sum of constructors.
    CtorPatterns(Vec<CtorPatternValue>),
    /// A finite include/exclude set over an infinite literal type.
    Literals { ty: Type, kind: LiteralsKind, values: BTreeSet<Literal> },
}

impl Pattern {
    pub fn is_nothing(&self) -> bool {
        match self {
            Pattern::Nothing => true,
            Pattern::CtorPattern(cpv) => cpv.args.iter().any(Pattern::is_nothing),
            Pattern::CtorPatterns(cpvs) => {
                cpvs.iter().all(|cpv| cpv.args.iter().any(Pattern::is_nothing))
                    || cpvs.is_empty()
            }
            Pattern::Literals { kind: LiteralsKind::Include, values, .. } => values.is_empty(),
            _ => false,
        }
    }
}

fn normalize(mut cpvs: Vec<CtorPatternValue>) -> Pattern {
    cpvs.retain(|cpv| !cpv.args.iter().any(Pattern::is_nothing));
    match cpvs.len() {
        0 => Pattern::Nothing,
        1 => Pattern::CtorPattern(cpvs.pop().expect("one element")),
        _ => Pattern::CtorPatterns(cpvs),
    }
}

fn cpvs_of(pattern: Pattern) -> Vec<CtorPatternValue> {
    match pattern {
        Pattern::Nothing => Vec::new(),
        Pattern::CtorPattern(cpv) => vec![cpv],
        Pattern::CtorPatterns(cpvs) => cpvs,
        other => panic!("expected constructor pattern, got {other:?}"),
    }
}

/// Ground argument types of a constructor at a concrete data type.
pub(crate) fn ctor_arg_types(info: &CtorInfo, ty: &Type) -> Option<Vec<Type>> {
    let terms = info.scheme.ty.unfold_arrows();
    let (args, result) = terms.split_at(terms.len() - 1);
    let unification = unify(result[0], ty).ok()?;
    Some(args.iter().map(|arg| arg.rebind(&unification.subst)).collect())
}

/// Expand `AllOf(ty)` one level into concrete coverage, when possible.
fn expand(ty: &Type, ctors: &DataCtorsMap) -> Option<Pattern> {
    if let Some(dims) = ty.tuple_dims() {
        return Some(Pattern::CtorPattern(CtorPatternValue {
            type_name: TUPLE_TYPE.to_string(),
            name: tuple_ctor(dims.len()),
            tag: 0,
            args: dims.into_iter().map(|d| Pattern::AllOf(d.clone())).collect(),
        }));
    }
    let (head, _) = ty.spine();
    let head_name = match head {
        Type::Id(id) => id.name.as_str(),
        _ => return None,
    };
    match head_name {
        "Bool" => Some(Pattern::CtorPatterns(vec![
            bool_cpv(false),
            bool_cpv(true),
        ])),
        "Int" | "String" => Some(Pattern::Literals {
            ty: ty.clone(),
            kind: LiteralsKind::Exclude,
            values: BTreeSet::new(),
        }),
        "Unit" => Some(Pattern::CtorPattern(CtorPatternValue {
            type_name: "Unit".to_string(),
            name: "unit".to_string(),
            tag: 0,
            args: Vec::new(),
        })),
        _ => {
            let infos = ctors.ctors_of(head_name)?;
            let mut cpvs = Vec::with_capacity(infos.len());
            for info in infos {
                let arg_tys = ctor_arg_types(info, ty)?;
                cpvs.push(CtorPatternValue {
                    type_name: info.type_name.clone(),
                    name: info.id.name.clone(),
                    tag: info.tag,
                    args: arg_tys.into_iter().map(Pattern::AllOf).collect(),
                });
            }
            Some(Pattern::CtorPatterns(cpvs))
        }
    }
}

fn bool_cpv(value: bool) -> CtorPatternValue {
    CtorPatternValue {
        type_name: "Bool".to_string(),
        name: value.to_string(),
        tag: value as usize,
        args: Vec::new(),
    }
}

// ── Lattice operations ──────────────────────────────────────────────────

/// Greatest lower bound: the scrutinees both patterns accept.
pub fn intersect(lhs: &Pattern, rhs: &Pattern, ctors: &DataCtorsMap) -> Pattern {
    match (lhs, rhs) {
        (Pattern::Nothing, _) | (_, Pattern::Nothing) => Pattern::Nothing,
        // AllOf is the top element for its type.
        (Pattern::AllOf(_), other) => other.clone(),
        (other, Pattern::AllOf(_)) => other.clone(),

        (Pattern::CtorPattern(a), Pattern::CtorPattern(b)) => intersect_cpv(a, b, ctors),

        (Pattern::CtorPattern(_), Pattern::CtorPatterns(bs)) => {
            let cpvs = bs
                .iter()
                .flat_map(|b| cpvs_of(intersect(lhs, &Pattern::CtorPattern(b.clone()), ctors)))
                .collect();
            normalize(cpvs)
        }
        (Pattern::CtorPatterns(r#as), _) => {
            let cpvs = r#as
                .iter()
                .flat_map(|a| cpvs_of(intersect(&Pattern::CtorPattern(a.clone()), rhs, ctors)))
                .collect();
            normalize(cpvs)
        }

        (
            Pattern::Literals { ty, kind: k1, values: v1 },
            Pattern::Literals { kind: k2, values: v2, .. },
        ) => {
            let (kind, values) = match (k1, k2) {
                (LiteralsKind::Include, LiteralsKind::Include) => {
                    (LiteralsKind::Include, v1.intersection(v2).cloned().collect())
                }
                (LiteralsKind::Include, LiteralsKind::Exclude) => {
                    (LiteralsKind::Include, v1.difference(v2).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Include) => {
                    (LiteralsKind::Include, v2.difference(v1).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Exclude) => {
                    (LiteralsKind::Exclude, v1.union(v2).cloned().collect())
                }
            };
            Pattern::Literals { ty: ty.clone(), kind, values }
        }

        _ => Pattern::Nothing,
    }
}

fn intersect_cpv(a: &CtorPatternValue, b: &CtorPatternValue, ctors: &DataCtorsMap) -> Pattern {
    if a.name != b.name {
        return Pattern::Nothing;
    }
    let args: Vec<Pattern> = a
        .args
        .iter()
        .zip(&b.args)
        .map(|(x, y)| intersect(x, y, ctors))
        .collect();
    if args.iter().any(Pattern::is_nothing) {
        return Pattern::Nothing;
    }
    Pattern::CtorPattern(CtorPatternValue {
        type_name: a.type_name.clone(),
        name: a.name.clone(),
        tag: a.tag,
        args,
    })
}

/// `lhs \ rhs`: scrutinees `lhs` accepts that `rhs` does not.
pub fn difference(lhs: &Pattern, rhs: &Pattern, ctors: &DataCtorsMap) -> Pattern {
    match (lhs, rhs) {
        (Pattern::Nothing, _) => Pattern::Nothing,
        (_, Pattern::Nothing) => lhs.clone(),
        (_, Pattern::AllOf(_)) => Pattern::Nothing,

        (Pattern::AllOf(ty), _) => match expand(ty, ctors) {
            Some(expanded) => difference(&expanded, rhs, ctors),
            // An opaque type cannot be subtracted from; only a wildcard
            // arm can cover it.
            None => lhs.clone(),
        },

        (Pattern::CtorPattern(a), Pattern::CtorPattern(b)) => difference_cpv(a, b, ctors),

        (Pattern::CtorPattern(_), Pattern::CtorPatterns(bs)) => {
            let mut remaining = lhs.clone();
            for b in bs {
                remaining = difference(&remaining, &Pattern::CtorPattern(b.clone()), ctors);
            }
            remaining
        }
        (Pattern::CtorPatterns(r#as), _) => {
            let cpvs = r#as
                .iter()
                .flat_map(|a| cpvs_of(difference(&Pattern::CtorPattern(a.clone()), rhs, ctors)))
                .collect();
            normalize(cpvs)
        }

        (
            Pattern::Literals { ty, kind: k1, values: v1 },
            Pattern::Literals { kind: k2, values: v2, .. },
        ) => {
            let (kind, values) = match (k1, k2) {
                (LiteralsKind::Include, LiteralsKind::Include) => {
                    (LiteralsKind::Include, v1.difference(v2).cloned().collect())
                }
                (LiteralsKind::Include, LiteralsKind::Exclude) => {
                    (LiteralsKind::Include, v1.intersection(v2).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Include) => {
                    (LiteralsKind::Exclude, v1.union(v2).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Exclude) => {
                    (LiteralsKind::Include, v2.difference(v1).cloned().collect())
                }
            };
            Pattern::Literals { ty: ty.clone(), kind, values }
        }

        _ => lhs.clone(),
    }
}

fn difference_cpv(
    a: &CtorPatternValue,
    b: &CtorPatternValue,
    ctors: &DataCtorsMap,
) -> Pattern {
    if a.name != b.name {
        return Pattern::CtorPattern(a.clone());
    }
    // Product difference: peel one argument position at a time.
    let mut out = Vec::new();
    for i in 0..a.args.len() {
        let diff_i = difference(&a.args[i], &b.args[i], ctors);
        if diff_i.is_nothing() {
            continue;
        }
        let mut args = Vec::with_capacity(a.args.len());
        let mut degenerate = false;
        for j in 0..a.args.len() {
            let arg = match j.cmp(&i) {
                std::cmp::Ordering::Less => intersect(&a.args[j], &b.args[j], ctors),
                std::cmp::Ordering::Equal => diff_i.clone(),
                std::cmp::Ordering::Greater => a.args[j].clone(),
            };
            if arg.is_nothing() {
                degenerate = true;
                break;
            }
            args.push(arg);
        }
        if !degenerate {
            out.push(CtorPatternValue {
                type_name: a.type_name.clone(),
                name: a.name.clone(),
                tag: a.tag,
                args,
            });
        }
    }
    normalize(out)
}

/// Least upper bound, used for exhaustiveness bookkeeping.
pub fn pattern_union(lhs: &Pattern, rhs: &Pattern) -> Pattern {
    match (lhs, rhs) {
        (Pattern::Nothing, other) | (other, Pattern::Nothing) => other.clone(),
        (Pattern::AllOf(ty), _) | (_, Pattern::AllOf(ty)) => Pattern::AllOf(ty.clone()),

        (
            Pattern::Literals { ty, kind: k1, values: v1 },
            Pattern::Literals { kind: k2, values: v2, .. },
        ) => {
            let (kind, values) = match (k1, k2) {
                (LiteralsKind::Include, LiteralsKind::Include) => {
                    (LiteralsKind::Include, v1.union(v2).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Include) => {
                    (LiteralsKind::Exclude, v1.difference(v2).cloned().collect())
                }
                (LiteralsKind::Include, LiteralsKind::Exclude) => {
                    (LiteralsKind::Exclude, v2.difference(v1).cloned().collect())
                }
                (LiteralsKind::Exclude, LiteralsKind::Exclude) => {
                    (LiteralsKind::Exclude, v1.intersection(v2).cloned().collect())
                }
            };
            Pattern::Literals { ty: ty.clone(), kind, values }
        }

        _ => {
            let mut cpvs = cpvs_of(lhs.clone());
            for cpv in cpvs_of(rhs.clone()) {
                if !cpvs.contains(&cpv) {
                    cpvs.push(cpv);
                }
            }
            normalize(cpvs)
        }
    }
}

// ── Pattern construction and exhaustiveness ─────────────────────────────

/// The coverage of one match-arm predicate at the given scrutinee type.
pub fn pattern_from_predicate(
    predicate: &Predicate,
    ty: &Type,
    ctors: &DataCtorsMap,
) -> Result<Pattern, MonoError> {
    match predicate {
        Predicate::Irrefutable { .. } => Ok(Pattern::AllOf(ty.clone())),

        Predicate::Tuple { params, location, .. } => {
            let dims: Vec<Type> = match ty.tuple_dims() {
                Some(dims) => dims.into_iter().cloned().collect(),
                None => {
                    return Err(MonoError::Internal {
                        message: format!("tuple pattern against non-tuple type `{ty}`"),
                        location: location.clone(),
                    })
                }
            };
            let args = params
                .iter()
                .zip(&dims)
                .map(|(p, d)| pattern_from_predicate(p, d, ctors))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::CtorPattern(CtorPatternValue {
                type_name: TUPLE_TYPE.to_string(),
                name: tuple_ctor(params.len()),
                tag: 0,
                args,
            }))
        }

        Predicate::Ctor { ctor, params, location, .. } => {
            let info = ctors.lookup_ctor(&ctor.name).ok_or_else(|| MonoError::Internal {
                message: format!("unknown constructor `{}` after type checking", ctor.name),
                location: location.clone(),
            })?;
            let arg_tys = ctor_arg_types(info, ty).ok_or_else(|| MonoError::Internal {
                message: format!("constructor `{}` does not build `{ty}`", ctor.name),
                location: location.clone(),
            })?;
            let args = params
                .iter()
                .zip(&arg_tys)
                .map(|(p, t)| pattern_from_predicate(p, t, ctors))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::CtorPattern(CtorPatternValue {
                type_name: info.type_name.clone(),
                name: info.id.name.clone(),
                tag: info.tag,
                args,
            }))
        }

        Predicate::Literal { value, .. } => Ok(match value {
            Literal::Bool(b) => Pattern::CtorPattern(bool_cpv(*b)),
            other => Pattern::Literals {
                ty: ty.clone(),
                kind: LiteralsKind::Include,
                values: [other.clone()].into_iter().collect(),
            },
        }),
    }
}

/// Check arm coverage in order; error on an unreachable arm or a
/// non-empty residue.
pub fn check_coverage(
    arms: &[(Pattern, Location)],
    scrutinee_ty: &Type,
    match_location: &Location,
    ctors: &DataCtorsMap,
) -> Result<(), MonoError> {
    let mut remaining = Pattern::AllOf(scrutinee_ty.clone());
    for (covered, location) in arms {
        let contribution = intersect(&remaining, covered, ctors);
        if contribution.is_nothing() {
            return Err(MonoError::UnreachableArm { location: location.clone() });
        }
        remaining = difference(&remaining, covered, ctors);
    }
    if !remaining.is_nothing() {
        return Err(MonoError::NonExhaustive {
            location: match_location.clone(),
            scrutinee_ty: scrutinee_ty.clone(),
            witness: witness(&remaining),
        });
    }
    Ok(())
}

/// Synthesize an example value from a residue pattern.
pub fn witness(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Nothing => "<nothing>".to_string(),
        Pattern::AllOf(_) => "_".to_string(),
        Pattern::CtorPattern(cpv) => witness_cpv(cpv),
        Pattern::CtorPatterns(cpvs) => {
            cpvs.first().map(witness_cpv).unwrap_or_else(|| "<nothing>".to_string())
        }
        Pattern::Literals { ty, kind, values } => match kind {
            LiteralsKind::Include => {
                values.iter().next().map(|v| v.to_string()).unwrap_or_else(|| "_".to_string())
            }
            LiteralsKind::Exclude => fresh_literal(ty, values),
        },
    }
}

fn witness_cpv(cpv: &CtorPatternValue) -> String {
    if cpv.type_name == TUPLE_TYPE {
        let parts: Vec<String> = cpv.args.iter().map(witness).collect();
        return format!("({})", parts.join(", "));
    }
    if cpv.name == "unit" {
        return "()".to_string();
    }
    if cpv.args.is_empty() {
        return cpv.name.clone();
    }
    let parts: Vec<String> = cpv
        .args
        .iter()
        .map(|arg| {
            let w = witness(arg);
            if w.contains(' ') {
                format!("({w})")
            } else {
                w
            }
        })
        .collect();
    format!("{} {}", cpv.name, parts.join(" "))
}

/// Pick a literal of `ty` outside the excluded set.
fn fresh_literal(ty: &Type, excluded: &BTreeSet<Literal>) -> String {
    let is_string = matches!(ty.spine().0, Type::Id(id) if id.name == "String");
    if is_string {
        let mut candidate = "w".to_string();
        while excluded.contains(&Literal::Str(candidate.clone())) {
            candidate.push('w');
        }
        format!("{:?}", candidate)
    } else {
        let mut n = 0i64;
        while excluded.contains(&Literal::Int(n)) {
            n += 1;
        }
        n.to_string()
    }
}
