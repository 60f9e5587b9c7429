//! The monomorphizing translator.
//!
//! Specializes polymorphic top-level definitions for each concrete type
//! they are used at, driven by a worklist of needed definitions. Each
//! specialization re-traverses the declaration's body under the binding
//! obtained by unifying its raw inferred type with the requested
//! monotype; tracked types that still have free variables are rebound,
//! and anything left unconstrained is unitized.
//!
//! Along the way: `return` paths are tracked (statements after a
//! returning statement are rejected), non-forceful casts vanish,
//! class-method references resolve to the matching instance's method
//! declaration, and matches become decision trees over constructor tags
//! and tuple projections.

use lumen_ast::expr::{Expr, ExprKind, Literal, PatternBlock, Predicate};
use lumen_common::{Identifier, Location, UserError};
use lumen_types::{unify, NameSupply, Scheme, Subst, Type};
use lumen_typeck::builtins::{is_builtin, WORD_SIZE};
use lumen_typeck::env::{DataCtorsMap, TrackedTypes};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::defn::{DefnId, DefnKey, NeededDefns};
use crate::error::MonoError;
use crate::pattern;
use crate::texpr::TExpr;

/// A type-checked top-level declaration, ready for specialization.
///
/// `ty` is the raw inferred type (free variables are the ones the scheme
/// generalizes); `tracked` is the per-declaration type side-map keyed by
/// expression id, under the same variable names.
#[derive(Clone, Debug)]
pub struct CheckedDecl {
    pub name: Identifier,
    pub scheme: Scheme,
    pub ty: Type,
    pub body: Expr,
    pub tracked: TrackedTypes,
}

/// Immutable inputs to monomorphization.
pub struct MonoEnv<'a> {
    /// Ordinary top-level declarations by name.
    pub decls: &'a FxHashMap<String, CheckedDecl>,
    /// Class-method declarations by method name, one per instance.
    pub methods: &'a FxHashMap<String, Vec<CheckedDecl>>,
    pub data_ctors: &'a DataCtorsMap,
}

/// The translator's output: typed monomorphic definitions plus the
/// entry-point key.
#[derive(Debug)]
pub struct Monomorphized {
    pub defns: Vec<(DefnKey, TExpr)>,
    pub entry: DefnKey,
    /// `static_print` reports gathered during translation.
    pub static_prints: Vec<(Location, String)>,
}

/// Expand the program reachable from `entry` into monomorphic
/// definitions. Failed definitions are reported and skipped; the rest
/// still translate.
pub fn monomorphize(
    entry: &Identifier,
    env: &MonoEnv,
    supply: &mut NameSupply,
) -> Result<Monomorphized, Vec<UserError>> {
    let entry_decl = match env.decls.get(&entry.name) {
        Some(decl) => decl,
        None => {
            return Err(vec![MonoError::MissingDefinition { id: entry.clone() }.to_user_error()])
        }
    };
    let seed = DefnId::new(entry.clone(), entry_decl.scheme.clone());
    let seed = seed.unitize().map_err(|e| vec![e.to_user_error()])?;
    let entry_key = seed.key();

    let mut needed = NeededDefns::new();
    let root = DefnKey { name: "<root>".to_string(), ty: String::new() };
    needed.insert(seed, entry.location.clone(), root);

    let mut errors: Vec<UserError> = Vec::new();
    let mut static_prints = Vec::new();
    let mut defns: Vec<(DefnKey, TExpr)> = Vec::new();

    while let Some(defn_id) = needed.pop() {
        let key = defn_id.key();
        tracing::debug!(defn = %defn_id, "monomorphizing");
        match translate_defn(&defn_id, env, supply, &mut needed, &mut static_prints) {
            Ok(texpr) => defns.push((key, texpr)),
            Err(err) => errors.push(err.to_user_error()),
        }
    }

    if errors.is_empty() {
        Ok(Monomorphized { defns, entry: entry_key, static_prints })
    } else {
        Err(errors)
    }
}

/// Translate one needed definition at its concrete type.
fn translate_defn(
    defn_id: &DefnId,
    env: &MonoEnv,
    supply: &mut NameSupply,
    needed: &mut NeededDefns,
    static_prints: &mut Vec<(Location, String)>,
) -> Result<TExpr, MonoError> {
    let mono_ty = defn_id.scheme.ty.clone();
    let name = defn_id.id.name.as_str();

    let decl = if let Some(decl) = env.decls.get(name) {
        decl
    } else if let Some(candidates) = env.methods.get(name) {
        resolve_method(defn_id, &mono_ty, candidates, supply)?
    } else if let Some(info) = env.data_ctors.lookup_ctor(name) {
        return synthesize_ctor(info.tag, &mono_ty);
    } else {
        return Err(MonoError::MissingDefinition { id: defn_id.id.clone() });
    };

    let unification = unify(&decl.ty, &mono_ty).map_err(|err| MonoError::Internal {
        message: format!(
            "declaration `{}` :: `{}` does not cover requested type `{}`: {}",
            name, decl.ty, mono_ty, err
        ),
        location: defn_id.id.location.clone(),
    })?;

    let mut ctx = TranslateCtx {
        env,
        supply,
        needed,
        static_prints,
        subst: unification.subst,
        tracked: &decl.tracked,
        for_key: defn_id.key(),
        poly_lets: Vec::new(),
    };
    let mut returns = false;
    texpr(&mut ctx, &decl.body, &FxHashSet::default(), &mut returns)
}

/// Pick the one instance method whose scheme covers the requested type.
fn resolve_method<'a>(
    defn_id: &DefnId,
    mono_ty: &Type,
    candidates: &'a [CheckedDecl],
    supply: &mut NameSupply,
) -> Result<&'a CheckedDecl, MonoError> {
    let mut matching: Vec<&CheckedDecl> = Vec::new();
    for candidate in candidates {
        let (instantiated, _) = candidate.scheme.instantiate(supply);
        if unify(&instantiated, mono_ty).is_ok() {
            matching.push(candidate);
        }
    }
    match matching.len() {
        0 => Err(MonoError::NoMethodInstance {
            method: defn_id.id.clone(),
            ty: mono_ty.clone(),
        }),
        1 => Ok(matching[0]),
        _ => Err(MonoError::AmbiguousMethod {
            method: defn_id.id.clone(),
            ty: mono_ty.clone(),
            candidates: matching.iter().map(|c| c.scheme.to_string()).collect(),
        }),
    }
}

/// Build the definition of a data constructor at a concrete type: a
/// curried function allocating a `(tag, args…)` tuple.
fn synthesize_ctor(tag: usize, mono_ty: &Type) -> Result<TExpr, MonoError> {
    let terms: Vec<Type> = mono_ty.unfold_arrows().into_iter().cloned().collect();
    let (arg_tys, result_ty) = terms.split_at(terms.len() - 1);
    let result_ty = result_ty[0].clone();

    let mut dims = vec![TExpr::Literal { value: Literal::Int(tag as i64), ty: Type::int() }];
    for (i, arg_ty) in arg_tys.iter().enumerate() {
        dims.push(TExpr::Local { name: format!("a{i}"), ty: arg_ty.clone() });
    }
    let mut body = TExpr::Tuple { dims, ty: result_ty };
    for i in (0..arg_tys.len()).rev() {
        let ty = Type::arrows(terms[i..].to_vec());
        body = TExpr::Lambda { param: format!("a{i}"), body: Box::new(body), ty };
    }
    Ok(body)
}

/// Per-specialization translation state.
struct TranslateCtx<'a> {
    env: &'a MonoEnv<'a>,
    supply: &'a mut NameSupply,
    needed: &'a mut NeededDefns,
    static_prints: &'a mut Vec<(Location, String)>,
    /// Binding from the declaration's raw type variables to the
    /// requested concrete types.
    subst: Subst,
    tracked: &'a TrackedTypes,
    for_key: DefnKey,
    /// Let bindings whose value type still has free variables: each use
    /// site re-translates the value at its own concrete type. The entry
    /// records the binding's value, its raw type, and the binder scope it
    /// was written in.
    poly_lets: Vec<(String, Expr, Type, FxHashSet<String>)>,
}

impl TranslateCtx<'_> {
    /// The ground type of a node: tracked type, rebound, unitized.
    fn node_type(&self, expr: &Expr) -> Result<Type, MonoError> {
        let raw = self.tracked.get(&expr.id).ok_or_else(|| MonoError::Internal {
            message: format!("no tracked type for expression {}", expr.id),
            location: expr.location.clone(),
        })?;
        unitize(&raw.rebind(&self.subst), &expr.location)
    }
}

/// Replace remaining free type variables by `Unit`.
///
/// A variable still carrying class predicates is not representationally
/// irrelevant; erasing it would silently pick no instance, so it is
/// rejected instead.
fn unitize(ty: &Type, location: &Location) -> Result<Type, MonoError> {
    match ty {
        Type::Id(_) => Ok(ty.clone()),
        Type::Variable(var) => {
            if let Some(predicate) = var.predicates.iter().next() {
                return Err(MonoError::UnresolvedClassConstraint {
                    predicate: predicate.to_string(),
                    location: location.clone(),
                });
            }
            Ok(Type::unit())
        }
        Type::Operator(f, x) => {
            Ok(Type::operator(unitize(f, location)?, unitize(x, location)?))
        }
        Type::Lambda(param, body) => {
            Ok(Type::lambda(param.clone(), unitize(body, location)?))
        }
    }
}

fn texpr(
    ctx: &mut TranslateCtx,
    expr: &Expr,
    bound: &FxHashSet<String>,
    returns: &mut bool,
) -> Result<TExpr, MonoError> {
    let ty = ctx.node_type(expr)?;
    match &expr.kind {
        ExprKind::Literal(value) => Ok(TExpr::Literal { value: value.clone(), ty }),

        ExprKind::Var(id) => {
            if bound.contains(&id.name) {
                Ok(TExpr::Local { name: id.name.clone(), ty })
            } else if let Some((value, raw_ty, let_scope)) = ctx
                .poly_lets
                .iter()
                .rev()
                .find(|(name, ..)| *name == id.name)
                .map(|(_, value, ty, scope)| (value.clone(), ty.clone(), scope.clone()))
            {
                // A polymorphic let binding: re-translate its value at
                // this use site's concrete type.
                let unification =
                    unify(&raw_ty, &ty).map_err(|err| MonoError::Internal {
                        message: format!(
                            "let-bound `{}` :: `{raw_ty}` does not cover use at `{ty}`: {err}",
                            id.name
                        ),
                        location: expr.location.clone(),
                    })?;
                let composed = unification.subst.compose(&ctx.subst);
                let saved = std::mem::replace(&mut ctx.subst, composed);
                let mut value_returns = false;
                let result = texpr(ctx, &value, &let_scope, &mut value_returns);
                ctx.subst = saved;
                result
            } else if is_builtin(&id.name) {
                Ok(TExpr::BuiltinRef { name: id.name.clone(), ty })
            } else {
                let defn = DefnId::new(id.clone(), Scheme::mono(ty.clone()));
                let key = defn.key();
                ctx.needed.insert(defn, expr.location.clone(), ctx.for_key.clone());
                Ok(TExpr::Global { key, ty })
            }
        }

        ExprKind::Lambda { param, body, .. } => {
            let mut inner_bound = bound.clone();
            inner_bound.insert(param.name.clone());
            let mut lambda_returns = false;
            let body_t = texpr(ctx, body, &inner_bound, &mut lambda_returns)?;

            let terms: Vec<Type> = ty.unfold_arrows().into_iter().cloned().collect();
            if terms.len() < 2 {
                return Err(MonoError::Internal {
                    message: format!("lambda with non-arrow type `{ty}`"),
                    location: expr.location.clone(),
                });
            }
            let codomain = Type::arrows(terms[1..].to_vec());
            // A body with no `return` of its own is expression-styled: its
            // value is the result, and inference already pinned its type
            // to the codomain. A body that returns anywhere must return on
            // every path, unless the codomain is unit.
            if contains_return(body) && !lambda_returns && !codomain.is_unit() {
                return Err(MonoError::NotAllPathsReturn {
                    location: expr.location.clone(),
                    codomain,
                });
            }
            Ok(TExpr::Lambda { param: param.name.clone(), body: Box::new(body_t), ty })
        }

        ExprKind::Application { callee, arg } => {
            let callee_t = texpr(ctx, callee, bound, returns)?;
            let arg_t = texpr(ctx, arg, bound, returns)?;
            Ok(TExpr::Call { callee: Box::new(callee_t), arg: Box::new(arg_t), ty })
        }

        ExprKind::Let { name, value, body } => {
            let raw_value_ty = ctx
                .tracked
                .get(&value.id)
                .ok_or_else(|| MonoError::Internal {
                    message: format!("no tracked type for expression {}", value.id),
                    location: value.location.clone(),
                })?
                .rebind(&ctx.subst);
            if raw_value_ty.ftv_count() != 0 {
                // The binding was generalized: no single monotype fits,
                // so each use site inlines the value at its own type.
                let mut inner_bound = bound.clone();
                inner_bound.remove(&name.name);
                ctx.poly_lets.push((
                    name.name.clone(),
                    (**value).clone(),
                    raw_value_ty,
                    bound.clone(),
                ));
                let body_t = texpr(ctx, body, &inner_bound, returns);
                ctx.poly_lets.pop();
                return body_t;
            }

            let value_t = texpr(ctx, value, bound, returns)?;
            let mut inner_bound = bound.clone();
            inner_bound.insert(name.name.clone());
            let body_t = texpr(ctx, body, &inner_bound, returns)?;
            Ok(TExpr::Let {
                name: name.name.clone(),
                value: Box::new(value_t),
                body: Box::new(body_t),
                ty,
            })
        }

        // Top-level recursion goes through global definitions; a fixpoint
        // surviving to this pass is a front-end bug.
        ExprKind::Fix(_) => Err(MonoError::Internal {
            message: "fixpoint reached monomorphization".to_string(),
            location: expr.location.clone(),
        }),

        ExprKind::Conditional { cond, truthy, falsey } => {
            let cond_t = texpr(ctx, cond, bound, returns)?;
            let mut truthy_returns = false;
            let truthy_t = texpr(ctx, truthy, bound, &mut truthy_returns)?;
            let mut falsey_returns = false;
            let falsey_t = texpr(ctx, falsey, bound, &mut falsey_returns)?;
            if truthy_returns && falsey_returns {
                *returns = true;
            }
            Ok(TExpr::Cond {
                cond: Box::new(cond_t),
                truthy: Box::new(truthy_t),
                falsey: Box::new(falsey_t),
                ty,
            })
        }

        ExprKind::Block(statements) => {
            let starts_already_returned = *returns;
            let mut out = Vec::with_capacity(statements.len());
            for statement in statements {
                if *returns && !starts_already_returned {
                    return Err(MonoError::UnreachableCode {
                        location: statement.location.clone(),
                    });
                }
                out.push(texpr(ctx, statement, bound, returns)?);
            }
            Ok(TExpr::Block { statements: out, ty })
        }

        ExprKind::While { condition, block } => {
            let cond_t = texpr(ctx, condition, bound, returns)?;
            // Whether the body returns is unknowable: the loop may not run.
            let mut block_returns = false;
            let block_t = texpr(ctx, block, bound, &mut block_returns)?;
            Ok(TExpr::While { condition: Box::new(cond_t), block: Box::new(block_t) })
        }

        ExprKind::Break => Ok(TExpr::Break),
        ExprKind::Continue => Ok(TExpr::Continue),

        ExprKind::ReturnStatement(value) => {
            let value_t = texpr(ctx, value, bound, returns)?;
            *returns = true;
            Ok(TExpr::Return { value: Box::new(value_t) })
        }

        ExprKind::Tuple(dims) => {
            if dims.is_empty() {
                return Ok(TExpr::Unit);
            }
            let starts_already_returned = *returns;
            let mut out = Vec::with_capacity(dims.len());
            for dim in dims {
                if *returns && !starts_already_returned {
                    return Err(MonoError::UnreachableCode { location: dim.location.clone() });
                }
                out.push(texpr(ctx, dim, bound, returns)?);
            }
            Ok(TExpr::Tuple { dims: out, ty })
        }

        ExprKind::TupleDeref { expr: inner, index, .. } => {
            let inner_t = texpr(ctx, inner, bound, returns)?;
            Ok(TExpr::TupleDeref { tuple: Box::new(inner_t), index: *index, ty })
        }

        ExprKind::As { expr: inner, force_cast, .. } => {
            let inner_t = texpr(ctx, inner, bound, returns)?;
            if !force_cast {
                // The ascription constrained inference; at this point the
                // wrapper is the identity.
                return Ok(inner_t);
            }
            let from = inner_t.ty();
            if !cast_supported(&from, &ty) {
                return Err(MonoError::UnsupportedCast {
                    location: expr.location.clone(),
                    from,
                    to: ty,
                });
            }
            Ok(TExpr::Cast { inner: Box::new(inner_t), ty })
        }

        ExprKind::Match { scrutinee, arms } => {
            translate_match(ctx, expr, scrutinee, arms, bound, returns, ty)
        }

        ExprKind::Builtin { name, args } => {
            let mut out = Vec::with_capacity(args.len());
            for arg in args {
                out.push(texpr(ctx, arg, bound, returns)?);
            }
            Ok(TExpr::Builtin { name: name.name.clone(), args: out, ty })
        }

        ExprKind::Sizeof(_) => {
            Ok(TExpr::Builtin { name: WORD_SIZE.to_string(), args: Vec::new(), ty })
        }

        ExprKind::StaticPrint(inner) => {
            let mut fake_returns = false;
            let inner_t = texpr(ctx, inner, bound, &mut fake_returns)?;
            let shown = inner_t.ty().to_string();
            tracing::info!(location = %inner.location, ty = %shown, "static_print");
            ctx.static_prints.push((inner.location.clone(), shown));
            Ok(TExpr::Unit)
        }
    }
}

/// Whether the expression contains a `return` targeting the current
/// function. Nested lambdas own their returns and do not count.
fn contains_return(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::ReturnStatement(_) => true,
        ExprKind::Lambda { .. } => false,
        ExprKind::Literal(_)
        | ExprKind::Var(_)
        | ExprKind::Break
        | ExprKind::Continue
        | ExprKind::Sizeof(_) => false,
        ExprKind::Application { callee, arg } => {
            contains_return(callee) || contains_return(arg)
        }
        ExprKind::Let { value, body, .. } => contains_return(value) || contains_return(body),
        ExprKind::Fix(inner) | ExprKind::StaticPrint(inner) => contains_return(inner),
        ExprKind::Conditional { cond, truthy, falsey } => {
            contains_return(cond) || contains_return(truthy) || contains_return(falsey)
        }
        ExprKind::Block(statements) => statements.iter().any(contains_return),
        ExprKind::While { condition, block } => {
            contains_return(condition) || contains_return(block)
        }
        ExprKind::Tuple(dims) => dims.iter().any(contains_return),
        ExprKind::TupleDeref { expr: inner, .. } => contains_return(inner),
        ExprKind::As { expr: inner, .. } => contains_return(inner),
        ExprKind::Match { scrutinee, arms } => {
            contains_return(scrutinee) || arms.iter().any(|arm| contains_return(&arm.result))
        }
        ExprKind::Builtin { args, .. } => args.iter().any(contains_return),
    }
}

/// Forceful casts are confined to single-word pointer shapes.
fn cast_supported(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    let pointer_head = |ty: &Type| {
        matches!(ty.spine().0, Type::Id(id) if id.name == lumen_types::ty::PTR || id.name == lumen_types::ty::REF)
    };
    pointer_head(from) && pointer_head(to)
}

// ── Match compilation ───────────────────────────────────────────────────

fn translate_match(
    ctx: &mut TranslateCtx,
    expr: &Expr,
    scrutinee: &Expr,
    arms: &[PatternBlock],
    bound: &FxHashSet<String>,
    returns: &mut bool,
    ty: Type,
) -> Result<TExpr, MonoError> {
    let scrutinee_t = texpr(ctx, scrutinee, bound, returns)?;
    let scrutinee_ty = scrutinee_t.ty();

    // Coverage first: unreachable arms and non-exhaustive matches are
    // rejected before any code is produced.
    let mut coverage = Vec::with_capacity(arms.len());
    for arm in arms {
        coverage.push((
            pattern::pattern_from_predicate(&arm.predicate, &scrutinee_ty, ctx.env.data_ctors)?,
            arm.predicate.location().clone(),
        ));
    }
    pattern::check_coverage(&coverage, &scrutinee_ty, &expr.location, ctx.env.data_ctors)?;

    let scrut_name = format!("__scrutinee_{}", expr.id.0);
    let scrut_local = TExpr::Local { name: scrut_name.clone(), ty: scrutinee_ty.clone() };

    let mut arm_flags = Vec::with_capacity(arms.len());
    let tree = lower_arms(ctx, arms, &scrut_local, &scrutinee_ty, bound, &ty, &mut arm_flags)?;
    if !arms.is_empty() && arm_flags.iter().all(|flag| *flag) {
        *returns = true;
    }

    Ok(TExpr::Let {
        name: scrut_name,
        value: Box::new(scrutinee_t),
        body: Box::new(tree),
        ty,
    })
}

/// Lower arms into a decision tree: test the first arm's pattern, bind
/// its names, fall through to the rest. The final arm's test is dropped;
/// exhaustiveness has already proven it total.
fn lower_arms(
    ctx: &mut TranslateCtx,
    arms: &[PatternBlock],
    scrutinee: &TExpr,
    scrutinee_ty: &Type,
    bound: &FxHashSet<String>,
    result_ty: &Type,
    arm_flags: &mut Vec<bool>,
) -> Result<TExpr, MonoError> {
    let (arm, rest) = arms.split_first().expect("lower_arms needs at least one arm");

    let mut binds = Vec::new();
    let test = compile_predicate(ctx, &arm.predicate, scrutinee, scrutinee_ty, &mut binds)?;

    let mut arm_bound = bound.clone();
    for (name, _, _) in &binds {
        arm_bound.insert(name.clone());
    }
    let mut arm_returns = false;
    let mut body = texpr(ctx, &arm.result, &arm_bound, &mut arm_returns)?;
    arm_flags.push(arm_returns);

    for (name, value, _) in binds.into_iter().rev() {
        body = TExpr::Let {
            name,
            value: Box::new(value),
            body: Box::new(body),
            ty: result_ty.clone(),
        };
    }

    match (test, rest.is_empty()) {
        (_, true) | (None, _) => Ok(body),
        (Some(test), false) => {
            let rest_t =
                lower_arms(ctx, rest, scrutinee, scrutinee_ty, bound, result_ty, arm_flags)?;
            Ok(TExpr::Cond {
                cond: Box::new(test),
                truthy: Box::new(body),
                falsey: Box::new(rest_t),
                ty: result_ty.clone(),
            })
        }
    }
}

/// Compile a predicate against a scrutinee reference into an optional
/// boolean test plus the value bindings it introduces. Sub-patterns
/// conjoin left-to-right by structural position.
fn compile_predicate(
    ctx: &mut TranslateCtx,
    predicate: &Predicate,
    scrutinee: &TExpr,
    scrutinee_ty: &Type,
    binds: &mut Vec<(String, TExpr, Type)>,
) -> Result<Option<TExpr>, MonoError> {
    match predicate {
        Predicate::Irrefutable { name, .. } => {
            if let Some(name) = name {
                binds.push((name.name.clone(), scrutinee.clone(), scrutinee_ty.clone()));
            }
            Ok(None)
        }

        Predicate::Literal { value, .. } => Ok(Some(literal_test(scrutinee, value))),

        Predicate::Tuple { params, name, location } => {
            let dims: Vec<Type> = match scrutinee_ty.tuple_dims() {
                Some(dims) => dims.into_iter().cloned().collect(),
                None => {
                    return Err(MonoError::Internal {
                        message: format!(
                            "tuple pattern against non-tuple type `{scrutinee_ty}`"
                        ),
                        location: location.clone(),
                    })
                }
            };
            if let Some(name) = name {
                binds.push((name.name.clone(), scrutinee.clone(), scrutinee_ty.clone()));
            }
            let mut test = None;
            for (i, (param, dim)) in params.iter().zip(&dims).enumerate() {
                let part = TExpr::TupleDeref {
                    tuple: Box::new(scrutinee.clone()),
                    index: i,
                    ty: dim.clone(),
                };
                let part_test = compile_predicate(ctx, param, &part, dim, binds)?;
                test = conjoin(test, part_test);
            }
            Ok(test)
        }

        Predicate::Ctor { ctor, params, name, location } => {
            let info = ctx.env.data_ctors.lookup_ctor(&ctor.name).ok_or_else(|| {
                MonoError::Internal {
                    message: format!(
                        "unknown constructor `{}` after type checking",
                        ctor.name
                    ),
                    location: location.clone(),
                }
            })?;
            let tag = info.tag;
            let arg_tys =
                pattern::ctor_arg_types(info, scrutinee_ty).ok_or_else(|| MonoError::Internal {
                    message: format!(
                        "constructor `{}` does not build `{scrutinee_ty}`",
                        ctor.name
                    ),
                    location: location.clone(),
                })?;

            if let Some(name) = name {
                binds.push((name.name.clone(), scrutinee.clone(), scrutinee_ty.clone()));
            }

            // Constructor values are `(tag, args…)` tuples: test slot 0,
            // project the rest.
            let tag_read = TExpr::TupleDeref {
                tuple: Box::new(scrutinee.clone()),
                index: 0,
                ty: Type::int(),
            };
            let mut test = Some(TExpr::Builtin {
                name: "__builtin_int_eq".to_string(),
                args: vec![
                    tag_read,
                    TExpr::Literal { value: Literal::Int(tag as i64), ty: Type::int() },
                ],
                ty: Type::bool(),
            });
            for (i, (param, arg_ty)) in params.iter().zip(&arg_tys).enumerate() {
                let part = TExpr::TupleDeref {
                    tuple: Box::new(scrutinee.clone()),
                    index: i + 1,
                    ty: arg_ty.clone(),
                };
                let part_test = compile_predicate(ctx, param, &part, arg_ty, binds)?;
                test = conjoin(test, part_test);
            }
            Ok(test)
        }
    }
}

fn literal_test(scrutinee: &TExpr, value: &Literal) -> TExpr {
    match value {
        Literal::Int(_) => TExpr::Builtin {
            name: "__builtin_int_eq".to_string(),
            args: vec![
                scrutinee.clone(),
                TExpr::Literal { value: value.clone(), ty: Type::int() },
            ],
            ty: Type::bool(),
        },
        Literal::Str(_) => TExpr::Builtin {
            name: "__builtin_str_eq".to_string(),
            args: vec![
                scrutinee.clone(),
                TExpr::Literal { value: value.clone(), ty: Type::string() },
            ],
            ty: Type::bool(),
        },
        Literal::Bool(true) => scrutinee.clone(),
        Literal::Bool(false) => TExpr::Builtin {
            name: "__builtin_bool_not".to_string(),
            args: vec![scrutinee.clone()],
            ty: Type::bool(),
        },
    }
}

/// Short-circuit conjunction of two optional tests.
fn conjoin(lhs: Option<TExpr>, rhs: Option<TExpr>) -> Option<TExpr> {
    match (lhs, rhs) {
        (None, rhs) => rhs,
        (lhs, None) => lhs,
        (Some(lhs), Some(rhs)) => Some(TExpr::Cond {
            cond: Box::new(lhs),
            truthy: Box::new(rhs),
            falsey: Box::new(TExpr::Literal { value: Literal::Bool(false), ty: Type::bool() }),
            ty: Type::bool(),
        }),
    }
}
