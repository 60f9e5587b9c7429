//! The constraint generator.
//!
//! `infer` walks a raw expression producing fresh type variables, equality
//! constraints, and class-predicate requirements, recording the type of
//! every node in the `TrackedTypes` side map. Constraints are solved
//! afterwards (per declaration) by [`crate::solve`]; `let` bindings solve
//! their bound expression eagerly so the binding can be generalized.

use lumen_common::Location;
use lumen_types::{generalize, ClassPredicates, NameSupply, Scheme, Type};

use lumen_ast::expr::{Expr, ExprKind, Literal, Predicate};

use crate::classes::ClassEnv;
use crate::constraint::{Constraint, ConstraintContext, Constraints};
use crate::env::{DataCtorsMap, TrackedTypes, TypeEnv};
use crate::error::TypeError;
use crate::solve::solve;

/// Mutable inference state, threaded explicitly through the walk.
pub struct InferCtx<'a> {
    pub data_ctors: &'a DataCtorsMap,
    pub class_env: &'a ClassEnv,
    pub tracked: &'a mut TrackedTypes,
    pub constraints: &'a mut Constraints,
    pub instance_requirements: &'a mut ClassPredicates,
    pub supply: &'a mut NameSupply,
    /// Codomain of the enclosing function, if any. `return` constrains it.
    pub return_type: Option<Type>,
    /// Current loop nesting depth; `break`/`continue` require depth > 0.
    pub loop_depth: u32,
}

impl<'a> InferCtx<'a> {
    fn constrain(&mut self, lhs: Type, rhs: Type, message: &str, location: &Location) {
        self.constraints.push(Constraint::new(
            lhs,
            rhs,
            ConstraintContext::new(message, location.clone()),
        ));
    }
}

fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Int(_) => Type::int(),
        Literal::Bool(_) => Type::bool(),
        Literal::Str(_) => Type::string(),
    }
}

/// Infer the type of `expr` under `env`, accumulating constraints.
pub fn infer(expr: &Expr, env: &TypeEnv, ctx: &mut InferCtx) -> Result<Type, TypeError> {
    let ty = infer_kind(expr, env, ctx)?;
    ctx.tracked.insert(expr.id, ty.clone());
    tracing::trace!(expr = %expr, ty = %ty, "inferred");
    Ok(ty)
}

fn infer_kind(expr: &Expr, env: &TypeEnv, ctx: &mut InferCtx) -> Result<Type, TypeError> {
    match &expr.kind {
        ExprKind::Literal(literal) => Ok(literal_type(literal)),

        ExprKind::Var(id) => match env.get(&id.name) {
            Some(scheme) => {
                let (ty, predicates) = scheme.instantiate(ctx.supply);
                ctx.instance_requirements.extend(predicates);
                Ok(ty)
            }
            None => Err(TypeError::UndefinedIdentifier { id: id.clone() }),
        },

        ExprKind::Lambda { param, param_type, return_type, body } => {
            let param_ty = ctx.supply.fresh_var(param.location.clone());
            let ret_ty = ctx.supply.fresh_var(expr.location.clone());
            if let Some(annotation) = param_type {
                ctx.constrain(
                    param_ty.clone(),
                    annotation.clone(),
                    "parameter annotation",
                    &param.location,
                );
            }
            if let Some(annotation) = return_type {
                ctx.constrain(
                    ret_ty.clone(),
                    annotation.clone(),
                    "return annotation",
                    &expr.location,
                );
            }

            let inner_env = env.extend(&param.name, Scheme::mono(param_ty.clone()));
            let saved_return = ctx.return_type.replace(ret_ty.clone());
            let saved_depth = std::mem::replace(&mut ctx.loop_depth, 0);
            let body_ty = infer(body, &inner_env, ctx)?;
            ctx.return_type = saved_return;
            ctx.loop_depth = saved_depth;

            ctx.constrain(ret_ty.clone(), body_ty, "function body", &body.location);
            Ok(Type::arrow(param_ty, ret_ty))
        }

        ExprKind::Application { callee, arg } => {
            let callee_ty = infer(callee, env, ctx)?;
            let arg_ty = infer(arg, env, ctx)?;
            let result = ctx.supply.fresh_var(expr.location.clone());
            ctx.constrain(
                callee_ty,
                Type::arrow(arg_ty, result.clone()),
                "function call",
                &expr.location,
            );
            Ok(result)
        }

        ExprKind::Let { name, value, body } => {
            // Solve the bound expression's constraints eagerly so the
            // binding can be generalized (let-polymorphism). The
            // constraints stay in the main list too: the outer solve
            // re-derives any bindings that touch enclosing variables.
            let mark = ctx.constraints.len();
            let requirements_before = ctx.instance_requirements.clone();
            let value_ty = infer(value, env, ctx)?;
            let sub_constraints: Constraints = ctx.constraints[mark..].to_vec();
            let value_requirements =
                ctx.instance_requirements.difference(&requirements_before);
            *ctx.instance_requirements = requirements_before;

            let solved = solve(&sub_constraints, &value_requirements, ctx.class_env, ctx.supply)?;
            let value_ty = value_ty.rebind(&solved.subst);
            let env_ftv = env.ftv_under(&solved.subst);
            let generalized = generalize(&env_ftv, solved.deferred, value_ty);
            // Predicates that only mention enclosing variables flow back
            // out to the declaration-level resolution.
            ctx.instance_requirements.extend(generalized.leftover);
            tracing::debug!(name = %name.name, scheme = %generalized.scheme, "let-generalized");

            let inner_env = env.extend(&name.name, generalized.scheme);
            infer(body, &inner_env, ctx)
        }

        ExprKind::Fix(f) => {
            let f_ty = infer(f, env, ctx)?;
            let result = ctx.supply.fresh_var(expr.location.clone());
            ctx.constrain(
                f_ty,
                Type::arrow(result.clone(), result.clone()),
                "fixpoint",
                &expr.location,
            );
            Ok(result)
        }

        ExprKind::Conditional { cond, truthy, falsey } => {
            let cond_ty = infer(cond, env, ctx)?;
            ctx.constrain(cond_ty, Type::bool(), "if condition", &cond.location);
            let truthy_ty = infer(truthy, env, ctx)?;
            let falsey_ty = infer(falsey, env, ctx)?;
            ctx.constrain(truthy_ty.clone(), falsey_ty, "if branches", &expr.location);
            Ok(truthy_ty)
        }

        ExprKind::Block(statements) => {
            let mut block_ty = Type::unit();
            for statement in statements {
                block_ty = infer(statement, env, ctx)?;
            }
            Ok(block_ty)
        }

        ExprKind::While { condition, block } => {
            let cond_ty = infer(condition, env, ctx)?;
            ctx.constrain(cond_ty, Type::bool(), "while condition", &condition.location);
            ctx.loop_depth += 1;
            let result = infer(block, env, ctx);
            ctx.loop_depth -= 1;
            result?;
            Ok(Type::unit())
        }

        ExprKind::Break => {
            if ctx.loop_depth == 0 {
                return Err(TypeError::BreakOutsideLoop { location: expr.location.clone() });
            }
            Ok(Type::unit())
        }

        ExprKind::Continue => {
            if ctx.loop_depth == 0 {
                return Err(TypeError::ContinueOutsideLoop {
                    location: expr.location.clone(),
                });
            }
            Ok(Type::unit())
        }

        ExprKind::ReturnStatement(value) => {
            let return_type = match &ctx.return_type {
                Some(ty) => ty.clone(),
                None => {
                    return Err(TypeError::ReturnOutsideFunction {
                        location: expr.location.clone(),
                    })
                }
            };
            let value_ty = infer(value, env, ctx)?;
            ctx.constrain(value_ty, return_type, "return value", &expr.location);
            Ok(Type::bottom())
        }

        ExprKind::Tuple(dims) => {
            if dims.is_empty() {
                return Ok(Type::unit());
            }
            let mut dim_types = Vec::with_capacity(dims.len());
            for dim in dims {
                dim_types.push(infer(dim, env, ctx)?);
            }
            Ok(Type::tuple(dim_types))
        }

        ExprKind::TupleDeref { expr: inner, index, max } => {
            if index >= max {
                return Err(TypeError::TupleIndexOutOfBounds {
                    index: *index,
                    arity: *max,
                    location: expr.location.clone(),
                });
            }
            let inner_ty = infer(inner, env, ctx)?;
            let dims: Vec<Type> =
                (0..*max).map(|_| ctx.supply.fresh_var(expr.location.clone())).collect();
            let result = dims[*index].clone();
            ctx.constrain(inner_ty, Type::tuple(dims), "tuple dereference", &expr.location);
            Ok(result)
        }

        ExprKind::As { expr: inner, target, force_cast } => {
            let inner_ty = infer(inner, env, ctx)?;
            if !force_cast {
                ctx.constrain(inner_ty, target.clone(), "type ascription", &expr.location);
            }
            Ok(target.clone())
        }

        ExprKind::Match { scrutinee, arms } => {
            let scrutinee_ty = infer(scrutinee, env, ctx)?;
            let result = ctx.supply.fresh_var(expr.location.clone());
            for arm in arms {
                let arm_env = infer_predicate(&arm.predicate, &scrutinee_ty, env, ctx)?;
                let arm_ty = infer(&arm.result, &arm_env, ctx)?;
                ctx.constrain(
                    arm_ty,
                    result.clone(),
                    "match arms agree",
                    &arm.result.location,
                );
            }
            Ok(result)
        }

        ExprKind::Builtin { name, args } => {
            let scheme = env
                .get(&name.name)
                .ok_or_else(|| TypeError::UndefinedIdentifier { id: name.clone() })?;
            let (mut builtin_ty, predicates) = scheme.instantiate(ctx.supply);
            ctx.instance_requirements.extend(predicates);
            for arg in args {
                let arg_ty = infer(arg, env, ctx)?;
                let result = ctx.supply.fresh_var(expr.location.clone());
                ctx.constrain(
                    builtin_ty,
                    Type::arrow(arg_ty, result.clone()),
                    "builtin call",
                    &expr.location,
                );
                builtin_ty = result;
            }
            Ok(builtin_ty)
        }

        ExprKind::Sizeof(_) => Ok(Type::int()),

        ExprKind::StaticPrint(inner) => {
            infer(inner, env, ctx)?;
            Ok(Type::unit())
        }
    }
}

/// Type a match-arm pattern against the scrutinee, returning the arm's
/// extended environment.
fn infer_predicate(
    predicate: &Predicate,
    scrutinee_ty: &Type,
    env: &TypeEnv,
    ctx: &mut InferCtx,
) -> Result<TypeEnv, TypeError> {
    match predicate {
        Predicate::Irrefutable { name, .. } => Ok(match name {
            Some(name) => env.extend(&name.name, Scheme::mono(scrutinee_ty.clone())),
            None => env.clone(),
        }),

        Predicate::Tuple { params, name, location } => {
            let dims: Vec<Type> =
                (0..params.len()).map(|_| ctx.supply.fresh_var(location.clone())).collect();
            ctx.constrain(
                scrutinee_ty.clone(),
                Type::tuple(dims.clone()),
                "tuple pattern",
                location,
            );
            let mut arm_env = env.clone();
            for (param, dim) in params.iter().zip(&dims) {
                arm_env = infer_predicate(param, dim, &arm_env, ctx)?;
            }
            if let Some(name) = name {
                arm_env = arm_env.extend(&name.name, Scheme::mono(scrutinee_ty.clone()));
            }
            Ok(arm_env)
        }

        Predicate::Ctor { ctor, params, name, location } => {
            let info = ctx
                .data_ctors
                .lookup_ctor(&ctor.name)
                .ok_or_else(|| TypeError::UndefinedIdentifier { id: ctor.clone() })?
                .clone();
            if params.len() != info.arity {
                return Err(TypeError::CtorArityMismatch {
                    ctor: ctor.clone(),
                    expected: info.arity,
                    found: params.len(),
                    location: location.clone(),
                });
            }
            let (ctor_ty, predicates) = info.scheme.instantiate(ctx.supply);
            ctx.instance_requirements.extend(predicates);
            let terms: Vec<Type> = ctor_ty.unfold_arrows().into_iter().cloned().collect();
            let result_ty = terms.last().expect("ctor scheme has a result").clone();
            ctx.constrain(
                scrutinee_ty.clone(),
                result_ty,
                "constructor pattern",
                location,
            );
            let mut arm_env = env.clone();
            for (param, arg_ty) in params.iter().zip(&terms[..terms.len() - 1]) {
                arm_env = infer_predicate(param, arg_ty, &arm_env, ctx)?;
            }
            if let Some(name) = name {
                arm_env = arm_env.extend(&name.name, Scheme::mono(scrutinee_ty.clone()));
            }
            Ok(arm_env)
        }

        Predicate::Literal { value, location } => {
            ctx.constrain(
                scrutinee_ty.clone(),
                literal_type(value),
                "literal pattern",
                location,
            );
            Ok(env.clone())
        }
    }
}
