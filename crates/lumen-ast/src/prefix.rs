//! Module-qualified name composition.
//!
//! For a module `M` binding the top-level name set `B`, every free
//! occurrence of a name `n ∈ B` is rewritten to `M.n`. Binder forms
//! shrink `B` for their body; pattern predicates collect the symbols they
//! introduce into a local set without disturbing outer bindings. Inside
//! type expressions and class-parameter lists only uppercase-initial names
//! (type identifiers, data constructors, class names) are prefixed.

use std::collections::BTreeSet;

use lumen_common::Identifier;
use lumen_types::ty::TypeVariable;
use lumen_types::{ClassPredicate, ClassPredicates, Type};

use crate::decl::{DataCtor, Decl, Instance, Module, TypeClass, TypeDecl};
use crate::expr::{Expr, ExprKind, PatternBlock, Predicate};

/// Prefix a bare name if it is bound at the module's top level.
pub fn prefix_name(bindings: &BTreeSet<String>, pre: &str, name: &str) -> String {
    if bindings.contains(name) {
        format!("{pre}.{name}")
    } else {
        name.to_string()
    }
}

pub fn prefix_identifier(bindings: &BTreeSet<String>, pre: &str, id: &Identifier) -> Identifier {
    Identifier::new(prefix_name(bindings, pre, &id.name), id.location.clone())
}

fn only_uppercase_bindings(bindings: &BTreeSet<String>) -> BTreeSet<String> {
    bindings
        .iter()
        .filter(|name| name.as_bytes().first().is_some_and(|b| b.is_ascii_uppercase()))
        .cloned()
        .collect()
}

fn without(bindings: &BTreeSet<String>, name: &str) -> BTreeSet<String> {
    let mut smaller = bindings.clone();
    smaller.remove(name);
    smaller
}

fn set_diff(bindings: &BTreeSet<String>, removed: &BTreeSet<String>) -> BTreeSet<String> {
    bindings.difference(removed).cloned().collect()
}

// ── Types ───────────────────────────────────────────────────────────────

/// Prefix type identifiers. Only uppercase-initial bindings apply inside
/// type expressions.
pub fn prefix_type(bindings: &BTreeSet<String>, pre: &str, ty: &Type) -> Type {
    let upper = only_uppercase_bindings(bindings);
    prefix_type_upper(&upper, pre, ty)
}

fn prefix_type_upper(upper: &BTreeSet<String>, pre: &str, ty: &Type) -> Type {
    match ty {
        Type::Id(id) => Type::Id(prefix_identifier(upper, pre, id)),
        Type::Variable(var) => Type::Variable(TypeVariable {
            id: var.id.clone(),
            predicates: var
                .predicates
                .iter()
                .map(|p| prefix_class_predicate_upper(upper, pre, p))
                .collect(),
        }),
        Type::Operator(f, x) => {
            Type::operator(prefix_type_upper(upper, pre, f), prefix_type_upper(upper, pre, x))
        }
        // The binder is a type variable; uppercase filtering already keeps
        // it out of the prefixed set.
        Type::Lambda(param, body) => {
            Type::lambda(param.clone(), prefix_type_upper(upper, pre, body))
        }
    }
}

pub fn prefix_class_predicate(
    bindings: &BTreeSet<String>,
    pre: &str,
    pred: &ClassPredicate,
) -> ClassPredicate {
    prefix_class_predicate_upper(&only_uppercase_bindings(bindings), pre, pred)
}

fn prefix_class_predicate_upper(
    upper: &BTreeSet<String>,
    pre: &str,
    pred: &ClassPredicate,
) -> ClassPredicate {
    ClassPredicate::new(
        prefix_identifier(upper, pre, &pred.classname),
        pred.params.iter().map(|p| prefix_type_upper(upper, pre, p)).collect(),
    )
}

pub fn prefix_class_predicates(
    bindings: &BTreeSet<String>,
    pre: &str,
    preds: &ClassPredicates,
) -> ClassPredicates {
    preds.iter().map(|p| prefix_class_predicate(bindings, pre, p)).collect()
}

// ── Expressions ─────────────────────────────────────────────────────────

pub fn prefix_expr(bindings: &BTreeSet<String>, pre: &str, expr: &Expr) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
        ExprKind::Var(id) => ExprKind::Var(prefix_identifier(bindings, pre, id)),
        ExprKind::Lambda { param, param_type, return_type, body } => {
            let inner = without(bindings, &param.name);
            ExprKind::Lambda {
                param: param.clone(),
                param_type: param_type.as_ref().map(|t| prefix_type(bindings, pre, t)),
                return_type: return_type.as_ref().map(|t| prefix_type(bindings, pre, t)),
                body: Box::new(prefix_expr(&inner, pre, body)),
            }
        }
        ExprKind::Application { callee, arg } => ExprKind::Application {
            callee: Box::new(prefix_expr(bindings, pre, callee)),
            arg: Box::new(prefix_expr(bindings, pre, arg)),
        },
        ExprKind::Let { name, value, body } => {
            let inner = without(bindings, &name.name);
            ExprKind::Let {
                name: name.clone(),
                value: Box::new(prefix_expr(&inner, pre, value)),
                body: Box::new(prefix_expr(&inner, pre, body)),
            }
        }
        ExprKind::Fix(f) => ExprKind::Fix(Box::new(prefix_expr(bindings, pre, f))),
        ExprKind::Conditional { cond, truthy, falsey } => ExprKind::Conditional {
            cond: Box::new(prefix_expr(bindings, pre, cond)),
            truthy: Box::new(prefix_expr(bindings, pre, truthy)),
            falsey: Box::new(prefix_expr(bindings, pre, falsey)),
        },
        ExprKind::Block(statements) => {
            ExprKind::Block(statements.iter().map(|s| prefix_expr(bindings, pre, s)).collect())
        }
        ExprKind::While { condition, block } => ExprKind::While {
            condition: Box::new(prefix_expr(bindings, pre, condition)),
            block: Box::new(prefix_expr(bindings, pre, block)),
        },
        ExprKind::Break => ExprKind::Break,
        ExprKind::Continue => ExprKind::Continue,
        ExprKind::ReturnStatement(value) => {
            ExprKind::ReturnStatement(Box::new(prefix_expr(bindings, pre, value)))
        }
        ExprKind::Tuple(dims) => {
            ExprKind::Tuple(dims.iter().map(|d| prefix_expr(bindings, pre, d)).collect())
        }
        ExprKind::TupleDeref { expr: inner, index, max } => ExprKind::TupleDeref {
            expr: Box::new(prefix_expr(bindings, pre, inner)),
            index: *index,
            max: *max,
        },
        ExprKind::As { expr: inner, target, force_cast } => ExprKind::As {
            expr: Box::new(prefix_expr(bindings, pre, inner)),
            target: prefix_type(bindings, pre, target),
            force_cast: *force_cast,
        },
        ExprKind::Match { scrutinee, arms } => ExprKind::Match {
            scrutinee: Box::new(prefix_expr(bindings, pre, scrutinee)),
            arms: arms.iter().map(|arm| prefix_pattern_block(bindings, pre, arm)).collect(),
        },
        ExprKind::Builtin { name, args } => ExprKind::Builtin {
            name: name.clone(),
            args: args.iter().map(|a| prefix_expr(bindings, pre, a)).collect(),
        },
        ExprKind::Sizeof(ty) => ExprKind::Sizeof(prefix_type(bindings, pre, ty)),
        ExprKind::StaticPrint(inner) => {
            ExprKind::StaticPrint(Box::new(prefix_expr(bindings, pre, inner)))
        }
    };
    Expr { id: expr.id, location: expr.location.clone(), kind }
}

/// Prefix a pattern predicate, accumulating the value names it binds.
///
/// Constructor references are prefixed like any other free name; name
/// assignments go into `new_symbols` and shadow the module bindings for
/// the arm's result.
fn prefix_predicate(
    bindings: &BTreeSet<String>,
    pre: &str,
    predicate: &Predicate,
    new_symbols: &mut BTreeSet<String>,
) -> Predicate {
    match predicate {
        Predicate::Irrefutable { name, location } => {
            if let Some(name) = name {
                new_symbols.insert(name.name.clone());
            }
            Predicate::Irrefutable { name: name.clone(), location: location.clone() }
        }
        Predicate::Tuple { params, name, location } => {
            if let Some(name) = name {
                new_symbols.insert(name.name.clone());
            }
            Predicate::Tuple {
                params: params
                    .iter()
                    .map(|p| prefix_predicate(bindings, pre, p, new_symbols))
                    .collect(),
                name: name.clone(),
                location: location.clone(),
            }
        }
        Predicate::Ctor { ctor, params, name, location } => {
            if let Some(name) = name {
                new_symbols.insert(name.name.clone());
            }
            Predicate::Ctor {
                ctor: prefix_identifier(bindings, pre, ctor),
                params: params
                    .iter()
                    .map(|p| prefix_predicate(bindings, pre, p, new_symbols))
                    .collect(),
                name: name.clone(),
                location: location.clone(),
            }
        }
        Predicate::Literal { .. } => predicate.clone(),
    }
}

pub fn prefix_pattern_block(
    bindings: &BTreeSet<String>,
    pre: &str,
    block: &PatternBlock,
) -> PatternBlock {
    let mut new_symbols = BTreeSet::new();
    let predicate = prefix_predicate(bindings, pre, &block.predicate, &mut new_symbols);
    PatternBlock {
        predicate,
        result: prefix_expr(&set_diff(bindings, &new_symbols), pre, &block.result),
    }
}

// ── Declarations ────────────────────────────────────────────────────────

pub fn prefix_decl(bindings: &BTreeSet<String>, pre: &str, decl: &Decl) -> Decl {
    Decl {
        var: prefix_identifier(bindings, pre, &decl.var),
        value: prefix_expr(bindings, pre, &decl.value),
    }
}

pub fn prefix_type_decl(bindings: &BTreeSet<String>, pre: &str, type_decl: &TypeDecl) -> TypeDecl {
    TypeDecl {
        id: prefix_identifier(bindings, pre, &type_decl.id),
        params: type_decl.params.clone(),
        ctors: type_decl
            .ctors
            .iter()
            .map(|ctor| DataCtor {
                id: prefix_identifier(bindings, pre, &ctor.id),
                arg_types: ctor.arg_types.iter().map(|t| prefix_type(bindings, pre, t)).collect(),
            })
            .collect(),
    }
}

pub fn prefix_type_class(
    bindings: &BTreeSet<String>,
    pre: &str,
    type_class: &TypeClass,
) -> TypeClass {
    TypeClass {
        id: prefix_identifier(bindings, pre, &type_class.id),
        params: type_class.params.clone(),
        superclasses: prefix_class_predicates(bindings, pre, &type_class.superclasses),
        overloads: type_class
            .overloads
            .iter()
            .map(|(name, ty)| {
                (prefix_identifier(bindings, pre, name), prefix_type(bindings, pre, ty))
            })
            .collect(),
    }
}

pub fn prefix_instance(bindings: &BTreeSet<String>, pre: &str, instance: &Instance) -> Instance {
    Instance {
        class_predicate: prefix_class_predicate(bindings, pre, &instance.class_predicate),
        where_predicates: prefix_class_predicates(bindings, pre, &instance.where_predicates),
        decls: instance.decls.iter().map(|d| prefix_decl(bindings, pre, d)).collect(),
    }
}

/// Prefix a whole module against its own top-level binding set.
pub fn prefix_module(module: &Module) -> Module {
    let bindings = module.bound_names();
    let pre = module.name.as_str();
    Module {
        name: module.name.clone(),
        decls: module.decls.iter().map(|d| prefix_decl(&bindings, pre, d)).collect(),
        type_decls: module.type_decls.iter().map(|t| prefix_type_decl(&bindings, pre, t)).collect(),
        type_classes: module
            .type_classes
            .iter()
            .map(|c| prefix_type_class(&bindings, pre, c))
            .collect(),
        instances: module.instances.iter().map(|i| prefix_instance(&bindings, pre, i)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::AstBuilder;

    fn bindings(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn free_names_are_prefixed() {
        let mut b = AstBuilder::new("m.lm");
        let expr = b.var("helper");
        let prefixed = prefix_expr(&bindings(&["helper"]), "m", &expr);
        match prefixed.kind {
            ExprKind::Var(id) => assert_eq!(id.name, "m.helper"),
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn unbound_names_are_untouched() {
        let mut b = AstBuilder::new("m.lm");
        let expr = b.var("other");
        let prefixed = prefix_expr(&bindings(&["helper"]), "m", &expr);
        match prefixed.kind {
            ExprKind::Var(id) => assert_eq!(id.name, "other"),
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn lambda_param_shadows_binding() {
        let mut b = AstBuilder::new("m.lm");
        let body = b.var("helper");
        let lam = b.lam("helper", body);
        let prefixed = prefix_expr(&bindings(&["helper"]), "m", &lam);
        assert_eq!(prefixed.to_string(), "(λhelper. helper)");
    }

    #[test]
    fn let_shadows_in_value_and_body() {
        let mut b = AstBuilder::new("m.lm");
        let value = b.var("x");
        let body = b.var("x");
        let let_expr = b.let_("x", value, body);
        let prefixed = prefix_expr(&bindings(&["x"]), "m", &let_expr);
        assert_eq!(prefixed.to_string(), "(let x = x in x)");
    }

    #[test]
    fn pattern_bindings_shadow_arm_result() {
        let mut b = AstBuilder::new("m.lm");
        // match s { Just x -> x }: the pattern binds x, shadowing a
        // module-level x inside the arm body.
        let inner = b.p_any(Some("x"));
        let pat = b.p_ctor("Just", vec![inner]);
        let result = b.var("x");
        let arm = b.arm(pat, result);
        let prefixed = prefix_pattern_block(&bindings(&["x", "Just"]), "m", &arm);
        match &prefixed.predicate {
            Predicate::Ctor { ctor, .. } => assert_eq!(ctor.name, "m.Just"),
            other => panic!("expected ctor predicate, got {other:?}"),
        }
        assert_eq!(prefixed.result.to_string(), "x");
    }

    #[test]
    fn types_prefix_only_uppercase() {
        let ty = Type::operator(Type::con("Maybe"), Type::con("item"));
        let prefixed = prefix_type(&bindings(&["Maybe", "item"]), "m", &ty);
        assert_eq!(prefixed.to_string(), "m.Maybe item");
    }

    #[test]
    fn module_prefix_covers_decls_and_ctors() {
        let mut b = AstBuilder::new("m.lm");
        let value = b.var("two");
        let mut module = Module::new("m");
        module.decls.push(Decl { var: b.ident("one"), value });
        module.decls.push({
            let lit = b.int(2);
            Decl { var: b.ident("two"), value: lit }
        });
        let prefixed = prefix_module(&module);
        assert_eq!(prefixed.decls[0].var.name, "m.one");
        assert_eq!(prefixed.decls[0].value.to_string(), "m.two");
        assert_eq!(prefixed.decls[1].var.name, "m.two");
    }

    #[test]
    fn prefix_preserves_expr_ids() {
        let mut b = AstBuilder::new("m.lm");
        let expr = b.var("helper");
        let id = expr.id;
        let prefixed = prefix_expr(&bindings(&["helper"]), "m", &expr);
        assert_eq!(prefixed.id, id);
    }
}
