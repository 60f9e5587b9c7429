//! Construction support for the raw AST.
//!
//! The parser owns the assignment of `ExprId`s; this builder is the API it
//! (and the test suites) go through. Every constructed node gets a fresh
//! id and a distinct location within the builder's file.

use lumen_common::{Identifier, Location};
use lumen_types::Type;

use crate::expr::{Expr, ExprId, ExprKind, Literal, PatternBlock, Predicate};

/// Issues `ExprId`s and assembles expression nodes.
#[derive(Debug)]
pub struct AstBuilder {
    path: String,
    next_id: u32,
    next_col: u32,
}

impl AstBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        AstBuilder { path: path.into(), next_id: 0, next_col: 0 }
    }

    fn fresh_location(&mut self) -> Location {
        self.next_col += 1;
        Location::new(self.path.clone(), 1, self.next_col)
    }

    /// Wrap a node kind with a fresh id and location.
    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr { id, location: self.fresh_location(), kind }
    }

    pub fn ident(&mut self, name: &str) -> Identifier {
        Identifier::new(name, self.fresh_location())
    }

    // ── Expressions ─────────────────────────────────────────────────────

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Str(value.to_string())))
    }

    pub fn var(&mut self, name: &str) -> Expr {
        let id = self.ident(name);
        self.expr(ExprKind::Var(id))
    }

    pub fn lam(&mut self, param: &str, body: Expr) -> Expr {
        let param = self.ident(param);
        self.expr(ExprKind::Lambda {
            param,
            param_type: None,
            return_type: None,
            body: Box::new(body),
        })
    }

    pub fn lam_typed(
        &mut self,
        param: &str,
        param_type: Option<Type>,
        return_type: Option<Type>,
        body: Expr,
    ) -> Expr {
        let param = self.ident(param);
        self.expr(ExprKind::Lambda { param, param_type, return_type, body: Box::new(body) })
    }

    pub fn app(&mut self, callee: Expr, arg: Expr) -> Expr {
        self.expr(ExprKind::Application { callee: Box::new(callee), arg: Box::new(arg) })
    }

    /// Curried application of two arguments.
    pub fn app2(&mut self, callee: Expr, a: Expr, b: Expr) -> Expr {
        let first = self.app(callee, a);
        self.app(first, b)
    }

    pub fn let_(&mut self, name: &str, value: Expr, body: Expr) -> Expr {
        let name = self.ident(name);
        self.expr(ExprKind::Let { name, value: Box::new(value), body: Box::new(body) })
    }

    pub fn fix(&mut self, f: Expr) -> Expr {
        self.expr(ExprKind::Fix(Box::new(f)))
    }

    pub fn cond(&mut self, cond: Expr, truthy: Expr, falsey: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            cond: Box::new(cond),
            truthy: Box::new(truthy),
            falsey: Box::new(falsey),
        })
    }

    pub fn block(&mut self, statements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Block(statements))
    }

    pub fn while_(&mut self, condition: Expr, block: Expr) -> Expr {
        self.expr(ExprKind::While { condition: Box::new(condition), block: Box::new(block) })
    }

    pub fn break_(&mut self) -> Expr {
        self.expr(ExprKind::Break)
    }

    pub fn continue_(&mut self) -> Expr {
        self.expr(ExprKind::Continue)
    }

    pub fn ret(&mut self, value: Expr) -> Expr {
        self.expr(ExprKind::ReturnStatement(Box::new(value)))
    }

    pub fn tuple(&mut self, dims: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Tuple(dims))
    }

    /// The unit value: a zero-dimension tuple.
    pub fn unit(&mut self) -> Expr {
        self.tuple(Vec::new())
    }

    pub fn tuple_deref(&mut self, expr: Expr, index: usize, max: usize) -> Expr {
        self.expr(ExprKind::TupleDeref { expr: Box::new(expr), index, max })
    }

    pub fn as_(&mut self, expr: Expr, target: Type) -> Expr {
        self.expr(ExprKind::As { expr: Box::new(expr), target, force_cast: false })
    }

    pub fn as_force(&mut self, expr: Expr, target: Type) -> Expr {
        self.expr(ExprKind::As { expr: Box::new(expr), target, force_cast: true })
    }

    pub fn match_(&mut self, scrutinee: Expr, arms: Vec<PatternBlock>) -> Expr {
        self.expr(ExprKind::Match { scrutinee: Box::new(scrutinee), arms })
    }

    pub fn builtin(&mut self, name: &str, args: Vec<Expr>) -> Expr {
        let name = self.ident(name);
        self.expr(ExprKind::Builtin { name, args })
    }

    pub fn sizeof(&mut self, ty: Type) -> Expr {
        self.expr(ExprKind::Sizeof(ty))
    }

    pub fn static_print(&mut self, inner: Expr) -> Expr {
        self.expr(ExprKind::StaticPrint(Box::new(inner)))
    }

    // ── Patterns ────────────────────────────────────────────────────────

    pub fn arm(&mut self, predicate: Predicate, result: Expr) -> PatternBlock {
        PatternBlock { predicate, result }
    }

    pub fn p_any(&mut self, name: Option<&str>) -> Predicate {
        let name = name.map(|n| self.ident(n));
        Predicate::Irrefutable { name, location: self.fresh_location() }
    }

    pub fn p_ctor(&mut self, ctor: &str, params: Vec<Predicate>) -> Predicate {
        let ctor = self.ident(ctor);
        Predicate::Ctor { ctor, params, name: None, location: self.fresh_location() }
    }

    pub fn p_tuple(&mut self, params: Vec<Predicate>) -> Predicate {
        Predicate::Tuple { params, name: None, location: self.fresh_location() }
    }

    pub fn p_int(&mut self, value: i64) -> Predicate {
        Predicate::Literal { value: Literal::Int(value), location: self.fresh_location() }
    }

    pub fn p_bool(&mut self, value: bool) -> Predicate {
        Predicate::Literal { value: Literal::Bool(value), location: self.fresh_location() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut b = AstBuilder::new("t.lm");
        let x = b.var("x");
        let y = b.var("y");
        assert_ne!(x.id, y.id);
    }

    #[test]
    fn locations_are_distinct() {
        let mut b = AstBuilder::new("t.lm");
        let x = b.var("x");
        let y = b.var("y");
        assert_ne!(x.location, y.location);
    }

    #[test]
    fn unit_is_empty_tuple() {
        let mut b = AstBuilder::new("t.lm");
        match b.unit().kind {
            ExprKind::Tuple(dims) => assert!(dims.is_empty()),
            other => panic!("expected tuple, got {other:?}"),
        }
    }
}
