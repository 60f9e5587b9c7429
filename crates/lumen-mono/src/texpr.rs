//! The typed, monomorphic expression tree.
//!
//! This is the shape between monomorphization and CFG lowering: the same
//! structure as the surface AST minus its sugar. Every node carries a
//! ground type; `match` has already become a decision tree of conditionals
//! over constructor tags and tuple projections; non-forceful casts are
//! gone; variable references are split into locals, output-map keys, and
//! builtin references.

use lumen_ast::expr::Literal;
use lumen_types::Type;

use crate::defn::DefnKey;

/// A typed monomorphic expression.
#[derive(Clone, Debug, PartialEq)]
pub enum TExpr {
    Unit,
    Literal { value: Literal, ty: Type },
    /// A lexically bound name (parameter, let, or pattern binding).
    Local { name: String, ty: Type },
    /// A reference to a monomorphized global definition.
    Global { key: DefnKey, ty: Type },
    /// A reference to a builtin the emitter lowers directly.
    BuiltinRef { name: String, ty: Type },
    Lambda { param: String, body: Box<TExpr>, ty: Type },
    Call { callee: Box<TExpr>, arg: Box<TExpr>, ty: Type },
    Let { name: String, value: Box<TExpr>, body: Box<TExpr>, ty: Type },
    Cond { cond: Box<TExpr>, truthy: Box<TExpr>, falsey: Box<TExpr>, ty: Type },
    Block { statements: Vec<TExpr>, ty: Type },
    While { condition: Box<TExpr>, block: Box<TExpr> },
    Break,
    Continue,
    Return { value: Box<TExpr> },
    Tuple { dims: Vec<TExpr>, ty: Type },
    TupleDeref { tuple: Box<TExpr>, index: usize, ty: Type },
    /// A representation-changing cast; the only one left after
    /// translation.
    Cast { inner: Box<TExpr>, ty: Type },
    Builtin { name: String, args: Vec<TExpr>, ty: Type },
}

impl TExpr {
    /// The node's (ground) type.
    pub fn ty(&self) -> Type {
        match self {
            TExpr::Unit | TExpr::While { .. } | TExpr::Break | TExpr::Continue => Type::unit(),
            TExpr::Return { .. } => Type::bottom(),
            TExpr::Literal { ty, .. }
            | TExpr::Local { ty, .. }
            | TExpr::Global { ty, .. }
            | TExpr::BuiltinRef { ty, .. }
            | TExpr::Lambda { ty, .. }
            | TExpr::Call { ty, .. }
            | TExpr::Let { ty, .. }
            | TExpr::Cond { ty, .. }
            | TExpr::Block { ty, .. }
            | TExpr::Tuple { ty, .. }
            | TExpr::TupleDeref { ty, .. }
            | TExpr::Cast { ty, .. }
            | TExpr::Builtin { ty, .. } => ty.clone(),
        }
    }

    /// Visit every node, outside-in.
    pub fn walk(&self, visit: &mut impl FnMut(&TExpr)) {
        visit(self);
        match self {
            TExpr::Unit
            | TExpr::Literal { .. }
            | TExpr::Local { .. }
            | TExpr::Global { .. }
            | TExpr::BuiltinRef { .. }
            | TExpr::Break
            | TExpr::Continue => {}
            TExpr::Lambda { body, .. } => body.walk(visit),
            TExpr::Call { callee, arg, .. } => {
                callee.walk(visit);
                arg.walk(visit);
            }
            TExpr::Let { value, body, .. } => {
                value.walk(visit);
                body.walk(visit);
            }
            TExpr::Cond { cond, truthy, falsey, .. } => {
                cond.walk(visit);
                truthy.walk(visit);
                falsey.walk(visit);
            }
            TExpr::Block { statements, .. } => {
                for statement in statements {
                    statement.walk(visit);
                }
            }
            TExpr::While { condition, block } => {
                condition.walk(visit);
                block.walk(visit);
            }
            TExpr::Return { value } => value.walk(visit),
            TExpr::Tuple { dims, .. } => {
                for dim in dims {
                    dim.walk(visit);
                }
            }
            TExpr::TupleDeref { tuple, .. } => tuple.walk(visit),
            TExpr::Cast { inner, .. } => inner.walk(visit),
            TExpr::Builtin { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_flow_nodes_are_unit_or_bottom() {
        assert!(TExpr::Break.ty().is_unit());
        assert!(TExpr::Continue.ty().is_unit());
        assert!(TExpr::Unit.ty().is_unit());
        let ret = TExpr::Return {
            value: Box::new(TExpr::Literal { value: Literal::Int(1), ty: Type::int() }),
        };
        assert!(ret.ty().is_bottom());
    }

    #[test]
    fn walk_covers_nested_nodes() {
        let expr = TExpr::Call {
            callee: Box::new(TExpr::Local { name: "f".into(), ty: Type::int() }),
            arg: Box::new(TExpr::Literal { value: Literal::Int(1), ty: Type::int() }),
            ty: Type::int(),
        };
        let mut count = 0;
        expr.walk(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
