//! Expression nodes.

use std::fmt;

use lumen_common::{Identifier, Location};
use lumen_types::Type;

/// A unique identifier for an expression node within one compilation.
///
/// Side tables produced during inference (`TrackedTypes`) are keyed by
/// `ExprId`, so ids must be stable across the prefixing pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A literal value token.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// An expression: a node id, a source location, and the node itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub location: Location,
    pub kind: ExprKind,
}

/// The expression variants the parser produces.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Var(Identifier),
    Lambda {
        param: Identifier,
        param_type: Option<Type>,
        return_type: Option<Type>,
        body: Box<Expr>,
    },
    Application {
        callee: Box<Expr>,
        arg: Box<Expr>,
    },
    Let {
        name: Identifier,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// The fixpoint combinator. Top-level recursion goes through global
    /// definitions instead; `Fix` only appears for local recursive values.
    Fix(Box<Expr>),
    Conditional {
        cond: Box<Expr>,
        truthy: Box<Expr>,
        falsey: Box<Expr>,
    },
    Block(Vec<Expr>),
    While {
        condition: Box<Expr>,
        block: Box<Expr>,
    },
    Break,
    Continue,
    ReturnStatement(Box<Expr>),
    /// A tuple construction. Zero dimensions is the unit value.
    Tuple(Vec<Expr>),
    TupleDeref {
        expr: Box<Expr>,
        index: usize,
        /// Arity of the tuple being dereferenced, as written.
        max: usize,
    },
    /// A type ascription or cast. Non-forceful casts constrain the
    /// expression's type; forceful casts reinterpret the representation.
    As {
        expr: Box<Expr>,
        target: Type,
        force_cast: bool,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<PatternBlock>,
    },
    /// A direct call to a registered builtin.
    Builtin {
        name: Identifier,
        args: Vec<Expr>,
    },
    Sizeof(Type),
    /// Compile-time type reporting; evaluates to unit.
    StaticPrint(Box<Expr>),
}

/// A match-arm pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matches anything, optionally binding the scrutinee.
    Irrefutable {
        name: Option<Identifier>,
        location: Location,
    },
    /// Matches a tuple, destructuring its parts.
    Tuple {
        params: Vec<Predicate>,
        name: Option<Identifier>,
        location: Location,
    },
    /// Matches a data constructor, destructuring its arguments.
    Ctor {
        ctor: Identifier,
        params: Vec<Predicate>,
        name: Option<Identifier>,
        location: Location,
    },
    /// Matches a literal value.
    Literal { value: Literal, location: Location },
}

impl Predicate {
    pub fn location(&self) -> &Location {
        match self {
            Predicate::Irrefutable { location, .. }
            | Predicate::Tuple { location, .. }
            | Predicate::Ctor { location, .. }
            | Predicate::Literal { location, .. } => location,
        }
    }
}

/// One arm of a `match`: a pattern and its result expression.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternBlock {
    pub predicate: Predicate,
    pub result: Expr,
}

impl Expr {
    /// Visit this expression and all descendants, outside-in.
    pub fn walk(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Var(_)
            | ExprKind::Break
            | ExprKind::Continue
            | ExprKind::Sizeof(_) => {}
            ExprKind::Lambda { body, .. } => body.walk(visit),
            ExprKind::Application { callee, arg } => {
                callee.walk(visit);
                arg.walk(visit);
            }
            ExprKind::Let { value, body, .. } => {
                value.walk(visit);
                body.walk(visit);
            }
            ExprKind::Fix(inner)
            | ExprKind::ReturnStatement(inner)
            | ExprKind::StaticPrint(inner) => inner.walk(visit),
            ExprKind::Conditional { cond, truthy, falsey } => {
                cond.walk(visit);
                truthy.walk(visit);
                falsey.walk(visit);
            }
            ExprKind::Block(statements) => {
                for statement in statements {
                    statement.walk(visit);
                }
            }
            ExprKind::While { condition, block } => {
                condition.walk(visit);
                block.walk(visit);
            }
            ExprKind::Tuple(dims) => {
                for dim in dims {
                    dim.walk(visit);
                }
            }
            ExprKind::TupleDeref { expr, .. } => expr.walk(visit),
            ExprKind::As { expr, .. } => expr.walk(visit),
            ExprKind::Match { scrutinee, arms } => {
                scrutinee.walk(visit);
                for arm in arms {
                    arm.result.walk(visit);
                }
            }
            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Var(id) => write!(f, "{}", id.name),
            ExprKind::Lambda { param, body, .. } => write!(f, "(λ{}. {})", param.name, body),
            ExprKind::Application { callee, arg } => write!(f, "({callee} {arg})"),
            ExprKind::Let { name, value, body } => {
                write!(f, "(let {} = {} in {})", name.name, value, body)
            }
            ExprKind::Fix(inner) => write!(f, "(fix {inner})"),
            ExprKind::Conditional { cond, truthy, falsey } => {
                write!(f, "(if {cond} {truthy} {falsey})")
            }
            ExprKind::Block(statements) => {
                write!(f, "{{")?;
                for statement in statements {
                    write!(f, " {statement};")?;
                }
                write!(f, " }}")
            }
            ExprKind::While { condition, block } => write!(f, "(while {condition} {block})"),
            ExprKind::Break => write!(f, "break"),
            ExprKind::Continue => write!(f, "continue"),
            ExprKind::ReturnStatement(inner) => write!(f, "(return {inner})"),
            ExprKind::Tuple(dims) => {
                write!(f, "(")?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{dim}")?;
                }
                write!(f, ")")
            }
            ExprKind::TupleDeref { expr, index, .. } => write!(f, "{expr}.{index}"),
            ExprKind::As { expr, target, force_cast } => {
                if *force_cast {
                    write!(f, "({expr} as! {target})")
                } else {
                    write!(f, "({expr} as {target})")
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                write!(f, "(match {scrutinee} [{} arms])", arms.len())
            }
            ExprKind::Builtin { name, args } => {
                write!(f, "({}", name.name)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Sizeof(ty) => write!(f, "(sizeof {ty})"),
            ExprKind::StaticPrint(inner) => write!(f, "(static_print {inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::AstBuilder;

    #[test]
    fn walk_visits_every_node() {
        let mut b = AstBuilder::new("t.lm");
        let f = b.var("f");
        let one = b.int(1);
        let two = b.int(2);
        let pair = b.tuple(vec![one, two]);
        let expr = b.app(f, pair);
        let mut count = 0;
        expr.walk(&mut |_| count += 1);
        assert_eq!(count, 5);
    }

    #[test]
    fn display_reads_like_source() {
        let mut b = AstBuilder::new("t.lm");
        let x = b.var("x");
        let expr = b.lam("x", x);
        assert_eq!(expr.to_string(), "(λx. x)");
    }
}
