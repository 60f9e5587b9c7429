//! Lowering from the typed monomorphic tree to the CFG IR.
//!
//! Every definition gets a placeholder root first, so cross-references
//! (including mutual recursion) resolve by handle; bodies are filled in a
//! second pass. Lambdas become single-argument functions (curried
//! application is preserved); `while`/`break`/`continue` become block
//! graphs; value-producing conditionals merge through `Phi`.

use lumen_types::Type;
use rustc_hash::FxHashMap;

use crate::defn::DefnKey;
use crate::ir::{Arena, BlockId, Program, Value, ValueId};
use crate::texpr::TExpr;
use crate::translate::Monomorphized;

/// Lower all monomorphized definitions into one typed program.
pub fn lower_program(mono: &Monomorphized) -> Program {
    let mut arena = Arena::new();
    let mut defns: FxHashMap<DefnKey, ValueId> = FxHashMap::default();

    // Placeholders first so forward references resolve.
    for (key, _) in &mono.defns {
        let id = arena.alloc(Value::Unit, None);
        defns.insert(key.clone(), id);
    }
    for (key, texpr) in &mono.defns {
        let root = defns[key];
        fill_defn(&mut arena, &defns, root, key, texpr);
    }

    Program { arena, defns, entry: mono.entry.clone() }
}

fn fill_defn(
    arena: &mut Arena,
    defns: &FxHashMap<DefnKey, ValueId>,
    root: ValueId,
    key: &DefnKey,
    texpr: &TExpr,
) {
    if let TExpr::Lambda { .. } = texpr {
        lower_function(arena, defns, root, key.to_string(), texpr, Vec::new());
        return;
    }
    if let Some(value) = lower_const(arena, texpr) {
        arena.replace(root, value);
        return;
    }
    // A non-constant global initializer becomes a nullary function; the
    // emitter thunks it.
    lower_function(arena, defns, root, format!("{key}.init"), texpr, Vec::new());
}

/// Lower a constant initializer without blocks, when possible.
fn lower_const(arena: &mut Arena, texpr: &TExpr) -> Option<Value> {
    match texpr {
        TExpr::Unit => Some(Value::Unit),
        TExpr::Literal { value, ty } => {
            Some(Value::Literal { token: value.to_string(), ty: ty.clone() })
        }
        TExpr::Tuple { dims, ty } => {
            let mut ids = Vec::with_capacity(dims.len());
            for dim in dims {
                let value = lower_const(arena, dim)?;
                ids.push(arena.alloc(value, None));
            }
            Some(Value::Tuple { dims: ids, ty: ty.clone() })
        }
        _ => None,
    }
}

/// Per-function lowering state.
struct FnCtx<'a> {
    arena: &'a mut Arena,
    defns: &'a FxHashMap<DefnKey, ValueId>,
    fn_id: ValueId,
    blocks: Vec<BlockId>,
    current: BlockId,
    /// Set once the current block has a terminator.
    terminated: bool,
    /// Lexical bindings, innermost last.
    locals: Vec<(String, ValueId)>,
    /// Enclosing loops: (header, exit).
    loops: Vec<(BlockId, BlockId)>,
}

impl FnCtx<'_> {
    fn emit(&mut self, value: Value) -> ValueId {
        let terminator = value.is_terminator();
        let id = self.arena.alloc(value, Some(self.fn_id));
        if !self.terminated {
            self.arena.push_instruction(self.current, id);
            self.terminated = terminator;
        }
        id
    }

    fn emit_in(&mut self, block: BlockId, value: Value) -> ValueId {
        let id = self.arena.alloc(value, Some(self.fn_id));
        self.arena.push_instruction(block, id);
        id
    }

    fn new_block(&mut self) -> BlockId {
        let id = self.arena.alloc_block();
        self.blocks.push(id);
        id
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = block;
        self.terminated = false;
    }

    fn lookup(&self, name: &str) -> Option<ValueId> {
        self.locals.iter().rev().find(|(n, _)| n == name).map(|(_, id)| *id)
    }
}

/// Lower one function body into `root`. `seed_locals` carries the
/// enclosing function's bindings for nested lambdas; the emitter performs
/// closure conversion downstream.
fn lower_function(
    arena: &mut Arena,
    defns: &FxHashMap<DefnKey, ValueId>,
    root: ValueId,
    name: String,
    texpr: &TExpr,
    seed_locals: Vec<(String, ValueId)>,
) {
    let (args, body, fn_ty, codomain) = match texpr {
        TExpr::Lambda { param, body, ty } => {
            let terms: Vec<Type> = ty.unfold_arrows().into_iter().cloned().collect();
            let arg = arena.alloc(
                Value::Argument { index: 0, ty: terms[0].clone() },
                Some(root),
            );
            let codomain = Type::arrows(terms[1..].to_vec());
            (vec![(param.clone(), arg)], body.as_ref(), ty.clone(), codomain)
        }
        other => (Vec::new(), other, Type::arrow(Type::unit(), other.ty()), other.ty()),
    };

    let entry = arena.alloc_block();
    let mut locals = seed_locals;
    for (param, arg) in &args {
        locals.push((param.clone(), *arg));
    }
    let mut ctx = FnCtx {
        arena,
        defns,
        fn_id: root,
        blocks: vec![entry],
        current: entry,
        terminated: false,
        locals,
        loops: Vec::new(),
    };

    let result = lower_expr(&mut ctx, body);
    if !ctx.terminated {
        // Translation guarantees the trailing value fits the codomain:
        // expression-styled bodies are pinned to it by inference, and
        // return-styled bodies that fall through were rejected with
        // NotAllPathsReturn unless the codomain is unit.
        if let Some(value_ty) = ctx.arena.value(result).ty() {
            debug_assert!(
                *value_ty == codomain || value_ty.is_bottom(),
                "implicit return of `{value_ty}` from a function returning `{codomain}`"
            );
        }
        ctx.emit(Value::Return { value: result });
    }

    let blocks = ctx.blocks;
    let arg_ids: Vec<ValueId> = args.iter().map(|(_, id)| *id).collect();
    arena.replace(root, Value::Function { name, args: arg_ids, blocks, ty: fn_ty });
}

fn lower_expr(ctx: &mut FnCtx, texpr: &TExpr) -> ValueId {
    match texpr {
        TExpr::Unit => ctx.emit(Value::Unit),

        TExpr::Literal { value, ty } => {
            ctx.emit(Value::Literal { token: value.to_string(), ty: ty.clone() })
        }

        TExpr::Local { name, .. } => ctx
            .lookup(name)
            .unwrap_or_else(|| panic!("unbound local `{name}` survived translation")),

        TExpr::Global { key, .. } => *ctx
            .defns
            .get(key)
            .unwrap_or_else(|| panic!("global `{key}` missing from output map")),

        TExpr::BuiltinRef { name, ty } => {
            ctx.emit(Value::Builtin { name: name.clone(), args: Vec::new(), ty: ty.clone() })
        }

        TExpr::Lambda { .. } => {
            // A nested function value; it may reference enclosing locals.
            let placeholder = ctx.arena.alloc(Value::Unit, Some(ctx.fn_id));
            let name = format!("lambda.{}", placeholder.0);
            let seed = ctx.locals.clone();
            lower_function(ctx.arena, ctx.defns, placeholder, name, texpr, seed);
            placeholder
        }

        TExpr::Call { callee, arg, ty } => {
            let callee_v = lower_expr(ctx, callee);
            let arg_v = lower_expr(ctx, arg);
            ctx.emit(Value::Callsite { callee: callee_v, args: vec![arg_v], ty: ty.clone() })
        }

        TExpr::Let { name, value, body, .. } => {
            let value_v = lower_expr(ctx, value);
            ctx.locals.push((name.clone(), value_v));
            let result = lower_expr(ctx, body);
            ctx.locals.pop();
            result
        }

        TExpr::Cond { cond, truthy, falsey, ty } => {
            let cond_v = lower_expr(ctx, cond);
            let then_b = ctx.new_block();
            let else_b = ctx.new_block();
            ctx.emit(Value::CondBranch { cond: cond_v, truthy: then_b, falsey: else_b });
            ctx.terminated = true;

            ctx.switch_to(then_b);
            let then_v = lower_expr(ctx, truthy);
            let then_end = (ctx.current, ctx.terminated, then_v);

            ctx.switch_to(else_b);
            let else_v = lower_expr(ctx, falsey);
            let else_end = (ctx.current, ctx.terminated, else_v);

            let join = ctx.new_block();
            let mut incoming = Vec::new();
            for (end_block, terminated, value) in [then_end, else_end] {
                if !terminated {
                    ctx.emit_in(end_block, Value::Goto { target: join });
                    incoming.push((end_block, value));
                }
            }
            ctx.switch_to(join);
            if incoming.is_empty() {
                // Both branches returned; the join is unreachable.
                ctx.emit(Value::Unit)
            } else {
                ctx.emit(Value::Phi { incoming, ty: ty.clone() })
            }
        }

        TExpr::Block { statements, .. } => {
            let mut last = None;
            for statement in statements {
                if ctx.terminated {
                    break;
                }
                last = Some(lower_expr(ctx, statement));
            }
            match last {
                Some(value) => value,
                None => ctx.emit(Value::Unit),
            }
        }

        TExpr::While { condition, block } => {
            let header = ctx.new_block();
            ctx.emit(Value::Goto { target: header });
            ctx.terminated = true;

            ctx.switch_to(header);
            let cond_v = lower_expr(ctx, condition);
            let body_b = ctx.new_block();
            let exit_b = ctx.new_block();
            ctx.emit(Value::CondBranch { cond: cond_v, truthy: body_b, falsey: exit_b });
            ctx.terminated = true;

            ctx.loops.push((header, exit_b));
            ctx.switch_to(body_b);
            lower_expr(ctx, block);
            if !ctx.terminated {
                ctx.emit(Value::Goto { target: header });
                ctx.terminated = true;
            }
            ctx.loops.pop();

            ctx.switch_to(exit_b);
            ctx.emit(Value::Unit)
        }

        TExpr::Break => {
            let (_, exit) = *ctx.loops.last().expect("break outside loop survived checking");
            ctx.emit(Value::Goto { target: exit })
        }

        TExpr::Continue => {
            let (header, _) =
                *ctx.loops.last().expect("continue outside loop survived checking");
            ctx.emit(Value::Goto { target: header })
        }

        TExpr::Return { value } => {
            let value_v = lower_expr(ctx, value);
            ctx.emit(Value::Return { value: value_v })
        }

        TExpr::Tuple { dims, ty } => {
            let dim_vs: Vec<ValueId> = dims.iter().map(|d| lower_expr(ctx, d)).collect();
            ctx.emit(Value::Tuple { dims: dim_vs, ty: ty.clone() })
        }

        TExpr::TupleDeref { tuple, index, ty } => {
            let tuple_v = lower_expr(ctx, tuple);
            ctx.emit(Value::TupleDeref { tuple: tuple_v, index: *index, ty: ty.clone() })
        }

        TExpr::Cast { inner, ty } => {
            let inner_v = lower_expr(ctx, inner);
            ctx.emit(Value::Cast { inner: inner_v, target: ty.clone() })
        }

        TExpr::Builtin { name, args, ty } => {
            let arg_vs: Vec<ValueId> = args.iter().map(|a| lower_expr(ctx, a)).collect();
            match (name.as_str(), arg_vs.as_slice()) {
                ("__builtin_load", [ptr]) => ctx.emit(Value::Load { ptr: *ptr, ty: ty.clone() }),
                ("__builtin_deref", [ptr]) => {
                    ctx.emit(Value::Load { ptr: *ptr, ty: ty.clone() })
                }
                ("__builtin_store", [ptr, value]) => {
                    ctx.emit(Value::Store { ptr: *ptr, value: *value })
                }
                _ => ctx.emit(Value::Builtin {
                    name: name.clone(),
                    args: arg_vs,
                    ty: ty.clone(),
                }),
            }
        }
    }
}
