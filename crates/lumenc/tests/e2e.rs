//! End-to-end pipeline tests.
//!
//! Each test builds a module the way the parser would, runs the full
//! driver (prefixing, declaration collection, inference, class
//! resolution, monomorphization, lowering), and asserts on the resulting
//! typed program or the accumulated errors.

use lumen_ast::decl::{DataCtor, Decl, Instance, Module, TypeClass, TypeDecl};
use lumen_ast::AstBuilder;
use lumen_common::{Config, Identifier};
use lumen_mono::Value;
use lumen_types::{ClassPredicate, ClassPredicates, Type};
use lumenc::Driver;

fn driver() -> Driver {
    Driver::new(Config::default())
}

fn tv(name: &str) -> Type {
    Type::variable(Identifier::internal(name))
}

/// `data Maybe a = Just a | Nothing`.
fn maybe_decl() -> TypeDecl {
    TypeDecl {
        id: Identifier::internal("Maybe"),
        params: vec![Identifier::internal("a")],
        ctors: vec![
            DataCtor { id: Identifier::internal("Just"), arg_types: vec![tv("a")] },
            DataCtor { id: Identifier::internal("Nothing"), arg_types: vec![] },
        ],
    }
}

/// `class Show a { show : a -> String }`.
fn show_class() -> TypeClass {
    TypeClass {
        id: Identifier::internal("Show"),
        params: vec![Identifier::internal("a")],
        superclasses: ClassPredicates::new(),
        overloads: vec![(
            Identifier::internal("show"),
            Type::arrow(tv("a"), Type::string()),
        )],
    }
}

/// `instance Show Int { show = __builtin_int_show }`.
fn show_int_instance(b: &mut AstBuilder) -> Instance {
    let body = b.var("__builtin_int_show");
    Instance {
        class_predicate: ClassPredicate::new(Identifier::internal("Show"), vec![Type::int()]),
        where_predicates: ClassPredicates::new(),
        decls: vec![Decl { var: b.ident("show"), value: body }],
    }
}

fn defn_names(program: &lumen_mono::Program) -> Vec<String> {
    let mut names: Vec<String> =
        program.defns.keys().map(|key| key.to_string()).collect();
    names.sort();
    names
}

// ── S1: identity function ───────────────────────────────────────────────

#[test]
fn identity_function_monomorphizes_at_int() {
    let mut b = AstBuilder::new("m.lm");
    let x = b.var("x");
    let id_body = b.lam("x", x);
    let id_ref = b.var("id");
    let three = b.int(3);
    let call = b.app(id_ref, three);
    let main_body = b.lam("u", call);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("id"), value: id_body });
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    assert!(compilation
        .schemes
        .iter()
        .any(|(name, scheme)| name == "m.id" && scheme == "a -> a"));

    let program = compilation.program.unwrap();
    let names = defn_names(&program);
    assert!(names.contains(&"m.id :: Int -> Int".to_string()), "{names:?}");
    assert_eq!(program.entry.to_string(), "m.main :: Unit -> Int");
}

// ── S2: one declaration, two specializations ────────────────────────────

#[test]
fn polymorphic_let_use_at_two_types() {
    let mut b = AstBuilder::new("m.lm");
    let x = b.var("x");
    let id_body = b.lam("x", x);

    // main = λu. let i = id in (i 1, i true)
    let id_ref = b.var("id");
    let i1 = b.var("i");
    let one = b.int(1);
    let first = b.app(i1, one);
    let i2 = b.var("i");
    let tru = b.boolean(true);
    let second = b.app(i2, tru);
    let pair = b.tuple(vec![first, second]);
    let let_expr = b.let_("i", id_ref, pair);
    let main_body = b.lam("u", let_expr);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("id"), value: id_body });
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let names = defn_names(&program);
    assert!(names.contains(&"m.id :: Int -> Int".to_string()), "{names:?}");
    assert!(names.contains(&"m.id :: Bool -> Bool".to_string()), "{names:?}");
}

// ── S3: type-class dispatch without dictionaries ────────────────────────

#[test]
fn class_method_resolves_to_instance_body() {
    let mut b = AstBuilder::new("m.lm");
    let show_ref = b.var("show");
    let five = b.int(5);
    let call = b.app(show_ref, five);
    let main_body = b.lam("u", call);

    let mut module = Module::new("m");
    module.type_classes.push(show_class());
    let instance = show_int_instance(&mut b);
    module.instances.push(instance);
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let names = defn_names(&program);
    assert!(names.contains(&"m.show :: Int -> String".to_string()), "{names:?}");

    // The specialized method is a direct builtin reference.
    let direct = program
        .arena
        .values()
        .any(|(_, v)| matches!(v, Value::Builtin { name, .. } if name == "__builtin_int_show"));
    assert!(direct, "expected a direct reference to __builtin_int_show");
}

#[test]
fn parametric_instance_chains_through_where_clause() {
    // instance (Show a) => Show (Maybe a), used at Maybe Int: the method
    // specializes at Maybe Int and its body's `show x` pulls in the Int
    // instance.
    let mut b = AstBuilder::new("m.lm");

    let m = b.var("m");
    let inner = b.p_any(Some("x"));
    let just_pat = b.p_ctor("Just", vec![inner]);
    let show_inner = b.var("show");
    let x = b.var("x");
    let rec = b.app(show_inner, x);
    let arm1 = b.arm(just_pat, rec);
    let nothing_pat = b.p_ctor("Nothing", vec![]);
    let none_str = b.string("nothing");
    let arm2 = b.arm(nothing_pat, none_str);
    let match_expr = b.match_(m, vec![arm1, arm2]);
    let maybe_show_body = b.lam("m", match_expr);

    let wheres: ClassPredicates =
        [ClassPredicate::new(Identifier::internal("Show"), vec![tv("a")])]
            .into_iter()
            .collect();
    let maybe_instance = Instance {
        class_predicate: ClassPredicate::new(
            Identifier::internal("Show"),
            vec![Type::maybe(tv("a"))],
        ),
        where_predicates: wheres,
        decls: vec![Decl { var: b.ident("show"), value: maybe_show_body }],
    };

    let show_ref = b.var("show");
    let just = b.var("Just");
    let five = b.int(5);
    let arg = b.app(just, five);
    let call = b.app(show_ref, arg);
    let main_body = b.lam("u", call);

    let mut module = Module::new("m");
    module.type_decls.push(maybe_decl());
    module.type_classes.push(show_class());
    let int_instance = show_int_instance(&mut b);
    module.instances.push(int_instance);
    module.instances.push(maybe_instance);
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let names = defn_names(&program);
    assert!(
        names.contains(&"m.show :: m.Maybe Int -> String".to_string()),
        "{names:?}"
    );
    assert!(names.contains(&"m.show :: Int -> String".to_string()), "{names:?}");
    assert!(names.contains(&"m.Just :: Int -> m.Maybe Int".to_string()), "{names:?}");
}

// ── S4 / S5: match exhaustiveness ───────────────────────────────────────

#[test]
fn exhaustive_match_lowers_to_decision_tree() {
    let mut b = AstBuilder::new("m.lm");
    let m = b.var("m");
    let inner = b.p_any(Some("x"));
    let just_pat = b.p_ctor("Just", vec![inner]);
    let x = b.var("x");
    let arm1 = b.arm(just_pat, x);
    let nothing_pat = b.p_ctor("Nothing", vec![]);
    let zero = b.int(0);
    let arm2 = b.arm(nothing_pat, zero);
    let match_expr = b.match_(m, vec![arm1, arm2]);
    let main_body = b.lam("m", match_expr);

    let mut module = Module::new("m");
    module.type_decls.push(maybe_decl());
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();

    // The tag test lowers to a conditional branch over a tuple
    // projection of slot 0.
    let branches = program
        .arena
        .values()
        .filter(|(_, v)| matches!(v, Value::CondBranch { .. }))
        .count();
    assert_eq!(branches, 1);
    let tag_reads = program
        .arena
        .values()
        .filter(|(_, v)| matches!(v, Value::TupleDeref { index: 0, .. }))
        .count();
    assert!(tag_reads >= 1, "expected a constructor tag read");
}

#[test]
fn non_exhaustive_match_reports_missing_ctor() {
    let mut b = AstBuilder::new("m.lm");
    let m = b.var("m");
    let inner = b.p_any(Some("x"));
    let just_pat = b.p_ctor("Just", vec![inner]);
    let x = b.var("x");
    let arm1 = b.arm(just_pat, x);
    let match_expr = b.match_(m, vec![arm1]);
    let main_body = b.lam("m", match_expr);

    let mut module = Module::new("m");
    module.type_decls.push(maybe_decl());
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(!compilation.succeeded());
    let error = &compilation.errors[0];
    assert!(error.message.contains("not exhaustive"), "{}", error.message);
    assert!(
        error.infos.iter().any(|info| info.message.contains("Nothing")),
        "witness should mention Nothing: {:?}",
        error.infos
    );
}

#[test]
fn arm_shadowed_by_wildcard_is_unreachable() {
    let mut b = AstBuilder::new("m.lm");
    let m = b.var("m");
    let wild = b.p_any(None);
    let zero = b.int(0);
    let arm1 = b.arm(wild, zero);
    let inner = b.p_any(Some("x"));
    let just_pat = b.p_ctor("Just", vec![inner]);
    let x = b.var("x");
    let arm2 = b.arm(just_pat, x);
    let match_expr = b.match_(m, vec![arm1, arm2]);
    let main_body = b.lam("m", match_expr);

    let mut module = Module::new("m");
    module.type_decls.push(maybe_decl());
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("unreachable")));
}

// ── S6: occurs check ────────────────────────────────────────────────────

#[test]
fn self_application_is_an_infinite_type() {
    let mut b = AstBuilder::new("m.lm");
    let f1 = b.var("f");
    let f2 = b.var("f");
    let app = b.app(f1, f2);
    let main_body = b.lam("f", app);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation
        .errors
        .iter()
        .any(|e| e.message.contains("infinite type")));
}

// ── S7: dead code after return ──────────────────────────────────────────

#[test]
fn statement_after_return_is_rejected() {
    let mut b = AstBuilder::new("m.lm");
    let x1 = b.var("x");
    let ret = b.ret(x1);
    let x2 = b.var("x");
    let one = b.int(1);
    let add = b.builtin("__builtin_add_int", vec![x2, one]);
    let body = b.block(vec![ret, add]);
    let main_body = b.lam("x", body);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("never run")));
}

#[test]
fn missing_return_path_is_reported() {
    // main = λx. { if x { return 1 } else { __builtin_print "x" } }: the
    // else branch falls off the end of an Int-returning function.
    let mut b = AstBuilder::new("m.lm");
    let x = b.var("x");
    let one = b.int(1);
    let ret = b.ret(one);
    let truthy = b.block(vec![ret]);
    let msg = b.string("x");
    let print = b.builtin("__builtin_print", vec![msg]);
    let falsey = b.block(vec![print]);
    let cond = b.cond(x, truthy, falsey);
    let body = b.block(vec![cond]);
    let main_body = b.lam("x", body);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(
        compilation.errors.iter().any(|e| e.message.contains("not all control paths")),
        "{:?}",
        compilation.errors
    );
}

#[test]
fn unit_codomain_allows_partial_returns() {
    // main = λx. { if x { return () } else { __builtin_print "x" } }:
    // falling off the end of a unit function lowers cleanly.
    let mut b = AstBuilder::new("m.lm");
    let x = b.var("x");
    let unit = b.unit();
    let ret = b.ret(unit);
    let truthy = b.block(vec![ret]);
    let msg = b.string("x");
    let print = b.builtin("__builtin_print", vec![msg]);
    let falsey = b.block(vec![print]);
    let cond = b.cond(x, truthy, falsey);
    let body = b.block(vec![cond]);
    let main_body = b.lam("x", body);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    assert_eq!(compilation.program.unwrap().entry.to_string(), "m.main :: Bool -> Unit");
}

// ── Class resolution failure modes ──────────────────────────────────────

#[test]
fn missing_instance_is_reported() {
    let mut b = AstBuilder::new("m.lm");
    let show_ref = b.var("show");
    let tru = b.boolean(true);
    let call = b.app(show_ref, tru);
    let main_body = b.lam("u", call);

    let mut module = Module::new("m");
    module.type_classes.push(show_class());
    let instance = show_int_instance(&mut b);
    module.instances.push(instance);
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("no instance")));
}

#[test]
fn bare_variable_instance_makes_resolution_ambiguous() {
    let mut b = AstBuilder::new("m.lm");
    let catch_all_body = b.var("__builtin_int_show");
    let catch_all = Instance {
        class_predicate: ClassPredicate::new(Identifier::internal("Show"), vec![tv("z")]),
        where_predicates: ClassPredicates::new(),
        decls: vec![Decl { var: b.ident("show"), value: catch_all_body }],
    };
    let show_ref = b.var("show");
    let five = b.int(5);
    let call = b.app(show_ref, five);
    let main_body = b.lam("u", call);

    let mut module = Module::new("m");
    module.type_classes.push(show_class());
    let int_instance = show_int_instance(&mut b);
    module.instances.push(int_instance);
    module.instances.push(catch_all);
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("ambiguous")));
}

#[test]
fn duplicate_instance_is_a_declaration_error() {
    let mut b = AstBuilder::new("m.lm");
    let zero = b.int(0);
    let main_body = b.lam("u", zero);

    let mut module = Module::new("m");
    module.type_classes.push(show_class());
    let first = show_int_instance(&mut b);
    let second = show_int_instance(&mut b);
    module.instances.push(first);
    module.instances.push(second);
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("duplicate instance")));
}

// ── Control flow and builtins ───────────────────────────────────────────

#[test]
fn while_break_compiles_to_block_graph() {
    let mut b = AstBuilder::new("m.lm");
    let tru = b.boolean(true);
    let brk = b.break_();
    let loop_body = b.block(vec![brk]);
    let while_expr = b.while_(tru, loop_body);
    let zero = b.int(0);
    let body = b.block(vec![while_expr, zero]);
    let main_body = b.lam("u", body);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let gotos = program
        .arena
        .values()
        .filter(|(_, v)| matches!(v, Value::Goto { .. }))
        .count();
    assert!(gotos >= 2, "loop entry and break gotos expected");
}

#[test]
fn sizeof_lowers_to_word_size_builtin() {
    let mut b = AstBuilder::new("m.lm");
    let size = b.sizeof(Type::maybe(Type::int()));
    let main_body = b.lam("u", size);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let word_size = program
        .arena
        .values()
        .any(|(_, v)| matches!(v, Value::Builtin { name, .. } if name == "__builtin_word_size"));
    assert!(word_size);
}

#[test]
fn static_print_reports_the_inferred_type() {
    let mut b = AstBuilder::new("m.lm");
    let just = b.var("Just");
    let three = b.int(3);
    let arg = b.app(just, three);
    let print = b.static_print(arg);
    let zero = b.int(0);
    let body = b.block(vec![print, zero]);
    let main_body = b.lam("u", body);

    let mut module = Module::new("m");
    module.type_decls.push(maybe_decl());
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    assert_eq!(compilation.static_prints.len(), 1);
    assert_eq!(compilation.static_prints[0].1, "m.Maybe Int");
}

// ── Cross-module references ─────────────────────────────────────────────

#[test]
fn qualified_cross_module_reference_resolves() {
    let mut b = AstBuilder::new("a.lm");
    let x = b.var("x");
    let helper_body = b.lam("x", x);
    let mut module_a = Module::new("a");
    module_a.decls.push(Decl { var: b.ident("helper"), value: helper_body });

    let mut b2 = AstBuilder::new("b.lm");
    let helper_ref = b2.var("a.helper");
    let one = b2.int(1);
    let call = b2.app(helper_ref, one);
    let main_body = b2.lam("u", call);
    let mut module_b = Module::new("b");
    module_b.decls.push(Decl { var: b2.ident("main"), value: main_body });

    let compilation = driver().compile(&[module_a, module_b], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let names = defn_names(&program);
    assert!(names.contains(&"a.helper :: Int -> Int".to_string()), "{names:?}");
}

// ── Forceful casts ──────────────────────────────────────────────────────

#[test]
fn pointer_cast_survives_as_cast_value() {
    let mut b = AstBuilder::new("m.lm");
    // main = λp. (p as! Ptr Bool) with p : Ptr Int via annotation.
    let p = b.var("p");
    let cast = b.as_force(p, Type::ptr(Type::bool()));
    let main_body = b.lam_typed("p", Some(Type::ptr(Type::int())), None, cast);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.succeeded(), "{:?}", compilation.errors);
    let program = compilation.program.unwrap();
    let casts = program
        .arena
        .values()
        .filter(|(_, v)| matches!(v, Value::Cast { .. }))
        .count();
    assert_eq!(casts, 1);
}

#[test]
fn non_pointer_forceful_cast_is_rejected() {
    let mut b = AstBuilder::new("m.lm");
    let one = b.int(1);
    let cast = b.as_force(one, Type::bool());
    let main_body = b.lam("u", cast);

    let mut module = Module::new("m");
    module.decls.push(Decl { var: b.ident("main"), value: main_body });

    let compilation = driver().compile(&[module], "main");
    assert!(compilation.errors.iter().any(|e| e.message.contains("unsupported cast")));
}
