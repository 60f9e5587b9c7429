//! The compilation pipeline.
//!
//! Phases, in order: module prefixing; declaration collection (data
//! constructors, classes, instances -- immutable afterwards); per-decl
//! inference, solving, and generalization with poisoned-scheme recovery;
//! instance-method checking against the class signatures; entry-point
//! resolution; monomorphization; CFG lowering.

use lumen_ast::decl::{Instance, Module};
use lumen_ast::prefix::prefix_module;
use lumen_common::{Config, Identifier, Location, UserError};
use lumen_mono::translate::{monomorphize, CheckedDecl, MonoEnv};
use lumen_mono::{lower_program, Program};
use lumen_typeck::classes::ClassEnv;
use lumen_typeck::env::{DataCtorsMap, TrackedTypes, TypeEnv};
use lumen_typeck::infer::{infer, InferCtx};
use lumen_typeck::solve::{generalize_decl, solve};
use lumen_typeck::{builtins, Constraint, ConstraintContext, Constraints, TypeError};
use lumen_types::{ClassPredicates, NameSupply, Scheme, Subst, Type};
use rustc_hash::FxHashMap;

/// The result of compiling a set of modules.
#[derive(Debug)]
pub struct Compilation {
    /// The closed typed program, when no errors were emitted.
    pub program: Option<Program>,
    /// Accumulated per-declaration errors, in source order.
    pub errors: Vec<UserError>,
    /// `static_print` reports from monomorphization.
    pub static_prints: Vec<(Location, String)>,
    /// Declared names and their normalized schemes, in check order.
    pub schemes: Vec<(String, String)>,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && self.program.is_some()
    }
}

/// The compiler driver. Holds startup configuration only; all per-run
/// state lives in `compile`.
#[derive(Debug, Default)]
pub struct Driver {
    config: Config,
}

impl Driver {
    pub fn new(config: Config) -> Self {
        Driver { config }
    }

    /// Install a tracing subscriber mapping `DEBUG` verbosity onto level
    /// filters. Safe to call more than once; later calls are no-ops.
    pub fn init_logging(config: &Config) {
        let filter = match config.debug_level {
            0 => "error",
            1..=3 => "info",
            4..=6 => "debug",
            _ => "trace",
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Compile with a prelude prepended, unless `NO_STD_LIB` was set.
    ///
    /// The prelude is just more modules -- typically the standard library
    /// handed over by the file-discovery collaborator.
    pub fn compile_with_prelude(
        &self,
        prelude: &[Module],
        modules: &[Module],
        entry: &str,
    ) -> Compilation {
        if self.config.no_std_lib {
            return self.compile(modules, entry);
        }
        let mut all = prelude.to_vec();
        all.extend(modules.iter().cloned());
        self.compile(&all, entry)
    }

    /// Compile prefixed modules down to the typed IR.
    ///
    /// `entry` names the entry-point declaration, unqualified; a unique
    /// module-qualified match (`m.main` for `main`) is accepted.
    pub fn compile(&self, modules: &[Module], entry: &str) -> Compilation {
        let mut supply = NameSupply::new();
        let mut env = TypeEnv::new();
        let mut data_ctors = DataCtorsMap::new();
        let mut class_env = ClassEnv::new();
        let mut errors: Vec<UserError> = Vec::new();

        if !self.config.no_builtins {
            builtins::register_builtins(&mut env);
        }

        let modules: Vec<Module> = modules.iter().map(prefix_module).collect();

        // ── Declaration collection pre-pass ─────────────────────────────
        for module in &modules {
            for type_decl in &module.type_decls {
                if let Err(err) = data_ctors.register_type_decl(type_decl) {
                    errors.push(err.to_user_error());
                }
            }
        }
        let ctor_infos: Vec<_> = data_ctors.all_ctors().cloned().collect();
        for info in ctor_infos {
            env.insert(&info.id.name, info.scheme.clone());
        }
        for module in &modules {
            for type_class in &module.type_classes {
                match class_env.register_class(type_class) {
                    Ok(overloads) => {
                        for (name, scheme) in overloads {
                            env.insert(&name.name, scheme);
                        }
                    }
                    Err(err) => errors.push(err.to_user_error()),
                }
            }
        }
        for module in &modules {
            for instance in &module.instances {
                if let Err(err) = class_env.register_instance(instance) {
                    errors.push(err.to_user_error());
                }
            }
        }

        // ── Value declarations, with per-decl recovery ──────────────────
        let mut decls: FxHashMap<String, CheckedDecl> = FxHashMap::default();
        let mut decl_locations: FxHashMap<String, Location> = FxHashMap::default();
        let mut schemes = Vec::new();
        for module in &modules {
            for decl in &module.decls {
                let name = decl.var.name.clone();
                if let Some(previous) = decl_locations.get(&name) {
                    errors.push(
                        TypeError::DuplicateDeclaration {
                            id: decl.var.clone(),
                            previous: previous.clone(),
                        }
                        .to_user_error(),
                    );
                    continue;
                }
                decl_locations.insert(name.clone(), decl.var.location.clone());

                match check_decl(decl, &env, &data_ctors, &class_env, &mut supply) {
                    Ok(checked) => {
                        schemes.push((name.clone(), checked.scheme.normalize().to_string()));
                        env.insert(&name, checked.scheme.clone());
                        decls.insert(name, checked);
                    }
                    Err(err) => {
                        errors.push(err.to_user_error());
                        // Poisoned scheme: downstream declarations still
                        // type-check against `∀ a b. a -> b`.
                        env.insert(&name, poisoned_scheme());
                    }
                }
            }
        }

        // ── Instance methods ────────────────────────────────────────────
        let mut methods: FxHashMap<String, Vec<CheckedDecl>> = FxHashMap::default();
        for module in &modules {
            for instance in &module.instances {
                check_instance_methods(
                    instance,
                    &env,
                    &data_ctors,
                    &class_env,
                    &mut supply,
                    &mut methods,
                    &mut errors,
                );
            }
        }

        if self.config.show_types {
            print!("{}", crate::dump::schemes_text(&schemes));
        }
        if self.config.show_env {
            println!("{}", crate::dump::env_json(&env));
        }

        if !errors.is_empty() {
            return Compilation { program: None, errors, static_prints: Vec::new(), schemes };
        }

        // ── Entry point ─────────────────────────────────────────────────
        let entry_id = match resolve_entry(&decls, entry) {
            Some(id) => id,
            None => {
                if self.config.no_std_main {
                    // No wrapper requested and no entry found: a bare
                    // library unit is fine.
                    return Compilation {
                        program: None,
                        errors,
                        static_prints: Vec::new(),
                        schemes,
                    };
                }
                errors.push(UserError::new(
                    Location::internal(),
                    format!("entry point `{entry}` is not declared"),
                ));
                return Compilation { program: None, errors, static_prints: Vec::new(), schemes };
            }
        };

        // ── Monomorphization and lowering ───────────────────────────────
        let mono_env = MonoEnv { decls: &decls, methods: &methods, data_ctors: &data_ctors };
        match monomorphize(&entry_id, &mono_env, &mut supply) {
            Ok(mono) => {
                let static_prints = mono.static_prints.clone();
                let program = lower_program(&mono);
                Compilation { program: Some(program), errors, static_prints, schemes }
            }
            Err(mono_errors) => {
                errors.extend(mono_errors);
                Compilation { program: None, errors, static_prints: Vec::new(), schemes }
            }
        }
    }
}

/// The recovery scheme installed for failed declarations: `∀ a b. a -> b`
/// unifies with any use site, so downstream errors stay focused.
fn poisoned_scheme() -> Scheme {
    let a = Type::variable(Identifier::internal("a"));
    let b = Type::variable(Identifier::internal("b"));
    Scheme::new(
        vec!["a".to_string(), "b".to_string()],
        ClassPredicates::new(),
        Type::arrow(a, b),
    )
}

/// Infer, solve, and generalize one top-level declaration.
fn check_decl(
    decl: &lumen_ast::decl::Decl,
    env: &TypeEnv,
    data_ctors: &DataCtorsMap,
    class_env: &ClassEnv,
    supply: &mut NameSupply,
) -> Result<CheckedDecl, TypeError> {
    let mut tracked = TrackedTypes::default();
    let mut constraints = Constraints::new();
    let mut requirements = ClassPredicates::new();
    let mut ctx = InferCtx {
        data_ctors,
        class_env,
        tracked: &mut tracked,
        constraints: &mut constraints,
        instance_requirements: &mut requirements,
        supply,
        return_type: None,
        loop_depth: 0,
    };
    let ty = infer(&decl.value, env, &mut ctx)?;

    let solved = solve(&constraints, &requirements, class_env, supply)?;
    let ty = ty.rebind(&solved.subst);
    for tracked_ty in tracked.values_mut() {
        *tracked_ty = tracked_ty.rebind(&solved.subst);
    }
    let scheme = generalize_decl(env, solved.deferred, ty.clone(), class_env, supply)?;
    tracing::debug!(name = %decl.var.name, scheme = %scheme, "checked declaration");

    Ok(CheckedDecl { name: decl.var.clone(), scheme, ty, body: decl.value.clone(), tracked })
}

/// Check every method declaration of one instance against the class's
/// signature at the instance's type arguments.
fn check_instance_methods(
    instance: &Instance,
    env: &TypeEnv,
    data_ctors: &DataCtorsMap,
    class_env: &ClassEnv,
    supply: &mut NameSupply,
    methods: &mut FxHashMap<String, Vec<CheckedDecl>>,
    errors: &mut Vec<UserError>,
) {
    let class = match class_env.class(&instance.class_predicate.classname.name) {
        Some(class) => class,
        // Registration already reported the unknown class.
        None => return,
    };
    let pattern_subst = Subst::from_pairs(
        class
            .params
            .iter()
            .zip(&instance.class_predicate.params)
            .map(|(param, ty)| (param.name.clone(), ty.clone()))
            .collect(),
    );

    for decl in &instance.decls {
        let overload = class.overloads.iter().find(|(name, _)| *name == decl.var);
        let expected = match overload {
            Some((_, ty)) => ty.rebind(&pattern_subst),
            // Extra methods were not declared by the class; registration
            // kept them, monomorphization will never ask for them.
            None => continue,
        };

        let mut tracked = TrackedTypes::default();
        let mut constraints = Constraints::new();
        let mut requirements = instance.where_predicates.clone();
        let mut ctx = InferCtx {
            data_ctors,
            class_env,
            tracked: &mut tracked,
            constraints: &mut constraints,
            instance_requirements: &mut requirements,
            supply,
            return_type: None,
            loop_depth: 0,
        };
        let ty = match infer(&decl.value, env, &mut ctx) {
            Ok(ty) => ty,
            Err(err) => {
                errors.push(err.to_user_error());
                continue;
            }
        };
        constraints.push(Constraint::new(
            ty.clone(),
            expected,
            ConstraintContext::new("instance method signature", decl.var.location.clone()),
        ));

        let solved = match solve(&constraints, &requirements, class_env, supply) {
            Ok(solved) => solved,
            Err(err) => {
                errors.push(err.to_user_error());
                continue;
            }
        };
        let ty = ty.rebind(&solved.subst);
        for tracked_ty in tracked.values_mut() {
            *tracked_ty = tracked_ty.rebind(&solved.subst);
        }
        let scheme = match generalize_decl(env, solved.deferred, ty.clone(), class_env, supply) {
            Ok(scheme) => scheme,
            Err(err) => {
                errors.push(err.to_user_error());
                continue;
            }
        };

        methods.entry(decl.var.name.clone()).or_default().push(CheckedDecl {
            name: decl.var.clone(),
            scheme,
            ty,
            body: decl.value.clone(),
            tracked,
        });
    }
}

/// Find the entry declaration: exact name, or a unique `<module>.<entry>`
/// qualified match.
fn resolve_entry(decls: &FxHashMap<String, CheckedDecl>, entry: &str) -> Option<Identifier> {
    if let Some(checked) = decls.get(entry) {
        return Some(checked.name.clone());
    }
    let suffix = format!(".{entry}");
    let mut matches = decls.keys().filter(|name| name.ends_with(&suffix));
    match (matches.next(), matches.next()) {
        (Some(name), None) => Some(decls[name].name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ast::decl::Decl;
    use lumen_ast::AstBuilder;

    #[test]
    fn init_logging_is_idempotent() {
        let config = Config { debug_level: 5, ..Config::default() };
        Driver::init_logging(&config);
        Driver::init_logging(&config);
    }

    #[test]
    fn poisoned_scheme_unifies_anywhere() {
        let scheme = poisoned_scheme();
        assert_eq!(scheme.normalize().to_string(), "a -> b");
        assert_eq!(scheme.vars.len(), 2);
    }

    #[test]
    fn poisoned_decl_does_not_cascade() {
        // bad = undefined_name; good = λx. x -- bad errors, good still
        // checks, and the unit reports exactly one error.
        let mut b = AstBuilder::new("m.lm");
        let bad_body = b.var("undefined_name");
        let x = b.var("x");
        let good_body = b.lam("x", x);
        let user = b.var("bad");
        let one = b.int(1);
        let call = b.app(user, one);
        let use_body = b.lam("u", call);

        let mut module = Module::new("m");
        module.decls.push(Decl { var: b.ident("bad"), value: bad_body });
        module.decls.push(Decl { var: b.ident("good"), value: good_body });
        module.decls.push(Decl { var: b.ident("uses_bad"), value: use_body });

        let driver = Driver::new(Config::default());
        let compilation = driver.compile(&[module], "uses_bad");
        assert_eq!(compilation.errors.len(), 1, "{:?}", compilation.errors);
        assert!(compilation.errors[0].message.contains("undefined identifier"));
        // good's scheme was still computed.
        assert!(compilation
            .schemes
            .iter()
            .any(|(name, scheme)| name == "m.good" && scheme == "a -> a"));
    }

    #[test]
    fn entry_resolution_accepts_qualified_match() {
        let mut b = AstBuilder::new("m.lm");
        let zero = b.int(0);
        let main_body = b.lam("u", zero);
        let mut module = Module::new("m");
        module.decls.push(Decl { var: b.ident("main"), value: main_body });

        let driver = Driver::new(Config::default());
        let compilation = driver.compile(&[module], "main");
        assert!(compilation.succeeded(), "{:?}", compilation.errors);
        let program = compilation.program.unwrap();
        assert_eq!(program.entry.name, "m.main");
    }

    #[test]
    fn missing_entry_is_an_error_unless_no_std_main() {
        let module = Module::new("m");
        let driver = Driver::new(Config::default());
        let compilation = driver.compile(&[module.clone()], "main");
        assert!(!compilation.errors.is_empty());

        let lenient = Driver::new(Config { no_std_main: true, ..Config::default() });
        let compilation = lenient.compile(&[module], "main");
        assert!(compilation.errors.is_empty());
        assert!(compilation.program.is_none());
    }

    #[test]
    fn no_std_lib_skips_the_prelude() {
        let mut b = AstBuilder::new("std.lm");
        let x = b.var("x");
        let id_body = b.lam("x", x);
        let mut prelude = Module::new("std");
        prelude.decls.push(Decl { var: b.ident("id"), value: id_body });

        let mut b2 = AstBuilder::new("m.lm");
        let id_ref = b2.var("std.id");
        let one = b2.int(1);
        let call = b2.app(id_ref, one);
        let main_body = b2.lam("u", call);
        let mut module = Module::new("m");
        module.decls.push(Decl { var: b2.ident("main"), value: main_body });

        let with_std = Driver::new(Config::default());
        let compilation =
            with_std.compile_with_prelude(&[prelude.clone()], &[module.clone()], "main");
        assert!(compilation.succeeded(), "{:?}", compilation.errors);

        let without_std = Driver::new(Config { no_std_lib: true, ..Config::default() });
        let compilation = without_std.compile_with_prelude(&[prelude], &[module], "main");
        assert!(compilation
            .errors
            .iter()
            .any(|e| e.message.contains("undefined identifier")));
    }

    #[test]
    fn no_builtins_suppresses_registration() {
        let mut b = AstBuilder::new("m.lm");
        let one = b.int(1);
        let two = b.int(2);
        let add = b.builtin("__builtin_add_int", vec![one, two]);
        let main_body = b.lam("u", add);
        let mut module = Module::new("m");
        module.decls.push(Decl { var: b.ident("main"), value: main_body });

        let driver = Driver::new(Config { no_builtins: true, ..Config::default() });
        let compilation = driver.compile(&[module], "main");
        assert!(compilation
            .errors
            .iter()
            .any(|e| e.message.contains("undefined identifier")));
    }
}
