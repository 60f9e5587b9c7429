//! The type-class and instance registry.
//!
//! Classes contribute overload schemes to the typing environment; each
//! scheme carries the class predicate so that every use site of a method
//! turns into an instance requirement. Instances are the witnesses those
//! requirements resolve against.
//!
//! Coherence is enforced at declaration time: at most one instance per
//! (class, head-constant tuple) may be registered, with no overlap
//! precedence. Resolution of a ground predicate therefore has at most one
//! answer unless a bare-variable instance pattern competes with a
//! constructor pattern, which is reported as ambiguous.

use lumen_ast::decl::{Decl, Instance, TypeClass};
use lumen_common::Identifier;
use lumen_types::{
    unify, ClassPredicate, ClassPredicates, NameSupply, Scheme, Subst, Type,
};
use rustc_hash::FxHashMap;

use crate::error::TypeError;

/// A registered class definition.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub id: Identifier,
    pub params: Vec<Identifier>,
    pub superclasses: ClassPredicates,
    pub overloads: Vec<(Identifier, Type)>,
}

/// A registered instance.
#[derive(Clone, Debug)]
pub struct InstanceDef {
    /// Registration-order index, used to key dictionary bindings.
    pub index: usize,
    pub class_predicate: ClassPredicate,
    pub where_predicates: ClassPredicates,
    pub decls: Vec<Decl>,
}

/// The outcome of resolving one predicate.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// Exactly one instance matched.
    Matched(InstanceMatch),
    /// Some argument still has a free variable; try again after
    /// generalization or monomorphization.
    Deferred,
    /// Ground arguments, no instance.
    NoInstance,
    /// More than one instance matched.
    Ambiguous(Vec<String>),
}

/// A successful instance match.
#[derive(Clone, Debug)]
pub struct InstanceMatch {
    pub class: String,
    pub instance_index: usize,
    /// Bindings for the instance pattern's variables.
    pub subst: Subst,
    /// The instance's where-predicates, rebound by the match.
    pub where_predicates: ClassPredicates,
}

/// The global registry of classes and instances.
#[derive(Debug, Default)]
pub struct ClassEnv {
    classes: FxHashMap<String, ClassDef>,
    instances: FxHashMap<String, Vec<InstanceDef>>,
    next_index: usize,
}

impl ClassEnv {
    pub fn new() -> Self {
        ClassEnv::default()
    }

    /// Register a class declaration.
    ///
    /// Returns the overload schemes to install in the typing environment:
    /// for `class Show a { show : a -> String }` the scheme of `show` is
    /// `∀a. (Show a) => a -> String`.
    pub fn register_class(
        &mut self,
        type_class: &TypeClass,
    ) -> Result<Vec<(Identifier, Scheme)>, TypeError> {
        if let Some(existing) = self.classes.get(&type_class.id.name) {
            return Err(TypeError::DuplicateDeclaration {
                id: type_class.id.clone(),
                previous: existing.id.location.clone(),
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for param in &type_class.params {
            if !seen.insert(param.name.clone()) {
                return Err(TypeError::DuplicateTypeVariable {
                    id: param.clone(),
                    decl: type_class.id.clone(),
                });
            }
        }

        let vars: Vec<String> = type_class.params.iter().map(|p| p.name.clone()).collect();
        let class_predicate = ClassPredicate::new(
            type_class.id.clone(),
            type_class.params.iter().map(|p| Type::variable(p.clone())).collect(),
        );

        // Method schemes carry the class predicate plus the superclass
        // constraints: using a method demands the whole hierarchy's
        // witnesses.
        let mut predicates: ClassPredicates = [class_predicate].into_iter().collect();
        predicates.extend(type_class.superclasses.clone());
        let mut schemes = Vec::with_capacity(type_class.overloads.len());
        for (name, ty) in &type_class.overloads {
            schemes.push((name.clone(), Scheme::new(vars.clone(), predicates.clone(), ty.clone())));
        }

        self.classes.insert(
            type_class.id.name.clone(),
            ClassDef {
                id: type_class.id.clone(),
                params: type_class.params.clone(),
                superclasses: type_class.superclasses.clone(),
                overloads: type_class.overloads.clone(),
            },
        );
        Ok(schemes)
    }

    /// Register an instance, enforcing coherence and method completeness.
    pub fn register_instance(&mut self, instance: &Instance) -> Result<(), TypeError> {
        let predicate = &instance.class_predicate;
        let class = self
            .classes
            .get(&predicate.classname.name)
            .ok_or_else(|| TypeError::UnknownClass { id: predicate.classname.clone() })?;

        for (method, _) in &class.overloads {
            if !instance.decls.iter().any(|d| d.var == *method) {
                return Err(TypeError::MissingInstanceMethod {
                    predicate: predicate.clone(),
                    method: method.clone(),
                });
            }
        }

        let shape = head_shape(predicate);
        let existing = self.instances.entry(predicate.classname.name.clone()).or_default();
        for other in existing.iter() {
            if head_shape(&other.class_predicate) == shape {
                return Err(TypeError::DuplicateInstance {
                    predicate: predicate.clone(),
                    previous: other.class_predicate.classname.location.clone(),
                });
            }
        }

        existing.push(InstanceDef {
            index: self.next_index,
            class_predicate: predicate.clone(),
            where_predicates: instance.where_predicates.clone(),
            decls: instance.decls.clone(),
        });
        self.next_index += 1;
        Ok(())
    }

    /// Resolve a predicate against the registered instances.
    pub fn resolve(&self, predicate: &ClassPredicate, supply: &mut NameSupply) -> Resolution {
        // Any free variable in the predicate head defers resolution; a
        // speculative match would wrongly commit the variable.
        if !predicate.ftv().is_empty() {
            return Resolution::Deferred;
        }

        let instances = match self.instances.get(&predicate.classname.name) {
            Some(list) => list,
            None => return Resolution::NoInstance,
        };

        let mut matches = Vec::new();
        for instance in instances {
            if let Some(m) = match_instance(instance, predicate, supply) {
                matches.push(m);
            }
        }
        match matches.len() {
            0 => Resolution::NoInstance,
            1 => Resolution::Matched(matches.pop().expect("one match")),
            _ => Resolution::Ambiguous(
                instances
                    .iter()
                    .filter(|i| match_instance(i, predicate, supply).is_some())
                    .map(|i| i.class_predicate.to_string())
                    .collect(),
            ),
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn instances_of(&self, class: &str) -> &[InstanceDef] {
        self.instances.get(class).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Try to match one instance's type-argument pattern against a ground
/// predicate. Pattern variables are freshened first so that repeated
/// resolutions never interfere.
fn match_instance(
    instance: &InstanceDef,
    predicate: &ClassPredicate,
    supply: &mut NameSupply,
) -> Option<InstanceMatch> {
    let pattern = &instance.class_predicate;
    if pattern.params.len() != predicate.params.len() {
        return None;
    }
    let freshen = freshen_pattern_vars(pattern, supply);
    let mut subst = Subst::empty();
    for (pat, arg) in pattern.params.iter().zip(&predicate.params) {
        let pat = pat.rebind(&freshen).rebind(&subst);
        let arg = arg.rebind(&subst);
        match unify(&pat, &arg) {
            Ok(u) => subst = u.subst.compose(&subst),
            Err(_) => return None,
        }
    }
    let where_predicates = instance.where_predicates.rebind(&freshen).rebind(&subst);
    Some(InstanceMatch {
        class: predicate.classname.name.clone(),
        instance_index: instance.index,
        subst,
        where_predicates,
    })
}

/// A substitution renaming every free variable of the instance pattern to
/// a fresh one.
fn freshen_pattern_vars(pattern: &ClassPredicate, supply: &mut NameSupply) -> Subst {
    Subst::from_pairs(
        pattern
            .ftv()
            .into_iter()
            .map(|name| (name, supply.fresh_var(lumen_common::Location::internal())))
            .collect(),
    )
}

/// The tuple of head constants for coherence checking. A variable (or
/// lambda) in head position contributes `None`.
fn head_shape(predicate: &ClassPredicate) -> Vec<Option<String>> {
    predicate
        .params
        .iter()
        .map(|param| match param.spine().0 {
            Type::Id(id) => Some(id.name.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ast::AstBuilder;

    fn var(name: &str) -> Type {
        Type::variable(Identifier::internal(name))
    }

    fn show_class() -> TypeClass {
        TypeClass {
            id: Identifier::internal("Show"),
            params: vec![Identifier::internal("a")],
            superclasses: ClassPredicates::new(),
            overloads: vec![(
                Identifier::internal("show"),
                Type::arrow(var("a"), Type::string()),
            )],
        }
    }

    fn show_instance(pattern: Type, where_predicates: ClassPredicates) -> Instance {
        let mut b = AstBuilder::new("inst.lm");
        let body = b.var("__builtin_int_show");
        Instance {
            class_predicate: ClassPredicate::new(Identifier::internal("Show"), vec![pattern]),
            where_predicates,
            decls: vec![Decl { var: Identifier::internal("show"), value: body }],
        }
    }

    #[test]
    fn overload_scheme_carries_class_predicate() {
        let mut env = ClassEnv::new();
        let schemes = env.register_class(&show_class()).unwrap();
        assert_eq!(schemes.len(), 1);
        let (name, scheme) = &schemes[0];
        assert_eq!(name.name, "show");
        assert_eq!(scheme.to_string(), "(Show a) => a -> String");
        assert_eq!(scheme.btvs(), 1);
    }

    #[test]
    fn overload_scheme_includes_superclass_constraints() {
        // class (Eq a) => Ord a { cmp : a -> a -> Int }: using cmp
        // requires both Ord and Eq witnesses.
        let mut env = ClassEnv::new();
        let superclasses: ClassPredicates =
            [ClassPredicate::new(Identifier::internal("Eq"), vec![var("a")])]
                .into_iter()
                .collect();
        let schemes = env
            .register_class(&TypeClass {
                id: Identifier::internal("Ord"),
                params: vec![Identifier::internal("a")],
                superclasses,
                overloads: vec![(
                    Identifier::internal("cmp"),
                    Type::arrows(vec![var("a"), var("a"), Type::int()]),
                )],
            })
            .unwrap();
        let (_, scheme) = &schemes[0];
        assert_eq!(scheme.to_string(), "(Eq a, Ord a) => a -> a -> Int");
        assert_eq!(scheme.btvs(), 2);
    }

    #[test]
    fn resolve_ground_predicate() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::int(), ClassPredicates::new())).unwrap();

        let mut supply = NameSupply::new();
        let pred = ClassPredicate::new(Identifier::internal("Show"), vec![Type::int()]);
        match env.resolve(&pred, &mut supply) {
            Resolution::Matched(m) => {
                assert_eq!(m.class, "Show");
                assert!(m.where_predicates.is_empty());
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn resolve_emits_where_predicates() {
        // instance (Show a) => Show (Maybe a); resolving Show (Maybe Int)
        // leaves Show Int pending.
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        let wheres: ClassPredicates =
            [ClassPredicate::new(Identifier::internal("Show"), vec![var("a")])]
                .into_iter()
                .collect();
        env.register_instance(&show_instance(Type::maybe(var("a")), wheres)).unwrap();

        let mut supply = NameSupply::new();
        let pred = ClassPredicate::new(
            Identifier::internal("Show"),
            vec![Type::maybe(Type::int())],
        );
        match env.resolve(&pred, &mut supply) {
            Resolution::Matched(m) => {
                assert_eq!(m.where_predicates.to_string(), "Show Int");
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn resolve_defers_on_free_variables() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::int(), ClassPredicates::new())).unwrap();

        let mut supply = NameSupply::new();
        let pred = ClassPredicate::new(Identifier::internal("Show"), vec![var("__v0")]);
        assert!(matches!(env.resolve(&pred, &mut supply), Resolution::Deferred));
    }

    #[test]
    fn resolve_reports_no_instance() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::int(), ClassPredicates::new())).unwrap();

        let mut supply = NameSupply::new();
        let pred = ClassPredicate::new(Identifier::internal("Show"), vec![Type::bool()]);
        assert!(matches!(env.resolve(&pred, &mut supply), Resolution::NoInstance));
    }

    #[test]
    fn duplicate_instance_rejected() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::int(), ClassPredicates::new())).unwrap();
        match env.register_instance(&show_instance(Type::int(), ClassPredicates::new())) {
            Err(TypeError::DuplicateInstance { .. }) => {}
            other => panic!("expected duplicate instance, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_heads_rejected() {
        // Show (Maybe a) and Show (Maybe Int) share the head constant
        // Maybe, so the second registration is a coherence violation.
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::maybe(var("a")), ClassPredicates::new()))
            .unwrap();
        match env.register_instance(&show_instance(
            Type::maybe(Type::int()),
            ClassPredicates::new(),
        )) {
            Err(TypeError::DuplicateInstance { .. }) => {}
            other => panic!("expected duplicate instance, got {other:?}"),
        }
    }

    #[test]
    fn missing_method_rejected() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        let instance = Instance {
            class_predicate: ClassPredicate::new(
                Identifier::internal("Show"),
                vec![Type::int()],
            ),
            where_predicates: ClassPredicates::new(),
            decls: vec![],
        };
        match env.register_instance(&instance) {
            Err(TypeError::MissingInstanceMethod { method, .. }) => {
                assert_eq!(method.name, "show")
            }
            other => panic!("expected missing method, got {other:?}"),
        }
    }

    #[test]
    fn unknown_class_rejected() {
        let mut env = ClassEnv::new();
        let instance = show_instance(Type::int(), ClassPredicates::new());
        assert!(matches!(
            env.register_instance(&instance),
            Err(TypeError::UnknownClass { .. })
        ));
    }

    #[test]
    fn registered_instances_are_listed() {
        let mut env = ClassEnv::new();
        env.register_class(&show_class()).unwrap();
        env.register_instance(&show_instance(Type::int(), ClassPredicates::new())).unwrap();
        assert_eq!(env.instances_of("Show").len(), 1);
        assert!(env.instances_of("Eq").is_empty());
    }
}
