//! Builtin scheme registration.
//!
//! Builtins are the leaves the emitter knows how to lower directly:
//! integer arithmetic, comparisons, string operations, pointer access,
//! and the word-size probe that `sizeof` lowers to. Registration is
//! skipped under `NO_BUILTINS`.

use lumen_common::Identifier;
use lumen_types::{ClassPredicates, Scheme, Type};

use crate::env::TypeEnv;

/// Builtin names all share this prefix; the monomorphizer uses it to tell
/// a builtin reference from a global definition.
pub const BUILTIN_PREFIX: &str = "__builtin_";

/// The distinguished builtin `sizeof` lowers to.
pub const WORD_SIZE: &str = "__builtin_word_size";

pub fn is_builtin(name: &str) -> bool {
    name.starts_with(BUILTIN_PREFIX)
}

fn poly1(var: &str, ty: Type) -> Scheme {
    Scheme::new(vec![var.to_string()], ClassPredicates::new(), ty)
}

fn tv(name: &str) -> Type {
    Type::variable(Identifier::internal(name))
}

/// Install the builtin schemes into the typing environment.
pub fn register_builtins(env: &mut TypeEnv) {
    let int2 = Type::arrows(vec![Type::int(), Type::int(), Type::int()]);
    let int_cmp = Type::arrows(vec![Type::int(), Type::int(), Type::bool()]);

    for name in ["add_int", "sub_int", "mul_int", "div_int", "mod_int"] {
        env.insert(&format!("{BUILTIN_PREFIX}{name}"), Scheme::mono(int2.clone()));
    }
    for name in ["int_eq", "int_lt", "int_lte", "int_gt", "int_gte"] {
        env.insert(&format!("{BUILTIN_PREFIX}{name}"), Scheme::mono(int_cmp.clone()));
    }

    env.insert(
        "__builtin_int_show",
        Scheme::mono(Type::arrow(Type::int(), Type::string())),
    );
    env.insert(
        "__builtin_str_concat",
        Scheme::mono(Type::arrows(vec![Type::string(), Type::string(), Type::string()])),
    );
    env.insert(
        "__builtin_str_eq",
        Scheme::mono(Type::arrows(vec![Type::string(), Type::string(), Type::bool()])),
    );
    env.insert(
        "__builtin_bool_not",
        Scheme::mono(Type::arrow(Type::bool(), Type::bool())),
    );
    env.insert(
        "__builtin_print",
        Scheme::mono(Type::arrow(Type::string(), Type::unit())),
    );
    env.insert(
        "__builtin_panic",
        Scheme::mono(Type::arrow(Type::string(), Type::bottom())),
    );
    env.insert(WORD_SIZE, Scheme::mono(Type::int()));

    // Pointer and reference access.
    env.insert(
        "__builtin_load",
        poly1("a", Type::arrow(Type::ptr(tv("a")), tv("a"))),
    );
    env.insert(
        "__builtin_store",
        poly1(
            "a",
            Type::arrows(vec![Type::ptr(tv("a")), tv("a"), Type::unit()]),
        ),
    );
    env.insert("__builtin_ref", poly1("a", Type::arrow(tv("a"), Type::reference(tv("a")))));
    env.insert("__builtin_deref", poly1("a", Type::arrow(Type::reference(tv("a")), tv("a"))));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_expected_schemes() {
        let mut env = TypeEnv::new();
        register_builtins(&mut env);
        assert_eq!(
            env.get("__builtin_add_int").unwrap().to_string(),
            "Int -> Int -> Int"
        );
        assert_eq!(
            env.get("__builtin_int_eq").unwrap().to_string(),
            "Int -> Int -> Bool"
        );
        assert_eq!(env.get(WORD_SIZE).unwrap().to_string(), "Int");
    }

    #[test]
    fn load_is_polymorphic() {
        let mut env = TypeEnv::new();
        register_builtins(&mut env);
        let scheme = env.get("__builtin_load").unwrap();
        assert_eq!(scheme.vars.len(), 1);
        assert_eq!(scheme.to_string(), "Ptr a -> a");
    }

    #[test]
    fn prefix_detection() {
        assert!(is_builtin("__builtin_add_int"));
        assert!(!is_builtin("add_int"));
    }
}
