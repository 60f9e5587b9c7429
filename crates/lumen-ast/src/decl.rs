//! Top-level declarations and compilation units.

use std::collections::BTreeSet;

use lumen_common::Identifier;
use lumen_types::{ClassPredicate, ClassPredicates, Type};

use crate::expr::Expr;

/// A top-level value binding: `name = expr`.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub var: Identifier,
    pub value: Expr,
}

/// A data constructor within a type declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct DataCtor {
    pub id: Identifier,
    /// Argument types, possibly mentioning the type declaration's params.
    pub arg_types: Vec<Type>,
}

/// An algebraic data type declaration:
/// `data Name p1 p2 = Ctor1 τ̅ | Ctor2 τ̅ | …`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub id: Identifier,
    pub params: Vec<Identifier>,
    pub ctors: Vec<DataCtor>,
}

impl TypeDecl {
    /// The type this declaration defines, applied to its own parameters:
    /// `Name p1 p2 …`.
    pub fn applied_type(&self) -> Type {
        let mut ty = Type::id(self.id.clone());
        for param in &self.params {
            ty = Type::operator(ty, Type::variable(param.clone()));
        }
        ty
    }
}

/// A type-class declaration with overload signatures.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeClass {
    pub id: Identifier,
    /// Class type parameters (e.g. `a` in `class Show a`).
    pub params: Vec<Identifier>,
    /// Superclass constraints over the class parameters.
    pub superclasses: ClassPredicates,
    /// Method name and signature pairs; signatures mention the class
    /// parameters as free variables.
    pub overloads: Vec<(Identifier, Type)>,
}

/// An instance declaration: a witness for a class at specific type
/// arguments, providing one decl per class method.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    /// The class and the type-argument pattern, e.g. `Show (Maybe a)`.
    pub class_predicate: ClassPredicate,
    /// Constraints required of the pattern's variables.
    pub where_predicates: ClassPredicates,
    /// Method implementations.
    pub decls: Vec<Decl>,
}

/// One compilation unit as handed over by the parser.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub decls: Vec<Decl>,
    pub type_decls: Vec<TypeDecl>,
    pub type_classes: Vec<TypeClass>,
    pub instances: Vec<Instance>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module { name: name.into(), ..Default::default() }
    }

    /// Every name this module binds at the top level: value decls, type
    /// names, data constructors, class names, and class methods.
    pub fn bound_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for decl in &self.decls {
            names.insert(decl.var.name.clone());
        }
        for type_decl in &self.type_decls {
            names.insert(type_decl.id.name.clone());
            for ctor in &type_decl.ctors {
                names.insert(ctor.id.name.clone());
            }
        }
        for type_class in &self.type_classes {
            names.insert(type_class.id.name.clone());
            for (overload, _) in &type_class.overloads {
                names.insert(overload.name.clone());
            }
        }
        names
    }
}
