//! Type checkers used by the `type` keyword

use serde_json::Value;
use std::collections::HashMap;

use crate::error::Error;

/// Predicate deciding whether an instance is of one JSON Schema type
pub type TypeCheckFn = fn(&Value) -> bool;

/// An immutable table from type name to predicate.
///
/// Drafts differ in what counts as an `integer`; each variant carries
/// its own checker. A type name absent from the table is an error
/// distinct from "the instance is not of that type".
#[derive(Debug, Clone)]
pub struct TypeChecker {
    checkers: HashMap<String, TypeCheckFn>,
}

impl TypeChecker {
    /// Create an empty checker
    pub fn new() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    /// Whether `instance` is of the named type.
    pub fn is_type(&self, instance: &Value, type_name: &str) -> Result<bool, Error> {
        match self.checkers.get(type_name) {
            Some(check) => Ok(check(instance)),
            None => Err(Error::UnknownType {
                name: type_name.to_string(),
                instance: instance.clone(),
            }),
        }
    }

    /// Whether the named type is defined at all
    pub fn is_known(&self, type_name: &str) -> bool {
        self.checkers.contains_key(type_name)
    }

    /// Derive a new checker with one type redefined or added.
    pub fn redefine(&self, type_name: impl Into<String>, check: TypeCheckFn) -> Self {
        let mut checkers = self.checkers.clone();
        checkers.insert(type_name.into(), check);
        Self { checkers }
    }

    /// Derive a new checker with several types redefined or added.
    pub fn redefine_many<I, S>(&self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeCheckFn)>,
        S: Into<String>,
    {
        let mut checkers = self.checkers.clone();
        for (name, check) in definitions {
            checkers.insert(name.into(), check);
        }
        Self { checkers }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        draft202012_type_checker()
    }
}

fn is_object(instance: &Value) -> bool {
    instance.is_object()
}

fn is_array(instance: &Value) -> bool {
    instance.is_array()
}

fn is_string(instance: &Value) -> bool {
    instance.is_string()
}

fn is_number(instance: &Value) -> bool {
    instance.is_number()
}

fn is_boolean(instance: &Value) -> bool {
    instance.is_boolean()
}

fn is_null(instance: &Value) -> bool {
    instance.is_null()
}

/// Draft 4 integers: integral JSON numbers only, never floats
fn is_integer_strict(instance: &Value) -> bool {
    match instance {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

/// Draft 6 and later integers: any number with a zero fractional part
fn is_integer_lax(instance: &Value) -> bool {
    match instance {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => false,
    }
}

fn base_checker(integer: TypeCheckFn) -> TypeChecker {
    TypeChecker::new().redefine_many([
        ("object", is_object as TypeCheckFn),
        ("array", is_array),
        ("string", is_string),
        ("number", is_number),
        ("integer", integer),
        ("boolean", is_boolean),
        ("null", is_null),
    ])
}

/// The Draft 4 type checker
pub fn draft4_type_checker() -> TypeChecker {
    base_checker(is_integer_strict)
}

/// The Draft 6 type checker
pub fn draft6_type_checker() -> TypeChecker {
    base_checker(is_integer_lax)
}

/// The Draft 7 type checker
pub fn draft7_type_checker() -> TypeChecker {
    draft6_type_checker()
}

/// The Draft 2020-12 type checker
pub fn draft202012_type_checker() -> TypeChecker {
    draft6_type_checker()
}
