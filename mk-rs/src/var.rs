//! Variable namespace.
//!
//! One mutable table maps each name to at most one [`Var`].  There is no
//! scope stack: transient bindings made by `call` and `foreach` are saved and
//! restored around the evaluation that needs them (see `script::scope`).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::script::value::Value;

/// Where a variable's value came from, as reported by `$(origin …)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Undefined,
    Default,
    Environment,
    File,
    CommandLine,
    Override,
    Automatic,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Undefined => "undefined",
            Origin::Default => "default",
            Origin::Environment => "environment",
            Origin::File => "file",
            Origin::CommandLine => "command line",
            Origin::Override => "override",
            Origin::Automatic => "automatic",
        })
    }
}

/// How a variable expands, as reported by `$(flavor …)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Undefined,
    Simple,
    Recursive,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flavor::Undefined => "undefined",
            Flavor::Simple => "simple",
            Flavor::Recursive => "recursive",
        })
    }
}

/// A defined variable.
///
/// Simple variables hold already-expanded text.  Recursive variables hold an
/// expression that is expanded every time the variable is referenced; the
/// expression is behind an `Rc` so references clone cheaply.
#[derive(Debug, Clone, PartialEq)]
pub enum Var {
    Simple {
        value: String,
        origin: Origin,
    },
    Recursive {
        value: Rc<Value>,
        src: String,
        origin: Origin,
    },
}

impl Var {
    pub fn simple(value: impl Into<String>, origin: Origin) -> Self {
        Var::Simple { value: value.into(), origin }
    }

    pub fn recursive(src: impl Into<String>, value: Value, origin: Origin) -> Self {
        Var::Recursive {
            value: Rc::new(value),
            src: src.into(),
            origin,
        }
    }

    /// A transient binding made by `call` or `foreach`.
    pub fn automatic(value: impl Into<String>) -> Self {
        Var::simple(value, Origin::Automatic)
    }

    pub fn origin(&self) -> Origin {
        match self {
            Var::Simple { origin, .. } | Var::Recursive { origin, .. } => *origin,
        }
    }

    pub fn flavor(&self) -> Flavor {
        match self {
            Var::Simple { .. } => Flavor::Simple,
            Var::Recursive { .. } => Flavor::Recursive,
        }
    }

    /// The stored text, unexpanded (what `$(value …)` returns).
    pub fn raw(&self) -> &str {
        match self {
            Var::Simple { value, .. } => value,
            Var::Recursive { src, .. } => src,
        }
    }
}

/// The shared variable namespace.
#[derive(Debug, Default)]
pub struct VarTable {
    vars: HashMap<String, Var>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, var: Var) {
        self.vars.insert(name.into(), var);
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.vars.get(name)
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Returns `true` if the variable is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn origin(&self, name: &str) -> Origin {
        self.get(name).map_or(Origin::Undefined, Var::origin)
    }

    pub fn flavor(&self, name: &str) -> Flavor {
        self.get(name).map_or(Flavor::Undefined, Var::flavor)
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Var)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut vars = VarTable::new();
        vars.set("CC", Var::simple("gcc", Origin::File));
        assert_eq!(vars.get("CC").map(Var::raw), Some("gcc"));
    }

    #[test]
    fn overwrite_keeps_one_binding() {
        let mut vars = VarTable::new();
        vars.set("x", Var::simple("old", Origin::File));
        vars.set("x", Var::automatic("new"));
        assert_eq!(vars.get("x").map(Var::raw), Some("new"));
        assert_eq!(vars.origin("x"), Origin::Automatic);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn unset() {
        let mut vars = VarTable::new();
        vars.set("gone", Var::simple("bye", Origin::File));
        assert!(vars.unset("gone"));
        assert!(vars.get("gone").is_none());
        assert!(!vars.unset("gone"));
    }

    #[test]
    fn undefined_origin_and_flavor() {
        let vars = VarTable::new();
        assert_eq!(vars.origin("nope").to_string(), "undefined");
        assert_eq!(vars.flavor("nope").to_string(), "undefined");
        assert!(!vars.contains("nope"));
    }

    #[test]
    fn recursive_keeps_source_text() {
        let mut vars = VarTable::new();
        let expr = Value::VarRef(Box::new(Value::literal("y")));
        vars.set("x", Var::recursive("$(y)", expr, Origin::File));
        assert_eq!(vars.flavor("x"), Flavor::Recursive);
        assert_eq!(vars.get("x").map(Var::raw), Some("$(y)"));
    }

    #[test]
    fn origin_strings() {
        assert_eq!(Origin::CommandLine.to_string(), "command line");
        assert_eq!(Origin::Automatic.to_string(), "automatic");
    }
}
