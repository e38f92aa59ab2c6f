//! Unexpanded expression values.
//!
//! A [`Value`] is the parsed form of build-file text: literal runs, variable
//! references, substitution references and function calls.  It is immutable
//! once built; expanding it against an
//! [`Evaluator`](super::interp::Evaluator) yields text.

use std::fmt;

use super::func::FuncCall;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Plain text.
    Literal(String),
    /// `$(name)` / `${name}` / `$x`.  The name is itself an expression.
    VarRef(Box<Value>),
    /// `$(name:pat=repl)`.
    SubstRef {
        name: Box<Value>,
        pat: Box<Value>,
        repl: Box<Value>,
    },
    /// `$(func args…)`.
    Func(Box<FuncCall>),
    /// Concatenation of parts.
    List(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Literal(String::new())
    }
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Self {
        Value::Literal(s.into())
    }

    /// Build a value from a sequence of parts, collapsing trivial cases.
    pub fn concat(mut parts: Vec<Value>) -> Self {
        match parts.len() {
            0 => Value::default(),
            1 => parts.pop().unwrap_or_default(),
            _ => Value::List(parts),
        }
    }

    /// Returns `true` for a value that can only ever expand to nothing.
    pub fn is_empty_literal(&self) -> bool {
        match self {
            Value::Literal(s) => s.is_empty(),
            Value::List(parts) => parts.iter().all(Value::is_empty_literal),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(s) => f.write_str(&s.replace('$', "$$")),
            Value::VarRef(name) => write!(f, "$({name})"),
            Value::SubstRef { name, pat, repl } => write!(f, "$({name}:{pat}={repl})"),
            Value::Func(call) => f.write_str(call.source()),
            Value::List(parts) => parts.iter().try_for_each(|p| write!(f, "{p}")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::literal(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Literal(s)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_collapses() {
        assert_eq!(Value::concat(vec![]), Value::literal(""));
        assert_eq!(Value::concat(vec!["a".into()]), Value::literal("a"));
        assert!(matches!(
            Value::concat(vec!["a".into(), "b".into()]),
            Value::List(ref p) if p.len() == 2
        ));
    }

    #[test]
    fn display_escapes_dollar() {
        assert_eq!(Value::literal("a$b").to_string(), "a$$b");
    }

    #[test]
    fn display_references() {
        let v = Value::concat(vec![
            "x=".into(),
            Value::VarRef(Box::new("CC".into())),
        ]);
        assert_eq!(v.to_string(), "x=$(CC)");

        let s = Value::SubstRef {
            name: Box::new("SRCS".into()),
            pat: Box::new(".c".into()),
            repl: Box::new(".o".into()),
        };
        assert_eq!(s.to_string(), "$(SRCS:.c=.o)");
    }

    #[test]
    fn empty_literal() {
        assert!(Value::default().is_empty_literal());
        assert!(Value::List(vec!["".into(), "".into()]).is_empty_literal());
        assert!(!Value::VarRef(Box::new("x".into())).is_empty_literal());
    }
}
