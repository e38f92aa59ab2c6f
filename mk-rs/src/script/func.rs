//! Function registry and call-site closures.
//!
//! [`Builtin`] is the closed set of functions the language knows.  The
//! registry maps a name to a fresh [`FuncCall`], and each builtin declares
//! the arity the parser uses to split its argument text:
//!
//! - `n > 0`: the first `n - 1` top-level commas separate arguments;
//!   everything after them, further commas included, is the last argument.
//! - `n == 0`: every top-level comma separates arguments (no limit).
//!
//! Evaluation lives in [`builtins`](super::builtins).

use super::error::{EvalError, EvalResult};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    // Text
    Subst,
    Patsubst,
    Strip,
    Findstring,
    Filter,
    FilterOut,
    Sort,
    Word,
    Wordlist,
    Words,
    Firstword,
    Lastword,
    // File names
    Join,
    Wildcard,
    Dir,
    Notdir,
    Suffix,
    Basename,
    Addsuffix,
    Addprefix,
    Realpath,
    Abspath,
    // Control and meta
    Shell,
    Call,
    Foreach,
    If,
    And,
    Or,
    Value,
    Eval,
    Origin,
    Flavor,
    Info,
    Warning,
    Error,
}

impl Builtin {
    /// Every registered builtin, in registry order.
    pub const ALL: &'static [Builtin] = &[
        Builtin::Subst,
        Builtin::Patsubst,
        Builtin::Strip,
        Builtin::Findstring,
        Builtin::Filter,
        Builtin::FilterOut,
        Builtin::Sort,
        Builtin::Word,
        Builtin::Wordlist,
        Builtin::Words,
        Builtin::Firstword,
        Builtin::Lastword,
        Builtin::Join,
        Builtin::Wildcard,
        Builtin::Dir,
        Builtin::Notdir,
        Builtin::Suffix,
        Builtin::Basename,
        Builtin::Addsuffix,
        Builtin::Addprefix,
        Builtin::Realpath,
        Builtin::Abspath,
        Builtin::Shell,
        Builtin::Call,
        Builtin::Foreach,
        Builtin::If,
        Builtin::And,
        Builtin::Or,
        Builtin::Value,
        Builtin::Eval,
        Builtin::Origin,
        Builtin::Flavor,
        Builtin::Info,
        Builtin::Warning,
        Builtin::Error,
    ];

    /// Look a function up by the name used in `$(name …)`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "subst" => Builtin::Subst,
            "patsubst" => Builtin::Patsubst,
            "strip" => Builtin::Strip,
            "findstring" => Builtin::Findstring,
            "filter" => Builtin::Filter,
            "filter-out" => Builtin::FilterOut,
            "sort" => Builtin::Sort,
            "word" => Builtin::Word,
            "wordlist" => Builtin::Wordlist,
            "words" => Builtin::Words,
            "firstword" => Builtin::Firstword,
            "lastword" => Builtin::Lastword,
            "join" => Builtin::Join,
            "wildcard" => Builtin::Wildcard,
            "dir" => Builtin::Dir,
            "notdir" => Builtin::Notdir,
            "suffix" => Builtin::Suffix,
            "basename" => Builtin::Basename,
            "addsuffix" => Builtin::Addsuffix,
            "addprefix" => Builtin::Addprefix,
            "realpath" => Builtin::Realpath,
            "abspath" => Builtin::Abspath,
            "shell" => Builtin::Shell,
            "call" => Builtin::Call,
            "foreach" => Builtin::Foreach,
            "if" => Builtin::If,
            "and" => Builtin::And,
            "or" => Builtin::Or,
            "value" => Builtin::Value,
            "eval" => Builtin::Eval,
            "origin" => Builtin::Origin,
            "flavor" => Builtin::Flavor,
            "info" => Builtin::Info,
            "warning" => Builtin::Warning,
            "error" => Builtin::Error,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Subst => "subst",
            Builtin::Patsubst => "patsubst",
            Builtin::Strip => "strip",
            Builtin::Findstring => "findstring",
            Builtin::Filter => "filter",
            Builtin::FilterOut => "filter-out",
            Builtin::Sort => "sort",
            Builtin::Word => "word",
            Builtin::Wordlist => "wordlist",
            Builtin::Words => "words",
            Builtin::Firstword => "firstword",
            Builtin::Lastword => "lastword",
            Builtin::Join => "join",
            Builtin::Wildcard => "wildcard",
            Builtin::Dir => "dir",
            Builtin::Notdir => "notdir",
            Builtin::Suffix => "suffix",
            Builtin::Basename => "basename",
            Builtin::Addsuffix => "addsuffix",
            Builtin::Addprefix => "addprefix",
            Builtin::Realpath => "realpath",
            Builtin::Abspath => "abspath",
            Builtin::Shell => "shell",
            Builtin::Call => "call",
            Builtin::Foreach => "foreach",
            Builtin::If => "if",
            Builtin::And => "and",
            Builtin::Or => "or",
            Builtin::Value => "value",
            Builtin::Eval => "eval",
            Builtin::Origin => "origin",
            Builtin::Flavor => "flavor",
            Builtin::Info => "info",
            Builtin::Warning => "warning",
            Builtin::Error => "error",
        }
    }

    /// Maximum number of argument slots; `0` means variadic.
    pub fn arity(self) -> usize {
        match self {
            Builtin::Subst
            | Builtin::Patsubst
            | Builtin::Wordlist
            | Builtin::Foreach
            | Builtin::If => 3,
            Builtin::Findstring
            | Builtin::Filter
            | Builtin::FilterOut
            | Builtin::Word
            | Builtin::Join
            | Builtin::Addsuffix
            | Builtin::Addprefix => 2,
            Builtin::Call | Builtin::And | Builtin::Or => 0,
            _ => 1,
        }
    }

    /// Fewest arguments a well-formed call may have.
    pub fn required_args(self) -> usize {
        match self {
            Builtin::If => 2,
            Builtin::Call | Builtin::And | Builtin::Or => 1,
            other => other.arity(),
        }
    }
}

/// Registry constructor: a fresh closure for `name`, or `None` if `name` is
/// not a function.
pub fn lookup(name: &str) -> Option<FuncCall> {
    Builtin::from_name(name).map(FuncCall::new)
}

/// Fail with the arity diagnostic if fewer than `required` arguments were given.
pub fn assert_arity(name: &'static str, required: usize, actual: usize) -> EvalResult<()> {
    if actual < required {
        return Err(EvalError::InsufficientArgs { name, actual });
    }
    Ok(())
}

/// One function call site: its argument expressions and source text.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    func: Builtin,
    args: Vec<Value>,
    src: String,
}

impl FuncCall {
    pub fn new(func: Builtin) -> Self {
        Self { func, args: Vec::new(), src: String::new() }
    }

    pub fn builtin(&self) -> Builtin {
        self.func
    }

    pub fn name(&self) -> &'static str {
        self.func.name()
    }

    pub fn arity(&self) -> usize {
        self.func.arity()
    }

    /// Append the next argument expression (parse order).
    pub fn add_arg(&mut self, arg: Value) {
        self.args.push(arg);
    }

    pub fn set_source(&mut self, src: impl Into<String>) {
        self.src = src.into();
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The call as written, e.g. `$(subst a,b,$(x))`.
    pub fn source(&self) -> &str {
        &self.src
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trips_names() {
        for &b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
        assert_eq!(Builtin::ALL.len(), 35);
    }

    #[test]
    fn unknown_name() {
        assert!(lookup("no-such-fn").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn arities() {
        assert_eq!(Builtin::Subst.arity(), 3);
        assert_eq!(Builtin::Filter.arity(), 2);
        assert_eq!(Builtin::Sort.arity(), 1);
        assert_eq!(Builtin::Call.arity(), 0);
        assert_eq!(Builtin::And.arity(), 0);
        assert_eq!(Builtin::If.required_args(), 2);
    }

    #[test]
    fn lookup_gives_fresh_closure() {
        let mut a = lookup("subst").unwrap();
        a.add_arg("x".into());
        let b = lookup("subst").unwrap();
        assert_eq!(a.args().len(), 1);
        assert!(b.args().is_empty());
    }

    #[test]
    fn arity_violation_is_fatal() {
        let err = assert_arity("subst", 3, 2).unwrap_err();
        assert!(matches!(err, EvalError::InsufficientArgs { name: "subst", actual: 2 }));
        assert!(assert_arity("subst", 3, 3).is_ok());
    }
}
