//! Fatal evaluation errors.
//!
//! Every evaluation step returns [`EvalResult`].  A fatal error unwinds the
//! whole evaluation; only the top-level driver turns it into a process exit.
//! The `Display` form of each variant is the exact diagnostic printed for it.

use std::fmt;

use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// A position in a build file: the `file:line` prefix of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self { file: file.into(), line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("*** insufficient number of arguments ({actual}) to function '{name}'.")]
    InsufficientArgs { name: &'static str, actual: usize },

    #[error("{loc}: *** non-numeric {nth} argument to \"{func}\" function: \"{text}\".")]
    NonNumeric {
        loc: Location,
        func: &'static str,
        nth: &'static str,
        text: String,
    },

    #[error("{loc}: *** first argument to \"word\" function must be greater than 0.")]
    ZeroWordIndex { loc: Location },

    #[error("{loc}: *** invalid {nth} argument to \"wordlist\" function: \"{text}\".")]
    InvalidWordlistBound {
        loc: Location,
        nth: &'static str,
        text: String,
    },

    /// `$(error …)`.
    #[error("{loc}: *** {message}.")]
    User { loc: Location, message: String },

    /// Malformed build-file text (including text re-parsed by `eval`).
    #[error("{loc}: *** {message}.")]
    Parse { loc: Location, message: String },

    /// Any other fatal condition raised during expansion.
    #[error("{loc}: *** {message}.")]
    Fatal { loc: Location, message: String },
}

impl EvalError {
    pub fn parse(loc: &Location, message: impl Into<String>) -> Self {
        EvalError::Parse { loc: loc.clone(), message: message.into() }
    }

    pub fn fatal(loc: &Location, message: impl Into<String>) -> Self {
        EvalError::Fatal { loc: loc.clone(), message: message.into() }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_has_no_location() {
        let e = EvalError::InsufficientArgs { name: "subst", actual: 2 };
        assert_eq!(
            e.to_string(),
            "*** insufficient number of arguments (2) to function 'subst'."
        );
    }

    #[test]
    fn user_error_is_located() {
        let e = EvalError::User {
            loc: Location::new("Makefile", 7),
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "Makefile:7: *** boom.");
    }

    #[test]
    fn non_numeric_message() {
        let e = EvalError::NonNumeric {
            loc: Location::new("x.mk", 1),
            func: "word",
            nth: "first",
            text: "abc".into(),
        };
        assert_eq!(
            e.to_string(),
            "x.mk:1: *** non-numeric first argument to \"word\" function: \"abc\"."
        );
    }
}
