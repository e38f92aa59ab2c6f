//! Build-file language engine.
//!
//! This module implements make's expansion language, covering:
//!
//! - Variable and substitution references (`$(x)`, `${x}`, `$x`, `$(x:a=b)`)
//! - The builtin function set (`subst`, `patsubst`, `filter`, `call`,
//!   `foreach`, `shell`, `eval`, …) and its name registry
//! - Save/restore of transient bindings for `call` and `foreach`
//! - A small statement layer: assignments, `define`, rules, `undefine`
//!
//! # Quick start
//!
//! ```rust
//! use mk::script::Evaluator;
//!
//! let mut ev = Evaluator::new();
//! ev.exec_script("SRCS = a.c b.c\n$(info $(SRCS:.c=.o))\n", "Makefile").unwrap();
//! assert_eq!(ev.output, vec!["a.o b.o"]);
//! ```

pub mod builtins;
pub mod error;
pub mod expand;
pub mod func;
pub mod interp;
pub mod scope;
pub mod stmt;
pub mod value;

// Re-exports for convenience.
pub use error::{EvalError, EvalResult, Location};
pub use interp::{Evaluator, Rule};
pub use value::Value;
