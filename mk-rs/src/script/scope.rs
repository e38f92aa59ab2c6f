//! Save/restore of transient variable bindings.
//!
//! `call` binds `1`…`N` and `foreach` binds its loop variable in the one
//! shared [`VarTable`].  Each name is saved before the first rebinding and
//! restored when the body finishes, on the error path too: the restore runs
//! from a `scopeguard` drop, so a `?` inside the body cannot skip it.

use crate::var::{Var, VarTable};

use super::error::EvalResult;
use super::interp::Evaluator;

/// A binding captured before an override.
#[derive(Debug)]
pub struct SavedVar {
    name: String,
    prev: Option<Var>,
}

impl SavedVar {
    /// Capture the current binding of `name` (or its absence).
    pub fn save(vars: &VarTable, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            prev: vars.get(name).cloned(),
        }
    }

    /// Put the captured binding back, removing the name if it was undefined.
    pub fn restore(self, vars: &mut VarTable) {
        match self.prev {
            Some(var) => vars.set(self.name, var),
            None => {
                vars.unset(&self.name);
            }
        }
    }
}

impl Evaluator {
    /// Run `body` with `names` saved; every name is restored afterwards,
    /// whether `body` succeeds or fails.
    pub fn scoped<T, F>(&mut self, names: &[String], body: F) -> EvalResult<T>
    where
        F: FnOnce(&mut Evaluator) -> EvalResult<T>,
    {
        let saved: Vec<SavedVar> = names
            .iter()
            .map(|n| SavedVar::save(&self.vars, n))
            .collect();
        let mut guard = scopeguard::guard(self, move |ev| {
            for old in saved.into_iter().rev() {
                old.restore(&mut ev.vars);
            }
        });
        body(&mut **guard)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
