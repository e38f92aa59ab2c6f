//! Build-file evaluator.
//!
//! The [`Evaluator`] owns the variable table and the current location and
//! executes parsed [`Stmt`] lists.  Expanding a [`Value`] goes through
//! [`Evaluator::expand`], which calls back into each function's `eval`.

use std::io::{self, Write};
use std::rc::Rc;

use crate::pattern::{split_words, Pattern, WordWriter};
use crate::var::{Origin, Var, VarTable};

use super::builtins::run_shell;
use super::error::{EvalError, EvalResult, Location};
use super::expand::parse_expr;
use super::stmt::{parse_script, AssignOp, Stmt, StmtKind};
use super::value::Value;

// ── Rule ──────────────────────────────────────────────────────────────────────

/// A rule line, recorded after expanding its targets and prerequisites.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub targets: Vec<String>,
    pub prereqs: Vec<String>,
    pub recipe: Vec<String>,
    pub loc: Location,
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

pub struct Evaluator {
    /// The one shared variable namespace.
    pub vars: VarTable,
    /// Rules seen so far, in file order.
    pub rules: Vec<Rule>,
    /// Lines printed by `info`/`warning` when not streaming.
    pub output: Vec<String>,
    loc: Location,
    stream: bool,
    /// Recursive variables currently being expanded (self-reference check).
    expanding: Vec<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// An evaluator that collects `info`/`warning` lines in [`output`](Self::output).
    pub fn new() -> Self {
        Evaluator {
            vars: VarTable::new(),
            rules: Vec::new(),
            output: Vec::new(),
            loc: Location::default(),
            stream: false,
            expanding: Vec::new(),
        }
    }

    /// An evaluator that writes `info`/`warning` lines straight to stdout.
    pub fn streaming() -> Self {
        Evaluator { stream: true, ..Self::new() }
    }

    pub fn location(&self) -> &Location {
        &self.loc
    }

    /// Replace the current location, returning the previous one.
    pub fn set_location(&mut self, loc: Location) -> Location {
        std::mem::replace(&mut self.loc, loc)
    }

    /// Print one line of user-visible output.
    pub fn emit(&mut self, line: String) {
        if self.stream {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}") {
                log::warn!("stdout: {e}");
            }
        } else {
            self.output.push(line);
        }
    }

    // ── Environment ───────────────────────────────────────────────────────────

    /// Import the process environment (origin `environment`) and define
    /// `SHELL` with origin `default`.
    pub fn import_environment(&mut self) {
        for (name, value) in std::env::vars_os() {
            let (Ok(name), Ok(value)) = (name.into_string(), value.into_string()) else {
                continue;
            };
            if name == "SHELL" {
                continue;
            }
            self.vars.set(name, Var::simple(value, Origin::Environment));
        }
        self.vars.set("SHELL", Var::simple("/bin/sh", Origin::Default));
    }

    /// Define a variable given on the command line (`NAME=VALUE`).
    pub fn set_command_line_var(&mut self, name: &str, value: &str) -> EvalResult<()> {
        let expr = parse_expr(value).map_err(|e| EvalError::parse(&self.loc, e))?;
        self.vars.set(name, Var::recursive(value, expr, Origin::CommandLine));
        Ok(())
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    pub fn lookup_var(&self, name: &str) -> Option<&Var> {
        self.vars.get(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, var: Var) {
        self.vars.set(name, var);
    }

    // ── Expansion ─────────────────────────────────────────────────────────────

    /// Expand `v` against the current variables, appending to `out`.
    pub fn expand(&mut self, v: &Value, out: &mut String) -> EvalResult<()> {
        match v {
            Value::Literal(s) => out.push_str(s),
            Value::List(parts) => {
                for part in parts {
                    self.expand(part, out)?;
                }
            }
            Value::VarRef(name) => {
                let name = self.value(name)?;
                self.expand_var(&name, out)?;
            }
            Value::SubstRef { name, pat, repl } => {
                let name = self.value(name)?;
                let mut pat = self.value(pat)?;
                let mut repl = self.value(repl)?;
                if !pat.contains('%') {
                    pat.insert(0, '%');
                    repl.insert(0, '%');
                }
                let mut text = String::new();
                self.expand_var(&name, &mut text)?;
                let pattern = Pattern::new(&pat);
                let mut w = WordWriter::new(out);
                for word in split_words(&text) {
                    w.word(&pattern.subst(&repl, word));
                }
            }
            Value::Func(call) => call.eval(self, out)?,
        }
        Ok(())
    }

    /// Expand the variable `name` into `out`; undefined names expand to nothing.
    pub fn expand_var(&mut self, name: &str, out: &mut String) -> EvalResult<()> {
        let expr = match self.vars.get(name) {
            None => return Ok(()),
            Some(Var::Simple { value, .. }) => {
                out.push_str(value);
                return Ok(());
            }
            Some(Var::Recursive { value, .. }) => Rc::clone(value),
        };
        if self.expanding.iter().any(|n| n == name) {
            return Err(EvalError::fatal(
                &self.loc,
                format!("Recursive variable '{name}' references itself (eventually)"),
            ));
        }
        self.expanding.push(name.to_owned());
        let res = self.expand(&expr, out);
        self.expanding.pop();
        res
    }

    /// Expand `v` to a fresh string.
    pub fn value(&mut self, v: &Value) -> EvalResult<String> {
        let mut out = String::new();
        self.expand(v, &mut out)?;
        Ok(out)
    }

    /// Expand `v` and split the result into words.
    pub fn values(&mut self, v: &Value) -> EvalResult<Vec<String>> {
        let text = self.value(v)?;
        Ok(split_words(&text).into_iter().map(str::to_owned).collect())
    }

    /// Parse and expand build-file expression text.
    pub fn expand_str(&mut self, src: &str) -> EvalResult<String> {
        let expr = parse_expr(src).map_err(|e| EvalError::parse(&self.loc, e))?;
        self.value(&expr)
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Parse and execute a build file.
    pub fn exec_script(&mut self, src: &str, file: &str) -> EvalResult<()> {
        let stmts = parse_script(src, file)?;
        self.exec_stmts(&stmts)
    }

    pub fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.loc = stmt.loc.clone();
        match &stmt.kind {
            StmtKind::Assign { name, op, value, src, is_override } => {
                self.exec_assign(name, *op, value, src, *is_override)
            }
            StmtKind::Undefine { name, is_override } => {
                let name = self.value(name)?;
                let name = name.trim();
                if self.may_assign(name, *is_override) {
                    log::debug!("{}: undefine {name}", self.loc);
                    self.vars.unset(name);
                }
                Ok(())
            }
            StmtKind::Rule { targets, prereqs, recipe } => {
                let rule = Rule {
                    targets: self.values(targets)?,
                    prereqs: self.values(prereqs)?,
                    recipe: recipe.clone(),
                    loc: self.loc.clone(),
                };
                log::debug!("{}: rule {:?} <- {:?}", self.loc, rule.targets, rule.prereqs);
                self.rules.push(rule);
                Ok(())
            }
            StmtKind::Expr(expr) => {
                let text = self.value(expr)?;
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(EvalError::parse(&self.loc, "missing separator"))
                }
            }
        }
    }

    /// Command-line and `override` variables are only replaced by `override`.
    fn may_assign(&self, name: &str, is_override: bool) -> bool {
        is_override || !matches!(self.vars.origin(name), Origin::CommandLine | Origin::Override)
    }

    fn exec_assign(
        &mut self,
        name: &Value,
        op: AssignOp,
        value: &Value,
        src: &str,
        is_override: bool,
    ) -> EvalResult<()> {
        let name = self.value(name)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EvalError::parse(&self.loc, "empty variable name"));
        }
        if !self.may_assign(name, is_override) {
            log::debug!("{}: {name} kept from {}", self.loc, self.vars.origin(name));
            return Ok(());
        }
        let origin = if is_override { Origin::Override } else { Origin::File };

        let var = match op {
            AssignOp::Recursive => Var::recursive(src, value.clone(), origin),
            AssignOp::Simple => Var::simple(self.value(value)?, origin),
            AssignOp::Conditional => {
                if self.vars.contains(name) {
                    return Ok(());
                }
                Var::recursive(src, value.clone(), origin)
            }
            AssignOp::Shell => {
                let cmd = self.value(value)?;
                Var::simple(run_shell(&cmd), origin)
            }
            AssignOp::Append => match self.vars.get(name).cloned() {
                None => Var::recursive(src, value.clone(), origin),
                Some(Var::Simple { value: mut old, .. }) => {
                    let more = self.value(value)?;
                    if !old.is_empty() {
                        old.push(' ');
                    }
                    old.push_str(&more);
                    Var::simple(old, origin)
                }
                Some(Var::Recursive { value: old, src: old_src, .. }) => {
                    if old_src.is_empty() {
                        Var::recursive(src, value.clone(), origin)
                    } else {
                        let joined = Value::concat(vec![
                            (*old).clone(),
                            Value::literal(" "),
                            value.clone(),
                        ]);
                        Var::recursive(format!("{old_src} {src}"), joined, origin)
                    }
                }
            },
        };
        log::debug!("{}: {name} ({}) = {:?}", self.loc, var.flavor(), var.raw());
        self.vars.set(name, var);
        Ok(())
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    /// The variable database in `-p` form, sorted by name.
    pub fn dump_vars(&self) -> Vec<String> {
        let mut names: Vec<&String> = self.vars.iter().map(|(n, _)| n).collect();
        names.sort();
        let mut lines = Vec::with_capacity(names.len() * 2);
        for name in names {
            let Some(var) = self.vars.get(name) else { continue };
            let op = match var {
                Var::Simple { .. } => ":=",
                Var::Recursive { .. } => "=",
            };
            lines.push(format!("# {}", var.origin()));
            lines.push(format!("{name} {op} {}", var.raw()));
        }
        lines
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::Flavor;

    fn run(src: &str) -> Evaluator {
        let mut ev = Evaluator::new();
        ev.exec_script(src, "test.mk").expect("script failed");
        ev
    }

    fn get(ev: &mut Evaluator, name: &str) -> String {
        let mut out = String::new();
        ev.expand_var(name, &mut out).unwrap();
        out
    }

    #[test]
    fn recursive_is_late_bound() {
        let mut ev = run("a = $(b)\nb = 1\n");
        assert_eq!(get(&mut ev, "a"), "1");
        assert_eq!(ev.vars.flavor("a"), Flavor::Recursive);
        assert_eq!(ev.vars.origin("a"), Origin::File);
    }

    #[test]
    fn simple_is_early_bound() {
        let mut ev = run("b = 1\na := $(b)\nb = 2\n");
        assert_eq!(get(&mut ev, "a"), "1");
        assert_eq!(ev.vars.flavor("a"), Flavor::Simple);
    }

    #[test]
    fn conditional_assignment() {
        let mut ev = run("a = 1\na ?= 2\nb ?= 3\n");
        assert_eq!(get(&mut ev, "a"), "1");
        assert_eq!(get(&mut ev, "b"), "3");
    }

    #[test]
    fn append_keeps_flavor() {
        let mut ev = run("s := x\ns += $(y)\ny = 1\nr = a\nr += $(y)\n");
        // Simple: appended text expanded at append time (y was undefined).
        assert_eq!(get(&mut ev, "s"), "x ");
        assert_eq!(ev.vars.flavor("s"), Flavor::Simple);
        assert_eq!(get(&mut ev, "r"), "a 1");
        assert_eq!(ev.vars.get("r").map(Var::raw), Some("a $(y)"));
    }

    #[test]
    fn append_to_undefined() {
        let mut ev = run("x += a\n");
        assert_eq!(get(&mut ev, "x"), "a");
    }

    #[test]
    fn substitution_reference() {
        let mut ev = run("SRCS = a.c b.c c.h\n");
        assert_eq!(ev.expand_str("$(SRCS:.c=.o)").unwrap(), "a.o b.o c.h");
        assert_eq!(ev.expand_str("$(SRCS:%.c=obj/%.o)").unwrap(), "obj/a.o obj/b.o c.h");
    }

    #[test]
    fn computed_variable_name() {
        let mut ev = run("n = x\nvx = found\n");
        assert_eq!(ev.expand_str("$(v$(n))").unwrap(), "found");
    }

    #[test]
    fn self_reference_is_fatal() {
        let mut ev = run("a = $(a) x\n");
        let err = ev.expand_str("$(a)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "test.mk:1: *** Recursive variable 'a' references itself (eventually)."
        );
    }

    #[test]
    fn command_line_wins_over_file() {
        let mut ev = Evaluator::new();
        ev.set_command_line_var("CC", "clang").unwrap();
        ev.exec_script("CC = gcc\nD = $(CC)\n", "m.mk").unwrap();
        assert_eq!(get(&mut ev, "D"), "clang");
        assert_eq!(ev.vars.origin("CC"), Origin::CommandLine);

        ev.exec_script("override CC = tcc\n", "m.mk").unwrap();
        assert_eq!(get(&mut ev, "D"), "tcc");
        assert_eq!(ev.vars.origin("CC"), Origin::Override);
    }

    #[test]
    fn undefine_removes() {
        let ev = run("a = 1\nundefine a\n");
        assert!(!ev.vars.contains("a"));
    }

    #[test]
    fn rules_are_recorded() {
        let ev = run("OBJS = a.o b.o\nprog: $(OBJS)\n\t$(CC) -o $@ $^\n");
        assert_eq!(ev.rules.len(), 1);
        let rule = &ev.rules[0];
        assert_eq!(rule.targets, vec!["prog"]);
        assert_eq!(rule.prereqs, vec!["a.o", "b.o"]);
        assert_eq!(rule.recipe, vec!["$(CC) -o $@ $^"]);
        assert_eq!(rule.loc, Location::new("test.mk", 2));
    }

    #[test]
    fn missing_separator() {
        let mut ev = Evaluator::new();
        let err = ev.exec_script("\nfoo bar\n", "m.mk").unwrap_err();
        assert_eq!(err.to_string(), "m.mk:2: *** missing separator.");
    }

    #[test]
    fn blank_expansion_is_not_an_error() {
        let ev = run("$(info hi)\n$(empty)\n");
        assert_eq!(ev.output, vec!["hi"]);
    }

    #[test]
    fn shell_assignment() {
        let mut ev = run("x != echo one; echo two\n");
        assert_eq!(get(&mut ev, "x"), "one two");
    }

    #[test]
    fn environment_import() {
        std::env::set_var("MK_INTERP_TEST_VAR", "present");
        let mut ev = Evaluator::new();
        ev.import_environment();
        assert_eq!(ev.vars.origin("MK_INTERP_TEST_VAR"), Origin::Environment);
        assert_eq!(ev.vars.origin("SHELL"), Origin::Default);
        assert_eq!(get(&mut ev, "SHELL"), "/bin/sh");
    }

    #[test]
    fn dump_is_sorted() {
        let ev = run("b := 2\na = $(b)\n");
        assert_eq!(ev.dump_vars(), vec!["# file", "a = $(b)", "# file", "b := 2"]);
    }
}
