//! Builtin function evaluation.
//!
//! Every builtin receives its unexpanded argument expressions and decides
//! which of them to expand, and when.  Most expand everything up front;
//! `if`, `and`, `or` and `foreach` expand lazily, and `call`/`foreach`
//! rebind variables through [`Evaluator::scoped`].
//!
//! Results are written to the caller's buffer.  Functions that produce word
//! lists use [`WordWriter`] so words are separated by exactly one space.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use glob::MatchOptions;

use crate::pattern::{self, split_words, Pattern, WordWriter};
use crate::var::Var;

use super::error::{EvalError, EvalResult};
use super::func::{assert_arity, Builtin, FuncCall};
use super::interp::Evaluator;
use super::stmt::parse_script_at;
use super::value::Value;

type Args = [Value];

impl FuncCall {
    /// Evaluate this call, appending its result to `out`.
    pub fn eval(&self, ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
        let func = self.builtin();
        let args = self.args();
        assert_arity(func.name(), func.required_args(), args.len())?;
        log::trace!("{}: {}", ev.location(), self.source());

        match func {
            Builtin::Subst => subst(ev, args, out),
            Builtin::Patsubst => patsubst(ev, args, out),
            Builtin::Strip => strip(ev, args, out),
            Builtin::Findstring => findstring(ev, args, out),
            Builtin::Filter => filter(ev, args, out, true),
            Builtin::FilterOut => filter(ev, args, out, false),
            Builtin::Sort => sort(ev, args, out),
            Builtin::Word => word(ev, args, out),
            Builtin::Wordlist => wordlist(ev, args, out),
            Builtin::Words => {
                let n = ev.values(&args[0])?.len();
                out.push_str(&n.to_string());
                Ok(())
            }
            Builtin::Firstword => {
                let text = ev.value(&args[0])?;
                out.push_str(split_words(&text).first().copied().unwrap_or(""));
                Ok(())
            }
            Builtin::Lastword => {
                let text = ev.value(&args[0])?;
                out.push_str(split_words(&text).last().copied().unwrap_or(""));
                Ok(())
            }
            Builtin::Join => join(ev, args, out),
            Builtin::Wildcard => wildcard(ev, args, out),
            Builtin::Dir => map_words(ev, &args[0], out, |w| {
                Some(w.rfind('/').map_or("./", |i| &w[..=i]).to_owned())
            }),
            Builtin::Notdir => map_words(ev, &args[0], out, |w| {
                Some(w.rfind('/').map_or(w, |i| &w[i + 1..]).to_owned())
            }),
            Builtin::Suffix => map_words(ev, &args[0], out, |w| pattern::ext(w).map(str::to_owned)),
            Builtin::Basename => {
                map_words(ev, &args[0], out, |w| Some(pattern::strip_ext(w).to_owned()))
            }
            Builtin::Addsuffix => affix(ev, args, out, false),
            Builtin::Addprefix => affix(ev, args, out, true),
            Builtin::Realpath => realpath(ev, args, out),
            Builtin::Abspath => abspath(ev, args, out),
            Builtin::Shell => {
                let cmd = ev.value(&args[0])?;
                out.push_str(&run_shell(&cmd));
                Ok(())
            }
            Builtin::Call => call(ev, args, out, self),
            Builtin::Foreach => foreach(ev, args, out),
            Builtin::If => {
                let cond = value_trimmed(ev, &args[0])?;
                if !cond.is_empty() {
                    ev.expand(&args[1], out)
                } else if let Some(otherwise) = args.get(2) {
                    ev.expand(otherwise, out)
                } else {
                    Ok(())
                }
            }
            Builtin::And => {
                let mut last = String::new();
                for arg in args {
                    last = value_trimmed(ev, arg)?;
                    if last.is_empty() {
                        return Ok(());
                    }
                }
                out.push_str(&last);
                Ok(())
            }
            Builtin::Or => {
                for arg in args {
                    let v = value_trimmed(ev, arg)?;
                    if !v.is_empty() {
                        out.push_str(&v);
                        break;
                    }
                }
                Ok(())
            }
            Builtin::Value => {
                let name = ev.value(&args[0])?;
                if let Some(var) = ev.lookup_var(name.trim()) {
                    out.push_str(var.raw());
                }
                Ok(())
            }
            Builtin::Eval => eval(ev, args),
            Builtin::Origin => {
                let name = ev.value(&args[0])?;
                out.push_str(&ev.vars.origin(name.trim()).to_string());
                Ok(())
            }
            Builtin::Flavor => {
                let name = ev.value(&args[0])?;
                out.push_str(&ev.vars.flavor(name.trim()).to_string());
                Ok(())
            }
            Builtin::Info => {
                let msg = ev.value(&args[0])?;
                ev.emit(msg);
                Ok(())
            }
            Builtin::Warning => {
                let msg = ev.value(&args[0])?;
                let line = format!("{}: {msg}", ev.location());
                ev.emit(line);
                Ok(())
            }
            Builtin::Error => {
                let message = ev.value(&args[0])?;
                Err(EvalError::User { loc: ev.location().clone(), message })
            }
        }
    }
}

/// Expand `arg` with whitespace at the edges of its text removed first.
///
/// Only the written text is trimmed; whitespace produced by expansion stays,
/// so `$(if $(space),a,b)` takes the `a` branch.
fn value_trimmed(ev: &mut Evaluator, arg: &Value) -> EvalResult<String> {
    let mut out = String::new();
    expand_trimmed(ev, arg, true, true, &mut out)?;
    Ok(out)
}

fn expand_trimmed(
    ev: &mut Evaluator,
    v: &Value,
    trim_start: bool,
    trim_end: bool,
    out: &mut String,
) -> EvalResult<()> {
    match v {
        Value::Literal(s) => {
            let s = if trim_start { s.trim_start() } else { s.as_str() };
            out.push_str(if trim_end { s.trim_end() } else { s });
            Ok(())
        }
        Value::List(parts) => {
            let last = parts.len().saturating_sub(1);
            for (i, part) in parts.iter().enumerate() {
                expand_trimmed(ev, part, trim_start && i == 0, trim_end && i == last, out)?;
            }
            Ok(())
        }
        other => ev.expand(other, out),
    }
}

// ── Text functions ────────────────────────────────────────────────────────────

fn subst(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let from = ev.value(&args[0])?;
    let to = ev.value(&args[1])?;
    let text = ev.value(&args[2])?;
    log::trace!("subst from:{from:?} to:{to:?} text:{text:?}");
    out.push_str(&text.replace(&from, &to));
    Ok(())
}

fn patsubst(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let pat = ev.value(&args[0])?;
    let repl = ev.value(&args[1])?;
    let text = ev.value(&args[2])?;
    let pat = Pattern::new(&pat);
    let mut w = WordWriter::new(out);
    for word in split_words(&text) {
        w.word(&pat.subst(&repl, word));
    }
    Ok(())
}

fn strip(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let text = ev.value(&args[0])?;
    out.push_str(text.trim_matches(|c: char| c.is_ascii_whitespace()));
    Ok(())
}

fn findstring(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let find = ev.value(&args[0])?;
    let text = ev.value(&args[1])?;
    if text.contains(&find) {
        out.push_str(&find);
    }
    Ok(())
}

/// `filter` (`keep == true`) and `filter-out`.
fn filter(ev: &mut Evaluator, args: &Args, out: &mut String, keep: bool) -> EvalResult<()> {
    let pats = ev.value(&args[0])?;
    let text = ev.value(&args[1])?;
    let pats: Vec<Pattern<'_>> = split_words(&pats).into_iter().map(Pattern::new).collect();
    let mut w = WordWriter::new(out);
    for word in split_words(&text) {
        if pats.iter().any(|p| p.matches(word)) == keep {
            w.word(word);
        }
    }
    Ok(())
}

fn sort(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let text = ev.value(&args[0])?;
    let mut words = split_words(&text);
    words.sort_unstable();
    words.dedup();
    let mut w = WordWriter::new(out);
    for word in words {
        w.word(word);
    }
    Ok(())
}

/// Expand `arg` as a non-negative decimal integer.
fn numeric_arg(
    ev: &mut Evaluator,
    arg: &Value,
    func: &'static str,
    nth: &'static str,
) -> EvalResult<usize> {
    let text = ev.value(arg)?;
    let text = text.trim();
    match text.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
        _ => Err(EvalError::NonNumeric {
            loc: ev.location().clone(),
            func,
            nth,
            text: text.to_owned(),
        }),
    }
}

fn word(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let index = numeric_arg(ev, &args[0], "word", "first")?;
    if index == 0 {
        return Err(EvalError::ZeroWordIndex { loc: ev.location().clone() });
    }
    let text = ev.value(&args[1])?;
    if let Some(w) = split_words(&text).get(index - 1) {
        out.push_str(w);
    }
    Ok(())
}

fn wordlist(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let start = numeric_arg(ev, &args[0], "wordlist", "first")?;
    if start == 0 {
        return Err(EvalError::InvalidWordlistBound {
            loc: ev.location().clone(),
            nth: "first",
            text: start.to_string(),
        });
    }
    let end = numeric_arg(ev, &args[1], "wordlist", "second")?;
    if end == 0 {
        return Err(EvalError::InvalidWordlistBound {
            loc: ev.location().clone(),
            nth: "second",
            text: end.to_string(),
        });
    }
    let text = ev.value(&args[2])?;
    let words = split_words(&text);
    if start > words.len() || end < start {
        return Ok(());
    }
    let end = end.min(words.len());
    let mut w = WordWriter::new(out);
    for word in &words[start - 1..end] {
        w.word(word);
    }
    Ok(())
}

// ── File-name functions ───────────────────────────────────────────────────────

fn join(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let first = ev.value(&args[0])?;
    let second = ev.value(&args[1])?;
    let (l1, l2) = (split_words(&first), split_words(&second));
    let mut w = WordWriter::new(out);
    for i in 0..l1.len().max(l2.len()) {
        match (l1.get(i), l2.get(i)) {
            (Some(a), Some(b)) => {
                w.word(a);
                w.append(b);
            }
            (Some(only), None) | (None, Some(only)) => w.word(only),
            (None, None) => {}
        }
    }
    Ok(())
}

/// Expand `arg`, rewrite each word with `f` (dropping `None`), and write the
/// results as a word list.
fn map_words<F>(ev: &mut Evaluator, arg: &Value, out: &mut String, f: F) -> EvalResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let text = ev.value(arg)?;
    let mut w = WordWriter::new(out);
    for word in split_words(&text) {
        if let Some(mapped) = f(word) {
            w.word(&mapped);
        }
    }
    Ok(())
}

/// `addprefix` (`prefix == true`) and `addsuffix`.
fn affix(ev: &mut Evaluator, args: &Args, out: &mut String, prefix: bool) -> EvalResult<()> {
    let fix = ev.value(&args[0])?;
    let text = ev.value(&args[1])?;
    let mut w = WordWriter::new(out);
    for word in split_words(&text) {
        if prefix {
            w.word(&fix);
            w.append(word);
        } else {
            w.word(word);
            w.append(&fix);
        }
    }
    Ok(())
}

fn wildcard(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let pats = ev.value(&args[0])?;
    let opts = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let mut w = WordWriter::new(out);
    for pat in split_words(&pats) {
        let paths = glob::glob_with(pat, opts)
            .map_err(|e| EvalError::fatal(ev.location(), format!("wildcard: {e}")))?;
        for entry in paths {
            match entry {
                Ok(path) => w.word(&path.to_string_lossy()),
                Err(e) => log::debug!("wildcard {pat}: {e}"),
            }
        }
    }
    Ok(())
}

fn realpath(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let text = ev.value(&args[0])?;
    let mut w = WordWriter::new(out);
    for name in split_words(&text) {
        match std::fs::canonicalize(name) {
            Ok(path) => w.word(&path.to_string_lossy()),
            Err(e) => log::debug!("realpath {name}: {e}"),
        }
    }
    Ok(())
}

fn abspath(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let text = ev.value(&args[0])?;
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            log::warn!("abspath: {e}");
            return Ok(());
        }
    };
    let mut w = WordWriter::new(out);
    for name in split_words(&text) {
        w.word(&lexical_abspath(&cwd, Path::new(name)).to_string_lossy());
    }
    Ok(())
}

/// Resolve `path` against `cwd`, folding `.` and `..` without touching the
/// filesystem.
fn lexical_abspath(cwd: &Path, path: &Path) -> PathBuf {
    let mut out = if path.is_absolute() { PathBuf::from("/") } else { cwd.to_path_buf() };
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}

// ── Shell ─────────────────────────────────────────────────────────────────────

/// Run `cmd` with `/bin/sh -c` and return its stdout, minus one trailing
/// newline, with the remaining newlines turned into spaces.
///
/// Failures are logged; whatever was captured is still returned.
pub(crate) fn run_shell(cmd: &str) -> String {
    log::debug!("shell: {cmd}");
    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stderr(Stdio::inherit())
        .output();
    let stdout = match output {
        Ok(o) => {
            if !o.status.success() {
                log::warn!("$(shell {cmd:?}) failed: {}", o.status);
            }
            o.stdout
        }
        Err(e) => {
            log::warn!("$(shell {cmd:?}) failed: {e}");
            return String::new();
        }
    };
    let text = String::from_utf8_lossy(&stdout);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    text.replace('\n', " ")
}

// ── Control functions ─────────────────────────────────────────────────────────

fn call(ev: &mut Evaluator, args: &Args, out: &mut String, site: &FuncCall) -> EvalResult<()> {
    let name = ev.value(&args[0])?;
    let var = ev.lookup_var(name.trim()).cloned();
    log::trace!("call variable {name:?} = {var:?}");

    // Arguments are expanded before anything is rebound.
    let mut bound = Vec::with_capacity(args.len() - 1);
    for (i, arg) in args[1..].iter().enumerate() {
        let v = ev.value(arg)?;
        log::trace!("call ${}: {arg} => {v:?}", i + 1);
        bound.push(v);
    }

    let names: Vec<String> = (1..=bound.len()).map(|i| i.to_string()).collect();
    let mut result = String::new();
    ev.scoped(&names, |ev| {
        for (name, v) in names.iter().zip(bound) {
            ev.set_var(name.as_str(), Var::automatic(v));
        }
        match &var {
            Some(Var::Simple { value, .. }) => result.push_str(value),
            Some(Var::Recursive { value, .. }) => ev.expand(value, &mut result)?,
            None => {}
        }
        Ok(())
    })?;
    log::trace!("call {} return {result:?}", site.source());
    out.push_str(&result);
    Ok(())
}

fn foreach(ev: &mut Evaluator, args: &Args, out: &mut String) -> EvalResult<()> {
    let name = ev.value(&args[0])?.trim().to_owned();
    let words = ev.values(&args[1])?;
    let body = &args[2];
    ev.scoped(std::slice::from_ref(&name), |ev| {
        let mut w = WordWriter::new(out);
        for word in words {
            ev.set_var(name.as_str(), Var::automatic(word));
            let text = ev.value(body)?;
            w.word(&text);
        }
        Ok(())
    })
}

fn eval(ev: &mut Evaluator, args: &Args) -> EvalResult<()> {
    let text = ev.value(&args[0])?;
    if text.is_empty() || (text.starts_with('#') && !text.contains('\n')) {
        return Ok(());
    }
    let loc = ev.location().clone();
    let stmts = parse_script_at(&text, &loc)?;
    let res = ev.exec_stmts(&stmts);
    ev.set_location(loc);
    res
}

// ── Tests ─────────────────────────────────────────────────────────────────────
