//! Build-file statements and the line-level parser.
//!
//! Only the subset the function engine needs is recognised:
//!
//! | Form                                  | Statement              |
//! |---------------------------------------|------------------------|
//! | `[override] NAME op VALUE`            | [`StmtKind::Assign`]   |
//! | `define NAME [op]` … `endef`          | [`StmtKind::Assign`]   |
//! | `[override] undefine NAME`            | [`StmtKind::Undefine`] |
//! | `targets : prereqs [; recipe]`        | [`StmtKind::Rule`]     |
//! | `<tab>recipe line` (after a rule)     | appended to the rule   |
//! | anything else                         | [`StmtKind::Expr`]     |
//!
//! `op` is one of `=`, `:=`, `::=`, `?=`, `+=`, `!=`.  A trailing backslash
//! joins a line with the next (one space replaces the break), and an
//! unescaped `#` outside a reference starts a comment.

use std::sync::OnceLock;

use regex::Regex;

use super::error::{EvalError, EvalResult, Location};
use super::expand::parse_expr;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Recursive,
    /// `:=` / `::=`
    Simple,
    /// `?=`
    Conditional,
    /// `+=`
    Append,
    /// `!=`
    Shell,
}

impl AssignOp {
    fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "=" => AssignOp::Recursive,
            ":=" | "::=" => AssignOp::Simple,
            "?=" => AssignOp::Conditional,
            "+=" => AssignOp::Append,
            "!=" => AssignOp::Shell,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        name: Value,
        op: AssignOp,
        value: Value,
        /// Right-hand side as written; the stored text of a recursive variable.
        src: String,
        is_override: bool,
    },
    Undefine {
        name: Value,
        is_override: bool,
    },
    Rule {
        targets: Value,
        prereqs: Value,
        /// Recipe lines, unexpanded, without the leading tab.
        recipe: Vec<String>,
    },
    /// A bare expression, expanded for its side effects.
    Expr(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub loc: Location,
    pub kind: StmtKind,
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Parse a whole build file; statements are located by line in `file`.
pub fn parse_script(src: &str, file: &str) -> EvalResult<Vec<Stmt>> {
    StmtParser::new(src, file, None).parse()
}

/// Parse text produced at `loc` (by `eval` or `--eval`); every statement
/// reports `loc` as its location.
pub fn parse_script_at(src: &str, loc: &Location) -> EvalResult<Vec<Stmt>> {
    StmtParser::new(src, &loc.file, Some(loc.line)).parse()
}

// ── Parser ────────────────────────────────────────────────────────────────────

fn define_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(override\s+)?define\s+(\S+?)\s*(=|:=|::=|\?=|\+=|!=)?\s*$")
            .expect("define header regex")
    })
}

struct StmtParser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    file: &'a str,
    fixed_line: Option<usize>,
}

impl<'a> StmtParser<'a> {
    fn new(src: &'a str, file: &'a str, fixed_line: Option<usize>) -> Self {
        Self { lines: src.lines().collect(), pos: 0, file, fixed_line }
    }

    fn loc(&self, index: usize) -> Location {
        Location::new(self.file, self.fixed_line.unwrap_or(index + 1))
    }

    fn parse(mut self) -> EvalResult<Vec<Stmt>> {
        let mut stmts: Vec<Stmt> = Vec::new();
        let mut in_rule = false;

        while self.pos < self.lines.len() {
            let start = self.pos;
            let loc = self.loc(start);
            let raw = self.lines[start];

            if let Some(body) = raw.strip_prefix('\t') {
                if in_rule {
                    let line = self.logical_line(body);
                    if let Some(Stmt { kind: StmtKind::Rule { recipe, .. }, .. }) = stmts.last_mut() {
                        recipe.push(line);
                    }
                    continue;
                }
            }

            if let Some(caps) = define_header().captures(raw) {
                self.pos += 1;
                let body = self.define_body(&loc)?;
                let op = caps
                    .get(3)
                    .and_then(|m| AssignOp::from_token(m.as_str()))
                    .unwrap_or(AssignOp::Recursive);
                let name = parse_expr(&caps[2]).map_err(|e| EvalError::parse(&loc, e))?;
                let value = parse_expr(&body).map_err(|e| EvalError::parse(&loc, e))?;
                stmts.push(Stmt {
                    loc,
                    kind: StmtKind::Assign {
                        name,
                        op,
                        value,
                        src: body,
                        is_override: caps.get(1).is_some(),
                    },
                });
                in_rule = false;
                continue;
            }

            let joined = self.logical_line(raw);
            let line = strip_comment(&joined);
            if line.trim().is_empty() {
                continue;
            }
            let kind = parse_line(&line, &loc)?;
            in_rule = matches!(kind, StmtKind::Rule { .. });
            if let Some(kind) = kind_if_kept(kind) {
                stmts.push(Stmt { loc, kind });
            }
        }
        Ok(stmts)
    }

    /// Consume one logical line starting at `self.pos`, whose first physical
    /// line is `first`, joining backslash continuations.
    fn logical_line(&mut self, first: &'a str) -> String {
        let mut out = String::new();
        let mut cur = first;
        loop {
            self.pos += 1;
            let continued = ends_with_continuation(cur);
            if !continued || self.pos >= self.lines.len() {
                out.push_str(if continued { &cur[..cur.len() - 1] } else { cur });
                return out;
            }
            out.push_str(cur[..cur.len() - 1].trim_end());
            out.push(' ');
            let next: &'a str = self.lines[self.pos];
            cur = next.trim_start();
        }
    }

    /// Collect a `define` body up to the matching `endef`.
    fn define_body(&mut self, loc: &Location) -> EvalResult<String> {
        let mut depth = 0usize;
        let mut body: Vec<&str> = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            let word = line.split_whitespace().next().unwrap_or("");
            if word == "endef" {
                if depth == 0 {
                    return Ok(body.join("\n"));
                }
                depth -= 1;
            } else if define_header().is_match(line) {
                depth += 1;
            }
            body.push(line);
        }
        Err(EvalError::parse(loc, "missing 'endef', unterminated 'define'"))
    }
}

fn kind_if_kept(kind: StmtKind) -> Option<StmtKind> {
    match kind {
        StmtKind::Expr(ref v) if v.is_empty_literal() => None,
        kind => Some(kind),
    }
}

/// `true` if the line ends in an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Drop an unescaped `#` and what follows; `\#` becomes `#`.  A `#` inside
/// `$(…)`/`${…}` is literal.
fn strip_comment(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    let mut i = 0;
    let mut lit = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'#') => {
                out.push_str(&line[lit..i]);
                i += 1;
                lit = i;
            }
            b'$' if bytes.get(i + 1) == Some(&b'$') => i += 1,
            b'$' if matches!(bytes.get(i + 1), Some(b'(' | b'{')) => {
                depth += 1;
                i += 1;
            }
            b'(' | b'{' if depth > 0 => depth += 1,
            b')' | b'}' if depth > 0 => depth -= 1,
            b'#' if depth == 0 => {
                out.push_str(&line[lit..i]);
                return out;
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&line[lit..]);
    out
}

/// The first top-level `:` or `=` of a line, skipping references.
enum Separator {
    Colon(usize),
    Assign { start: usize, end: usize, op: AssignOp },
}

fn find_separator(line: &str) -> Option<Separator> {
    let bytes = line.as_bytes();
    let mut closers: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'$' => {
                match bytes.get(i + 1) {
                    Some(b'(') => closers.push(b')'),
                    Some(b'{') => closers.push(b'}'),
                    _ => {}
                }
                i += 2;
                continue;
            }
            b'(' if !closers.is_empty() => closers.push(b')'),
            b'{' if !closers.is_empty() => closers.push(b'}'),
            _ if closers.last() == Some(&b) => {
                closers.pop();
            }
            _ if !closers.is_empty() => {}
            b'=' => {
                let (start, op) = match i.checked_sub(1).map(|p| bytes[p]) {
                    Some(b'?') => (i - 1, AssignOp::Conditional),
                    Some(b'+') => (i - 1, AssignOp::Append),
                    Some(b'!') => (i - 1, AssignOp::Shell),
                    _ => (i, AssignOp::Recursive),
                };
                return Some(Separator::Assign { start, end: i + 1, op });
            }
            b':' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    return Some(Separator::Assign { start: i, end: i + 2, op: AssignOp::Simple });
                }
                if bytes.get(i + 1) == Some(&b':') && bytes.get(i + 2) == Some(&b'=') {
                    return Some(Separator::Assign { start: i, end: i + 3, op: AssignOp::Simple });
                }
                return Some(Separator::Colon(i));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// If `line` starts with keyword `kw` used as a directive (not as a variable
/// name being assigned), return the rest.
fn strip_keyword<'l>(line: &'l str, kw: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(kw)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim_start();
    let assigns = ["=", ":=", "::=", "?=", "+=", "!="];
    if rest.is_empty() || assigns.iter().any(|op| rest.starts_with(op)) {
        return None;
    }
    Some(rest)
}

fn parse_line(line: &str, loc: &Location) -> EvalResult<StmtKind> {
    let expr = |s: &str| parse_expr(s).map_err(|e| EvalError::parse(loc, e));
    let mut text = line.trim_start();

    for kw in ["ifeq", "ifneq", "ifdef", "ifndef", "else", "endif", "include", "-include", "sinclude", "vpath"] {
        let word = text.split_whitespace().next().unwrap_or("");
        if (word == kw && strip_keyword(text, kw).is_some()) || text.trim_end() == kw {
            return Err(EvalError::parse(loc, format!("unsupported directive '{kw}'")));
        }
    }

    let mut is_override = false;
    if let Some(rest) = strip_keyword(text, "override") {
        is_override = true;
        text = rest;
    }
    if let Some(rest) = strip_keyword(text, "undefine") {
        return Ok(StmtKind::Undefine { name: expr(rest.trim())?, is_override });
    }
    if let Some(rest) = strip_keyword(text, "export").or_else(|| strip_keyword(text, "unexport")) {
        // Environment export is not modelled; a bare `export NAME` is a no-op.
        match find_separator(rest) {
            Some(Separator::Assign { .. }) => text = rest,
            _ => return Ok(StmtKind::Expr(Value::default())),
        }
    }

    match find_separator(text) {
        Some(Separator::Assign { start, end, op }) => {
            let name = text[..start].trim();
            if name.is_empty() {
                return Err(EvalError::parse(loc, "empty variable name"));
            }
            let src = text[end..].trim_start();
            Ok(StmtKind::Assign {
                name: expr(name)?,
                op,
                value: expr(src)?,
                src: src.to_owned(),
                is_override,
            })
        }
        Some(Separator::Colon(at)) if !is_override => {
            let after = text[at + 1..].trim_start_matches(':');
            let (prereqs, recipe) = match after.find(';') {
                Some(semi) => (&after[..semi], vec![after[semi + 1..].trim_start().to_owned()]),
                None => (after, Vec::new()),
            };
            Ok(StmtKind::Rule {
                targets: expr(text[..at].trim())?,
                prereqs: expr(prereqs.trim())?,
                recipe,
            })
        }
        _ if is_override => Err(EvalError::parse(loc, "missing separator")),
        _ => Ok(StmtKind::Expr(expr(text)?)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
