//! Expression parser: build-file text → [`Value`].
//!
//! | Sequence            | Meaning                                         |
//! |---------------------|-------------------------------------------------|
//! | `$$`                | Literal `$`                                     |
//! | `$x`                | Reference to the one-character variable `x`     |
//! | `$(name)` `${name}` | Variable reference; `name` may nest references  |
//! | `$(name:a=b)`       | Substitution reference                          |
//! | `$(fn args)`        | Function call when `fn` is a registered builtin |
//!
//! Inside a reference only the opening delimiter kind nests: `$(a (b) c)`
//! balances parentheses, `${a {b} c}` balances braces.  Argument commas are
//! recognised only at nesting depth zero, and only as many as the
//! function's arity allows (see [`func`](super::func)).

use super::func::{self, FuncCall};
use super::value::Value;

/// Parse `src` into an expression.
///
/// Returns an error message (without location) for malformed references.
pub fn parse_expr(src: &str) -> Result<Value, String> {
    let mut p = ExprParser { src, pos: 0 };
    p.parse_seq(None, &[])
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

fn closer_of(open: u8) -> u8 {
    if open == b'{' { b'}' } else { b')' }
}

fn opener_of(close: u8) -> u8 {
    if close == b'}' { b'{' } else { b'(' }
}

/// Append literal text, merging with a preceding literal.
fn push_literal(parts: &mut Vec<Value>, s: &str) {
    if s.is_empty() {
        return;
    }
    if let Some(Value::Literal(prev)) = parts.last_mut() {
        prev.push_str(s);
    } else {
        parts.push(Value::literal(s));
    }
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    /// Parse up to an unnested `close` byte, or a byte in `stops` at depth
    /// zero, or end of input.  The terminator is not consumed.
    fn parse_seq(&mut self, close: Option<u8>, stops: &[u8]) -> Result<Value, String> {
        let open = close.map(opener_of);
        let mut parts = Vec::new();
        let mut lit_start = self.pos;
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            if c == b'$' {
                push_literal(&mut parts, &self.src[lit_start..self.pos]);
                self.parse_dollar(&mut parts)?;
                lit_start = self.pos;
                continue;
            }
            if depth == 0 && (Some(c) == close || stops.contains(&c)) {
                break;
            }
            if Some(c) == open {
                depth += 1;
            } else if Some(c) == close {
                depth -= 1;
            }
            self.pos += 1;
        }

        push_literal(&mut parts, &self.src[lit_start..self.pos]);
        Ok(Value::concat(parts))
    }

    /// Parse the `$…` sequence at `self.pos`.
    fn parse_dollar(&mut self, parts: &mut Vec<Value>) -> Result<(), String> {
        let start = self.pos;
        self.pos += 1;
        match self.peek() {
            None => push_literal(parts, "$"),
            Some(b'$') => {
                self.pos += 1;
                push_literal(parts, "$");
            }
            Some(open @ (b'(' | b'{')) => {
                self.pos += 1;
                let value = self.parse_ref(start, closer_of(open))?;
                parts.push(value);
            }
            Some(_) => {
                let ch = self.src[self.pos..].chars().next().unwrap_or_default();
                self.pos += ch.len_utf8();
                parts.push(Value::VarRef(Box::new(Value::literal(ch.to_string()))));
            }
        }
        Ok(())
    }

    /// Parse a reference body; `self.pos` is just past the opener.
    fn parse_ref(&mut self, start: usize, close: u8) -> Result<Value, String> {
        let rest = &self.src[self.pos..];
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        if matches!(rest.as_bytes().get(name_len), Some(b' ' | b'\t')) {
            if let Some(mut call) = func::lookup(&rest[..name_len]) {
                self.pos += name_len;
                while matches!(self.peek(), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                self.parse_args(&mut call, close)?;
                call.set_source(&self.src[start..self.pos]);
                return Ok(Value::Func(Box::new(call)));
            }
        }

        let name = self.parse_seq(Some(close), &[b':'])?;
        match self.peek() {
            Some(c) if c == close => {
                self.pos += 1;
                Ok(Value::VarRef(Box::new(name)))
            }
            Some(b':') => {
                self.pos += 1;
                let pat = self.parse_seq(Some(close), &[b'='])?;
                match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        let repl = self.parse_seq(Some(close), &[])?;
                        if self.peek() != Some(close) {
                            return Err("unterminated variable reference".into());
                        }
                        self.pos += 1;
                        Ok(Value::SubstRef {
                            name: Box::new(name),
                            pat: Box::new(pat),
                            repl: Box::new(repl),
                        })
                    }
                    Some(c) if c == close => {
                        // `$(a:b)` is a plain reference to the name "a:b".
                        self.pos += 1;
                        let name = Value::concat(vec![name, Value::literal(":"), pat]);
                        Ok(Value::VarRef(Box::new(name)))
                    }
                    _ => Err("unterminated variable reference".into()),
                }
            }
            _ => Err("unterminated variable reference".into()),
        }
    }

    /// Split a function's argument text per its arity.
    fn parse_args(&mut self, call: &mut FuncCall, close: u8) -> Result<(), String> {
        let arity = call.arity();
        loop {
            let last = arity > 0 && call.args().len() + 1 >= arity;
            let stops: &[u8] = if last { &[] } else { b"," };
            let arg = self.parse_seq(Some(close), stops)?;
            call.add_arg(arg);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => {
                    return Err(format!(
                        "unterminated call to function '{}': missing '{}'",
                        call.name(),
                        close as char
                    ))
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
