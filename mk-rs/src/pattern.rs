//! Word and `%`-pattern primitives.
//!
//! Nearly every text function works on *word lists*: the input is split on
//! runs of ASCII whitespace and empty tokens are discarded.  Patterns are the
//! make flavour of wildcard: at most one `%`, which matches any (possibly
//! empty) run of bytes called the *stem*.
//!
//! | Pattern  | Word        | Matches | Stem      |
//! |----------|-------------|---------|-----------|
//! | `%.c`    | `foo.c`     | yes     | `foo`     |
//! | `lib%.a` | `libm.a`    | yes     | `m`       |
//! | `%.c`    | `.c`        | yes     | (empty)   |
//! | `foo`    | `foo`       | yes     | (none)    |
//! | `foo`    | `xfoo`      | no      |           |

use std::borrow::Cow;

// ── Words ─────────────────────────────────────────────────────────────────────

/// Split `text` into words on runs of ASCII whitespace.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_ascii_whitespace().collect()
}

/// Writer that joins successive words with exactly one space.
///
/// Never emits a leading or trailing separator.  [`WordWriter::append`]
/// glues text onto the previous word without a separator, which is how
/// `join`, `addprefix` and `addsuffix` build compound words.
pub struct WordWriter<'a> {
    out: &'a mut String,
    needs_space: bool,
}

impl<'a> WordWriter<'a> {
    pub fn new(out: &'a mut String) -> Self {
        Self { out, needs_space: false }
    }

    /// Write one word, preceded by a space unless it is the first.
    pub fn word(&mut self, w: &str) {
        if self.needs_space {
            self.out.push(' ');
        }
        self.needs_space = true;
        self.out.push_str(w);
    }

    /// Append `s` to the current word.
    pub fn append(&mut self, s: &str) {
        self.out.push_str(s);
    }
}

// ── Patterns ──────────────────────────────────────────────────────────────────

/// A parsed pattern: a literal, or a prefix/suffix pair around one `%`.
///
/// Only the first `%` is a wildcard; any later `%` is part of the suffix and
/// matched literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern<'p> {
    prefix: &'p str,
    suffix: Option<&'p str>,
}

impl<'p> Pattern<'p> {
    pub fn new(src: &'p str) -> Self {
        match src.find('%') {
            Some(i) => Pattern {
                prefix: &src[..i],
                suffix: Some(&src[i + 1..]),
            },
            None => Pattern { prefix: src, suffix: None },
        }
    }

    /// Returns `true` if the pattern contains a `%`.
    pub fn has_wildcard(&self) -> bool {
        self.suffix.is_some()
    }

    /// Return the stem captured from `word`, or `None` if it doesn't match.
    ///
    /// A literal pattern yields an empty stem when it equals `word`.
    pub fn stem<'w>(&self, word: &'w str) -> Option<&'w str> {
        match self.suffix {
            None => (word == self.prefix).then_some(""),
            Some(suffix) => {
                if word.len() < self.prefix.len() + suffix.len() {
                    return None;
                }
                let rest = word.strip_prefix(self.prefix)?;
                rest.strip_suffix(suffix)
            }
        }
    }

    pub fn matches(&self, word: &str) -> bool {
        self.stem(word).is_some()
    }

    /// Rewrite a matching `word` through `repl`.
    ///
    /// Non-matching words pass through unchanged.  On a match, the first `%`
    /// of `repl` is replaced by the stem; a `repl` without `%` replaces the
    /// whole word.
    pub fn subst<'w>(&self, repl: &str, word: &'w str) -> Cow<'w, str> {
        let Some(stem) = self.stem(word) else {
            return Cow::Borrowed(word);
        };
        if !self.has_wildcard() {
            return Cow::Owned(repl.to_owned());
        }
        match repl.find('%') {
            Some(i) => {
                let mut out = String::with_capacity(repl.len() + stem.len());
                out.push_str(&repl[..i]);
                out.push_str(stem);
                out.push_str(&repl[i + 1..]);
                Cow::Owned(out)
            }
            None => Cow::Owned(repl.to_owned()),
        }
    }
}

/// Returns `true` if `word` matches `pattern`.
pub fn match_pattern(pattern: &str, word: &str) -> bool {
    Pattern::new(pattern).matches(word)
}

/// Substitute `word` through `pattern` → `repl` (see [`Pattern::subst`]).
pub fn subst_pattern<'w>(pattern: &str, repl: &str, word: &'w str) -> Cow<'w, str> {
    Pattern::new(pattern).subst(repl, word)
}

// ── File-name suffixes ────────────────────────────────────────────────────────

/// Byte offset of the `.` starting `word`'s suffix, if its last path
/// component has one.
fn ext_start(word: &str) -> Option<usize> {
    let dot = word.rfind('.')?;
    match word.rfind('/') {
        Some(slash) if slash > dot => None,
        _ => Some(dot),
    }
}

/// The suffix of `word` (`src/a.c` → `.c`), if any.
pub fn ext(word: &str) -> Option<&str> {
    ext_start(word).map(|i| &word[i..])
}

/// `word` without its suffix (`src/a.c` → `src/a`).
pub fn strip_ext(word: &str) -> &str {
    ext_start(word).map_or(word, |i| &word[..i])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
