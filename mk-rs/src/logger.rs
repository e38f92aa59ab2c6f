//! stderr backend for the `log` facade.
//!
//! Records are printed as `mk: <level>: <message>`.  When stderr is a
//! terminal the level tag is coloured with ANSI escapes.

use std::io::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Logger {
    pretty: bool,
}

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let (name, color) = match record.level() {
            Level::Error => ("error", 31),
            Level::Warn => ("warn", 35),
            Level::Info => ("info", 33),
            Level::Debug => ("debug", 36),
            Level::Trace => ("trace", 34),
        };

        let mut out = io::stderr().lock();
        if self.pretty {
            writeln!(out, "mk: \x1b[1;{color}m{name}\x1b[0m: {}", record.args()).ok();
        } else {
            writeln!(out, "mk: {name}: {}", record.args()).ok();
        }
    }

    fn flush(&self) {
        io::stderr().flush().ok();
    }
}

/// Returns `true` if stderr is attached to a terminal.
fn stderr_is_tty() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}

/// Parse an `MK_LOG` level name.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    Some(match s.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => return None,
    })
}

/// Install the logger.  `debug` raises the level to `Debug`; a valid
/// `MK_LOG` value overrides both.
pub fn init(debug: bool) {
    let pretty = stderr_is_tty();
    if log::set_boxed_logger(Box::new(Logger { pretty })).is_err() {
        return;
    }

    let mut level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };
    if let Ok(value) = std::env::var("MK_LOG") {
        match parse_level(&value) {
            Some(l) => level = l,
            None => eprintln!("mk: ignoring invalid MK_LOG value {value:?}"),
        }
    }
    log::set_max_level(level);

    if pretty {
        log::debug!("tty detected, pretty logging is enabled");
    } else {
        log::debug!("stderr is not a tty, pretty logging is disabled");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("trace"), Some(LevelFilter::Trace));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }
}
