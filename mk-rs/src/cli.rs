//! Command-line argument parsing.
//!
//! Usage:
//!   mk [-f FILE] [-C DIR] [-dp] [--eval=TEXT] [-V NAME] [NAME=VALUE]...

use std::path::{Path, PathBuf};

pub const USAGE: &str = "\
Usage: mk [options] [NAME=VALUE]...
  -f FILE, --file=FILE      Read FILE as the build file ('-' for stdin)
  -C DIR, --directory=DIR   Change to DIR before doing anything
  -d, --debug               Print debugging information
  -p, --print-data-base     Print the variable database after evaluation
  -V NAME                   Print the expanded value of NAME
  --eval=TEXT               Evaluate TEXT as build-file statements
  -h, --help                Print this message and exit";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Build-file selection.
    pub file: MakefileSource,
    /// Directory to change to first (`-C`).
    pub directory: Option<PathBuf>,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Dump the variable table when done (`-p`).
    pub print_db: bool,
    /// `--eval` texts, in order.
    pub evals: Vec<String>,
    /// Variables to print when done (`-V`).
    pub print_vars: Vec<String>,
    /// `NAME=VALUE` assignments.
    pub overrides: Vec<(String, String)>,
    /// `-h` / `--help`.
    pub help: bool,
}

/// Where the build file comes from.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum MakefileSource {
    /// First of `GNUmakefile`, `makefile`, `Makefile` (default).
    #[default]
    Search,
    /// `-f -`.
    Stdin,
    /// `-f FILE`.
    Path(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

fn file_source(arg: &str) -> MakefileSource {
    if arg == "-" {
        MakefileSource::Stdin
    } else {
        MakefileSource::Path(PathBuf::from(arg))
    }
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            for rest in &argv[i + 1..] {
                push_assignment(&mut args, rest)?;
            }
            break;
        }

        // Long options.
        if let Some(long) = arg.strip_prefix("--") {
            let (key, value) = match long.split_once('=') {
                Some((k, v)) => (k, Some(v.to_owned())),
                None => (long, None),
            };
            let mut value_or_next = |name: &str| -> Result<String, String> {
                if let Some(v) = value.clone() {
                    return Ok(v);
                }
                i += 1;
                argv.get(i).cloned().ok_or_else(|| format!("--{name} requires an argument"))
            };
            match key {
                "eval" => {
                    let text = value_or_next("eval")?;
                    args.evals.push(text);
                }
                "file" | "makefile" => args.file = file_source(&value_or_next(key)?),
                "directory" => args.directory = Some(PathBuf::from(value_or_next(key)?)),
                "debug" => args.debug = true,
                "print-data-base" => args.print_db = true,
                "help" => args.help = true,
                _ => return Err(format!("unknown option: --{key}")),
            }
            i += 1;
            continue;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            push_assignment(&mut args, arg)?;
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'p' => args.print_db = true,
                'h' => args.help = true,

                // Options taking a value, embedded (-fFILE) or separate (-f FILE).
                c @ ('f' | 'C' | 'V') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{c} requires an argument"));
                    };
                    match c {
                        'f' => args.file = file_source(&value),
                        'C' => args.directory = Some(PathBuf::from(value)),
                        _ => args.print_vars.push(value),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

/// Record a `NAME=VALUE` argument.
fn push_assignment(args: &mut CliArgs, arg: &str) -> Result<(), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            args.overrides.push((name.trim().to_owned(), value.to_owned()));
            Ok(())
        }
        _ => Err(format!("unexpected argument '{arg}' (targets are not built)")),
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search `dir` for the default build file names.
/// Returns the first path that exists, or `None`.
pub fn find_makefile(dir: &Path) -> Option<PathBuf> {
    ["GNUmakefile", "makefile", "Makefile"]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert_eq!(a.file, MakefileSource::Search);
        assert!(a.overrides.is_empty());
        assert!(!a.debug && !a.print_db);
    }

    #[test]
    fn file_separate_and_embedded() {
        let a = parse_argv(&argv(&["-f", "build.mk"])).unwrap();
        assert_eq!(a.file, MakefileSource::Path(PathBuf::from("build.mk")));
        let a = parse_argv(&argv(&["-fbuild.mk"])).unwrap();
        assert_eq!(a.file, MakefileSource::Path(PathBuf::from("build.mk")));
        let a = parse_argv(&argv(&["--file=build.mk"])).unwrap();
        assert_eq!(a.file, MakefileSource::Path(PathBuf::from("build.mk")));
    }

    #[test]
    fn file_stdin() {
        let a = parse_argv(&argv(&["-f", "-"])).unwrap();
        assert_eq!(a.file, MakefileSource::Stdin);
    }

    #[test]
    fn combined_bool_flags() {
        let a = parse_argv(&argv(&["-dp"])).unwrap();
        assert!(a.debug && a.print_db);
    }

    #[test]
    fn directory() {
        let a = parse_argv(&argv(&["-C", "/tmp"])).unwrap();
        assert_eq!(a.directory, Some(PathBuf::from("/tmp")));
        let a = parse_argv(&argv(&["--directory=/srv"])).unwrap();
        assert_eq!(a.directory, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn eval_and_print_vars() {
        let a = parse_argv(&argv(&["--eval=X := 1", "--eval", "Y = 2", "-V", "X", "-VY"])).unwrap();
        assert_eq!(a.evals, vec!["X := 1", "Y = 2"]);
        assert_eq!(a.print_vars, vec!["X", "Y"]);
    }

    #[test]
    fn assignments() {
        let a = parse_argv(&argv(&["CC=clang", "CFLAGS=-O2 -g", "--", "X=a=b"])).unwrap();
        assert_eq!(
            a.overrides,
            vec![
                ("CC".to_owned(), "clang".to_owned()),
                ("CFLAGS".to_owned(), "-O2 -g".to_owned()),
                ("X".to_owned(), "a=b".to_owned()),
            ]
        );
    }

    #[test]
    fn bare_target_rejected() {
        assert!(parse_argv(&argv(&["all"])).is_err());
        assert!(parse_argv(&argv(&["=x"])).is_err());
    }

    #[test]
    fn missing_value() {
        assert!(parse_argv(&argv(&["-f"])).is_err());
        assert!(parse_argv(&argv(&["--eval"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
        assert!(parse_argv(&argv(&["--frobnicate"])).is_err());
    }

    #[test]
    fn find_makefile_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_makefile(dir.path()), None);
        std::fs::write(dir.path().join("Makefile"), "").unwrap();
        assert_eq!(find_makefile(dir.path()), Some(dir.path().join("Makefile")));
        std::fs::write(dir.path().join("GNUmakefile"), "").unwrap();
        assert_eq!(find_makefile(dir.path()), Some(dir.path().join("GNUmakefile")));
    }
}
