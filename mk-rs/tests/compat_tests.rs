/// Compatibility tests: run build-file snippets through the `mk` binary and
/// verify its stdout matches expected lines.
///
/// When `MK_GNU_COMPARE=1` is set, the same snippet is also run through GNU
/// make (`MK_GNU_MAKE`, default `make`) and its stdout compared.  GNU make
/// complains about the missing targets on stderr and exits non-zero; only its
/// stdout is compared.
///
/// Each snippet is piped to the binary via stdin with `-f -`.

use std::io::Write;
use std::process::{Command, Output, Stdio};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Path to the `mk` binary built by this Cargo workspace.
fn mk_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_mk"))
}

/// Run `script` through `binary` with extra `args`.
fn run_with(binary: &std::path::Path, script: &str, args: &[&str]) -> Output {
    let mut child = Command::new(binary)
        .args(["-f", "-"])
        .args(args)
        .env("MK_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");
    {
        let stdin = child.stdin.as_mut().expect("stdin not open");
        stdin.write_all(script.as_bytes()).expect("write to stdin");
    }
    child.wait_with_output().expect("wait failed")
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout).lines().map(str::to_owned).collect()
}

fn gnu_compare_enabled() -> bool {
    std::env::var("MK_GNU_COMPARE").as_deref() == Ok("1")
}

/// Run a test case: verify `mk` prints `expected` and succeeds, and
/// (optionally) that GNU make prints the same.
fn check(script: &str, expected: &[&str]) {
    check_args(script, &[], expected);
}

fn check_args(script: &str, args: &[&str], expected: &[&str]) {
    check_mk(script, args, expected);

    if gnu_compare_enabled() {
        let make = std::env::var("MK_GNU_MAKE").unwrap_or_else(|_| "make".to_owned());
        let gnu = run_with(std::path::Path::new(&make), script, args);
        assert_eq!(stdout_lines(&gnu), expected, "\n--- GNU make output mismatch ---\nScript:\n{script}");
    }
}

/// Like [`check_args`] but never compared against GNU make, for behaviour
/// that is specific to `mk`.
fn check_mk(script: &str, args: &[&str], expected: &[&str]) {
    let out = run_with(&mk_binary(), script, args);
    let got = stdout_lines(&out);
    let want: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    assert!(
        out.status.success(),
        "mk failed ({}):\nScript:\n{script}\nStderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(got, want, "\n--- mk output mismatch ---\nScript:\n{script}");
}

/// Run a failing case: exit status 2 and `diagnostic` on stderr.
fn check_fatal(script: &str, stdout: &[&str], diagnostic: &str) {
    let out = run_with(&mk_binary(), script, &[]);
    let err = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(2), "Script:\n{script}\nStderr:\n{err}");
    assert_eq!(stdout_lines(&out), stdout);
    assert!(
        err.lines().any(|l| l == diagnostic),
        "diagnostic {diagnostic:?} not found in stderr:\n{err}"
    );
}

// ── Test cases ────────────────────────────────────────────────────────────────

#[test]
fn info_simple() {
    check("$(info hello world)", &["hello world"]);
}

#[test]
fn text_functions() {
    check(
        "$(info $(subst ee,EE,feet on the street))\n\
         $(info $(patsubst %.c,%.o,foo.c bar.c))\n\
         $(info $(filter %.c %.s,foo.c bar.o baz.s))\n\
         $(info $(sort foo bar lose foo))\n\
         $(info $(word 2,foo bar baz))\n\
         $(info $(wordlist 2,3,a b c d))\n\
         $(info $(join a b,x y z))",
        &["fEEt on the strEEt", "foo.o bar.o", "foo.c baz.s", "bar foo lose", "bar", "b c", "ax by z"],
    );
}

#[test]
fn variables_and_substitution_refs() {
    check(
        "SRCS := main.c util.c\nOBJS = $(SRCS:.c=.o)\nSRCS += extra.c\n$(info $(OBJS))",
        &["main.o util.o extra.o"],
    );
}

#[test]
fn call_and_foreach() {
    check(
        "pair = $(1)=$(2)\n\
         $(info $(foreach x,a b,$(call pair,$(x),$(x)$(x))))\n\
         $(info [$(1)][$(x)])",
        &["a=aa b=bb", "[][]"],
    );
}

#[test]
fn define_and_eval() {
    check(
        "define prog\n$(1)_objs := $(1).o\nendef\n\
         $(foreach p,foo bar,$(eval $(call prog,$(p))))\n\
         $(info $(foo_objs) $(bar_objs))",
        &["foo.o bar.o"],
    );
}

#[test]
fn lazy_conditionals() {
    check(
        "$(info $(if ,$(error never),else))\n\
         $(info $(and a,,$(error never)))\n\
         $(info $(or ,b,$(error never)))",
        &["else", "", "b"],
    );
}

#[test]
fn whitespace_condition_is_true() {
    check(
        "empty :=\nsp := $(empty) $(empty)\n\
         $(info $(if $(sp),THEN,ELSE))\n\
         $(info [$(or $(sp),b)][$(and a, x )])",
        &["THEN", "[ ][x]"],
    );
}

#[test]
fn shell_function() {
    check("$(info $(shell echo one; echo two))", &["one two"]);
}

#[test]
fn warning_goes_to_stdout_with_location() {
    // GNU make prints warnings on stderr.
    check_mk("\n$(warning look)", &[], &["-:2: look"]);
}

#[test]
fn command_line_variable_wins() {
    check_args("CC = gcc\n$(info $(CC) $(origin CC))", &["CC=clang"], &["clang command line"]);
}

#[test]
fn override_beats_command_line() {
    check_args("override CC = gcc\n$(info $(CC) $(origin CC))", &["CC=clang"], &["gcc override"]);
}

#[test]
fn eval_option_runs_first() {
    check_args("$(info $(X))", &["--eval=X := early"], &["early"]);
}

#[test]
fn print_variable_option() {
    check_mk("A = 1\nB = $(A) 2", &["-V", "B"], &["1 2"]);
}

#[test]
fn error_is_fatal() {
    check_fatal("$(info before)\n$(error stop here)\n$(info after)", &["before"], "-:2: *** stop here.");
}

#[test]
fn arity_error_is_fatal() {
    check_fatal(
        "$(info $(subst a,b))",
        &[],
        "*** insufficient number of arguments (2) to function 'subst'.",
    );
}

#[test]
fn missing_separator_is_fatal() {
    check_fatal("oops", &[], "-:1: *** missing separator.");
}
