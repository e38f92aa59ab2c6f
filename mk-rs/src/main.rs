use std::io::Read;
use std::process::ExitCode;

use mk::cli::{self, CliArgs, MakefileSource};
use mk::logger;
use mk::script::Evaluator;

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("mk: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    logger::init(args.debug);

    if let Some(dir) = &args.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("mk: *** {}: {e}.  Stop.", dir.display());
            return ExitCode::from(2);
        }
        log::debug!("entering directory {}", dir.display());
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

/// Evaluate everything the command line asks for.  Any fatal error comes
/// back as its printed diagnostic.
fn run(args: &CliArgs) -> Result<(), String> {
    let mut ev = Evaluator::streaming();
    ev.import_environment();

    for (name, value) in &args.overrides {
        ev.set_command_line_var(name, value).map_err(|e| e.to_string())?;
    }

    for text in &args.evals {
        ev.exec_script(text, "--eval").map_err(|e| e.to_string())?;
    }

    let (src, file) = match &args.file {
        MakefileSource::Stdin => {
            let mut src = String::new();
            std::io::stdin()
                .read_to_string(&mut src)
                .map_err(|e| format!("mk: -: {e}"))?;
            (Some(src), "-".to_owned())
        }
        MakefileSource::Path(path) => {
            let src = std::fs::read_to_string(path)
                .map_err(|e| format!("mk: {}: {e}", path.display()))?;
            (Some(src), path.display().to_string())
        }
        MakefileSource::Search => match cli::find_makefile(std::path::Path::new(".")) {
            Some(path) => {
                let src = std::fs::read_to_string(&path)
                    .map_err(|e| format!("mk: {}: {e}", path.display()))?;
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                (Some(src), name.unwrap_or_default())
            }
            None if !args.evals.is_empty() || !args.print_vars.is_empty() => (None, String::new()),
            None => return Err("mk: *** No targets specified and no makefile found.  Stop.".into()),
        },
    };

    if let Some(src) = src {
        log::debug!("reading {file}");
        ev.exec_script(&src, &file).map_err(|e| e.to_string())?;
    }
    log::debug!("{} variables, {} rules", ev.vars.len(), ev.rules.len());

    if args.print_db {
        for line in ev.dump_vars() {
            println!("{line}");
        }
    }
    for name in &args.print_vars {
        let value = ev.expand_str(&format!("$({name})")).map_err(|e| e.to_string())?;
        println!("{value}");
    }
    Ok(())
}
