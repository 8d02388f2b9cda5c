//! vizlint CLI binary entry point.
//! Resolves configuration, runs the engine and prints results.

use clap::Parser;
use std::process::ExitCode;
use vizlint::cli::{Cli, Commands};
use vizlint::config::{self, Effective};
use vizlint::error::Result;
use vizlint::lint::{self, Engine, Inputs};
use vizlint::logging::{init_logging, LogConfig};
use vizlint::output;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose).with_ansi(output::use_colors("human")));

    let outcome = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            root,
            pages,
            sources,
            output,
            strict,
        } => config::resolve_effective(
            root.as_deref(),
            pages.as_deref(),
            sources.as_deref(),
            output.as_deref(),
            strict.then_some(true),
        )
        .and_then(check),
        Commands::Gaps { root, output } => {
            config::resolve_effective(root.as_deref(), None, None, output.as_deref(), None)
                .and_then(gaps)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", output::error_prefix(output::use_colors("human")));
            ExitCode::from(2)
        }
    }
}

fn check(eff: Effective) -> Result<ExitCode> {
    if eff.config_file.is_none() && eff.output != "json" {
        eprintln!(
            "{} No vizlint.toml found; using built-in rules.",
            output::note_prefix(output::use_colors(&eff.output))
        );
    }
    let engine = Engine::new(eff.rules)?;
    let inputs = Inputs {
        root: eff.root,
        pages_dir: eff.pages_dir,
        data_dir: eff.sources_dir,
    };
    let result = lint::run(&engine, &inputs)?;
    output::print_lint(&result, &eff.output, eff.strict);
    if result.summary.failed(eff.strict) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn gaps(eff: Effective) -> Result<ExitCode> {
    let engine = Engine::new(eff.rules)?;
    output::print_gaps(engine.gaps(), &eff.output);
    Ok(ExitCode::SUCCESS)
}
