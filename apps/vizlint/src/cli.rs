//! CLI argument parsing via `clap`.

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vizlint",
    version,
    about = "Lint dashboard pages and their CSV data",
    long_about = "vizlint checks Markdown dashboard pages (SQL blocks and chart components) and the CSV files they read against a configurable rule set.\n\nConfiguration precedence: CLI > vizlint.toml > defaults.",
    after_help = "Examples:\n  vizlint check\n  vizlint check --pages site/pages --sources data/csv --strict\n  vizlint gaps --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current vizlint version.")]
    Version,
    /// Lint pages and data files
    #[command(
        about = "Run lint checks",
        long_about = "Scan every page under the pages directory and every configured CSV under the sources directory. Errors fail the run; warnings fail it only with --strict.",
        after_help = "Examples:\n  vizlint check\n  vizlint check --output json\n  vizlint check --strict"
    )]
    Check {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Pages directory, relative to the root (default: pages)")]
        pages: Option<String>,
        #[arg(long, help = "Data directory, relative to the root (default: sources/CMP)")]
        sources: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = ArgAction::SetTrue, help = "Treat warnings as errors")]
        strict: bool,
    },
    /// Print derived gap ranges
    #[command(
        about = "Show derived gap ranges",
        long_about = "Merge the configured per-source gaps into universal and source-only ranges and print the ReferenceArea bounds each one needs."
    )]
    Gaps {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::try_parse_from(["vizlint", "-vv", "check", "--strict", "--output", "json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Commands::Check { strict, output, pages, .. } => {
                assert!(strict);
                assert_eq!(output.as_deref(), Some("json"));
                assert!(pages.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["vizlint", "gaps", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.cmd, Commands::Gaps { .. }));
    }
}
