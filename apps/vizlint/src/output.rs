//! Output rendering for the `check` and `gaps` commands.
//!
//! Supports `human` (default) and `json` outputs. The human report groups
//! findings by file and wraps messages to a fixed width; the JSON form is the
//! serialized `LintResult` plus the pass/fail verdict.

use crate::findings::group_by_file;
use crate::gaps::{GapRange, GapTable};
use crate::models::{LintResult, Severity};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::fmt::Write as _;

const WIDTH: usize = 68;

pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// `error:` label for stderr diagnostics.
pub fn error_prefix(color: bool) -> String {
    if color {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix(color: bool) -> String {
    if color {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Greedy word wrap; a word longer than `width` gets its own line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn icon(severity: Severity, color: bool) -> String {
    match (severity, color) {
        (Severity::Error, true) => "✗".red().bold().to_string(),
        (Severity::Error, false) => "✗".to_string(),
        (Severity::Warn, true) => "⚠".yellow().bold().to_string(),
        (Severity::Warn, false) => "⚠".to_string(),
    }
}

/// Render the human report.
pub fn render_report(res: &LintResult, strict: bool, color: bool) -> String {
    let mut out = String::new();
    let rule = "═".repeat(WIDTH);
    let banner = format!(
        "vizlint · {} pages · {} data files",
        res.summary.pages, res.summary.data_files
    );
    let _ = writeln!(out, "{rule}");
    if color {
        let _ = writeln!(out, "{}", banner.bold());
    } else {
        let _ = writeln!(out, "{banner}");
    }
    let _ = writeln!(out, "{rule}");

    if res.findings.is_empty() {
        let ok = "✓ All checks passed";
        if color {
            let _ = writeln!(out, "\n{}", ok.green().bold());
        } else {
            let _ = writeln!(out, "\n{ok}");
        }
    }

    for (file, findings) in group_by_file(&res.findings) {
        if color {
            let _ = writeln!(out, "\n{}", file.bold());
        } else {
            let _ = writeln!(out, "\n{file}");
        }
        for f in findings {
            // "  ✗ [RULE] "
            let indent = f.rule.chars().count() + 7;
            let lines = wrap(&f.message, WIDTH.saturating_sub(indent).max(20));
            let tag = if color {
                format!("[{}]", f.rule).dimmed().to_string()
            } else {
                format!("[{}]", f.rule)
            };
            for (i, line) in lines.iter().enumerate() {
                if i == 0 {
                    let _ = writeln!(out, "  {} {tag} {line}", icon(f.severity, color));
                } else {
                    let _ = writeln!(out, "{}{line}", " ".repeat(indent));
                }
            }
        }
    }

    let s = &res.summary;
    let failed = s.failed(strict);
    let verdict = match (failed, color) {
        (true, true) => "FAIL".red().bold().to_string(),
        (true, false) => "FAIL".to_string(),
        (false, true) => "PASS".green().bold().to_string(),
        (false, false) => "PASS".to_string(),
    };
    let _ = writeln!(out, "\n{}", "─".repeat(WIDTH));
    let _ = writeln!(
        out,
        "{verdict} · {} error(s) · {} warning(s)",
        s.errors, s.warnings
    );
    if strict {
        let _ = writeln!(out, "(--strict: warnings treated as errors)");
    }
    out
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(res: &LintResult, strict: bool) -> JsonVal {
    json!({
        "findings": res.findings,
        "summary": res.summary,
        "strict": strict,
        "passed": !res.summary.failed(strict),
    })
}

/// Print lint results in the requested format.
pub fn print_lint(res: &LintResult, output: &str, strict: bool) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_lint_json(res, strict)).unwrap_or_default()
        ),
        _ => print!("{}", render_report(res, strict, use_colors(output))),
    }
}

fn gap_json(g: &GapRange) -> JsonVal {
    json!({
        "label": g.label,
        "xMin": g.start_iso(),
        "xMax": g.end_iso(),
        "sources": g.sources,
    })
}

pub fn compose_gaps_json(gaps: &GapTable) -> JsonVal {
    json!({
        "universal": gaps.universal.iter().map(gap_json).collect::<Vec<_>>(),
        "source_only": gaps.source_only.iter().map(gap_json).collect::<Vec<_>>(),
    })
}

/// Print derived gap ranges with the annotation each one needs.
pub fn print_gaps(gaps: &GapTable, output: &str) {
    if output == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&compose_gaps_json(gaps)).unwrap_or_default()
        );
        return;
    }
    let color = use_colors(output);
    let sections = [
        ("Universal gaps", &gaps.universal),
        ("Source-only gaps", &gaps.source_only),
    ];
    for (title, ranges) in sections {
        if color {
            println!("{}", title.bold());
        } else {
            println!("{title}");
        }
        if ranges.is_empty() {
            println!("  (none)");
        }
        for g in ranges {
            let sources: Vec<&str> = g.sources.iter().map(String::as_str).collect();
            println!(
                "  {:<20} xMin='{}' xMax='{}'  [{}]",
                g.label,
                g.start_iso(),
                g.end_iso(),
                sources.join(", ")
            );
        }
    }
}
