//! Shared data models for findings, summaries, and the rule configuration.

pub mod conventions;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Finding severity. `Error` fails the build; `Warn` only under `--strict`.
pub enum Severity {
    Error,
    #[serde(alias = "warning")]
    Warn,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single rule violation scoped to one file.
pub struct Finding {
    pub severity: Severity,
    pub rule: String,
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts used by printers and for the exit status.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub pages: usize,
    pub data_files: usize,
}

impl Summary {
    /// Pass/fail policy: any error fails; warnings fail only when `strict`.
    pub fn failed(&self, strict: bool) -> bool {
        self.errors > 0 || (strict && self.warnings > 0)
    }
}

#[derive(Debug, Clone, Serialize)]
/// Lint results container.
pub struct LintResult {
    pub findings: Vec<Finding>,
    pub summary: Summary,
}
