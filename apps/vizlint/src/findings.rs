//! Finding buffers.
//!
//! Rules write into a per-page [`Findings`] buffer; the driver appends whole
//! buffers to the shared [`Collector`], so findings for one file stay in rule
//! execution order even when pages are scanned concurrently.

use crate::models::{Finding, Severity, Summary};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Stable rule identifiers emitted by the engine.
pub mod ids {
    pub const META_FRONTMATTER: &str = "META_FRONTMATTER";
    pub const META_YAML_QUOTE: &str = "META_YAML_QUOTE";
    pub const META_DESCRIPTION: &str = "META_DESCRIPTION";
    pub const META_CITATION: &str = "META_CITATION";
    pub const LINK_ENCODING: &str = "LINK_ENCODING";

    pub const SQL_TRY_CAST: &str = "SQL_TRY_CAST";
    pub const SQL_VALUE_CAP: &str = "SQL_VALUE_CAP";
    pub const SQL_DATE_FORMAT: &str = "SQL_DATE_FORMAT";
    pub const SQL_NULL_GUARD: &str = "SQL_NULL_GUARD";
    pub const SQL_NULLIF: &str = "SQL_NULLIF";
    pub const SQL_UNRELIABLE_COLUMN: &str = "SQL_UNRELIABLE_COLUMN";
    pub const SQL_COLUMN_SWAP: &str = "SQL_COLUMN_SWAP";
    pub const SQL_DEPOT_NAME: &str = "SQL_DEPOT_NAME";
    pub const SQL_POSITION: &str = "SQL_POSITION";
    pub const SQL_DUPLICATE_QUERY: &str = "SQL_DUPLICATE_QUERY";

    pub const COMPONENT_FMT: &str = "COMPONENT_FMT";
    pub const COMPONENT_DEPRECATED: &str = "COMPONENT_DEPRECATED";
    pub const COMPONENT_CONNECT: &str = "COMPONENT_CONNECT";
    pub const COMPONENT_GAPS: &str = "COMPONENT_GAPS";
    pub const COMPONENT_QUERY_REF: &str = "COMPONENT_QUERY_REF";
    pub const COMPONENT_SELF_CLOSE: &str = "COMPONENT_SELF_CLOSE";
    pub const COMPONENT_COLOR_ORDER: &str = "COMPONENT_COLOR_ORDER";
    pub const COMPONENT_INVALID_PROP: &str = "COMPONENT_INVALID_PROP";

    pub const CHART_XFMT_YEAR: &str = "CHART_XFMT_YEAR";
    pub const BARCHART_MULTITYPE: &str = "BARCHART_MULTITYPE";
    pub const AREACHART_MISSING: &str = "AREACHART_MISSING";
    pub const REFERENCELINE_ZERO: &str = "REFERENCELINE_ZERO";
    pub const CHART_TITLE: &str = "CHART_TITLE";
    pub const CHART_YAXIS: &str = "CHART_YAXIS";
    pub const CHART_AREA_TYPE: &str = "CHART_AREA_TYPE";
    pub const CHART_DATATABLE_ROWS: &str = "CHART_DATATABLE_ROWS";
    pub const BIGVALUE_FMT: &str = "BIGVALUE_FMT";
    pub const MAP_LON_PROP: &str = "MAP_LON_PROP";
    pub const MAP_VALUE_FMT: &str = "MAP_VALUE_FMT";

    pub const PAGE_INTRO: &str = "PAGE_INTRO";
    pub const PAGE_SEE_ALSO: &str = "PAGE_SEE_ALSO";
    pub const PAGE_FOOTER: &str = "PAGE_FOOTER";
    pub const ARTIFACT_OPENER: &str = "ARTIFACT_OPENER";
    pub const CONTENT_IFELSE: &str = "CONTENT_IFELSE";

    pub const DATA_READ: &str = "DATA_READ";
    pub const DATA_MISSING_FILE: &str = "DATA_MISSING_FILE";
    pub const DATA_COLUMNS: &str = "DATA_COLUMNS";
    pub const DATA_DEPOT_NAME: &str = "DATA_DEPOT_NAME";
    pub const DATA_COORDS: &str = "DATA_COORDS";
    pub const DATA_DEPOT_EXCLUSIVE: &str = "DATA_DEPOT_EXCLUSIVE";
    pub const DATA_DATE_FMT: &str = "DATA_DATE_FMT";
}

#[derive(Debug, Default, Clone)]
/// Ordered finding buffer owned by one unit of work.
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        severity: Severity,
        rule: &str,
        file: &str,
        message: impl Into<String>,
    ) {
        self.items.push(Finding {
            severity,
            rule: rule.to_string(),
            file: file.to_string(),
            message: message.into(),
        });
    }

    pub fn error(&mut self, rule: &str, file: &str, message: impl Into<String>) {
        self.push(Severity::Error, rule, file, message);
    }

    pub fn warn(&mut self, rule: &str, file: &str, message: impl Into<String>) {
        self.push(Severity::Warn, rule, file, message);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.items
    }
}

/// Lock-guarded sink shared by concurrent page scans and the data check.
#[derive(Debug, Default)]
pub struct Collector {
    inner: Mutex<Vec<Finding>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a whole buffer, keeping its internal order.
    pub fn append(&self, findings: Findings) {
        if findings.is_empty() {
            return;
        }
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend(findings.into_vec());
    }

    /// Drain into a list ordered by file path. The sort is stable, so each
    /// file keeps its rule execution order.
    pub fn into_sorted(self) -> Vec<Finding> {
        let mut items = self.inner.into_inner().unwrap_or_else(|e| e.into_inner());
        items.sort_by(|a, b| a.file.cmp(&b.file));
        items
    }
}

/// Count findings by severity into a summary.
pub fn summarize(findings: &[Finding], pages: usize, data_files: usize) -> Summary {
    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    Summary {
        errors,
        warnings: findings.len() - errors,
        pages,
        data_files,
    }
}

/// Group findings by file, preserving per-file order.
pub fn group_by_file(findings: &[Finding]) -> BTreeMap<&str, Vec<&Finding>> {
    let mut by_file: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for f in findings {
        by_file.entry(f.file.as_str()).or_default().push(f);
    }
    by_file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_per_file_order() {
        let collector = Collector::new();
        let mut b = Findings::new();
        b.warn("SECOND", "b.md", "w");
        b.error("FIRST_B", "b.md", "e");
        collector.append(b);
        let mut a = Findings::new();
        a.error("A", "a.md", "e");
        collector.append(a);

        let all = collector.into_sorted();
        let rules: Vec<_> = all.iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(rules, vec!["A", "SECOND", "FIRST_B"]);
    }

    #[test]
    fn test_summarize_counts_by_severity() {
        let mut f = Findings::new();
        f.error("R1", "x", "m");
        f.warn("R2", "x", "m");
        f.warn("R3", "y", "m");
        let items = f.into_vec();
        let s = summarize(&items, 2, 1);
        assert_eq!(s.errors, 1);
        assert_eq!(s.warnings, 2);
        assert_eq!(group_by_file(&items).len(), 2);
    }
}
