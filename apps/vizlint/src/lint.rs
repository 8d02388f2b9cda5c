//! Rule engine and lint driver.
//!
//! [`Engine`] owns the rule configuration plus everything derived from it
//! once per process: merged gap ranges, the known-issue lookup and the
//! patterns compiled from configured column and table names. It is shared
//! read-only by every page scan.
//!
//! [`run`] enumerates pages, reads them in parallel, scans them in parallel
//! while the data check runs alongside, and returns a `LintResult` whose
//! findings are ordered by file path.

use crate::data::{self, DataReport, KnownIssues};
use crate::error::{LintError, Result};
use crate::extract::{normalize_newlines, Page};
use crate::findings::{ids, summarize, Collector, Findings};
use crate::gaps::{derive_gaps, GapTable};
use crate::models::conventions::{ReferenceMarker, RuleConfig};
use crate::models::LintResult;
use crate::rules::run_page_rules;
use glob::glob;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};

/// Compiled rule configuration.
#[derive(Debug)]
pub struct Engine {
    config: RuleConfig,
    gaps: GapTable,
    known: KnownIssues,
    capped: Vec<(String, Regex)>,
    markers: Vec<Option<Regex>>,
    table_refs: HashMap<String, Regex>,
}

impl Engine {
    /// Derive gap ranges and compile configured patterns.
    ///
    /// Fails only when a configured pattern does not compile.
    pub fn new(config: RuleConfig) -> Result<Self> {
        let gaps = derive_gaps(&config.gaps);
        let known = KnownIssues::new(&config.known_issues);

        let capped = config
            .capped_columns
            .iter()
            .map(|col| {
                let pattern = format!(r#"TRY_CAST\((?:\w+\.)?"{}" AS DOUBLE\)"#, regex::escape(col));
                compile(ids::SQL_VALUE_CAP, &pattern).map(|re| (col.clone(), re))
            })
            .collect::<Result<Vec<_>>>()?;

        let markers = config
            .markers
            .iter()
            .map(|m| {
                m.content_pattern
                    .as_deref()
                    .map(|p| compile(&m.rule, p))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table_refs = HashMap::new();
        let tables = config
            .primary_tables
            .iter()
            .chain(config.gaps.iter().map(|g| &g.source));
        for table in tables {
            if table_refs.contains_key(table) {
                continue;
            }
            let pattern = format!(r"\b(?:FROM|JOIN)\s+{}\b", regex::escape(table));
            table_refs.insert(table.clone(), compile(ids::SQL_NULL_GUARD, &pattern)?);
        }

        debug!(
            universal = gaps.universal.len(),
            source_only = gaps.source_only.len(),
            known_issues = known.len(),
            "engine ready"
        );
        Ok(Self {
            config,
            gaps,
            known,
            capped,
            markers,
            table_refs,
        })
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn gaps(&self) -> &GapTable {
        &self.gaps
    }

    pub fn known(&self) -> &KnownIssues {
        &self.known
    }

    /// `(column, TRY_CAST pattern)` for every capped column.
    pub fn capped_patterns(&self) -> &[(String, Regex)] {
        &self.capped
    }

    /// Reference markers with their compiled content pattern, if any.
    pub fn markers(&self) -> impl Iterator<Item = (&ReferenceMarker, Option<&Regex>)> {
        self.config
            .markers
            .iter()
            .zip(self.markers.iter().map(Option::as_ref))
    }

    /// True when `sql` reads `table` via a word-bounded `FROM`/`JOIN`.
    pub fn queries_table(&self, sql: &str, table: &str) -> bool {
        self.table_refs
            .get(table)
            .map(|re| re.is_match(sql))
            .unwrap_or(false)
    }

    pub fn queries_primary(&self, sql: &str) -> bool {
        self.config
            .primary_tables
            .iter()
            .any(|t| self.queries_table(sql, t))
    }

    /// Run every page rule over one document. CRLF input is checked as LF.
    pub fn check_page(&self, path: &str, text: &str) -> Findings {
        let text = normalize_newlines(text);
        let page = Page::new(path, &text);
        run_page_rules(&page, self)
    }

    /// Run the data checks over `dir`; paths in findings are relative to `root`.
    pub fn check_data(&self, dir: &Path, root: &Path) -> Result<DataReport> {
        data::check_data(self, dir, root)
    }
}

fn compile(rule: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| LintError::Pattern {
        rule: rule.to_string(),
        source,
    })
}

/// Path shown in findings: relative to `root` when possible, `/`-separated.
pub fn display_path(path: &Path, root: &Path) -> String {
    let rel = path
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .ok()
        .or_else(|| pathdiff::diff_paths(path, root))
        .unwrap_or_else(|| path.to_path_buf());
    rel.to_string_lossy().replace('\\', "/")
}

/// Locations the driver reads from.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub root: PathBuf,
    pub pages_dir: PathBuf,
    pub data_dir: PathBuf,
}

/// All `*.md` files under `dir`, sorted.
pub fn discover_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LintError::PagesDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    let pattern = format!("{}/**/*.md", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| LintError::Glob {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    let mut pages: Vec<PathBuf> = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect();
    pages.sort();
    Ok(pages)
}

/// Lint all pages and the data directory.
pub fn run(engine: &Engine, inputs: &Inputs) -> Result<LintResult> {
    let paths = discover_pages(&inputs.pages_dir)?;
    debug!(pages = paths.len(), dir = %inputs.pages_dir.display(), "discovered pages");

    let pages: Vec<(String, String)> = paths
        .par_iter()
        .map(|p| {
            fs::read_to_string(p)
                .map(|text| (display_path(p, &inputs.root), text))
                .map_err(|source| LintError::PageRead {
                    path: p.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let collector = Collector::new();
    let (_, data) = rayon::join(
        || {
            let _span = info_span!("scan_pages", pages = pages.len()).entered();
            pages
                .par_iter()
                .for_each(|(path, text)| collector.append(engine.check_page(path, text)));
        },
        || {
            let _span = info_span!("check_data", dir = %inputs.data_dir.display()).entered();
            engine.check_data(&inputs.data_dir, &inputs.root)
        },
    );
    let data = data?;
    debug!(data_files = data.files, findings = data.findings.len(), "data check done");
    collector.append(data.findings);

    let findings = collector.into_sorted();
    let summary = summarize(&findings, pages.len(), data.files);
    Ok(LintResult { findings, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conventions::{DataConfig, GapInterval};
    use crate::models::Severity;
    use std::fs;
    use tempfile::tempdir;

    fn gap(source: &str, start: &str, end: &str) -> GapInterval {
        GapInterval {
            source: source.into(),
            start: start.into(),
            end: end.into(),
            note: String::new(),
        }
    }

    fn bare_config() -> RuleConfig {
        RuleConfig {
            data: DataConfig {
                entity_tables: Vec::new(),
                locations: None,
                allowlisted_entities: Default::default(),
                ranges: Vec::new(),
                aggregates: Vec::new(),
                references: Vec::new(),
            },
            ..RuleConfig::default()
        }
    }

    const INTRO: &str = "Trips on the main network recovered after the pandemic and kept climbing through every quarter, although the published monthly reports leave several gaps that the charts below mark explicitly for readers.";

    #[test]
    fn test_end_to_end_second_gap_missing() {
        let mut cfg = bare_config();
        cfg.primary_tables = vec!["trips".into()];
        cfg.gaps = vec![
            gap("trips", "Jan 2024", "Mar 2024"),
            gap("buses", "Jan 2024", "Mar 2024"),
            gap("trips", "Jul 2025", "Sep 2025"),
            gap("buses", "Jul 2025", "Sep 2025"),
        ];
        cfg.markers.clear();
        let engine = Engine::new(cfg).unwrap();
        assert_eq!(engine.gaps().universal.len(), 2);

        let text = format!(
            r#"---
title: Trips
description: Monthly trips across the network since 2019
---
{INTRO}

<LineChart data={{monthly}} x=date_parsed y=trips title="Trips" yAxisTitle="Trips" connectGroup=g>
<ReferenceArea xMin='2024-01-01' xMax='2024-03-31' label="Gap"/>
</LineChart>

<LineChart data={{monthly}} x=date_parsed y=km title="Km" yAxisTitle="Km" connectGroup=g>
</LineChart>

## See Also
- [Fleet](/fleet)

*Source: monthly statistical reports*

## Data Queries
```sql monthly
SELECT date_parsed, trips, km FROM trips WHERE Date IS NOT NULL
```
"#
        );
        let found = engine.check_page("pages/trips.md", &text).into_vec();
        let gaps: Vec<_> = found.iter().filter(|f| f.rule == ids::COMPONENT_GAPS).collect();
        assert_eq!(gaps.len(), 1, "{found:?}");
        assert_eq!(gaps[0].severity, Severity::Warn);
        assert!(gaps[0].message.contains("xMin='2025-07-01' xMax='2025-09-30'"));
        assert!(!found.iter().any(|f| f.severity == Severity::Error), "{found:?}");
    }

    #[test]
    fn test_check_page_is_idempotent() {
        let engine = Engine::new(RuleConfig::default()).unwrap();
        let text = "```sql q\nSELECT * FROM extracted\n```\n<LineChart data={q} x=date_parsed/>\n<ReferenceArea xMin='2024-01-01' xMax='2024-03-31'/>\n<BarChart data={missing}/>";
        let a = engine.check_page("p.md", text).into_vec();
        let b = engine.check_page("p.md", text).into_vec();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_crlf_page_matches_lf_page() {
        let engine = Engine::new(RuleConfig::default()).unwrap();
        let lf = "---\ntitle: T\ndescription: A page checked with both line endings\n---\n<BigValue data={q} value=x/>\n\n```sql q\nSELECT 1\n```\n";
        let crlf = lf.replace('\n', "\r\n");
        let a = engine.check_page("p.md", lf).into_vec();
        let b = engine.check_page("p.md", &crlf).into_vec();
        assert_eq!(a, b);
        assert!(!b
            .iter()
            .any(|f| f.rule == ids::META_FRONTMATTER || f.rule == ids::COMPONENT_QUERY_REF));
    }

    #[test]
    fn test_run_is_idempotent() {
        let td = tempdir().unwrap();
        let root = td.path();
        fs::create_dir_all(root.join("pages/fleet")).unwrap();
        fs::create_dir_all(root.join("sources")).unwrap();
        for (i, name) in ["a.md", "b.md", "fleet/c.md", "fleet/d.md"].iter().enumerate() {
            fs::write(
                root.join("pages").join(name),
                format!("<LineChart data={{q{i}}} x=date_parsed/>\n```sql q{i}\nSELECT * FROM extracted\n```\n"),
            )
            .unwrap();
        }
        fs::write(
            root.join("sources/extracted.csv"),
            "Date,Depot\nJan 2023,Bhekrainagar\nJanuary 2023,Nigadi\n",
        )
        .unwrap();

        let mut cfg = RuleConfig::default();
        cfg.data.references.clear();
        let engine = Engine::new(cfg).unwrap();
        let inputs = Inputs {
            root: root.to_path_buf(),
            pages_dir: root.join("pages"),
            data_dir: root.join("sources"),
        };
        let first = run(&engine, &inputs).unwrap();
        let second = run(&engine, &inputs).unwrap();
        assert!(first.findings.iter().any(|f| f.file == "sources/extracted.csv"));
        assert!(first.findings.iter().any(|f| f.file == "pages/fleet/d.md"));
        assert_eq!(first.findings, second.findings);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn test_discover_pages_escapes_directory_name() {
        let td = tempdir().unwrap();
        let dir = td.path().join("pages[v2]");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.md"), "").unwrap();
        fs::write(dir.join("sub/b.md"), "").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();
        let pages = discover_pages(&dir).unwrap();
        assert_eq!(pages, vec![dir.join("a.md"), dir.join("sub/b.md")]);
    }

    #[test]
    fn test_missing_reference_reported_without_any_blocks() {
        let engine = Engine::new(bare_config()).unwrap();
        let found = engine
            .check_page("p.md", "---\ntitle: T\n---\n<LineChart data={ghost}/>")
            .into_vec();
        assert!(found
            .iter()
            .any(|f| f.rule == ids::COMPONENT_QUERY_REF && f.severity == Severity::Error));
    }

    #[test]
    fn test_invalid_marker_pattern_is_error() {
        let mut cfg = bare_config();
        cfg.markers[0].content_pattern = Some("(unclosed".into());
        let err = Engine::new(cfg).unwrap_err();
        assert!(matches!(err, LintError::Pattern { .. }));
    }

    #[test]
    fn test_run_collects_pages_and_data_in_path_order() {
        let td = tempdir().unwrap();
        let root = td.path();
        fs::create_dir_all(root.join("pages/sub")).unwrap();
        fs::create_dir_all(root.join("sources")).unwrap();
        fs::write(root.join("pages/b.md"), "no front matter").unwrap();
        fs::write(root.join("pages/sub/a.md"), "---\ntitle: A\n---\n").unwrap();
        fs::write(root.join("sources/x.csv"), "a\n1\n").unwrap();

        let engine = Engine::new(bare_config()).unwrap();
        let inputs = Inputs {
            root: root.to_path_buf(),
            pages_dir: root.join("pages"),
            data_dir: root.join("sources"),
        };
        let res = run(&engine, &inputs).unwrap();
        assert_eq!(res.summary.pages, 2);
        assert_eq!(res.summary.data_files, 1);
        let files: Vec<_> = res.findings.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files.first(), Some(&"pages/b.md"));
        assert!(files.contains(&"pages/sub/a.md"));
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_run_requires_directories() {
        let td = tempdir().unwrap();
        let engine = Engine::new(bare_config()).unwrap();
        let inputs = Inputs {
            root: td.path().to_path_buf(),
            pages_dir: td.path().join("pages"),
            data_dir: td.path().join("sources"),
        };
        assert!(matches!(
            run(&engine, &inputs),
            Err(LintError::PagesDirNotFound { .. })
        ));
        fs::create_dir_all(td.path().join("pages")).unwrap();
        assert!(matches!(
            run(&engine, &inputs),
            Err(LintError::DataDirNotFound { .. })
        ));
    }
}
