//! Data integrity checks over the CSV data directory.
//!
//! Runs once per process, independently of the page scan. Every configured
//! file is read at most once; a file that cannot be parsed is reported under
//! `DATA_READ` and then treated as absent by the remaining checks.

use crate::error::{LintError, Result};
use crate::findings::{ids, Findings};
use crate::gaps::parse_month;
use crate::lint::{display_path, Engine};
use crate::models::conventions::{
    DataConfig, EntityTable, ExpectMode, KnownIssue, ReferenceFile, TableRole,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

const WILDCARD: &str = "*";

/// Curated exceptions keyed by `(file, date, entity, column)`.
#[derive(Debug, Default)]
pub struct KnownIssues {
    by_key: HashMap<(String, String, String, String), usize>,
    items: Vec<KnownIssue>,
}

impl KnownIssues {
    pub fn new(items: &[KnownIssue]) -> Self {
        let mut by_key = HashMap::new();
        for (i, ki) in items.iter().enumerate() {
            by_key
                .entry((
                    ki.file.clone(),
                    ki.date.clone(),
                    ki.entity.clone(),
                    ki.column.clone(),
                ))
                .or_insert(i);
        }
        Self {
            by_key,
            items: items.to_vec(),
        }
    }

    /// Exact key first, then wildcard entity, then wildcard date, then both.
    pub fn lookup(&self, file: &str, date: &str, entity: &str, column: &str) -> Option<&KnownIssue> {
        [
            (date, entity),
            (date, WILDCARD),
            (WILDCARD, entity),
            (WILDCARD, WILDCARD),
        ]
        .into_iter()
        .find_map(|(d, e)| {
            let key = (file.to_string(), d.to_string(), e.to_string(), column.to_string());
            self.by_key.get(&key).map(|&i| &self.items[i])
        })
    }

    pub fn is_known(&self, file: &str, date: &str, entity: &str, column: &str) -> bool {
        self.lookup(file, date, entity, column).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Header row plus records of one CSV file.
#[derive(Debug)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> std::result::Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Value of `col` in `row`, empty when the column or cell is absent.
    pub fn cell<'r>(&self, row: &'r csv::StringRecord, col: Option<usize>) -> &'r str {
        col.and_then(|i| row.get(i)).unwrap_or_default()
    }

    pub fn distinct(&self, name: &str) -> BTreeSet<&str> {
        let col = self.column(name);
        self.rows.iter().map(|r| self.cell(r, col)).collect()
    }
}

#[derive(Debug)]
pub struct DataReport {
    pub findings: Findings,
    /// CSV files present in the data directory.
    pub files: usize,
}

struct Loaded<'a> {
    dir: &'a Path,
    root: &'a Path,
    tables: BTreeMap<&'a str, Option<Table>>,
}

impl<'a> Loaded<'a> {
    fn load(dir: &'a Path, root: &'a Path, cfg: &'a DataConfig, out: &mut Findings) -> Self {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        names.extend(cfg.entity_tables.iter().map(|t| t.file.as_str()));
        names.extend(cfg.locations.iter().map(|l| l.file.as_str()));
        names.extend(cfg.ranges.iter().map(|r| r.file.as_str()));
        names.extend(cfg.aggregates.iter().map(|a| a.file.as_str()));
        names.extend(cfg.references.iter().map(|r| r.file.as_str()));

        let mut tables = BTreeMap::new();
        for name in names {
            let path = dir.join(name);
            if !path.is_file() {
                debug!(file = name, "data file not present");
                tables.insert(name, None);
                continue;
            }
            match Table::read(&path) {
                Ok(t) => {
                    debug!(file = name, rows = t.rows.len(), "loaded data file");
                    tables.insert(name, Some(t));
                }
                Err(e) => {
                    out.error(
                        ids::DATA_READ,
                        &display_path(&path, root),
                        format!("Cannot read {name}: {e}"),
                    );
                    tables.insert(name, None);
                }
            }
        }
        Self { dir, root, tables }
    }

    fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).and_then(Option::as_ref)
    }

    fn exists(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    fn display(&self, name: &str) -> String {
        display_path(&self.dir.join(name), self.root)
    }
}

fn entities<'t>(table: &'t Table, spec: &EntityTable) -> BTreeSet<&'t str> {
    let col = table.column(&spec.entity_column);
    table
        .rows
        .iter()
        .map(|r| table.cell(r, col))
        .filter(|e| !e.trim().is_empty() && !spec.exclude.iter().any(|x| x == e))
        .collect()
}

/// Thousands-separated integer rendering (`12,345,678`).
pub(crate) fn group_thousands(v: f64) -> String {
    let s = format!("{:.0}", v.abs());
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if v < 0.0 && s != "0" {
        out.insert(0, '-');
    }
    out
}

/// Run every data check against `dir`. Paths in findings are shown relative
/// to `root`.
pub fn check_data(engine: &Engine, dir: &Path, root: &Path) -> Result<DataReport> {
    if !dir.is_dir() {
        return Err(LintError::DataDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    let cfg = &engine.config().data;
    let mut out = Findings::new();
    let loaded = Loaded::load(dir, root, cfg, &mut out);

    check_layout(cfg, &loaded, &mut out);
    check_entities(engine, &loaded, &mut out);
    check_ranges(engine, &loaded, &mut out);
    check_aggregates(engine, &loaded, &mut out);
    for reference in &cfg.references {
        check_reference(reference, &loaded, &mut out);
    }
    check_dates(cfg, &loaded, &mut out);

    let pattern = format!("{}/*.csv", glob::Pattern::escape(&dir.to_string_lossy()));
    let files = glob::glob(&pattern)
        .map(|paths| paths.filter_map(|p| p.ok()).count())
        .unwrap_or(0);
    Ok(DataReport {
        findings: out,
        files,
    })
}

/// Entity and location tables must exist when required and carry every column
/// the configuration reads from them.
fn check_layout(cfg: &DataConfig, loaded: &Loaded, out: &mut Findings) {
    let mut tables: Vec<(&str, bool, BTreeSet<&str>)> = Vec::new();
    for spec in &cfg.entity_tables {
        let mut cols = BTreeSet::from([spec.entity_column.as_str()]);
        cols.extend(spec.period_column.as_deref());
        cols.extend(
            cfg.ranges
                .iter()
                .filter(|r| r.file == spec.file)
                .map(|r| r.column.as_str()),
        );
        cols.extend(
            cfg.aggregates
                .iter()
                .filter(|a| a.file == spec.file)
                .map(|a| a.column.as_str()),
        );
        tables.push((spec.file.as_str(), spec.required, cols));
    }
    if let Some(loc) = &cfg.locations {
        let mut cols: BTreeSet<&str> = loc.coordinate_columns.iter().map(String::as_str).collect();
        cols.insert(loc.entity_column.as_str());
        tables.push((loc.file.as_str(), loc.required, cols));
    }

    for (file, required, cols) in tables {
        let Some(table) = loaded.get(file) else {
            if required && !loaded.exists(file) {
                out.error(ids::DATA_MISSING_FILE, &loaded.display(file), format!("{file} not found"));
            }
            continue;
        };
        let missing: Vec<&str> = cols
            .into_iter()
            .filter(|c| table.column(c).is_none())
            .collect();
        if !missing.is_empty() {
            out.error(
                ids::DATA_COLUMNS,
                &loaded.display(file),
                format!("{file} missing columns: {}", missing.join(", ")),
            );
        }
    }
}

fn check_entities(engine: &Engine, loaded: &Loaded, out: &mut Findings) {
    let cfg = &engine.config().data;
    let deprecated = &engine.config().deprecated_names;

    let mut by_table: Vec<(&EntityTable, BTreeSet<&str>)> = Vec::new();
    for spec in &cfg.entity_tables {
        if let Some(t) = loaded.get(&spec.file) {
            by_table.push((spec, entities(t, spec)));
        }
    }

    let location = cfg
        .locations
        .as_ref()
        .and_then(|l| loaded.get(&l.file).map(|t| (l, t)));
    let located: BTreeSet<&str> = location
        .map(|(l, t)| {
            let col = t.column(&l.entity_column);
            t.rows
                .iter()
                .map(|r| t.cell(r, col))
                .filter(|e| !e.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut named: Vec<(&str, &BTreeSet<&str>)> = by_table
        .iter()
        .map(|(spec, set)| (spec.file.as_str(), set))
        .collect();
    if let Some((l, _)) = location {
        named.push((l.file.as_str(), &located));
    }
    for (file, set) in named {
        for (bad, good) in deprecated {
            if set.contains(bad.as_str()) {
                out.error(
                    ids::DATA_DEPOT_NAME,
                    &loaded.display(file),
                    format!("Deprecated name '{}'; use '{good}'", bad.escape_debug()),
                );
            }
        }
    }

    let Some((loc, loc_table)) = location else {
        return;
    };
    let loc_file = loaded.display(&loc.file);
    let entity_col = loc_table.column(&loc.entity_column);
    let coord_cols: Vec<Option<usize>> = loc
        .coordinate_columns
        .iter()
        .map(|c| loc_table.column(c))
        .collect();
    for row in &loc_table.rows {
        let missing = coord_cols
            .iter()
            .any(|&c| loc_table.cell(row, c).trim().is_empty());
        if missing {
            out.error(
                ids::DATA_COORDS,
                &loc_file,
                format!(
                    "'{}' missing {}",
                    loc_table.cell(row, entity_col),
                    loc.coordinate_columns.join("/")
                ),
            );
        }
    }

    let primary: BTreeSet<&str> = by_table
        .iter()
        .filter(|(spec, _)| spec.role == TableRole::Primary)
        .flat_map(|(_, set)| set.iter().copied())
        .collect();
    if !primary.is_empty() && !located.is_empty() {
        for (spec, set) in by_table.iter().filter(|(s, _)| s.role == TableRole::Primary) {
            for e in set.iter().filter(|e| !located.contains(*e)) {
                out.error(
                    ids::DATA_COORDS,
                    &loc_file,
                    format!("'{e}' in {} has no entry in {}", spec.file, loc.file),
                );
            }
        }
    }

    if !primary.is_empty() {
        for (spec, set) in by_table.iter().filter(|(s, _)| s.role == TableRole::Secondary) {
            for e in set
                .iter()
                .filter(|e| !primary.contains(*e) && !cfg.allowlisted_entities.contains(**e))
            {
                out.warn(
                    ids::DATA_DEPOT_EXCLUSIVE,
                    &loaded.display(&spec.file),
                    format!(
                        "'{e}' appears only in {} and is not allow-listed; add coordinates to {} or document the exception",
                        spec.label, loc.file
                    ),
                );
            }
        }
    }

    if !located.is_empty() {
        for e in cfg
            .allowlisted_entities
            .iter()
            .filter(|e| !located.contains(e.as_str()))
        {
            out.warn(
                ids::DATA_COORDS,
                &loc_file,
                format!(
                    "Allow-listed '{e}' has no entry in {}; add coordinates even if it only appears in secondary data",
                    loc.file
                ),
            );
        }
    }
}

fn entity_spec<'c>(cfg: &'c DataConfig, file: &str) -> Option<&'c EntityTable> {
    cfg.entity_tables.iter().find(|t| t.file == file)
}

fn check_ranges(engine: &Engine, loaded: &Loaded, out: &mut Findings) {
    let cfg = &engine.config().data;
    for range in &cfg.ranges {
        let Some(table) = loaded.get(&range.file) else {
            continue;
        };
        let Some(spec) = entity_spec(cfg, &range.file) else {
            warn!(rule = %range.rule, file = %range.file, "range check on a file that is not an entity table");
            continue;
        };
        let date_col = spec.period_column.as_deref().and_then(|c| table.column(c));
        let entity_col = table.column(&spec.entity_column);
        let value_col = table.column(&range.column);
        for row in &table.rows {
            let Ok(v) = table.cell(row, value_col).trim().parse::<f64>() else {
                continue;
            };
            if v <= range.max {
                continue;
            }
            let (date, entity) = (table.cell(row, date_col), table.cell(row, entity_col));
            if engine.known().is_known(&range.file, date, entity, &range.column) {
                continue;
            }
            out.push(
                range.severity,
                &range.rule,
                &loaded.display(&range.file),
                format!(
                    "{date} / {entity}: {} = {v}{}; add it to known_issues if expected, or fix the source CSV",
                    range.label, range.unit
                ),
            );
        }
    }
}

fn check_aggregates(engine: &Engine, loaded: &Loaded, out: &mut Findings) {
    let cfg = &engine.config().data;
    for agg in &cfg.aggregates {
        let Some(table) = loaded.get(&agg.file) else {
            continue;
        };
        let Some(period_col) = entity_spec(cfg, &agg.file)
            .and_then(|s| s.period_column.as_deref())
            .and_then(|c| table.column(c))
        else {
            warn!(rule = %agg.rule, file = %agg.file, "aggregate check needs a period column");
            continue;
        };
        let value_col = table.column(&agg.column);
        let in_period: Vec<_> = table
            .rows
            .iter()
            .filter(|r| table.cell(r, Some(period_col)) == agg.period)
            .collect();
        if in_period.is_empty() {
            continue;
        }
        let total: f64 = in_period
            .iter()
            .filter_map(|r| table.cell(r, value_col).trim().parse::<f64>().ok())
            .sum();
        if total >= agg.min_total
            || engine
                .known()
                .is_known(&agg.file, &agg.period, WILDCARD, &agg.column)
        {
            continue;
        }
        out.push(
            agg.severity,
            &agg.rule,
            &loaded.display(&agg.file),
            format!(
                "{} {} total = {}; suspiciously low (expected {}). Add it to known_issues if this has been addressed.",
                agg.period,
                agg.column,
                group_thousands(total),
                agg.expected
            ),
        );
    }
}

fn check_reference(reference: &ReferenceFile, loaded: &Loaded, out: &mut Findings) {
    let file = loaded.display(&reference.file);
    let Some(table) = loaded.get(&reference.file) else {
        if reference.required && !loaded.exists(&reference.file) {
            let hint = reference
                .hint
                .as_deref()
                .map(|h| format!("; {h}"))
                .unwrap_or_default();
            out.error(&reference.rule, &file, format!("{} not found{hint}", reference.file));
        }
        return;
    };

    let mut missing_cols: Vec<&str> = reference
        .required_columns
        .iter()
        .filter(|c| table.column(c).is_none())
        .map(String::as_str)
        .collect();
    missing_cols.sort_unstable();
    if !missing_cols.is_empty() {
        out.error(
            &reference.rule,
            &file,
            format!("{} missing columns: {}", reference.file, missing_cols.join(", ")),
        );
    }

    for expect in &reference.expect {
        let present = table.distinct(&expect.column);
        let mut missing: Vec<&str> = expect
            .values
            .iter()
            .map(String::as_str)
            .filter(|v| !present.contains(v))
            .collect();
        if missing.is_empty() {
            continue;
        }
        match expect.mode {
            ExpectMode::Each => {
                for value in missing {
                    let message = expect.message.clone().unwrap_or_else(|| {
                        format!("{} missing {} '{value}' rows", reference.file, expect.column)
                    });
                    out.push(expect.severity, &reference.rule, &file, message);
                }
            }
            ExpectMode::All => {
                missing.sort_unstable();
                let message = expect.message.clone().unwrap_or_else(|| {
                    format!(
                        "{} missing {} values: {}",
                        reference.file,
                        expect.column,
                        missing.join(", ")
                    )
                });
                out.push(expect.severity, &reference.rule, &file, message);
            }
        }
    }

    if let Some(rows) = &reference.rows {
        let n = table.rows.len();
        let off = if rows.exact { n != rows.expected } else { n > rows.expected };
        if off {
            let note = rows
                .note
                .as_deref()
                .map(|s| format!(" ({s})"))
                .unwrap_or_default();
            out.warn(
                &reference.rule,
                &file,
                format!("{} has {n} rows; expected {}{note}", reference.file, rows.expected),
            );
        }
    }
}

fn check_dates(cfg: &DataConfig, loaded: &Loaded, out: &mut Findings) {
    for spec in &cfg.entity_tables {
        let (Some(table), Some(period)) = (loaded.get(&spec.file), spec.period_column.as_deref())
        else {
            continue;
        };
        let col = table.column(period);
        for row in &table.rows {
            let d = table.cell(row, col).trim();
            if !d.is_empty() && parse_month(d).is_none() {
                out.error(
                    ids::DATA_DATE_FMT,
                    &loaded.display(&spec.file),
                    format!("Non-standard date value '{d}'; expected 'Mon YYYY' format (e.g. 'Jan 2023')"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::UTILIZATION_COLUMN;
    use crate::models::conventions::{RuleConfig, ValueExpectation};
    use crate::models::Severity;
    use std::fs;
    use tempfile::tempdir;

    const LOCATIONS: &str = "depot,latitude,longitude\nPune Station,18.5,73.8\nNigadi,18.6,73.7\nHadapsar,18.5,73.9\nM.Yard,18.5,73.8\n";

    fn engine_with(f: impl FnOnce(&mut RuleConfig)) -> Engine {
        let mut cfg = RuleConfig::default();
        cfg.data.references.clear();
        f(&mut cfg);
        Engine::new(cfg).unwrap()
    }

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn util_csv(rows: &[(&str, &str, &str)]) -> String {
        let mut s = format!("Date,Depot,\"{UTILIZATION_COLUMN}\"\n");
        for (d, e, v) in rows {
            s.push_str(&format!("{d},{e},{v}\n"));
        }
        s
    }

    fn rules(report: &DataReport) -> Vec<&str> {
        report.findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[test]
    fn test_missing_data_dir_is_process_error() {
        let engine = engine_with(|_| {});
        let td = tempdir().unwrap();
        let err = check_data(&engine, &td.path().join("nope"), td.path()).unwrap_err();
        assert!(matches!(err, LintError::DataDirNotFound { .. }));
    }

    #[test]
    fn test_exact_known_issue_suppresses_range_finding() {
        let td = tempdir().unwrap();
        write(td.path(), "extracted.csv", &util_csv(&[("Dec 2023", "Pune Station", "200")]));
        write(td.path(), "depot_locations.csv", LOCATIONS);

        let with_issue = engine_with(|cfg| cfg.data.aggregates.clear());
        let report = check_data(&with_issue, td.path(), td.path()).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);

        let without = engine_with(|cfg| {
            cfg.data.aggregates.clear();
            cfg.known_issues
                .retain(|k| !(k.entity == "Pune Station" && k.date == "Dec 2023"));
        });
        let report = check_data(&without, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec!["DATA_UTIL_OUTLIER"]);
        let f = report.findings.iter().next().unwrap();
        assert_eq!(f.severity, Severity::Warn);
        assert!(f.message.starts_with("Dec 2023 / Pune Station: fleet utilization = 200%"));
        assert_eq!(f.file, "extracted.csv");
    }

    #[test]
    fn test_wildcard_entity_known_issue() {
        let known = KnownIssues::new(&[KnownIssue {
            file: "x.csv".into(),
            date: "Jan 2023".into(),
            entity: "*".into(),
            column: "c".into(),
            note: String::new(),
        }]);
        assert!(known.is_known("x.csv", "Jan 2023", "Anything", "c"));
        assert!(!known.is_known("x.csv", "Feb 2023", "Anything", "c"));
        assert!(!known.is_known("y.csv", "Jan 2023", "Anything", "c"));
    }

    #[test]
    fn test_entity_cross_checks() {
        let td = tempdir().unwrap();
        write(
            td.path(),
            "extracted.csv",
            "Date,Depot\nJan 2023,Pune Station\nJan 2023,Katraj\nJan 2023,System Total\nJan 2023,Bhekrainagar\n",
        );
        write(
            td.path(),
            "brt_extracted.csv",
            "Date,Depot\nJan 2023,Pune Station\nJan 2023,M.Yard\nJan 2023,Swargate\n",
        );
        write(
            td.path(),
            "depot_locations.csv",
            "depot,latitude,longitude\nPune Station,18.5,73.8\nBhekrainagar,18.4,\n",
        );
        let engine = engine_with(|_| {});
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        let found: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.rule.as_str(), f.severity, f.message.as_str()))
            .collect();

        assert!(found.iter().any(|(r, _, m)| *r == ids::DATA_DEPOT_NAME && m.contains("Bhekrainagar")));
        assert!(found
            .iter()
            .any(|(r, s, m)| *r == ids::DATA_COORDS && *s == Severity::Error && m.contains("'Bhekrainagar' missing latitude/longitude")));
        assert!(found
            .iter()
            .any(|(r, _, m)| *r == ids::DATA_COORDS && m.contains("'Katraj' in extracted.csv")));
        // System Total is excluded; M.Yard is allow-listed
        assert!(!found.iter().any(|(_, _, m)| m.contains("System Total")));
        let exclusive: Vec<_> = found
            .iter()
            .filter(|(r, _, _)| *r == ids::DATA_DEPOT_EXCLUSIVE)
            .collect();
        assert_eq!(exclusive.len(), 1);
        assert!(exclusive[0].2.contains("'Swargate'"));
        assert!(found
            .iter()
            .any(|(r, s, m)| *r == ids::DATA_COORDS && *s == Severity::Warn && m.contains("'M.Yard'")));
    }

    #[test]
    fn test_aggregate_below_minimum() {
        let td = tempdir().unwrap();
        write(
            td.path(),
            "extracted.csv",
            "Date,Depot,All Traffic Earning (₹)\nFeb 2023,A,1200000\nFeb 2023,B,345678\nMar 2023,A,900000000\n",
        );
        let engine = engine_with(|cfg| {
            cfg.known_issues.retain(|k| k.date != "Feb 2023");
            cfg.data.locations = None;
            cfg.data.ranges.clear();
        });
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec!["DATA_EARNINGS"]);
        let f = report.findings.iter().next().unwrap();
        assert_eq!(f.severity, Severity::Error);
        assert!(f.message.contains("total = 1,545,678"));

        // the built-in table documents the Feb 2023 shift
        let known = engine_with(|cfg| {
            cfg.data.locations = None;
            cfg.data.ranges.clear();
        });
        assert!(check_data(&known, td.path(), td.path()).unwrap().findings.is_empty());
    }

    #[test]
    fn test_bad_period_values_reported_per_row() {
        let td = tempdir().unwrap();
        write(
            td.path(),
            "ebus_extracted.csv",
            "Date,Depot\nJan 2023,A\nJanuary 2023,A\n2023-02,A\n,A\n",
        );
        let engine = engine_with(|cfg| cfg.data.locations = None);
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec![ids::DATA_DATE_FMT, ids::DATA_DATE_FMT]);
    }

    #[test]
    fn test_reference_file_checks() {
        let td = tempdir().unwrap();
        let engine = engine_with(|cfg| {
            cfg.data.locations = None;
            cfg.data.references = RuleConfig::default().data.references;
        });
        write(
            td.path(),
            "pune_vehicle_registrations.csv",
            "year,city,cars\n2000-2001,Pune,10\n2017-2018,Pune,20\n",
        );
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        let msgs: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.rule.as_str(), f.message.as_str()))
            .collect();
        // absent required files carry their hint
        assert!(msgs
            .iter()
            .any(|(r, m)| *r == "DATA_PNL" && m.contains("not found; run /tmp/build_pnl_csv.py")));
        assert!(msgs.iter().any(|(r, m)| *r == "DATA_BS" && m.ends_with("not found")));
        assert!(msgs
            .iter()
            .any(|(r, m)| *r == "DATA_PVR" && m.contains("missing columns: auto_rickshaws, motor_cycles")));
        assert!(msgs
            .iter()
            .any(|(r, m)| *r == "DATA_PVR" && m.contains("city 'Pimpri-Chinchwad'")));
        assert!(!msgs.iter().any(|(_, m)| m.contains("2000-2001 to 2017-2018")));
    }

    #[test]
    fn test_row_count_exact_and_maximum() {
        let td = tempdir().unwrap();
        write(td.path(), "r.csv", "k\na\nb\nc\n");
        let engine = engine_with(|cfg| {
            cfg.data.locations = None;
            cfg.data.references = vec![ReferenceFile {
                rule: "DATA_R".into(),
                file: "r.csv".into(),
                required: true,
                hint: None,
                required_columns: vec!["k".into()],
                expect: vec![ValueExpectation {
                    column: "k".into(),
                    values: vec!["z".into(), "a".into(), "y".into()],
                    mode: ExpectMode::All,
                    severity: Severity::Error,
                    message: None,
                }],
                rows: Some(crate::models::conventions::RowCount {
                    expected: 2,
                    exact: false,
                    note: None,
                }),
            }];
        });
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        let msgs: Vec<_> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            msgs,
            vec!["r.csv missing k values: y, z", "r.csv has 3 rows; expected 2"]
        );
        assert_eq!(report.files, 1);
    }

    #[test]
    fn test_unreadable_file_is_data_read() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("extracted.csv"), b"Date,Depot\n\xff\xfe,A\n").unwrap();
        let engine = engine_with(|cfg| cfg.data.locations = None);
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec![ids::DATA_READ]);
    }

    #[test]
    fn test_missing_configured_columns_reported() {
        let td = tempdir().unwrap();
        write(td.path(), "extracted.csv", "Date,Depot,Util\nJan 2023,Pune Station,900\n");
        let engine = engine_with(|cfg| cfg.data.locations = None);
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec![ids::DATA_COLUMNS]);
        let f = report.findings.iter().next().unwrap();
        assert_eq!(f.severity, Severity::Error);
        assert_eq!(
            f.message,
            format!("extracted.csv missing columns: {UTILIZATION_COLUMN}, All Traffic Earning (₹)")
        );
    }

    #[test]
    fn test_location_table_columns_checked() {
        let td = tempdir().unwrap();
        write(td.path(), "depot_locations.csv", "depot,latitude\nNigadi,18.6\n");
        let engine = engine_with(|cfg| cfg.data.entity_tables.clear());
        let report = check_data(&engine, td.path(), td.path()).unwrap();
        let f = report.findings.iter().next().unwrap();
        assert_eq!(f.rule, ids::DATA_COLUMNS);
        assert_eq!(f.message, "depot_locations.csv missing columns: longitude");
    }

    #[test]
    fn test_required_entity_table_must_exist() {
        let td = tempdir().unwrap();
        let optional = engine_with(|cfg| cfg.data.locations = None);
        assert!(check_data(&optional, td.path(), td.path()).unwrap().findings.is_empty());

        let required = engine_with(|cfg| {
            cfg.data.locations = None;
            cfg.data.entity_tables[0].required = true;
        });
        let report = check_data(&required, td.path(), td.path()).unwrap();
        assert_eq!(rules(&report), vec![ids::DATA_MISSING_FILE]);
        let f = report.findings.iter().next().unwrap();
        assert_eq!(f.file, "extracted.csv");
        assert_eq!(f.message, "extracted.csv not found");
    }

    #[test]
    fn test_data_dir_with_glob_metacharacters() {
        let td = tempdir().unwrap();
        let dir = td.path().join("sources[2024]");
        fs::create_dir_all(&dir).unwrap();
        write(&dir, "a.csv", "k\n1\n");
        write(&dir, "b.csv", "k\n2\n");
        let engine = engine_with(|cfg| {
            cfg.data.entity_tables.clear();
            cfg.data.locations = None;
        });
        let report = check_data(&engine, &dir, td.path()).unwrap();
        assert_eq!(report.files, 2);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1_545_678.0), "1,545,678");
        assert_eq!(group_thousands(-12_345.0), "-12,345");
    }
}
