//! Rule configuration schema.
//!
//! `RuleConfig` is the single explicit configuration object handed to
//! [`crate::lint::Engine::new`]. Every table is optional when loaded from a
//! `[rules]` section; tables left out keep the built-in deployment values from
//! [`crate::defaults`].
//!
//! Key components:
//! - page tables: primary sources, deprecated names, column lists consulted by
//!   the query-safety and chart rules;
//! - `gaps`: declared data gaps, merged by [`crate::gaps::derive_gaps`];
//! - `known_issues`: curated suppressions for data findings;
//! - `data`: the CSV file layout checked by [`crate::data`].

use crate::models::Severity;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Root rule configuration.
pub struct RuleConfig {
    /// Tables whose use on a page triggers null-guard and gap annotation rules.
    pub primary_tables: Vec<String>,
    /// Phrase that must appear in SQL querying a primary table.
    pub null_guard: String,
    /// Column used as the date axis of time-series charts.
    pub date_axis: String,
    /// Retired entity label -> canonical label. Exact match only.
    pub deprecated_names: BTreeMap<String, String>,
    pub known_issues: Vec<KnownIssue>,
    pub gaps: Vec<GapInterval>,
    /// Columns that must be wrapped in `LEAST(..., 100.0)` after `TRY_CAST`.
    pub capped_columns: Vec<String>,
    /// Columns whose values are swapped in some periods; need `GREATEST/LEAST`.
    pub swapped_columns: Vec<String>,
    pub unreliable_columns: Vec<UnreliableColumn>,
    /// Columns inferred as integers that render with thousands separators.
    pub integer_year_columns: Vec<String>,
    /// BigValue column substrings that imply numeric formatting.
    pub format_keywords: Vec<String>,
    /// Column substrings whose values can cross zero (profit vs. loss).
    pub zero_cross_keywords: Vec<String>,
    pub markers: Vec<ReferenceMarker>,
    pub citations: Vec<Citation>,
    pub series_orders: Vec<SeriesOrder>,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
/// Curated exception for a data finding. `date`/`entity` may be `*`.
pub struct KnownIssue {
    pub file: String,
    pub date: String,
    pub entity: String,
    pub column: String,
    pub note: String,
}

#[derive(Debug, Clone, Deserialize)]
/// A period during which one source has no records. Months use `Mon YYYY`.
pub struct GapInterval {
    pub source: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Deserialize)]
/// A column that must never be queried, with the one to use instead.
pub struct UnreliableColumn {
    pub column: String,
    pub replacement: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Requires a `<ReferenceLine x='..'>` marker on pages matching a trigger.
///
/// The trigger is the conjunction of the configured conditions; a marker
/// with no condition never fires.
pub struct ReferenceMarker {
    pub rule: String,
    pub x: String,
    #[serde(default)]
    pub page_name_contains: Option<String>,
    #[serde(default)]
    pub chart_columns: Vec<String>,
    #[serde(default)]
    pub content_pattern: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Pages mentioning `trigger` must also cite `url`.
pub struct Citation {
    pub trigger: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Category family rendered both as `series=<column>` (sorted alphabetically)
/// and as explicit `y={[..]}` lists.
pub struct SeriesOrder {
    pub series_column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// CSV layout of the data directory.
pub struct DataConfig {
    pub entity_tables: Vec<EntityTable>,
    pub locations: Option<LocationTable>,
    /// Entities allowed to exist only in a secondary table.
    pub allowlisted_entities: BTreeSet<String>,
    pub ranges: Vec<RangeCheck>,
    pub aggregates: Vec<AggregateCheck>,
    pub references: Vec<ReferenceFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableRole {
    /// Every entity must have a location row.
    Primary,
    /// Entities missing from primary tables must be allow-listed.
    Secondary,
    Other,
}

#[derive(Debug, Clone, Deserialize)]
/// Monthly table keyed by entity and period.
pub struct EntityTable {
    pub file: String,
    pub label: String,
    pub entity_column: String,
    #[serde(default)]
    pub period_column: Option<String>,
    /// Pseudo-entities such as totals rows.
    #[serde(default)]
    pub exclude: Vec<String>,
    pub role: TableRole,
    /// Report the file when it is absent from the data directory.
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
/// Companion table that gives every entity its coordinates.
pub struct LocationTable {
    pub file: String,
    pub entity_column: String,
    pub coordinate_columns: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
/// Per-row upper bound on a numeric column of an entity table.
pub struct RangeCheck {
    pub rule: String,
    pub file: String,
    pub column: String,
    pub label: String,
    #[serde(default)]
    pub unit: String,
    pub max: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
/// Lower bound on the sum of a column over one period.
pub struct AggregateCheck {
    pub rule: String,
    pub file: String,
    pub period: String,
    pub column: String,
    pub min_total: f64,
    /// Human description of the expected magnitude, used in the message.
    pub expected: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
/// Standalone reference table (annual financials, registrations, ...).
pub struct ReferenceFile {
    pub rule: String,
    pub file: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub expect: Vec<ValueExpectation>,
    #[serde(default)]
    pub rows: Option<RowCount>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectMode {
    /// One finding per missing value.
    Each,
    /// One finding listing every missing value.
    All,
}

#[derive(Debug, Clone, Deserialize)]
/// Values that must occur in a column of a reference file.
pub struct ValueExpectation {
    pub column: String,
    pub values: Vec<String>,
    pub mode: ExpectMode,
    pub severity: Severity,
    /// Replaces the generated message when set.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Expected row count; `exact = false` makes `expected` a maximum.
pub struct RowCount {
    pub expected: usize,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub note: Option<String>,
}
