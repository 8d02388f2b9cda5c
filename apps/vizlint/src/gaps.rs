//! Gap-range derivation.
//!
//! Declared gaps are per source. A range declared identically by two or more
//! sources is *universal*: pages charting any primary table must annotate it.
//! The rest are *source-only* and matter only to pages that query that source.

use crate::models::conventions::GapInterval;
use chrono::{Months, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Merged gap over one calendar range.
pub struct GapRange {
    /// First day of the start month.
    pub start: NaiveDate,
    /// Last day of the end month.
    pub end: NaiveDate,
    pub label: String,
    pub sources: BTreeSet<String>,
}

impl GapRange {
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    pub fn is_universal(&self) -> bool {
        self.sources.len() >= 2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapTable {
    pub universal: Vec<GapRange>,
    pub source_only: Vec<GapRange>,
}

/// Parse a strict `Mon YYYY` month into its first day.
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split_whitespace();
    let (mon, year) = (parts.next()?, parts.next()?);
    if parts.next().is_some()
        || mon.len() != 3
        || !mon.chars().all(|c| c.is_ascii_alphabetic())
        || year.len() != 4
        || !year.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(&format!("01 {mon} {year}"), "%d %b %Y").ok()
}

fn month_end(first: NaiveDate) -> Option<NaiveDate> {
    first.checked_add_months(Months::new(1))?.pred_opt()
}

/// Merge declared intervals into universal and source-only ranges.
///
/// Intervals are grouped by identical `(start, end)`; the first declaration
/// of a range supplies its label. Both lists come out sorted by
/// `(start, end)`, so the result does not depend on declaration order.
pub fn derive_gaps(intervals: &[GapInterval]) -> GapTable {
    let mut groups: BTreeMap<(NaiveDate, NaiveDate), GapRange> = BTreeMap::new();
    for gi in intervals {
        let parsed = parse_month(&gi.start)
            .zip(parse_month(&gi.end))
            .and_then(|(s, e)| Some((s, month_end(e)?)));
        let Some((start, end)) = parsed else {
            warn!(source = %gi.source, start = %gi.start, end = %gi.end, "skipping unparseable gap");
            continue;
        };
        if end < start {
            warn!(source = %gi.source, start = %gi.start, end = %gi.end, "skipping inverted gap");
            continue;
        }
        groups
            .entry((start, end))
            .or_insert_with(|| {
                let first = start.format("%b %Y").to_string();
                let last = end.format("%b %Y").to_string();
                let label = if first == last {
                    first
                } else {
                    format!("{first}–{last}")
                };
                GapRange {
                    start,
                    end,
                    label,
                    sources: BTreeSet::new(),
                }
            })
            .sources
            .insert(gi.source.clone());
    }

    let mut table = GapTable::default();
    for range in groups.into_values() {
        if range.is_universal() {
            table.universal.push(range);
        } else {
            table.source_only.push(range);
        }
    }
    table
}
