//! Component rules: format strings, chart linking, gap annotations,
//! self-closing tags and series colour order.

use crate::extract::{ComponentKind, Page};
use crate::findings::{ids, Findings};
use crate::lint::Engine;
use regex::Regex;
use std::sync::LazyLock;

static BAD_FMT_RES: LazyLock<[(Regex, &'static str); 2]> = LazyLock::new(|| {
    [
        (Regex::new(r"fmt='[^']*#,##0\.1[^']*'").unwrap(), "#,##0.0"),
        (Regex::new(r"fmt='[^']*#0\.1[^']*'").unwrap(), "#0.0"),
    ]
});

static BLANK_LINE_AHEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*\n[ \t]*\n").unwrap());

static Y_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)y=\{(\[[^\]]+\])\}").unwrap());

const PARENT_KINDS: [ComponentKind; 4] = [
    ComponentKind::LineChart,
    ComponentKind::BarChart,
    ComponentKind::AreaChart,
    ComponentKind::PointMap,
];

pub fn check_components(page: &Page, engine: &Engine, out: &mut Findings) {
    for (re, fix) in BAD_FMT_RES.iter() {
        if re.is_match(page.text) {
            out.error(
                ids::COMPONENT_FMT,
                page.path,
                format!(
                    "Invalid format string; the decimal digit count uses '0' not '1' (#,##0.0 for one decimal, not #,##0.1). Fix: use {fix}"
                ),
            );
        }
    }

    if page.text.contains("scaleColor=") {
        out.warn(
            ids::COMPONENT_DEPRECATED,
            page.path,
            "scaleColor= is deprecated; use colorScale=",
        );
    }

    let date_axis = engine.config().date_axis.as_str();
    let series: Vec<_> = page.time_series(date_axis).collect();
    let connected = series.iter().filter(|t| t.attrs.has("connectGroup")).count();
    if series.len() >= 2 && connected < series.len() {
        out.warn(
            ids::COMPONENT_CONNECT,
            page.path,
            format!(
                "{} time-series charts but only {connected} use connectGroup=; add connectGroup to synchronize tooltip hover across charts",
                series.len()
            ),
        );
    }

    if !series.is_empty() && engine.queries_primary(&page.sql) {
        check_gap_annotations(page, engine, out);
    }
}

fn check_gap_annotations(page: &Page, engine: &Engine, out: &mut Findings) {
    let gaps = engine.gaps();
    let areas: Vec<(&str, &str)> = page
        .tags_of(ComponentKind::ReferenceArea)
        .map(|t| {
            (
                t.attrs.bare("xMin").unwrap_or_default(),
                t.attrs.bare("xMax").unwrap_or_default(),
            )
        })
        .collect();

    if areas.is_empty() {
        if !gaps.universal.is_empty() {
            let labels: Vec<&str> = gaps.universal.iter().map(|g| g.label.as_str()).collect();
            out.warn(
                ids::COMPONENT_GAPS,
                page.path,
                format!(
                    "Time-series page over primary data has no ReferenceArea gap annotations; add annotations for: {}",
                    labels.join(", ")
                ),
            );
        }
    } else {
        let annotated = |start: &str, end: &str| areas.iter().any(|&(a, b)| a == start && b == end);
        for gap in &gaps.universal {
            let (start, end) = (gap.start_iso(), gap.end_iso());
            if !annotated(&start, &end) {
                out.warn(
                    ids::COMPONENT_GAPS,
                    page.path,
                    format!("Missing {} gap annotation (xMin='{start}' xMax='{end}')", gap.label),
                );
            }
        }
        for gap in &gaps.source_only {
            let queried: Vec<&str> = gap
                .sources
                .iter()
                .filter(|s| engine.queries_table(&page.sql, s))
                .map(String::as_str)
                .collect();
            if queried.is_empty() {
                continue;
            }
            let (start, end) = (gap.start_iso(), gap.end_iso());
            if !annotated(&start, &end) {
                out.warn(
                    ids::COMPONENT_GAPS,
                    page.path,
                    format!(
                        "Missing {} gap annotation for {} (xMin='{start}' xMax='{end}')",
                        gap.label,
                        queried.join(", ")
                    ),
                );
            }
        }
    }

    let date_axis = engine.config().date_axis.as_str();
    for tag in page.time_series(date_axis) {
        if tag.kind == ComponentKind::LineChart && tag.self_closing {
            out.warn(
                ids::COMPONENT_GAPS,
                page.path,
                format!(
                    "Self-closing LineChart '{}' uses {date_axis} but cannot contain <ReferenceArea> children; convert it to an open/close tag and add gap annotations",
                    tag.title()
                ),
            );
        }
    }
}

/// A self-closing parent directly followed by a child-only tag drops the child.
pub fn check_self_close(page: &Page, _engine: &Engine, out: &mut Findings) {
    for tag in page.tags.iter().filter(|t| t.self_closing && PARENT_KINDS.contains(&t.kind)) {
        let rest = &page.text[tag.end..];
        if BLANK_LINE_AHEAD_RE.is_match(rest) {
            continue;
        }
        let Some(lt) = rest.find('<') else {
            continue;
        };
        let next = &rest[lt + 1..];
        let child = [ComponentKind::ReferenceArea, ComponentKind::Column]
            .into_iter()
            .find(|k| {
                next.strip_prefix(k.name())
                    .map(|tail| !tail.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
                    .unwrap_or(false)
            });
        if let Some(child) = child {
            out.error(
                ids::COMPONENT_SELF_CLOSE,
                page.path,
                format!(
                    "Self-closing chart tag followed by <{}> child; children are silently ignored. Change '/>' to '>' and add a closing tag.",
                    child.name()
                ),
            );
        }
    }
}

fn normalize_series_item(item: &str) -> String {
    item.chars()
        .filter(|c| !matches!(c, '-' | '_' | '\'' | '"' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Explicit series lists must follow the alphabetical order that `series=`
/// charts of the same family get, or colours swap between charts.
pub fn check_color_order(page: &Page, engine: &Engine, out: &mut Findings) {
    let lower = page.text.to_lowercase();
    for family in &engine.config().series_orders {
        let marker = format!("series={}", family.series_column.to_lowercase());
        if !lower.contains(&marker) {
            continue;
        }
        let categories: Vec<String> = family
            .categories
            .iter()
            .map(|c| normalize_series_item(c))
            .collect();
        for c in Y_LIST_RE.captures_iter(page.text) {
            let list = c[1].trim_matches(|ch| ch == '[' || ch == ']');
            let seen: Vec<&str> = list
                .split(',')
                .map(normalize_series_item)
                .filter_map(|item| {
                    categories
                        .iter()
                        .find(|cat| item.contains(cat.as_str()))
                        .map(String::as_str)
                })
                .collect();
            if seen.len() < 2 {
                continue;
            }
            let mut sorted = seen.clone();
            sorted.sort_unstable();
            if seen != sorted {
                out.warn(
                    ids::COMPONENT_COLOR_ORDER,
                    page.path,
                    format!(
                        "Wide-format chart lists {} but the series={} chart sorts alphabetically ({}); colours will be swapped between charts. Reorder y=[...] to match.",
                        seen.join(", "),
                        family.series_column,
                        sorted.join(", ")
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::rules::testing::{rules_of, run};

    #[test]
    fn test_bad_format_and_deprecated_prop() {
        let found = run(
            check_components,
            "p.md",
            "<BarChart data={q} fmt='#,##0.1' scaleColor=red/>",
        );
        // '#,##0.1' also contains '#0.1'
        assert_eq!(
            rules_of(&found),
            vec![ids::COMPONENT_FMT, ids::COMPONENT_FMT, ids::COMPONENT_DEPRECATED]
        );
    }

    #[test]
    fn test_connect_group_counts_time_series_only() {
        let text = "<LineChart data={a} x=date_parsed connectGroup=g/>\n<LineChart data={b} x=date_parsed/>\n<BarChart data={c} x=Year/>";
        let found = run(check_components, "p.md", text);
        assert_eq!(rules_of(&found), vec![ids::COMPONENT_CONNECT]);
        assert!(found[0].message.starts_with("2 time-series charts but only 1"));
    }

    #[test]
    fn test_gaps_without_any_reference_area_lists_all_labels() {
        let text = "```sql q\nSELECT * FROM extracted WHERE Date IS NOT NULL\n```\n<LineChart data={q} x=date_parsed>\n</LineChart>";
        let found = run(check_components, "p.md", text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, ids::COMPONENT_GAPS);
        assert!(found[0].message.contains("Jan 2024–Mar 2024"));
        assert!(found[0].message.contains("Jul 2025–Sep 2025"));
    }

    #[test]
    fn test_gaps_only_apply_to_primary_time_series() {
        let text = "```sql q\nSELECT * FROM registrations\n```\n<LineChart data={q} x=date_parsed/>";
        assert!(run(check_components, "p.md", text).is_empty());
        let bars = "```sql q\nSELECT * FROM extracted\n```\n<BarChart data={q} x=Year/>";
        assert!(run(check_components, "p.md", bars).is_empty());
    }

    #[test]
    fn test_source_only_gap_applies_to_its_source() {
        let areas = "<ReferenceArea xMin='2024-01-01' xMax='2024-03-31'/>\n<ReferenceArea xMin='2024-11-01' xMax='2025-03-31'/>\n<ReferenceArea xMin='2025-07-01' xMax='2025-09-30'/>";
        let brt = format!(
            "```sql q\nSELECT * FROM brt_extracted\n```\n<LineChart data={{q}} x=date_parsed>\n{areas}\n</LineChart>"
        );
        let found = run(check_components, "p.md", &brt);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("Jan 2023 gap annotation for brt_extracted"));
        assert!(found[0].message.contains("xMin='2023-01-01' xMax='2023-01-31'"));

        let main = brt.replace("brt_extracted", "extracted");
        assert!(run(check_components, "p.md", &main).is_empty());
    }

    #[test]
    fn test_self_closing_time_series_line_chart_warns() {
        let text = "```sql q\nSELECT * FROM extracted\n```\n<LineChart data={q} x=date_parsed title=\"Trips\"/>\n<ReferenceArea xMin='2024-01-01' xMax='2024-03-31'/>";
        let found = run(check_components, "p.md", text);
        let last = found.last().unwrap();
        assert_eq!(last.rule, ids::COMPONENT_GAPS);
        assert!(last.message.contains("'Trips'"));
    }

    #[test]
    fn test_self_close_followed_by_child_is_error() {
        let text = "<LineChart data={q} x=date_parsed/>\n<ReferenceArea xMin='2024-01-01' xMax='2024-03-31'/>";
        let found = run(check_self_close, "p.md", text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Error);
        assert!(found[0].message.contains("<ReferenceArea>"));
    }

    #[test]
    fn test_self_close_with_blank_line_is_sibling() {
        let text = "<LineChart data={q} x=date_parsed/>\n\n<ReferenceArea xMin='2024-01-01' xMax='2024-03-31'/>";
        assert!(run(check_self_close, "p.md", text).is_empty());
        let other = "<BarChart data={q}/>\n<DataTable data={q}>\n<Column id=a/>\n</DataTable>";
        assert!(run(check_self_close, "p.md", other).is_empty());
    }

    #[test]
    fn test_color_order_requires_series_chart() {
        let wide = "<BarChart data={a} y={['diesel_km', 'cng_km', 'ebus_km']}/>";
        assert!(run(check_color_order, "p.md", wide).is_empty());
        let both = format!("{wide}\n<BarChart data={{b}} series=fuel_type/>");
        let found = run(check_color_order, "p.md", &both);
        assert_eq!(rules_of(&found), vec![ids::COMPONENT_COLOR_ORDER]);
        let sorted = "<BarChart data={a} y={['cng_km', 'diesel_km', 'e_bus_km']}/>\n<BarChart data={b} series=fuel_type/>";
        assert!(run(check_color_order, "p.md", sorted).is_empty());
    }
}
