//! Per-chart affordances, map props and chart presentation rules.

use crate::extract::{ComponentKind, ComponentTag, Page};
use crate::findings::{ids, Findings};
use crate::lint::Engine;

/// Attribute value when it is a plain identifier (`x=Year`).
fn word_value<'a>(tag: &ComponentTag<'a>, key: &str) -> Option<&'a str> {
    tag.attrs
        .get(key)
        .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

fn quoted_title(tag: &ComponentTag) -> String {
    match tag.attrs.bare("title") {
        Some(t) if !t.is_empty() => format!("\"{t}\""),
        _ => "(no title)".to_string(),
    }
}

fn is_multi_series(tag: &ComponentTag) -> bool {
    tag.attrs.has("series")
}

pub fn check_affordances(page: &Page, engine: &Engine, out: &mut Findings) {
    let cfg = engine.config();

    for tag in page.charts() {
        if let Some(x) = word_value(tag, "x") {
            if cfg.integer_year_columns.iter().any(|c| c == x) && !tag.attrs.has("xFmt") {
                out.warn(
                    ids::CHART_XFMT_YEAR,
                    page.path,
                    format!(
                        "<{} x={x}> missing xFmt='####'; the integer year column renders with a thousands separator ('2,021'). Add xFmt='####'.",
                        tag.kind.name()
                    ),
                );
            }
        }
    }

    for tag in page.tags_of(ComponentKind::BarChart) {
        if !tag.attrs.has("type") && (tag.has_y_list() || is_multi_series(tag)) {
            out.warn(
                ids::BARCHART_MULTITYPE,
                page.path,
                format!(
                    "<BarChart {}> has multiple series but no type=; add type=grouped (side-by-side comparison) or type=stacked (additive parts of a whole)",
                    quoted_title(tag)
                ),
            );
        }
    }

    for tag in page.tags_of(ComponentKind::AreaChart) {
        let on_date_axis = word_value(tag, "x") == Some(cfg.date_axis.as_str());
        if on_date_axis
            && (tag.has_multi_y() || is_multi_series(tag))
            && !tag.attrs.has("handleMissing")
        {
            out.error(
                ids::AREACHART_MISSING,
                page.path,
                format!(
                    "<AreaChart {}> is multi-series on {} but missing handleMissing=gap; the default fills data gaps with false zeroes. Add handleMissing=gap so gaps render as breaks.",
                    quoted_title(tag),
                    cfg.date_axis
                ),
            );
        }
    }

    let has_zero_line = page
        .tags_of(ComponentKind::ReferenceLine)
        .any(|t| t.attrs.bare("y") == Some("0"));
    if !has_zero_line {
        let crossing = page.charts().find_map(|tag| {
            let y = word_value(tag, "y")?;
            let lower = y.to_lowercase();
            cfg.zero_cross_keywords
                .iter()
                .any(|kw| lower.contains(kw.as_str()))
                .then_some((tag, y))
        });
        if let Some((tag, y)) = crossing {
            out.warn(
                ids::REFERENCELINE_ZERO,
                page.path,
                format!(
                    "<{} {}> shows profit/loss values (y={y}) but has no <ReferenceLine y=0>; add a zero baseline: <ReferenceLine y=0 label=\"Breakeven\" color=base-content-muted hideValue=true/>",
                    tag.kind.name(),
                    quoted_title(tag)
                ),
            );
        }
    }

    let file_name = page.file_name().to_lowercase();
    for (marker, pattern) in engine.markers() {
        let mut conditions = 0;
        let mut triggered = true;
        if let Some(fragment) = &marker.page_name_contains {
            conditions += 1;
            triggered &= file_name.contains(&fragment.to_lowercase());
        }
        if !marker.chart_columns.is_empty() {
            conditions += 1;
            triggered &= page
                .charts()
                .any(|t| marker.chart_columns.iter().any(|c| t.raw.contains(c.as_str())));
        }
        if let Some(re) = pattern {
            conditions += 1;
            triggered &= re.is_match(page.text);
        }
        if conditions == 0 || !triggered {
            continue;
        }
        let present = page
            .tags_of(ComponentKind::ReferenceLine)
            .any(|t| t.attrs.bare("x") == Some(marker.x.as_str()));
        if !present {
            out.warn(&marker.rule, page.path, marker.message.as_str());
        }
    }
}

pub fn check_maps(page: &Page, _engine: &Engine, out: &mut Findings) {
    for tag in page.tags_of(ComponentKind::PointMap) {
        if tag.attrs.has("lon") {
            out.error(
                ids::MAP_LON_PROP,
                page.path,
                "<PointMap> uses lon= but the prop is long=; lon= is silently ignored and the map fails with 'long is required'. Rename to long=.",
            );
        }
        if tag.attrs.has("value") && !tag.attrs.has("valueFmt") {
            let col = word_value(tag, "value").unwrap_or("?");
            out.warn(
                ids::MAP_VALUE_FMT,
                page.path,
                format!(
                    "<PointMap value={col}> missing valueFmt=; the bubble tooltip shows a raw integer. Add valueFmt='#,##0' or a currency/pct format."
                ),
            );
        }
    }
}

pub fn check_chart_ux(page: &Page, engine: &Engine, out: &mut Findings) {
    for tag in page.charts() {
        if !tag.attrs.has("title") {
            out.warn(
                ids::CHART_TITLE,
                page.path,
                format!(
                    "<{}> missing title=; every chart needs a title for reader orientation",
                    tag.kind.name()
                ),
            );
        }
    }
    for tag in page.charts() {
        if !tag.attrs.has("yAxisTitle") {
            out.warn(
                ids::CHART_YAXIS,
                page.path,
                format!(
                    "<{}> missing yAxisTitle=; the axis label tells readers what units they are reading",
                    tag.kind.name()
                ),
            );
        }
    }
    for tag in page.tags_of(ComponentKind::AreaChart) {
        if tag.has_multi_y() && !tag.attrs.has("type") {
            out.warn(
                ids::CHART_AREA_TYPE,
                page.path,
                "<AreaChart> has multiple y-series but no type=; without type=stacked or type=stacked100 the series overlap",
            );
        }
    }
    if page.text.contains("seriesLabels=") {
        out.warn(
            ids::COMPONENT_INVALID_PROP,
            page.path,
            "seriesLabels= is not a valid prop and is silently ignored; rename series by aliasing columns in SQL (revenue AS \"Bus Revenue\")",
        );
    }
    for tag in page.tags_of(ComponentKind::DataTable) {
        if !tag.attrs.has("rows") {
            out.warn(
                ids::CHART_DATATABLE_ROWS,
                page.path,
                "<DataTable> missing rows=; set rows=all to show all records, or rows=N for an explicit page size",
            );
        }
    }
    let keywords = &engine.config().format_keywords;
    for tag in page.tags_of(ComponentKind::BigValue) {
        if tag.attrs.has("fmt") {
            continue;
        }
        let Some(value) = word_value(tag, "value") else {
            continue;
        };
        let lower = value.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
            out.warn(
                ids::BIGVALUE_FMT,
                page.path,
                format!(
                    "<BigValue value={value}> missing fmt=; add a format string such as '#,##0' or '\"₹\"#,##0\" Cr\"'"
                ),
            );
        }
    }
}
