//! Query-safety rules over the joined SQL of a page, and query placement.

use super::preceding;
use crate::extract::Page;
use crate::findings::{ids, Findings};
use crate::lint::Engine;
use regex::Regex;
use std::sync::LazyLock;

static QUOTED_CAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"CAST\s*\("[^"]+\s[^"]*"\s+AS"#).unwrap());
static LONG_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"STRPTIME\(Date,\s*'%B %Y'\)").unwrap());
static AGGREGATE_DIVISOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\s*(?:SUM|AVG|COUNT)\s*\(").unwrap());

pub fn check_sql(page: &Page, engine: &Engine, out: &mut Findings) {
    if page.queries.is_empty() {
        return;
    }
    let sql = page.sql.as_str();
    let cfg = engine.config();

    let bare_cast = QUOTED_CAST_RE
        .find_iter(sql)
        .any(|m| preceding(sql, m.start(), 4) != "TRY_");
    if bare_cast {
        out.warn(
            ids::SQL_TRY_CAST,
            page.path,
            "Bare CAST(\"...\") on a quoted column; use TRY_CAST to handle null or unparseable cells in extracted CSVs",
        );
    }

    for (column, pattern) in engine.capped_patterns() {
        for m in pattern.find_iter(sql) {
            if !preceding(sql, m.start(), 7).contains("LEAST(") {
                out.error(
                    ids::SQL_VALUE_CAP,
                    page.path,
                    format!(
                        "\"{column}\" not wrapped in LEAST(..., 100.0); the source reports values above 100% in some months"
                    ),
                );
            }
        }
    }

    if LONG_MONTH_RE.is_match(sql) {
        out.error(
            ids::SQL_DATE_FORMAT,
            page.path,
            "Use STRPTIME(Date, '%b %Y') with abbreviated month, not '%B %Y'",
        );
    }

    if engine.queries_primary(sql) && !sql.contains(&cfg.null_guard) {
        out.error(
            ids::SQL_NULL_GUARD,
            page.path,
            format!(
                "Query against a primary table is missing 'WHERE {}'; null rows exist and will corrupt aggregates",
                cfg.null_guard
            ),
        );
    }

    if AGGREGATE_DIVISOR_RE.is_match(sql) && !sql.contains("NULLIF(") {
        out.warn(
            ids::SQL_NULLIF,
            page.path,
            "SQL divides by an aggregate without NULLIF; add NULLIF(denominator, 0) to guard against division by zero",
        );
    }

    for uc in &cfg.unreliable_columns {
        if sql.contains(&format!("\"{}\"", uc.column)) {
            let reason = if uc.reason.is_empty() {
                String::new()
            } else {
                format!(": {}", uc.reason)
            };
            out.error(
                ids::SQL_UNRELIABLE_COLUMN,
                page.path,
                format!(
                    "\"{}\" is structurally unreliable{reason}. Use \"{}\" instead.",
                    uc.column, uc.replacement
                ),
            );
        }
    }

    let swapped_used = cfg
        .swapped_columns
        .iter()
        .any(|c| sql.contains(&format!("\"{c}\"")));
    if swapped_used && !sql.contains("GREATEST(") {
        out.error(
            ids::SQL_COLUMN_SWAP,
            page.path,
            format!(
                "Columns {} are used without GREATEST/LEAST correction; some periods have them swapped. Wrap them in GREATEST(...) and LEAST(...) to reconstruct correct values.",
                cfg.swapped_columns
                    .iter()
                    .map(|c| format!("\"{c}\""))
                    .collect::<Vec<_>>()
                    .join(" / ")
            ),
        );
    }

    for (bad, good) in &cfg.deprecated_names {
        if sql.contains(bad.as_str()) {
            out.error(
                ids::SQL_DEPOT_NAME,
                page.path,
                format!("Deprecated name '{}' in SQL; use '{good}'", bad.escape_debug()),
            );
        }
    }
}

/// Queries feeding visualizations belong in a trailing `## Data Queries`
/// section. Blocks only used by summary cards may sit above the charts.
pub fn check_position(page: &Page, _engine: &Engine, out: &mut Findings) {
    if page.queries.len() <= 1 || page.text.contains("## Data Queries") {
        return;
    }
    let Some(first_viz) = page.tags.iter().find(|t| t.kind.is_viz()) else {
        return;
    };
    for block in &page.queries {
        if block.offset >= first_viz.start {
            continue;
        }
        let feeds_viz = page
            .tags
            .iter()
            .any(|t| t.kind.is_viz() && t.attrs.bare("data") == Some(block.name));
        if feeds_viz {
            out.warn(
                ids::SQL_POSITION,
                page.path,
                format!(
                    "SQL block '{}' appears before visualizations; move all SQL to a '## Data Queries' section at the page bottom (narrative and charts first, queries last)",
                    block.name
                ),
            );
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::rules::testing::{rules_of, run};

    fn page_with_sql(sql: &str) -> String {
        format!("---\ntitle: T\n---\n```sql q\n{sql}\n```\n")
    }

    #[test]
    fn test_no_blocks_no_findings() {
        assert!(run(check_sql, "p.md", "SELECT * FROM extracted").is_empty());
    }

    #[test]
    fn test_try_cast_exempts_try_prefix() {
        let bad = page_with_sql(r#"SELECT CAST("Total KMs" AS DOUBLE) FROM t"#);
        assert_eq!(rules_of(&run(check_sql, "p.md", &bad)), vec![ids::SQL_TRY_CAST]);
        let ok = page_with_sql(r#"SELECT TRY_CAST("Total KMs" AS DOUBLE) FROM t"#);
        assert!(run(check_sql, "p.md", &ok).is_empty());
    }

    #[test]
    fn test_capped_column_needs_least() {
        let bad = page_with_sql(
            r#"SELECT TRY_CAST(e."% of Fleet Utilization(PMPML+PPP)" AS DOUBLE) FROM t"#,
        );
        let found = run(check_sql, "p.md", &bad);
        assert_eq!(rules_of(&found), vec![ids::SQL_VALUE_CAP]);
        assert_eq!(found[0].severity, Severity::Error);
        let ok = page_with_sql(
            r#"SELECT LEAST(TRY_CAST("% of Fleet Utilization(PMPML+PPP)" AS DOUBLE), 100.0) FROM t"#,
        );
        assert!(run(check_sql, "p.md", &ok).is_empty());
    }

    #[test]
    fn test_null_guard_is_word_bounded() {
        let bad = page_with_sql("SELECT Depot FROM extracted");
        assert_eq!(rules_of(&run(check_sql, "p.md", &bad)), vec![ids::SQL_NULL_GUARD]);
        let other = page_with_sql("SELECT Depot FROM extracted_archive");
        assert!(run(check_sql, "p.md", &other).is_empty());
        let guarded = page_with_sql("SELECT Depot FROM extracted WHERE Date IS NOT NULL");
        assert!(run(check_sql, "p.md", &guarded).is_empty());
    }

    #[test]
    fn test_date_format_nullif_and_columns() {
        let sql = concat!(
            "SELECT STRPTIME(Date, '%B %Y'), a / SUM(b),\n",
            "\"Total Gross KMs (Diesel+CNG+E)\",\n",
            "\"No.of Schedules Sanctioned Per Day (PMPML + PPP)\"\n",
            "FROM t WHERE Depot = 'Bhekrainagar'"
        );
        let found = run(check_sql, "p.md", &page_with_sql(sql));
        assert_eq!(
            rules_of(&found),
            vec![
                ids::SQL_DATE_FORMAT,
                ids::SQL_NULLIF,
                ids::SQL_UNRELIABLE_COLUMN,
                ids::SQL_COLUMN_SWAP,
                ids::SQL_DEPOT_NAME,
            ]
        );
        assert!(found[2].message.contains("Total Dead KMs"));
        assert!(found[4].message.contains("Bhekrai Nagar"));
    }

    #[test]
    fn test_deprecated_name_split_across_lines() {
        let split = page_with_sql("SELECT * FROM t WHERE Depot = 'Pune\nStation'");
        let found = run(check_sql, "p.md", &split);
        assert_eq!(rules_of(&found), vec![ids::SQL_DEPOT_NAME]);
        assert_eq!(
            found[0].message,
            "Deprecated name 'Pune\\nStation' in SQL; use 'Pune Station'"
        );
        let canonical = page_with_sql("SELECT * FROM t WHERE Depot = 'Pune Station'");
        assert!(run(check_sql, "p.md", &canonical).is_empty());
    }

    #[test]
    fn test_position_warns_once_for_chart_feeding_block() {
        let text = "```sql a\nSELECT 1\n```\n```sql b\nSELECT 2\n```\n<BigValue data={a} value=x/>\n<LineChart data={b} x=date_parsed/>\n";
        let found = run(check_position, "p.md", text);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("'b'"));
    }

    #[test]
    fn test_position_allows_bigvalue_only_blocks_and_data_queries_section() {
        let cards = "```sql a\nSELECT 1\n```\n<BigValue data={a} value=x/>\n<LineChart data={b} x=date_parsed/>\n## Data Queries\n```sql b\nSELECT 2\n```\n";
        assert!(run(check_position, "p.md", cards).is_empty());
        let cards_only = "```sql a\nSELECT 1\n```\n<BigValue data={a} value=x/>\n<LineChart data={b} x=date_parsed/>\n```sql b\nSELECT 2\n```\n";
        assert!(run(check_position, "p.md", cards_only).is_empty());
    }
}
