//! Front matter, link and citation rules.

use crate::extract::Page;
use crate::findings::{ids, Findings};
use crate::lint::Engine;
use regex::Regex;
use std::sync::LazyLock;

static UNQUOTED_META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(title|description):\s*([^"'\s].*)"#).unwrap());

static SPACED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\((/[^)\s]*[ ][^)]*)\)").unwrap());

/// Front matter must exist with a title; a description is expected, and
/// unquoted values containing `:` break the YAML loader.
pub fn check_meta(page: &Page, _engine: &Engine, out: &mut Findings) {
    let Some(fm) = page.front_matter else {
        out.error(ids::META_FRONTMATTER, page.path, "Missing YAML frontmatter block");
        return;
    };
    if !fm.contains("title:") {
        out.error(ids::META_FRONTMATTER, page.path, "Frontmatter missing 'title:'");
    }
    if !fm.contains("description:") {
        out.warn(ids::META_FRONTMATTER, page.path, "Frontmatter missing 'description:'");
    }
    for line in fm.lines() {
        let Some(c) = UNQUOTED_META_RE.captures(line) else {
            continue;
        };
        if c[2].contains(':') {
            out.warn(
                ids::META_YAML_QUOTE,
                page.path,
                format!(
                    "{}: value contains a colon but is not quoted; wrap it in double quotes to prevent a YAML parse error: '{}'",
                    &c[1],
                    line.trim()
                ),
            );
        }
    }
}

pub fn check_links(page: &Page, _engine: &Engine, out: &mut Findings) {
    for c in SPACED_LINK_RE.captures_iter(page.text) {
        out.error(
            ids::LINK_ENCODING,
            page.path,
            format!("Unencoded space in link path, use %20: ({})", &c[2]),
        );
    }
}

/// Pages that mention a cited source must link to it.
pub fn check_citation(page: &Page, engine: &Engine, out: &mut Findings) {
    for citation in &engine.config().citations {
        if page.text.contains(&citation.trigger) && !page.text.contains(&citation.url) {
            out.warn(
                ids::META_CITATION,
                page.path,
                format!(
                    "Page uses {} but does not cite https://{}; add it to the source footnote",
                    citation.trigger,
                    citation.url.trim_start_matches("https://")
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{rules_of, run};
    use crate::models::Severity;

    #[test]
    fn test_missing_front_matter_is_single_error() {
        let found = run(check_meta, "p.md", "# Just a heading\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(found[0].rule, ids::META_FRONTMATTER);
    }

    #[test]
    fn test_missing_title_and_description() {
        let found = run(check_meta, "p.md", "---\nsidebar: hide\n---\nbody");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(found[1].severity, Severity::Warn);
    }

    #[test]
    fn test_unquoted_colon_value_warns() {
        let found = run(
            check_meta,
            "p.md",
            "---\ntitle: Ridership: a decade\ndescription: \"Quoted: fine\"\n---\n",
        );
        assert_eq!(rules_of(&found), vec![ids::META_YAML_QUOTE]);
        assert!(found[0].message.starts_with("title:"));
    }

    #[test]
    fn test_link_with_space_is_error() {
        let found = run(
            check_links,
            "p.md",
            "See [Fleet](/fleet size) and [Ok](/fleet%20size) and [Ext](https://x.org/a b).",
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("/fleet size"));
    }

    #[test]
    fn test_citation_requires_url() {
        let text = "```sql pnl\nSELECT * FROM PMPML_Financial_PnL\n```";
        let found = run(check_citation, "p.md", text);
        assert_eq!(rules_of(&found), vec![ids::META_CITATION]);
        let cited = format!("{text}\n*Source: https://pmpml.org/financial_performance*");
        assert!(run(check_citation, "p.md", &cited).is_empty());
    }
}
