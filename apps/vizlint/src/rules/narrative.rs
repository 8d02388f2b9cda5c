//! Narrative structure: descriptions, intro prose, navigation, openers and
//! conditional views.

use super::strip_fences_and_headings;
use crate::extract::{ComponentKind, Page};
use crate::findings::{ids, Findings};
use crate::lint::Engine;
use regex::Regex;
use std::sync::LazyLock;

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"description:[ \t]*(.+)").unwrap());
static FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\*(?:Data|Source)|^## Source").unwrap());
static OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:Looking at|As we can see|As shown|We can see|In this (?:page|visualization|chart|dashboard))",
    )
    .unwrap()
});
static VIEW_CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:#if|:else if)\s+(inputs\.[^}]+)\}").unwrap());
static VIEW_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:#if|:else if|/if)\b").unwrap());
static INPUT_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^inputs\.(\w+)").unwrap());
static COMPARED_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"===\s*("[^"]*")"#).unwrap());
static TAG_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\w[^>]*/?>").unwrap());
static HEADING_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+)$").unwrap());

const FORMAT_VAR_SUFFIXES: [&str; 3] = ["_chart_type", "_display", "_metric"];
const FORMAT_VALUES: [&str; 7] = [
    "\"Line Chart\"",
    "\"Area Chart\"",
    "\"Bar Chart\"",
    "\"Percentage\"",
    "\"Split\"",
    "\"Both\"",
    "\"Absolute\"",
];

const MIN_DESCRIPTION: usize = 20;
const MAX_DESCRIPTION: usize = 160;
const MIN_INTRO_WORDS: usize = 30;
const MIN_VIEW_PROSE: usize = 20;

pub fn check_page_ux(page: &Page, _engine: &Engine, out: &mut Findings) {
    if let Some(c) = page.front_matter.and_then(|fm| DESCRIPTION_RE.captures(fm)) {
        let len = c[1].trim().chars().count();
        if len < MIN_DESCRIPTION {
            out.warn(
                ids::META_DESCRIPTION,
                page.path,
                format!("description too short ({len} chars); a concise one-liner helps readers and sidebar navigation"),
            );
        } else if len > MAX_DESCRIPTION {
            out.warn(
                ids::META_DESCRIPTION,
                page.path,
                format!("description too long ({len} chars, max {MAX_DESCRIPTION}); trim it for sidebar and link preview readability"),
            );
        }
    }

    if page.queries.is_empty() || !page.has_tag(|k| k.is_viz()) {
        return;
    }

    let body_start = page.body_offset();
    let first = page.tags.iter().find(|t| {
        t.start >= body_start
            && (t.kind.is_viz() || matches!(t.kind, ComponentKind::Grid | ComponentKind::BigValue))
    });
    if let Some(first) = first {
        let prose = strip_fences_and_headings(&page.text[body_start..first.start]);
        let words = prose.split_whitespace().count();
        if words < MIN_INTRO_WORDS {
            out.warn(
                ids::PAGE_INTRO,
                page.path,
                format!("Only {words} words of prose before the first visualization; add a narrative paragraph so readers have context before the charts"),
            );
        }
    }

    if page.file_name() != "index.md" && !page.text.contains("## See Also") {
        out.warn(
            ids::PAGE_SEE_ALSO,
            page.path,
            "Data page missing '## See Also' section; add cross-links to help readers discover related pages",
        );
    }

    if !FOOTER_RE.is_match(page.text) {
        out.warn(
            ids::PAGE_FOOTER,
            page.path,
            "Data page missing source footnote; add *Data covers [period]. Source: [URL].* or a ## Sources section",
        );
    }
}

/// The first prose line should make a claim, not point at a chart.
pub fn check_opener(page: &Page, _engine: &Engine, out: &mut Findings) {
    let Some(line) = page
        .body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
    else {
        return;
    };
    if OPENER_RE.is_match(line) {
        let excerpt: String = line.chars().take(80).collect();
        out.warn(
            ids::ARTIFACT_OPENER,
            page.path,
            format!("Page opens with artifact-forward sentence: '{excerpt}...'; lead with a claim about the world, not a pointer to a chart"),
        );
    }
}

fn is_format_switch(condition: &str) -> bool {
    let by_name = INPUT_VAR_RE
        .captures(condition)
        .map(|c| FORMAT_VAR_SUFFIXES.iter().any(|s| c[1].ends_with(s)))
        .unwrap_or(false);
    let by_value = COMPARED_VALUE_RE
        .captures(condition)
        .map(|c| FORMAT_VALUES.contains(&&c[1]))
        .unwrap_or(false);
    by_name || by_value
}

/// Each `{#if inputs.…}` view needs an orienting sentence before its first
/// component. Chart-format switchers are exempt.
pub fn check_conditional_views(page: &Page, _engine: &Engine, out: &mut Findings) {
    for c in VIEW_CONDITION_RE.captures_iter(page.text) {
        let (Some(whole), Some(cond)) = (c.get(0), c.get(1)) else {
            continue;
        };
        if is_format_switch(cond.as_str().trim()) {
            continue;
        }
        let block_start = whole.end();
        let block_end = VIEW_BOUNDARY_RE
            .find(&page.text[block_start..])
            .map(|m| block_start + m.start())
            .unwrap_or(page.text.len());
        let Some(first) = page
            .tags
            .iter()
            .find(|t| t.kind.is_display() && t.start >= block_start && t.start < block_end)
        else {
            continue;
        };
        let pre = strip_fences_and_headings(&page.text[block_start..first.start]);
        let pre = TAG_TEXT_RE.replace_all(&pre, "");
        let chars = pre.trim().chars().count();
        if chars < MIN_VIEW_PROSE {
            let section = HEADING_TEXT_RE
                .captures_iter(&page.text[..whole.start()])
                .last()
                .map(|h| h[1].trim().to_string())
                .unwrap_or_else(|| "(unknown section)".to_string());
            out.warn(
                ids::CONTENT_IFELSE,
                page.path,
                format!("Conditional view '{section}' contains charts but no prose paragraph ({chars} chars before first component); add at least one orienting sentence before the first chart"),
            );
        }
    }
}
