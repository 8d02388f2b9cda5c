//! Page rules.
//!
//! Every rule has the same shape, `fn(&Page, &Engine, &mut Findings)`, reads
//! only the shared page view and the engine tables, and reports by pushing
//! findings. A rule that matches nothing reports nothing. Rules run in the
//! order of [`PAGE_RULES`], which is also the order findings appear per file.

mod charts;
mod components;
mod meta;
mod narrative;
mod refs;
mod sql;

use crate::extract::Page;
use crate::findings::Findings;
use crate::lint::Engine;
use regex::Regex;
use std::sync::LazyLock;

pub type PageRule = fn(&Page, &Engine, &mut Findings);

/// Ordered rule table: `(name, rule)`.
pub const PAGE_RULES: &[(&str, PageRule)] = &[
    ("meta", meta::check_meta),
    ("links", meta::check_links),
    ("sql", sql::check_sql),
    ("components", components::check_components),
    ("position", sql::check_position),
    ("query_refs", refs::check_query_refs),
    ("self_close", components::check_self_close),
    ("color_order", components::check_color_order),
    ("citation", meta::check_citation),
    ("chart_affordances", charts::check_affordances),
    ("maps", charts::check_maps),
    ("chart_ux", charts::check_chart_ux),
    ("page_ux", narrative::check_page_ux),
    ("opener", narrative::check_opener),
    ("conditional_views", narrative::check_conditional_views),
];

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static HEADING_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+.*$").unwrap());

/// Remove fenced blocks and heading lines, leaving prose and tags.
pub(crate) fn strip_fences_and_headings(text: &str) -> String {
    let no_fences = FENCE_RE.replace_all(text, "");
    HEADING_LINE_RE.replace_all(&no_fences, "").into_owned()
}

/// Up to `n` bytes immediately before `pos`, widened to a char boundary.
pub(crate) fn preceding(text: &str, pos: usize, n: usize) -> &str {
    let mut start = pos.saturating_sub(n);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    &text[start..pos]
}

/// Check a single page against the full rule table.
pub fn run_page_rules(page: &Page, engine: &Engine) -> Findings {
    let mut out = Findings::new();
    for (name, rule) in PAGE_RULES {
        let before = out.len();
        rule(page, engine, &mut out);
        tracing::trace!(page = page.path, rule = name, found = out.len() - before);
    }
    out
}
