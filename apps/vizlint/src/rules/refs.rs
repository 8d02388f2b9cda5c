//! Cross-references between components and query blocks.

use crate::extract::Page;
use crate::findings::{ids, Findings};
use crate::lint::Engine;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static DATA_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"data=\{(\w+)\}").unwrap());
static COMPOSITION_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").unwrap());

/// Missing queries render blank charts without a build error; orphaned
/// queries are usually leftovers of a rename.
pub fn check_query_refs(page: &Page, _engine: &Engine, out: &mut Findings) {
    let mut defined: BTreeMap<&str, usize> = BTreeMap::new();
    for q in &page.queries {
        *defined.entry(q.name).or_default() += 1;
    }

    let component_refs: BTreeSet<&str> = DATA_REF_RE
        .captures_iter(page.text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let composition_refs: BTreeSet<&str> = COMPOSITION_REF_RE
        .captures_iter(page.text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    for name in component_refs.iter().filter(|n| !defined.contains_key(*n)) {
        out.error(
            ids::COMPONENT_QUERY_REF,
            page.path,
            format!(
                "Component references data={{{name}}} but no 'sql {name}' block is defined; the chart will render blank. Define the query or fix the name."
            ),
        );
    }

    if page.has_tag(|k| k.is_display()) {
        for name in defined.keys() {
            if !component_refs.contains(name) && !composition_refs.contains(name) {
                out.warn(
                    ids::COMPONENT_QUERY_REF,
                    page.path,
                    format!(
                        "SQL block '{name}' is defined but never referenced by any component or query composition; dead query, or a data= attribute was renamed without updating the block"
                    ),
                );
            }
        }
    }

    for (name, count) in &defined {
        if *count > 1 {
            out.error(
                ids::SQL_DUPLICATE_QUERY,
                page.path,
                format!("Query '{name}' is defined {count} times; query names must be unique on a page"),
            );
        }
    }
}
