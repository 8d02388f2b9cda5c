//! Fragment extraction from page text.
//!
//! This is a lexical scanner, not a parser. It recovers three flat fragment
//! lists from a Markdown page:
//! - named ```` ```sql <name> ```` query blocks, in document order;
//! - component tags (`<LineChart ...>` / `<LineChart .../>`) with their
//!   attribute strings split into name/value pairs;
//! - the front matter block and the body that follows it.
//!
//! Attribute values in this markup (single-quoted strings, `{[...]}` array
//! expressions) never contain a literal `>`, so a tag ends at the first `>`.
//! A `>` inside a value truncates the tag; that is an accepted false negative.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static QUERY_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```sql\s+(\w+)\n(.*?)```").unwrap());

static FRONT_MATTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\n(.*?)\n---\n?").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = ComponentKind::ALL.iter().map(|k| k.name()).collect();
    Regex::new(&format!(r"<({})\b([^>]*)>", names.join("|"))).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Component kinds recognised by the scanner.
pub enum ComponentKind {
    LineChart,
    BarChart,
    AreaChart,
    DataTable,
    BigValue,
    PointMap,
    AreaMap,
    Grid,
    ReferenceArea,
    ReferenceLine,
    Column,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 11] = [
        ComponentKind::LineChart,
        ComponentKind::BarChart,
        ComponentKind::AreaChart,
        ComponentKind::DataTable,
        ComponentKind::BigValue,
        ComponentKind::PointMap,
        ComponentKind::AreaMap,
        ComponentKind::Grid,
        ComponentKind::ReferenceArea,
        ComponentKind::ReferenceLine,
        ComponentKind::Column,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::LineChart => "LineChart",
            ComponentKind::BarChart => "BarChart",
            ComponentKind::AreaChart => "AreaChart",
            ComponentKind::DataTable => "DataTable",
            ComponentKind::BigValue => "BigValue",
            ComponentKind::PointMap => "PointMap",
            ComponentKind::AreaMap => "AreaMap",
            ComponentKind::Grid => "Grid",
            ComponentKind::ReferenceArea => "ReferenceArea",
            ComponentKind::ReferenceLine => "ReferenceLine",
            ComponentKind::Column => "Column",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Line, bar and area charts.
    pub fn is_chart(self) -> bool {
        matches!(
            self,
            ComponentKind::LineChart | ComponentKind::BarChart | ComponentKind::AreaChart
        )
    }

    /// Charts, tables and maps.
    pub fn is_viz(self) -> bool {
        self.is_chart()
            || matches!(
                self,
                ComponentKind::DataTable | ComponentKind::PointMap | ComponentKind::AreaMap
            )
    }

    /// Anything bound to query output, including summary cards.
    pub fn is_display(self) -> bool {
        self.is_viz() || self == ComponentKind::BigValue
    }

    /// Tags only meaningful nested inside a chart.
    pub fn is_child_only(self) -> bool {
        matches!(self, ComponentKind::ReferenceArea | ComponentKind::Column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A named, fenced SQL block.
pub struct QueryBlock<'a> {
    pub name: &'a str,
    pub text: &'a str,
    /// Byte offset of the opening fence.
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Attribute pairs in source order. Values are kept raw (quotes and braces
/// included); flag attributes have an empty value.
pub struct Attributes<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Attributes<'a> {
    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| *k == key)
    }

    /// Value with outer quotes or braces removed (`{'q'}` -> `q`).
    pub fn bare(&self, key: &str) -> Option<&'a str> {
        self.get(key).map(bare_value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An opening or self-closing component tag.
pub struct ComponentTag<'a> {
    pub kind: ComponentKind,
    /// Attribute text between the tag name and `>` (without a trailing `/`).
    pub raw: &'a str,
    pub attrs: Attributes<'a>,
    pub self_closing: bool,
    /// Byte offset of `<`.
    pub start: usize,
    /// Byte offset just past `>`.
    pub end: usize,
}

impl<'a> ComponentTag<'a> {
    /// `title` value for messages, or `(no title)`.
    pub fn title(&self) -> &'a str {
        match self.attrs.bare("title") {
            Some(t) if !t.is_empty() => t,
            _ => "(no title)",
        }
    }

    /// True when `y` holds an explicit list with at least two entries.
    pub fn has_multi_y(&self) -> bool {
        self.attrs
            .get("y")
            .map(|v| {
                let v = v.trim_start_matches('{');
                v.starts_with('[') && v.contains(',')
            })
            .unwrap_or(false)
    }

    /// True when `y` holds an explicit list (`y=[..]` or `y={[..]}`).
    pub fn has_y_list(&self) -> bool {
        self.attrs
            .get("y")
            .map(|v| v.starts_with('[') || v.starts_with("{["))
            .unwrap_or(false)
    }
}

/// Strip one layer of braces and then one layer of quotes.
pub fn bare_value(v: &str) -> &str {
    let v = v.trim();
    let v = v
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(v)
        .trim();
    for q in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

/// Return every named SQL block in document order. Duplicated names are all
/// returned; callers decide how to treat them.
pub fn extract_query_blocks(text: &str) -> Vec<QueryBlock<'_>> {
    QUERY_BLOCK_RE
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some(QueryBlock {
                name: c.get(1)?.as_str(),
                text: c.get(2)?.as_str(),
                offset: whole.start(),
            })
        })
        .collect()
}

/// Lazily scan for opening tags among `kinds`, in source order.
pub fn component_tags<'a>(
    text: &'a str,
    kinds: &'a [ComponentKind],
) -> impl Iterator<Item = ComponentTag<'a>> + 'a {
    TAG_RE.captures_iter(text).filter_map(move |c| {
        let whole = c.get(0)?;
        let kind = ComponentKind::from_name(c.get(1)?.as_str())?;
        if !kinds.contains(&kind) {
            return None;
        }
        let inner = c.get(2)?.as_str().trim_end();
        let (raw, self_closing) = match inner.strip_suffix('/') {
            Some(r) => (r, true),
            None => (inner, false),
        };
        Some(ComponentTag {
            kind,
            raw,
            attrs: parse_attributes(raw),
            self_closing,
            start: whole.start(),
            end: whole.end(),
        })
    })
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.')
}

/// Index just past the brace matching the `{` at `start`, skipping quoted text.
fn skip_braces(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    bytes.len()
}

/// Split a raw attribute string into pairs. Never fails: unterminated values
/// run to the end of the string and stray characters are skipped.
pub fn parse_attributes(raw: &str) -> Attributes<'_> {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut pairs = Vec::new();
    let mut i = 0;
    while i < len {
        let b = bytes[i];
        if b == b'{' {
            // spread expression such as {...props}
            i = skip_braces(bytes, i);
            continue;
        }
        if !is_name_byte(b) {
            i += 1;
            continue;
        }
        let name_start = i;
        while i < len && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = &raw[name_start..i];
        let mut j = i;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= len || bytes[j] != b'=' {
            pairs.push((name, ""));
            continue;
        }
        j += 1;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let value_start = j;
        let value_end = match bytes.get(j) {
            None => j,
            Some(&q) if q == b'\'' || q == b'"' => raw[j + 1..]
                .find(q as char)
                .map(|p| j + 1 + p + 1)
                .unwrap_or(len),
            Some(b'{') => skip_braces(bytes, j),
            Some(_) => {
                let mut k = j;
                while k < len && !bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                k
            }
        };
        pairs.push((name, &raw[value_start..value_end]));
        i = value_end;
    }
    Attributes { pairs }
}

/// Convert CRLF line endings to LF. Every pattern here is anchored on `\n`.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split off a leading `---` front matter block. Returns the block content
/// (without fences) and the remaining body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    match FRONT_MATTER_RE.captures(text) {
        Some(c) => {
            let end = c.get(0).map(|m| m.end()).unwrap_or(0);
            (c.get(1).map(|m| m.as_str()), &text[end..])
        }
        None => (None, text),
    }
}

/// Per-page derived state, computed once and shared read-only by every rule.
#[derive(Debug)]
pub struct Page<'a> {
    /// Display path used in findings.
    pub path: &'a str,
    pub text: &'a str,
    pub front_matter: Option<&'a str>,
    pub body: &'a str,
    pub queries: Vec<QueryBlock<'a>>,
    /// All query texts joined with newlines.
    pub sql: String,
    /// Every recognised component tag in source order.
    pub tags: Vec<ComponentTag<'a>>,
}

impl<'a> Page<'a> {
    pub fn new(path: &'a str, text: &'a str) -> Self {
        let (front_matter, body) = split_front_matter(text);
        let queries = extract_query_blocks(text);
        let sql = queries
            .iter()
            .map(|q| q.text)
            .collect::<Vec<_>>()
            .join("\n");
        let tags = component_tags(text, &ComponentKind::ALL).collect();
        Page {
            path,
            text,
            front_matter,
            body,
            queries,
            sql,
            tags,
        }
    }

    /// Last path component.
    pub fn file_name(&self) -> &'a str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(self.path)
    }

    /// Byte offset of the body within `text`.
    pub fn body_offset(&self) -> usize {
        self.text.len() - self.body.len()
    }

    pub fn tags_of(&self, kind: ComponentKind) -> impl Iterator<Item = &ComponentTag<'a>> {
        self.tags.iter().filter(move |t| t.kind == kind)
    }

    pub fn charts(&self) -> impl Iterator<Item = &ComponentTag<'a>> {
        self.tags.iter().filter(|t| t.kind.is_chart())
    }

    /// Charts plotted against the date axis column.
    pub fn time_series<'s>(
        &'s self,
        date_axis: &'s str,
    ) -> impl Iterator<Item = &'s ComponentTag<'a>> + 's {
        self.charts()
            .filter(move |t| t.attrs.bare("x") == Some(date_axis))
    }

    pub fn has_tag(&self, pred: impl Fn(ComponentKind) -> bool) -> bool {
        self.tags.iter().any(|t| pred(t.kind))
    }
}
