//! Lightweight extraction of links and section headings from HTML pages.
//!
//! Only `<a>` tags and `<h2>`/`<h3>` headings are recognized, which is all the
//! listing pages need.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ANCHOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<a\s([^>]*)>").expect("invalid regex"));

static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("invalid regex"));

static SECTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h2\b[^>]*>(?P<h2>.*?)</h2\s*>|<h3\b[^>]*>(?P<h3>.*?)</h3\s*>|<a\s(?P<attrs>[^>]*)>").expect("invalid regex")
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("invalid regex"));

/// An `<a>` tag's link target and classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub classes: Vec<String>,
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn parse_anchor(attrs: &str) -> Option<Anchor> {
    let mut href = None;
    let mut classes = Vec::new();

    for caps in ATTRIBUTE_REGEX.captures_iter(attrs) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)).map_or("", |m| m.as_str());

        if name.eq_ignore_ascii_case("href") {
            href = Some(decode_entities(value.trim()));
        } else if name.eq_ignore_ascii_case("class") {
            classes = value.split_whitespace().map(ToString::to_string).collect();
        }
    }

    href.map(|href| Anchor { href, classes })
}

/// Returns every `<a>` tag carrying an `href`, in document order.
#[must_use]
pub fn find_anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).and_then(|m| parse_anchor(m.as_str())))
        .collect()
}

/// Returns the `href` of every `<a>` tag, optionally only those carrying `class_filter`.
#[must_use]
pub fn find_anchor_hrefs(html: &str, class_filter: Option<&str>) -> Vec<String> {
    find_anchors(html)
        .into_iter()
        .filter(|a| class_filter.is_none_or(|class| a.classes.iter().any(|c| c == class)))
        .map(|a| a.href)
        .collect()
}

fn heading_text(inner: &str) -> String {
    decode_entities(&TAG_REGEX.replace_all(inner, "")).replace('¶', "").trim().to_string()
}

/// Group the links of a page under the `<h2>` and `<h3>` headings preceding them.
///
/// Links appearing before both an `<h2>` and an `<h3>` have been seen are dropped.
/// Links inside headings themselves (permalinks) are ignored.
#[must_use]
pub fn links_by_section(html: &str) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut sections: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    let mut current_h2: Option<String> = None;
    let mut current_h3: Option<String> = None;

    for caps in SECTION_REGEX.captures_iter(html) {
        if let Some(h2) = caps.name("h2") {
            let title = heading_text(h2.as_str());
            let _ = sections.entry(title.clone()).or_default();
            current_h2 = Some(title);
            current_h3 = None;
        } else if let Some(h3) = caps.name("h3") {
            let title = heading_text(h3.as_str());
            if let Some(h2) = &current_h2 {
                let _ = sections.entry(h2.clone()).or_default().entry(title.clone()).or_default();
            }
            current_h3 = Some(title);
        } else if let Some(attrs) = caps.name("attrs")
            && let (Some(h2), Some(h3)) = (&current_h2, &current_h3)
            && let Some(anchor) = parse_anchor(attrs.as_str())
        {
            sections
                .entry(h2.clone())
                .or_default()
                .entry(h3.clone())
                .or_default()
                .push(anchor.href);
        }
    }

    sections
}
