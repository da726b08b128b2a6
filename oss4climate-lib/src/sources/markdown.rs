use regex::Regex;
use std::sync::LazyLock;

static INLINE_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^\)]+)\)").expect("invalid regex"));

/// Returns the targets of all inline `[text](url)` links, in document order.
#[must_use]
pub fn find_links(markdown: &str) -> Vec<String> {
    INLINE_LINK_REGEX
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}
