//! Path utilities for turning request URLs into cache file names.

use core::hash::Hasher;
use rustc_hash::FxHasher;

/// Longest sanitized path component kept verbatim in a cache file name.
const MAX_COMPONENT_CHARS: usize = 160;

/// Sanitize a string for use as a path component
///
/// Removes path traversal sequences and characters that are either dangerous on a
/// filesystem or meaningful in a URL query.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    // Replace ".." before single characters so "my.repo" survives intact
    let s = s.replace("..", "__");
    s.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '&', '=', '#', '%'], "_")
}

/// Map a request URL onto a relative cache path of the form `<host>/<path-and-query>.json`.
///
/// Overly long paths are shortened and suffixed with a hash of the full URL so that
/// distinct keys keep distinct files. The mapping is not injective (`a/b` and `a_b`
/// collide), which is why cache entries also record their exact key.
#[must_use]
pub fn cache_file_name(key: &str) -> String {
    let without_scheme = key.split_once("://").map_or(key, |(_, rest)| rest);
    let (host, rest) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));

    let safe_host = match sanitize_path_component(host) {
        h if h.is_empty() => "_".to_string(),
        h => h,
    };

    let mut safe_rest = sanitize_path_component(rest.trim_end_matches('/'));
    if safe_rest.is_empty() {
        safe_rest.push_str("_root");
    }

    if safe_rest.chars().count() > MAX_COMPONENT_CHARS {
        let mut hasher = FxHasher::default();
        hasher.write(key.as_bytes());
        let prefix: String = safe_rest.chars().take(MAX_COMPONENT_CHARS).collect();
        safe_rest = format!("{prefix}-{:016x}", hasher.finish());
    }

    format!("{safe_host}/{safe_rest}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_normal_name() {
        assert_eq!(sanitize_path_component("tokio"), "tokio");
        assert_eq!(sanitize_path_component("my.repo"), "my.repo");
    }

    #[test]
    fn test_sanitize_path_traversal() {
        assert_eq!(sanitize_path_component(".."), "__");
        assert_eq!(sanitize_path_component("../../etc/passwd"), "______etc_passwd");
    }

    #[test]
    fn test_sanitize_query_characters() {
        assert_eq!(sanitize_path_component("readme?inline=false"), "readme_inline_false");
    }

    #[test]
    fn test_cache_file_name_github_api() {
        assert_eq!(
            cache_file_name("https://api.github.com/repos/acme/tool/branches"),
            "api.github.com/repos_acme_tool_branches.json"
        );
    }

    #[test]
    fn test_cache_file_name_with_port() {
        assert_eq!(cache_file_name("http://127.0.0.1:8080/orgs/acme/repos"), "127.0.0.1_8080/orgs_acme_repos.json");
    }

    #[test]
    fn test_cache_file_name_host_only() {
        assert_eq!(cache_file_name("https://opensustain.tech/"), "opensustain.tech/_root.json");
    }

    #[test]
    fn test_cache_file_name_long_path_is_hashed() {
        let long_a = format!("https://example.org/{}a", "x".repeat(300));
        let long_b = format!("https://example.org/{}b", "x".repeat(300));

        let name_a = cache_file_name(&long_a);
        let name_b = cache_file_name(&long_b);

        assert_ne!(name_a, name_b);
        assert!(name_a.len() < 220);
        assert_eq!(name_a, cache_file_name(&long_a));
    }
}
