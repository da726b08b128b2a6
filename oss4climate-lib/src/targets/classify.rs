//! Classification of project reference URLs.
//!
//! A URL is reduced to its path block (the part after the host, without fragments,
//! `&` suffixes and trailing slashes) and classified by the number of slashes in it.

use super::{ClassifiedTarget, Platform, TargetKind, TargetSet};
use url::Url;

const GITHUB_PREFIXES: [&str; 4] = [
    "https://github.com/",
    "https://www.github.com/",
    "http://github.com/",
    "http://www.github.com/",
];

const GITHUB_CANONICAL_PREFIX: &str = "https://github.com/";

/// Path suffixes and segments that mark a GitHub URL as pointing inside a repository.
const GITHUB_DEEP_MARKERS: [&str; 3] = ["/tree/", "/blob/", "/actions/workflows/"];
const GITHUB_DEEP_SUFFIXES: [&str; 2] = ["/releases", "/issues"];

/// Returns the `org` or `org/repo...` block of a GitHub URL.
#[must_use]
pub fn github_path_block(url: &str) -> Option<&str> {
    let rest = GITHUB_PREFIXES.iter().find_map(|prefix| url.strip_prefix(prefix))?;
    let block = rest.split(['#', '&', '?']).next().unwrap_or(rest).trim_end_matches('/');
    (!block.is_empty()).then_some(block)
}

/// Splits any http(s) URL into `scheme://host[:port]` and its trimmed path block.
///
/// The host is not checked, so this also serves self-hosted GitLab instances that
/// do not follow the `gitlab.*` naming convention.
#[must_use]
pub fn split_host_and_path(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?;
    let base = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    };

    let path = parsed.path();
    let block = path.split('&').next().unwrap_or(path).trim_matches('/');
    Some((base, block.to_string()))
}

fn gitlab_parts(url: &str) -> Option<(String, String)> {
    let (base, block) = split_host_and_path(url)?;
    let host = base.split_once("://").map_or(base.as_str(), |(_, host)| host);
    host.starts_with("gitlab.").then_some((base, block))
}

fn kind_from_block(block: &str) -> TargetKind {
    match block.matches('/').count() {
        _ if block.is_empty() => TargetKind::Unknown,
        0 => TargetKind::Organisation,
        1 => TargetKind::Repository,
        _ => TargetKind::Unknown,
    }
}

impl Platform {
    /// Normalize a URL to `scheme://host/<block>`.
    ///
    /// URLs that do not belong to this platform come back with only trailing slashes removed.
    #[must_use]
    pub fn canonicalize(self, url: &str) -> String {
        let url = url.trim();
        match self {
            Self::GitHub => match github_path_block(url) {
                Some(block) => format!("{GITHUB_CANONICAL_PREFIX}{block}"),
                None => url.trim_end_matches('/').to_string(),
            },
            Self::GitLab => match gitlab_parts(url) {
                Some((base, block)) if block.is_empty() => base,
                Some((base, block)) => format!("{base}/{block}"),
                None => url.trim_end_matches('/').to_string(),
            },
        }
    }

    /// Classify a URL as an organisation, a repository, or unknown on this platform.
    ///
    /// On GitLab every block with one or more slashes is a project, as nested
    /// sub-groups cannot be told apart from projects by the URL alone. Blocks
    /// that reach into GitLab's `/-/` routes are unknown.
    #[must_use]
    pub fn classify(self, url: &str) -> TargetKind {
        let url = url.trim();
        match self {
            Self::GitHub => github_path_block(url).map_or(TargetKind::Unknown, kind_from_block),
            Self::GitLab => match gitlab_parts(url) {
                None => TargetKind::Unknown,
                Some((_, block)) if block.is_empty() || block == "-" || block.contains("/-/") || block.ends_with("/-") => {
                    TargetKind::Unknown
                }
                Some((_, block)) if block.contains('/') => TargetKind::Repository,
                Some(_) => TargetKind::Organisation,
            },
        }
    }

    /// Classify and canonicalize in one step.
    #[must_use]
    pub fn classify_target(self, url: &str) -> ClassifiedTarget {
        ClassifiedTarget {
            url: self.canonicalize(url),
            platform: self,
            kind: self.classify(url),
        }
    }
}

fn is_web_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

/// Partition a flat list of URLs into a [`TargetSet`].
///
/// GitHub is tried first and its unknowns are offered to GitLab. Whatever neither
/// platform recognizes lands in `unknown`; strings that are not http(s) URLs land in `invalid`.
#[must_use]
pub fn split_by_class<I, S>(urls: I) -> TargetSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = TargetSet::default();

    for url in urls {
        let url = url.as_ref().trim();
        if url.is_empty() {
            continue;
        }

        if !is_web_url(url) {
            out.invalid.push(url.to_string());
            continue;
        }

        let github = Platform::GitHub.classify_target(url);
        match github.kind {
            TargetKind::Organisation => out.github_organisations.push(github.url),
            TargetKind::Repository => out.github_repositories.push(github.url),
            TargetKind::Unknown => {
                let gitlab = Platform::GitLab.classify_target(url);
                match gitlab.kind {
                    TargetKind::Organisation => out.gitlab_groups.push(gitlab.url),
                    TargetKind::Repository => out.gitlab_projects.push(gitlab.url),
                    TargetKind::Unknown => out.unknown.push(url.to_string()),
                }
            }
        }
    }

    out
}

/// Keep only URLs worth classifying: GitHub URLs that do not point inside a
/// repository, and GitLab URLs.
#[must_use]
pub fn isolate_relevant_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .filter_map(|url| {
            let url = url.as_ref().trim();
            let is_github = GITHUB_PREFIXES.iter().any(|p| url.starts_with(p));
            let is_deep = GITHUB_DEEP_MARKERS.iter().any(|m| url.contains(m))
                || GITHUB_DEEP_SUFFIXES.iter().any(|s| url.trim_end_matches('/').ends_with(s));

            ((is_github && !is_deep) || url.starts_with("https://gitlab.")).then(|| url.to_string())
        })
        .collect()
}

/// Returns `true` when an organisation URL actually names something deeper than an organisation.
///
/// The scheme and trailing slash are ignored; more than one remaining slash means
/// the URL carries a path below the host's first segment.
#[must_use]
pub fn is_ambiguous_organisation(url: &str) -> bool {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .trim_end_matches('/');
    stripped.matches('/').count() > 1
}

/// Returns the GitHub organisation URL owning a GitHub repository URL.
#[must_use]
pub fn organisation_url_of(repo_url: &str) -> Option<String> {
    let block = github_path_block(repo_url)?;
    let org = block.split('/').next()?;
    Some(format!("{GITHUB_CANONICAL_PREFIX}{org}"))
}
