/// What kind of target a failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FailureKind {
    /// A discovery source or listing document.
    Source,
    /// An organisation or group whose repositories could not be listed.
    Organisation,
    /// A repository or project whose details could not be fetched.
    Repository,
}

/// A target that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    #[must_use]
    pub fn new(url: impl Into<String>, kind: FailureKind, reason: impl core::fmt::Display) -> Self {
        Self {
            url: url.into(),
            kind,
            reason: reason.to_string(),
        }
    }
}

/// URLs of the failures of one kind, sorted and unique.
#[must_use]
pub fn failed_urls(failures: &[Failure], kind: FailureKind) -> Vec<String> {
    let mut urls: Vec<String> = failures.iter().filter(|f| f.kind == kind).map(|f| f.url.clone()).collect();
    urls.sort_unstable();
    urls.dedup();
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_urls_by_kind() {
        let failures = [
            Failure::new("https://github.com/b", FailureKind::Organisation, "HTTP 404"),
            Failure::new("https://github.com/a/x", FailureKind::Repository, "HTTP 500"),
            Failure::new("https://github.com/a", FailureKind::Organisation, "HTTP 404"),
            Failure::new("https://github.com/a", FailureKind::Organisation, "timeout"),
        ];

        assert_eq!(
            failed_urls(&failures, FailureKind::Organisation),
            ["https://github.com/a", "https://github.com/b"]
        );
        assert_eq!(failed_urls(&failures, FailureKind::Repository), ["https://github.com/a/x"]);
        assert!(failed_urls(&failures, FailureKind::Source).is_empty());
        assert_eq!(FailureKind::Organisation.to_string(), "organisation");
    }
}
