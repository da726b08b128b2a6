use serde::{Deserialize, Serialize};
use strum::Display;

/// A code hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum Platform {
    GitHub,
    GitLab,
}

/// What a URL points at on a hosting platform.
///
/// GitHub organisations and GitLab groups share [`TargetKind::Organisation`];
/// repositories and projects share [`TargetKind::Repository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TargetKind {
    Organisation,
    Repository,
    Unknown,
}

/// A URL tagged with its platform and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedTarget {
    pub url: String,
    pub platform: Platform,
    pub kind: TargetKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(Platform::GitHub.to_string(), "GitHub");
        assert_eq!(Platform::GitLab.to_string(), "GitLab");
        assert_eq!(TargetKind::Organisation.to_string(), "organisation");
        assert_eq!(TargetKind::Unknown.to_string(), "unknown");
    }
}
