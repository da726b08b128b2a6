use crate::targets::{TargetSet, organisation_url_of};

/// The GitHub organisations owning the repositories of `targets`.
///
/// Useful for finding sibling repositories of projects already indexed.
#[must_use]
pub fn organisations_of_repositories(targets: &TargetSet) -> TargetSet {
    let mut out = TargetSet {
        github_organisations: targets
            .github_repositories
            .iter()
            .filter_map(|url| organisation_url_of(url))
            .collect(),
        ..TargetSet::default()
    };
    out.dedup_and_sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_are_collected_once() {
        let targets = TargetSet {
            github_repositories: vec![
                "https://github.com/zeta/one".to_string(),
                "https://github.com/acme/a".to_string(),
                "https://github.com/acme/b".to_string(),
            ],
            gitlab_projects: vec!["https://gitlab.com/grid/sim".to_string()],
            ..TargetSet::default()
        };

        let orgs = organisations_of_repositories(&targets);
        assert_eq!(orgs.github_organisations, ["https://github.com/acme", "https://github.com/zeta"]);
        assert_eq!(orgs.len(), 2);
    }
}
