use super::Platform;
use super::toml_io::{load_toml, save_toml};
use crate::Result;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// The classified targets accumulated across discovery passes.
///
/// Buckets hold URLs. Order is irrelevant until [`TargetSet::dedup_and_sort`] or
/// [`TargetSet::cleanup`] runs, and persistence always writes sorted buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    pub github_repositories: Vec<String>,
    pub github_organisations: Vec<String>,
    pub gitlab_projects: Vec<String>,
    pub gitlab_groups: Vec<String>,
    pub unknown: Vec<String>,
    pub invalid: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TargetSetDocument {
    #[serde(default)]
    dropped_targets: DroppedTargets,
    #[serde(default)]
    github_hosted: GitHubHosted,
    #[serde(default)]
    gitlab_hosted: GitLabHosted,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DroppedTargets {
    #[serde(default)]
    invalid_urls: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GitHubHosted {
    #[serde(default)]
    organisations: Vec<String>,
    #[serde(default)]
    repositories: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GitLabHosted {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    projects: Vec<String>,
}

fn sort_unique(v: &mut Vec<String>) {
    v.sort_unstable();
    v.dedup();
}

fn remove_listed(v: &mut Vec<String>, listed: &[&Vec<String>]) {
    v.retain(|url| !listed.iter().any(|bucket| bucket.binary_search(url).is_ok()));
}

impl TargetSet {
    /// Concatenate two sets bucket by bucket, `a`'s entries first.
    #[must_use]
    pub fn merge(a: Self, b: Self) -> Self {
        let mut out = a;
        out.extend(b);
        out
    }

    /// Append every bucket of `other` to this set.
    pub fn extend(&mut self, other: Self) {
        self.github_repositories.extend(other.github_repositories);
        self.github_organisations.extend(other.github_organisations);
        self.gitlab_projects.extend(other.gitlab_projects);
        self.gitlab_groups.extend(other.gitlab_groups);
        self.unknown.extend(other.unknown);
        self.invalid.extend(other.invalid);
    }

    /// Sort every bucket and drop duplicate entries.
    pub fn dedup_and_sort(&mut self) {
        sort_unique(&mut self.github_repositories);
        sort_unique(&mut self.github_organisations);
        sort_unique(&mut self.gitlab_projects);
        sort_unique(&mut self.gitlab_groups);
        sort_unique(&mut self.unknown);
        sort_unique(&mut self.invalid);
    }

    /// Bring the set into its normal form.
    ///
    /// Every GitHub and GitLab entry is canonicalized, buckets are sorted and deduplicated,
    /// repositories that are also listed as organisations are dropped, and entries of
    /// `unknown`/`invalid` that now resolve to a known bucket are dropped.
    pub fn cleanup(&mut self) {
        for (platform, urls) in [
            (Platform::GitHub, &mut self.github_repositories),
            (Platform::GitHub, &mut self.github_organisations),
            (Platform::GitLab, &mut self.gitlab_projects),
            (Platform::GitLab, &mut self.gitlab_groups),
        ] {
            for url in urls.iter_mut() {
                *url = platform.canonicalize(url);
            }
        }

        self.dedup_and_sort();

        remove_listed(&mut self.github_repositories, &[&self.github_organisations]);
        remove_listed(&mut self.gitlab_projects, &[&self.gitlab_groups]);

        let known = [
            &self.github_repositories,
            &self.github_organisations,
            &self.gitlab_projects,
            &self.gitlab_groups,
        ];
        remove_listed(&mut self.unknown, &known);
        remove_listed(&mut self.invalid, &known);
        remove_listed(&mut self.invalid, &[&self.unknown]);
    }

    /// Flatten the set into a single URL list.
    ///
    /// With `known_repositories_only`, only GitHub repositories and GitLab projects are returned.
    #[must_use]
    pub fn as_url_list(&self, known_repositories_only: bool) -> Vec<String> {
        let mut out: Vec<String> = self.github_repositories.iter().chain(&self.gitlab_projects).cloned().collect();

        if !known_repositories_only {
            out.extend(
                self.github_organisations
                    .iter()
                    .chain(&self.gitlab_groups)
                    .chain(&self.unknown)
                    .chain(&self.invalid)
                    .cloned(),
            );
        }

        out
    }

    /// Total number of entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.github_repositories.len()
            + self.github_organisations.len()
            + self.gitlab_projects.len()
            + self.gitlab_groups.len()
            + self.unknown.len()
            + self.invalid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a set from its TOML form. Missing sections are empty.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let doc: TargetSetDocument = toml::from_str(text)?;
        Ok(Self {
            github_repositories: doc.github_hosted.repositories,
            github_organisations: doc.github_hosted.organisations,
            gitlab_projects: doc.gitlab_hosted.projects,
            gitlab_groups: doc.gitlab_hosted.groups,
            unknown: doc.dropped_targets.urls,
            invalid: doc.dropped_targets.invalid_urls,
        })
    }

    /// Render the set as TOML with every bucket sorted.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut sorted = self.clone();
        sorted.dedup_and_sort();

        let doc = TargetSetDocument {
            dropped_targets: DroppedTargets {
                invalid_urls: sorted.invalid,
                urls: sorted.unknown,
            },
            github_hosted: GitHubHosted {
                organisations: sorted.github_organisations,
                repositories: sorted.github_repositories,
            },
            gitlab_hosted: GitLabHosted {
                groups: sorted.gitlab_groups,
                projects: sorted.gitlab_projects,
            },
        };

        Ok(toml::to_string(&doc)?)
    }

    /// Load a set from a `.toml` file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        load_toml(path, "target index", Self::from_toml_str)
    }

    /// Save the set to a `.toml` file.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        save_toml(path, "target index", &self.to_toml_string()?)
    }
}
