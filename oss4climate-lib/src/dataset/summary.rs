use super::Dataset;
use crate::Result;
use crate::targets::save_toml;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name of the summary written next to the snapshot.
pub const SUMMARY_FILE_NAME: &str = "summary.toml";

/// Headline figures of a generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Statistics {
    pub repositories: usize,
    pub organisations: usize,
}

/// Targets whose fetch failed, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureSummary {
    pub organisations: Vec<String>,
    pub repositories: Vec<String>,
}

/// The `summary.toml` written next to a dataset.
///
/// Plain arrays come first so that they precede the tables in the TOML output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub organisations: Vec<String>,
    pub language: Vec<String>,
    pub licences: Vec<String>,
    pub statistics: Statistics,
    pub failures: FailureSummary,
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Summary {
    #[must_use]
    pub fn new(dataset: &Dataset, mut failed_organisations: Vec<String>, mut failed_repositories: Vec<String>) -> Self {
        failed_organisations.sort_unstable();
        failed_organisations.dedup();
        failed_repositories.sort_unstable();
        failed_repositories.dedup();

        let organisations = distinct(dataset.records().map(|r| r.organisation.as_deref()));

        Self {
            statistics: Statistics {
                repositories: dataset.len(),
                organisations: organisations.len(),
            },
            failures: FailureSummary {
                organisations: failed_organisations,
                repositories: failed_repositories,
            },
            language: distinct(dataset.records().map(|r| r.language.as_deref())),
            licences: distinct(dataset.records().map(|r| r.license.as_deref())),
            organisations,
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Save the summary to a `.toml` file.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        save_toml(path, "summary", &self.to_toml_string()?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_records::record;
    use super::*;

    #[test]
    fn summary_collects_distinct_values() {
        let mut other = record("grid/sim");
        other.language = Some("Rust".to_string());
        other.license = None;
        let dataset = Dataset::from_records([record("acme/a"), record("acme/b"), other]);

        let summary = Summary::new(
            &dataset,
            vec!["https://github.com/zeta".to_string(), "https://github.com/alpha".to_string()],
            vec!["https://github.com/acme/c".to_string(), "https://github.com/acme/c".to_string()],
        );

        assert_eq!(summary.statistics, Statistics { repositories: 3, organisations: 2 });
        assert_eq!(summary.organisations, ["acme", "grid"]);
        assert_eq!(summary.language, ["Python", "Rust"]);
        assert_eq!(summary.licences, ["MIT License"]);
        assert_eq!(summary.failures.organisations, ["https://github.com/alpha", "https://github.com/zeta"]);
        assert_eq!(summary.failures.repositories, ["https://github.com/acme/c"]);
    }

    #[test]
    fn summary_toml_layout() {
        let summary = Summary::new(&Dataset::from_records([record("acme/a")]), Vec::new(), Vec::new());
        let text = summary.to_toml_string().unwrap();

        assert!(text.contains("[statistics]"));
        assert!(text.contains("repositories = 1"));
        assert!(text.contains("[failures]"));
        assert_eq!(Summary::from_toml_str(&text).unwrap(), summary);
    }
}
