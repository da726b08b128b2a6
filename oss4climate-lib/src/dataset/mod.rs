//! The fetched repository dataset and its on-disk forms.
//!
//! A dataset is persisted three ways, and the flattened and summary forms can be read back:
//! - a compressed columnar snapshot, reloaded by the search command
//! - a flattened CSV or JSON file, chosen by the output file's extension
//! - a TOML summary with counts, failures and the distinct organisations, languages and licences

mod flat;
mod snapshot;
mod summary;

pub use flat::{LISTING_FILE_NAME, OutputFormat, parse_flat, write_flat};
pub use snapshot::{SNAPSHOT_FILE_NAME, load_snapshot, save_snapshot};
pub use summary::{FailureSummary, SUMMARY_FILE_NAME, Statistics, Summary};

use crate::Result;
use crate::hosting::RepositoryRecord;
use camino::Utf8Path;
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::fs;

/// Repository records keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: BTreeMap<String, RepositoryRecord>,
}

impl Dataset {
    /// Build a dataset. Later records replace earlier ones with the same id.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RepositoryRecord>,
    {
        let mut dataset = Self::default();
        for record in records {
            let _ = dataset.insert(record);
        }
        dataset
    }

    /// Add or replace a record, returning the one it replaced.
    pub fn insert(&mut self, record: RepositoryRecord) -> Option<RepositoryRecord> {
        self.records.insert(record.id.clone(), record)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RepositoryRecord> {
        self.records.get(id)
    }

    /// Records in id order.
    pub fn records(&self) -> impl Iterator<Item = &RepositoryRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn create_parent_dir(path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_records {
    use crate::hosting::RepositoryRecord;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    pub fn record(id: &str) -> RepositoryRecord {
        let (org, name) = id.split_once('/').unwrap_or(("", id));
        RepositoryRecord {
            id: id.to_string(),
            name: name.to_string(),
            organisation: Some(org.to_string()),
            url: format!("https://github.com/{id}"),
            website: None,
            description: Some(format!("{name}; a tool")),
            license: Some("MIT License".to_string()),
            language: Some("Python".to_string()),
            latest_update: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            last_commit: Some(Utc.with_ymd_and_hms(2024, 2, 28, 8, 30, 0).unwrap()),
            open_pull_requests: Some(2),
            master_branch: Some("main".to_string()),
            readme: Some("# Readme\n\nSolar things.".to_string()),
            is_fork: false,
            forked_from: None,
            raw_details: json!({ "full_name": id, "stargazers_count": 3 }),
        }
    }
}
